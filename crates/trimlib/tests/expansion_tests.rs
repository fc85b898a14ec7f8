/*
 * expansion_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests for rendering and tag expansion against in-memory
 * libraries.
 */

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use trimlib::{
    DiagnosticKind, ExpressionError, MemoryTransport, RenderData, Renderable, Request,
    TemplateEngine, TemplateError, Trimlib, TrimlibError,
};
use trimlib_markup::{NodeExt, NodeRef, Selector, find_all, parse_document};

const UI: &str = r#"
<textarea id="greet">Hello, ${name}!</textarea>
<textarea id="card"><div class="card"><h2>${title}</h2>${__body}</div></textarea>
<textarea id="badge"><span class="badge">${label}</span></textarea>
<textarea id="silent"><hr/></textarea>
<textarea id="twice">${__body}|${__body}</textarea>
<textarea id="sentinel">[${value}]</textarea>
<textarea id="wrap">[${__body}]</textarea>
<textarea id="broken">${unclosed</textarea>
<textarea id="unbalanced"><b>${x}</textarea>
<textarea id="emit"><ui:greet name="inner"/></textarea>
<template id="outer"><div><textarea id="nested">never a template</textarea></div></template>
"#;

fn transport() -> MemoryTransport {
    MemoryTransport::with_resources([("ui.html", UI)])
}

fn trimlib_with(transport: &MemoryTransport) -> Trimlib {
    Trimlib::builder()
        .transport(transport.clone())
        .declare("ui", "ui.html")
        .build()
}

fn select(doc: &NodeRef, selector: &str) -> NodeRef {
    find_all(doc, &Selector::parse(selector).unwrap())
        .into_iter()
        .next()
        .unwrap()
}

/// Evaluator that counts every expression it sees and returns it as a string.
fn counting_evaluator(
    hits: &Rc<Cell<usize>>,
) -> impl Fn(&str) -> Result<Value, ExpressionError> + 'static {
    let hits = Rc::clone(hits);
    move |expression: &str| {
        hits.set(hits.get() + 1);
        Ok(Value::String(expression.to_string()))
    }
}

#[test]
fn test_greet_round_trip() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<p><ui:greet name="World"/></p>"#).unwrap();
    let tag = select(&doc, "ui:greet");

    trimlib.expand(&tag).unwrap();

    assert_eq!(doc.inner_html(), "<p>Hello, World!</p>");
    assert!(tag.parent().is_none());
}

#[test]
fn test_malformed_tag_names_are_left_alone() {
    let trimlib = trimlib_with(&transport());
    let markup = "<div><greet/><ui:greet:x/><span>text</span></div>";
    let doc = parse_document(markup).unwrap();

    for node in doc.descendants() {
        if node.is_element() {
            trimlib.expand(&node).unwrap();
        }
    }
    assert_eq!(
        doc.inner_html(),
        "<div><greet></greet><ui:greet:x></ui:greet:x><span>text</span></div>"
    );
}

#[test]
fn test_unregistered_namespace_is_a_no_op() {
    let transport = transport();
    let trimlib = trimlib_with(&transport);
    let doc = parse_document(r#"<p><svg:greet name="x"/></p>"#).unwrap();

    trimlib.expand(&select(&doc, "svg:greet")).unwrap();

    assert_eq!(doc.inner_html(), r#"<p><svg:greet name="x"></svg:greet></p>"#);
    assert_eq!(transport.total_fetches(), 0);
}

#[test]
fn test_detached_element_is_a_no_op() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<p><ui:greet name="x"/></p>"#).unwrap();
    let tag = select(&doc, "ui:greet");
    tag.detach();

    trimlib.expand(&tag).unwrap();
    assert_eq!(doc.inner_html(), "<p></p>");
}

#[test]
fn test_matching_ignores_case() {
    let transport =
        MemoryTransport::with_resources([("foo.html", r#"<textarea id="BAR">ok</textarea>"#)]);
    let trimlib = Trimlib::builder()
        .transport(transport.clone())
        .declare("Foo", "foo.html")
        .build();
    let doc = parse_document("<div><Foo:Bar/><foo:bar/><FOO:BAR/></div>").unwrap();

    let expanded = trimlib.expand_all(&doc).unwrap();

    assert_eq!(expanded, 3);
    assert_eq!(doc.inner_html(), "<div>okokok</div>");
    assert_eq!(transport.fetch_count("foo.html"), 1);
}

#[test]
fn test_only_direct_children_are_templates() {
    let trimlib = trimlib_with(&transport());
    let library = trimlib.lookup("ui");
    assert!(library.is_none(), "registry is filled on first use");

    let doc = parse_document("<div><ui:nested/><ui:outer/></div>").unwrap();
    trimlib.expand_all(&doc).unwrap();

    let library = trimlib.lookup("ui").unwrap();
    let ctx = trimlib.load_context();
    assert!(library.has_template("outer", &ctx));
    assert!(!library.has_template("nested", &ctx));
    assert_eq!(
        doc.inner_html(),
        "<div><ui:nested></ui:nested><div><textarea id=\"nested\">never a template</textarea></div></div>"
    );
}

#[test]
fn test_missing_body_renders_as_empty() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document("<div id=\"a\"></div><div id=\"b\"></div>").unwrap();
    let a = select(&doc, "div[id=a]");
    let b = select(&doc, "div[id=b]");

    trimlib.render(&a, "ui", "wrap", None).unwrap();
    let mut data = RenderData::new();
    data.insert("__body", "");
    trimlib.render(&b, "ui", "wrap", Some(data)).unwrap();

    assert_eq!(a.inner_html(), "[]");
    assert_eq!(a.inner_html(), b.inner_html());
}

#[test]
fn test_render_fills_element() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document("<section>old</section>").unwrap();
    let target = select(&doc, "section");

    let data = RenderData::try_from(json!({"name": "Ada"})).unwrap();
    trimlib.render(&target, "UI", "Greet", Some(data)).unwrap();

    assert_eq!(doc.inner_html(), "<section>Hello, Ada!</section>");
}

#[test]
fn test_render_unknown_is_a_no_op() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document("<section>old</section>").unwrap();
    let target = select(&doc, "section");

    trimlib.render(&target, "nope", "greet", None).unwrap();
    trimlib.render(&target, "ui", "nope", None).unwrap();

    assert_eq!(target.inner_html(), "old");
}

#[test]
fn test_render_requires_namespace_and_template() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document("<section/>").unwrap();
    let target = select(&doc, "section");

    assert!(matches!(
        trimlib.render(&target, "", "greet", None),
        Err(TrimlibError::MissingNamespace)
    ));
    assert!(matches!(
        trimlib.render(&target, "ui", " ", None),
        Err(TrimlibError::MissingTemplate)
    ));
}

#[test]
fn test_unreferenced_body_is_never_expanded() {
    let hits = Rc::new(Cell::new(0));
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("ui", "ui.html")
        .evaluator(counting_evaluator(&hits))
        .build();
    let doc =
        parse_document(r#"<div><ui:silent><ui:sentinel value="javascript:hit"/></ui:silent></div>"#)
            .unwrap();
    let silent = select(&doc, "ui:silent");
    let sentinel = select(&doc, "ui:sentinel");

    trimlib.expand(&silent).unwrap();

    assert_eq!(doc.inner_html(), "<div><hr/></div>");
    assert_eq!(hits.get(), 0);
    // The sentinel still sits, untouched, in the replaced subtree
    assert!(sentinel.is_descendant_of(&silent));
    assert_eq!(sentinel.attr("value").as_deref(), Some("javascript:hit"));
    assert!(!sentinel.has_children());
}

#[test]
fn test_referenced_body_is_fully_expanded() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(
        r#"<main><ui:card title="Welcome"><ui:badge label="new"/> Hello <ui:wrap><ui:badge label="deep"/></ui:wrap></ui:card></main>"#,
    )
    .unwrap();

    trimlib.expand(&select(&doc, "ui:card")).unwrap();

    insta::assert_snapshot!(doc.inner_html(), @r#"<main><div class="card"><h2>Welcome</h2><span class="badge">new</span> Hello [<span class="badge">deep</span>]</div></main>"#);
}

#[test]
fn test_body_referenced_twice_expands_once() {
    let hits = Rc::new(Cell::new(0));
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("ui", "ui.html")
        .evaluator(counting_evaluator(&hits))
        .build();
    let doc =
        parse_document(r#"<div><ui:twice><ui:sentinel value="javascript:x"/></ui:twice></div>"#)
            .unwrap();

    trimlib.expand_all(&doc).unwrap();

    assert_eq!(doc.inner_html(), "<div>[x]|[x]</div>");
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_expression_attribute_yields_a_number() {
    struct Recorder(Rc<RefCell<Vec<Value>>>);

    impl Renderable for Recorder {
        fn process(&self, data: &RenderData<'_>) -> Result<String, TrimlibError> {
            if let Some(value) = data.resolve("data-x")? {
                self.0.borrow_mut().push(value.into_owned());
            }
            Ok(String::new())
        }
    }

    struct RecordingEngine(Rc<RefCell<Vec<Value>>>);

    impl TemplateEngine for RecordingEngine {
        fn compile(&self, _source: &str) -> Result<Rc<dyn Renderable>, TemplateError> {
            Ok(Rc::new(Recorder(Rc::clone(&self.0))))
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let trimlib = Trimlib::builder()
        .transport(transport())
        .engine(RecordingEngine(Rc::clone(&seen)))
        .declare("ui", "ui.html")
        .build();
    let doc = parse_document(r#"<div><ui:greet data-x="javascript:1+1"/></div>"#).unwrap();

    trimlib.expand_all(&doc).unwrap();

    assert_eq!(*seen.borrow(), vec![json!(2)]);
    assert!(seen.borrow()[0].is_number());
}

#[test]
fn test_expression_failure_propagates() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<div><ui:greet name="javascript:1 +"/></div>"#).unwrap();

    let err = trimlib.expand_all(&doc).unwrap_err();
    assert!(matches!(err, TrimlibError::Expression { .. }));
    assert_eq!(err.to_diagnostic().code.as_deref(), Some("TL-2-3"));
}

#[test]
fn test_disabled_expressions() {
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("ui", "ui.html")
        .expressions(false)
        .build();
    let doc = parse_document(r#"<div><ui:greet name="javascript:'x'"/></div>"#).unwrap();

    let err = trimlib.expand_all(&doc).unwrap_err();
    assert!(matches!(
        err,
        TrimlibError::Expression {
            source: ExpressionError::Disabled,
            ..
        }
    ));
}

#[test]
fn test_shorthand_and_explicit_render_requests_agree() {
    let payload = json!({"namespace": "ui", "template": "greet", "data": {"name": "Ada"}});
    let markup = r#"<section role="target"/><section role="target"/><p/>"#;

    let run = |method: Option<&str>| {
        let trimlib = trimlib_with(&transport());
        let doc = parse_document(markup).unwrap();
        let request = Request::from_args(method, Some(&payload)).unwrap();
        trimlib
            .invoke_selector(&doc, "section[role=target]", request)
            .unwrap();
        doc.inner_html()
    };

    let shorthand = run(None);
    assert_eq!(shorthand, run(Some("render")));
    assert_eq!(
        shorthand,
        r#"<section role="target">Hello, Ada!</section><section role="target">Hello, Ada!</section><p></p>"#
    );
}

#[test]
fn test_expand_request() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<ui:greet name="a"/><ui:greet name="b"/>"#).unwrap();
    let targets = find_all(&doc, &Selector::parse("ui:greet").unwrap());

    trimlib
        .invoke(&doc, &targets, Request::from_args(Some("expand"), None).unwrap())
        .unwrap();

    assert_eq!(doc.inner_html(), "Hello, a!Hello, b!");
}

#[test]
fn test_initialization_is_idempotent() {
    let transport = transport();
    let trimlib = trimlib_with(&transport);
    let doc = parse_document(
        r#"<link rel="trimlib" namespace="ui" href="ui.html"/><ui:greet name="a"/><ui:greet name="b"/>"#,
    )
    .unwrap();

    assert!(trimlib.initialize(&doc).unwrap());
    assert!(!trimlib.initialize(&doc).unwrap());
    trimlib.expand_all(&doc).unwrap();
    trimlib.expand_all(&doc).unwrap();

    assert_eq!(trimlib.libraries(), vec!["ui"]);
    assert_eq!(transport.fetch_count("ui.html"), 1);
    assert_eq!(transport.total_fetches(), 1);
}

#[test]
fn test_unavailable_library_is_reported_once() {
    let transport = transport();
    let trimlib = Trimlib::builder()
        .transport(transport.clone())
        .declare("gone", "gone.html")
        .build();
    let doc = parse_document("<div><gone:a/><gone:b/></div>").unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 0);

    assert_eq!(doc.inner_html(), "<div><gone:a></gone:a><gone:b></gone:b></div>");
    assert_eq!(transport.fetch_count("gone.html"), 1);
    let diagnostics = trimlib.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Warning);
    assert_eq!(diagnostics[0].code.as_deref(), Some("TL-1-1"));
}

#[test]
fn test_unavailable_library_in_strict_mode() {
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("gone", "gone.html")
        .strict(true)
        .build();
    let doc = parse_document("<section/>").unwrap();

    let err = trimlib
        .render(&select(&doc, "section"), "gone", "a", None)
        .unwrap_err();
    assert!(matches!(err, TrimlibError::LibraryUnavailable { .. }));
}

#[test]
fn test_compile_failure_is_reported_once_and_skipped() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<div><ui:broken/><ui:broken/><ui:greet name="ok"/></div>"#).unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 1);

    assert_eq!(
        doc.inner_html(),
        "<div><ui:broken></ui:broken><ui:broken></ui:broken>Hello, ok!</div>"
    );
    let diagnostics = trimlib.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("TL-2-1"));
    assert!(!trimlib.has_errors());
}

#[test]
fn test_compile_failure_in_strict_mode() {
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("ui", "ui.html")
        .strict(true)
        .build();
    let doc = parse_document("<div><ui:broken/></div>").unwrap();

    let err = trimlib.expand(&select(&doc, "ui:broken")).unwrap_err();
    assert!(matches!(err, TrimlibError::Compile { .. }));
}

#[test]
fn test_content_of_unusable_tags_is_not_expanded() {
    let hits = Rc::new(Cell::new(0));
    let transport = transport();
    let trimlib = Trimlib::builder()
        .transport(transport.clone())
        .declare("ui", "ui.html")
        .declare("gone", "gone.html")
        .evaluator(counting_evaluator(&hits))
        .build();
    let doc = parse_document(
        r#"<div><ui:broken><ui:sentinel value="javascript:a"/></ui:broken><gone:x><ui:sentinel value="javascript:b"/></gone:x><ui:missing><ui:sentinel value="javascript:c"/></ui:missing></div>"#,
    )
    .unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 1);

    assert_eq!(hits.get(), 1);
    insta::assert_snapshot!(doc.inner_html(), @r#"<div><ui:broken><ui:sentinel value="javascript:a"></ui:sentinel></ui:broken><gone:x><ui:sentinel value="javascript:b"></ui:sentinel></gone:x><ui:missing>[c]</ui:missing></div>"#);
}

#[test]
fn test_body_skips_content_of_unusable_tags() {
    let hits = Rc::new(Cell::new(0));
    let trimlib = Trimlib::builder()
        .transport(transport())
        .declare("ui", "ui.html")
        .evaluator(counting_evaluator(&hits))
        .build();
    let doc = parse_document(
        r#"<div><ui:wrap><ui:broken><ui:sentinel value="javascript:a"/></ui:broken></ui:wrap></div>"#,
    )
    .unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 1);

    assert_eq!(hits.get(), 0);
    assert_eq!(
        doc.inner_html(),
        r#"<div>[<ui:broken><ui:sentinel value="javascript:a"></ui:sentinel></ui:broken>]</div>"#
    );
}

#[test]
fn test_escaped_attribute_text_renders_as_text() {
    let trimlib = trimlib_with(&transport());
    let doc =
        parse_document(r#"<p><ui:greet name="a &lt; b"/><ui:badge label="&lt;b&gt;"/></p>"#).unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 2);

    assert_eq!(
        doc.inner_html(),
        r#"<p>Hello, a &lt; b!<span class="badge">&lt;b&gt;</span></p>"#
    );
}

#[test]
fn test_unbalanced_output_is_an_error() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document(r#"<div><ui:unbalanced x="1"/></div>"#).unwrap();

    let err = trimlib.expand_all(&doc).unwrap_err();
    assert!(matches!(err, TrimlibError::Markup(_)));
    // Nothing was replaced
    assert_eq!(doc.inner_html(), r#"<div><ui:unbalanced x="1"></ui:unbalanced></div>"#);
}

#[test]
fn test_expand_all_does_not_rescan_output() {
    let trimlib = trimlib_with(&transport());
    let doc = parse_document("<div><ui:emit/></div>").unwrap();

    assert_eq!(trimlib.expand_all(&doc).unwrap(), 1);
    assert_eq!(
        doc.inner_html(),
        r#"<div><ui:greet name="inner"></ui:greet></div>"#
    );

    // A second pass picks up what the first one produced
    assert_eq!(trimlib.expand_all(&doc).unwrap(), 1);
    assert_eq!(doc.inner_html(), "<div>Hello, inner!</div>");
}
