/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Diagnostic messages for problems that do not abort expansion.
//!
//! A broken tag library must not stop unrelated tags from expanding, but it
//! must not go unnoticed either. Such failures are recorded as
//! [`Diagnostic`]s in the [`DiagnosticCollector`] owned by the
//! [`Trimlib`](crate::Trimlib) context, and logged through `tracing`.
//!
//! Codes follow `TL-<subsystem>-<number>`:
//! - `TL-1-*`: library loading
//! - `TL-2-*`: template compilation and rendering
//! - `TL-3-*`: invocation

use std::fmt;

use serde::Serialize;

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// A problem that made some work impossible
    Error,
    /// A problem that was tolerated
    Warning,
    /// Informational message
    Info,
}

/// A structured diagnostic: title, problem statement, details and hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl Diagnostic {
    /// Start building an error diagnostic.
    pub fn error(title: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticKind::Error, title)
    }

    /// Start building a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticKind::Warning, title)
    }

    /// Start building an info diagnostic.
    pub fn info(title: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticKind::Info, title)
    }

    /// Render as tidyverse-style text.
    ///
    /// ```text
    /// Error [TL-2-1]: Template Compilation Failed
    /// Template `card` in library `ui` is malformed
    /// ✖ Unclosed placeholder at byte 6
    /// ? Hint
    /// ```
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
        };
        match &self.code {
            Some(code) => writeln!(f, "{} [{}]: {}", kind, code, self.title)?,
            None => writeln!(f, "{}: {}", kind, self.title)?,
        }
        if let Some(problem) = &self.problem {
            writeln!(f, "{}", problem)?;
        }
        for detail in &self.details {
            writeln!(f, "✖ {}", detail)?;
        }
        for hint in &self.hints {
            writeln!(f, "? {}", hint)?;
        }
        Ok(())
    }
}

/// Builder for [`Diagnostic`].
#[derive(Debug, Clone)]
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic {
                code: None,
                title: title.into(),
                kind,
                problem: None,
                details: Vec::new(),
                hints: Vec::new(),
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    /// The "what went wrong" statement.
    pub fn problem(mut self, problem: impl Into<String>) -> Self {
        self.diagnostic.problem = Some(problem.into());
        self
    }

    pub fn add_detail(mut self, detail: impl Into<String>) -> Self {
        self.diagnostic.details.push(detail.into());
        self
    }

    /// Hints are phrased as questions.
    pub fn add_hint(mut self, hint: impl Into<String>) -> Self {
        self.diagnostic.hints.push(hint.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Collector for diagnostics raised while loading and expanding.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Check if any errors were collected (warnings don't count).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all collected diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}
