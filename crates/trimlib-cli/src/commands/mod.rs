//! Command implementations for the trimlib CLI
//!
//! Options shared by every command select the configuration and build the
//! [`Trimlib`] context.

pub mod check;
pub mod expand;
pub mod render;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;
use trimlib::{CONFIG_FILENAME, Diagnostic, LibraryDeclaration, Trimlib, TrimlibConfig};

/// Options shared by all commands.
#[derive(Debug, Default, Args)]
pub struct EngineArgs {
    /// Configuration file (defaults to ./trimlib.toml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Declare a library (NAMESPACE=HREF); may be repeated
    #[arg(
        short = 'l',
        long = "lib",
        value_name = "NAMESPACE=HREF",
        value_parser = parse_library,
        global = true
    )]
    pub libraries: Vec<LibraryDeclaration>,

    /// Directory relative library references resolve against
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Fail on unavailable libraries and broken templates
    #[arg(long, global = true)]
    pub strict: bool,

    /// Refuse to evaluate `javascript:` attributes
    #[arg(long, global = true)]
    pub no_expressions: bool,
}

impl EngineArgs {
    /// Merge the configuration file with the command line.
    ///
    /// Without a configured base directory, library references resolve
    /// against the directory of `input`.
    pub fn load_config(&self, input: Option<&Path>) -> Result<TrimlibConfig> {
        let default_path = PathBuf::from(CONFIG_FILENAME);
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None if default_path.is_file() => Some(default_path),
            None => None,
        };

        let mut config = match &path {
            Some(path) => TrimlibConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => TrimlibConfig::default(),
        };
        debug!(config = ?path, "Resolved configuration");

        config.libraries.extend(self.libraries.iter().cloned());
        if let Some(base_dir) = &self.base_dir {
            config.base_dir = Some(base_dir.clone());
        } else if config.base_dir.is_none() {
            config.base_dir = input
                .and_then(Path::parent)
                .map(Path::to_path_buf);
        }
        config.strict |= self.strict;
        if self.no_expressions {
            config.expressions = false;
        }
        Ok(config)
    }

    pub fn build(&self, input: Option<&Path>) -> Result<Trimlib> {
        let config = self.load_config(input)?;
        Ok(Trimlib::builder().config(config).build())
    }
}

fn parse_library(value: &str) -> Result<LibraryDeclaration, String> {
    match value.split_once('=') {
        Some((namespace, href)) if !namespace.trim().is_empty() && !href.trim().is_empty() => {
            Ok(LibraryDeclaration::new(namespace.trim(), href.trim()))
        }
        _ => Err(format!("expected NAMESPACE=HREF, got '{}'", value)),
    }
}

/// Read a document from a path, or from stdin for `-`.
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        Ok(source)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

/// Input path used to resolve relative library references.
pub fn input_path(input: &str) -> Option<&Path> {
    (input != "-").then_some(Path::new(input))
}

/// Print diagnostics to stderr.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprint!("{}", diagnostic.to_text());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_library() {
        assert_eq!(
            parse_library("ui=libs/ui.html").unwrap(),
            LibraryDeclaration::new("ui", "libs/ui.html")
        );
        assert_eq!(
            parse_library("ui=a=b.html").unwrap(),
            LibraryDeclaration::new("ui", "a=b.html")
        );
        assert!(parse_library("ui").is_err());
        assert!(parse_library("=ui.html").is_err());
    }

    #[test]
    fn test_command_line_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[[library]]\nnamespace = \"ui\"\nhref = \"ui.html\"\n",
        )
        .unwrap();

        let args = EngineArgs {
            config: Some(path),
            libraries: vec![LibraryDeclaration::new("forms", "forms.html")],
            strict: true,
            no_expressions: true,
            ..Default::default()
        };
        let config = args.load_config(None).unwrap();

        assert_eq!(
            config.libraries,
            vec![
                LibraryDeclaration::new("ui", "ui.html"),
                LibraryDeclaration::new("forms", "forms.html"),
            ]
        );
        assert_eq!(config.base_dir, Some(dir.path().to_path_buf()));
        assert!(config.strict);
        assert!(!config.expressions);
    }

    #[test]
    fn test_base_dir_defaults_to_input_directory() {
        let args = EngineArgs {
            config: Some(PathBuf::from("/nonexistent/trimlib.toml")),
            ..Default::default()
        };
        assert!(args.load_config(None).is_err());

        let args = EngineArgs::default();
        let config = args.load_config(Some(Path::new("site/index.html")));
        // A trimlib.toml in the working directory would take precedence
        if !Path::new(CONFIG_FILENAME).is_file() {
            assert_eq!(config.unwrap().base_dir, Some(PathBuf::from("site")));
        }
    }

    #[test]
    fn test_input_path() {
        assert_eq!(input_path("-"), None);
        assert_eq!(input_path("a/b.html"), Some(Path::new("a/b.html")));
    }
}
