/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration, usually read from `trimlib.toml`.
//!
//! ```toml
//! base_dir = "site"
//! strict = false
//! expressions = true
//!
//! [[library]]
//! namespace = "ui"
//! href = "libs/ui.html"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::LibraryDeclaration;

/// Conventional configuration file name.
pub const CONFIG_FILENAME: &str = "trimlib.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config{}: {source}", in_file(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or_else(String::new, |p| format!(" {}", p.display()))
}

/// Settings for a [`Trimlib`](crate::Trimlib) context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrimlibConfig {
    /// Libraries registered before those declared in the document.
    #[serde(rename = "library", skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryDeclaration>,

    /// Directory relative library references resolve against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Return library and compile failures instead of skipping the tag.
    pub strict: bool,

    /// Evaluate `javascript:` attributes. When false every such attribute
    /// fails to evaluate.
    pub expressions: bool,
}

impl Default for TrimlibConfig {
    fn default() -> Self {
        Self {
            libraries: Vec::new(),
            base_dir: None,
            strict: false,
            expressions: true,
        }
    }
}

impl TrimlibConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Load a config file. A relative `base_dir` is taken relative to the
    /// file's directory; without one, the file's directory is used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        config.base_dir = Some(match config.base_dir.take() {
            Some(base) if base.is_relative() => dir.join(base),
            Some(base) => base,
            None => dir.to_path_buf(),
        });
        tracing::debug!(?path, libraries = config.libraries.len(), "Loaded config");
        Ok(config)
    }

    /// Add a library declaration.
    pub fn with_library(mut self, namespace: impl Into<String>, href: impl Into<String>) -> Self {
        self.libraries.push(LibraryDeclaration::new(namespace, href));
        self
    }
}
