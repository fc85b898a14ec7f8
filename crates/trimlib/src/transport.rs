/*
 * transport.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Fetching tag library resources.
//!
//! A [`Transport`] turns the `href` of a library declaration into the text of
//! the library. Fetches are synchronous: when `fetch` returns, the content is
//! either fully available or the fetch has failed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use url::Url;

/// Errors raised while fetching a library resource.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Failed to read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported resource scheme: {url}")]
    Unsupported { url: String },

    #[error("Invalid resource reference {url}: {message}")]
    InvalidReference { url: String, message: String },
}

/// Trait for fetching library content.
pub trait Transport {
    /// Fetch the resource at `url` and return it as text.
    fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

/// Transport that reads resources from the filesystem.
///
/// Relative references and `file://` URLs resolve against the base directory;
/// absolute paths are used as-is. Network schemes are rejected, as are
/// `file://` URLs naming a remote host.
#[derive(Debug, Clone, Default)]
pub struct FileSystemTransport {
    base_dir: PathBuf,
}

impl FileSystemTransport {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a library reference to a filesystem path.
    ///
    /// The reference is joined onto the base directory as a URL, so
    /// percent-escapes are decoded and queries and fragments dropped.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, TransportError> {
        let invalid = |message: &str| TransportError::InvalidReference {
            url: reference.to_string(),
            message: message.to_string(),
        };

        let url = self
            .base_url()?
            .join(reference)
            .map_err(|err| invalid(&err.to_string()))?;
        if url.scheme() != "file" {
            return Err(TransportError::Unsupported {
                url: reference.to_string(),
            });
        }
        url.to_file_path()
            .map_err(|()| invalid("not a local file path"))
    }

    fn base_url(&self) -> Result<Url, TransportError> {
        let base_dir = if self.base_dir.is_absolute() {
            self.base_dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|source| TransportError::Io {
                    url: self.base_dir.display().to_string(),
                    source,
                })?
                .join(&self.base_dir)
        };
        Url::from_directory_path(&base_dir).map_err(|()| TransportError::InvalidReference {
            url: base_dir.display().to_string(),
            message: "base directory is not an absolute path".to_string(),
        })
    }
}

impl Transport for FileSystemTransport {
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        let path = self.resolve(url)?;
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TransportError::NotFound {
                    url: url.to_string(),
                }
            } else {
                TransportError::Io {
                    url: url.to_string(),
                    source,
                }
            }
        })
    }
}

/// Transport that serves resources from an in-memory map.
///
/// Clones share the same resources and fetch counters, so a host (or a test)
/// can keep a handle after giving one to a [`Trimlib`](crate::Trimlib).
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Rc<RefCell<MemoryResources>>,
}

#[derive(Debug, Default)]
struct MemoryResources {
    resources: HashMap<String, String>,
    fetches: HashMap<String, usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a resource.
    pub fn add(&self, url: impl Into<String>, content: impl Into<String>) -> &Self {
        self.inner
            .borrow_mut()
            .resources
            .insert(url.into(), content.into());
        self
    }

    /// Create a transport with the given resources.
    pub fn with_resources(
        resources: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let transport = Self::new();
        for (url, content) in resources {
            transport.add(url, content);
        }
        transport
    }

    /// Number of fetches attempted for `url`, successful or not.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.inner
            .borrow()
            .fetches
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches attempted for any resource.
    pub fn total_fetches(&self) -> usize {
        self.inner.borrow().fetches.values().sum()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        let mut inner = self.inner.borrow_mut();
        *inner.fetches.entry(url.to_string()).or_insert(0) += 1;
        inner
            .resources
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                url: url.to_string(),
            })
    }
}

/// Transport that never finds anything.
#[derive(Debug, Clone, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        Err(TransportError::NotFound {
            url: url.to_string(),
        })
    }
}
