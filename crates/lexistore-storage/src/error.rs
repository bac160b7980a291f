//! Error taxonomy for the storage layer.
//!
//! These errors never cross the backend interface: backends log them as
//! warnings and report "not found" / "not saved" instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while parsing or serializing an XML document.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("xml syntax error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document has no root element")]
    MissingRoot,
    #[error("unexpected closing tag `{0}`")]
    Unbalanced(String),
    #[error("element `{0}` is never closed")]
    Unclosed(String),
}

/// Failure of a storage operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Tree {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
    #[error("malformed document {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn tree(path: impl Into<PathBuf>, source: TreeError) -> Self {
        Self::Tree {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the error only means "the document is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
