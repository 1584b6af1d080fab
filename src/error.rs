//! Error taxonomy of the mining pipeline.
//!
//! Every error here is isolated at the smallest unit that produced it (one
//! commit, one event, one repository): callers log it and move on. Only
//! configuration and CLI failures abort a run, and those travel as
//! [`anyhow::Error`].

use std::path::PathBuf;

use thiserror::Error;

/// A manifest snapshot could not be read in its declared format.
#[derive(Debug, Error)]
pub enum ManifestParseError {
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("invalid requirement pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The external classifier could not produce an answer.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("classifier response has no answer content")]
    MissingAnswer,
}

/// Writing or reading the on-disk migration corpus failed.
#[derive(Debug, Error)]
#[error("{action} {}: {source}", path.display())]
pub struct PersistenceError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl PersistenceError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A repository could not be cloned or opened.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to clone {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("failed to open repository {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("failed to create work directory: {0}")]
    WorkDir(#[source] std::io::Error),
}

/// A version-control query against an opened repository failed.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error("invalid commit hash '{0}'")]
    InvalidHash(String),
}
