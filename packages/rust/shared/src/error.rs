//! Error types for recipepull.
//!
//! Library crates use [`RecipePullError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` and makes the single exit decision.

use std::path::PathBuf;

/// Top-level error type for all recipepull operations.
#[derive(Debug, thiserror::Error)]
pub enum RecipePullError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The checkpoint file exists but cannot be read or decoded.
    #[error("checkpoint at {path:?} is unusable: {reason}")]
    CheckpointLoad { path: PathBuf, reason: String },

    /// The checkpoint could not be durably written or removed.
    #[error("failed to persist checkpoint at {path:?}: {source}")]
    CheckpointSave {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Network failure talking to the upstream API or the destination store.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream API answered with a status other than 200.
    #[error("bad status code: url={url}, code={status}, body={body}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },

    /// The upstream API answered 200 with a body we cannot decode.
    #[error("decode error at {url}: {message}")]
    Decode { url: String, message: String },

    /// The destination store rejected a document.
    #[error("publish failed: url={url}, code={status}, body={body}")]
    Publish {
        url: String,
        status: u16,
        body: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unusable category url, malformed image url, ...).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RecipePullError>;

impl RecipePullError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A checkpoint that exists but cannot be trusted.
    pub fn checkpoint_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CheckpointLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// A checkpoint write, rename, or delete that failed.
    pub fn checkpoint_save(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CheckpointSave {
            path: path.into(),
            source,
        }
    }
}
