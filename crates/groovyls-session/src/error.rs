//! Error types for session reconciliation.

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Failure to rewrite a virtual document URI into a file-like one.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The rewritten identifier is not a valid URL.
    #[error("cannot normalize {uri}: rewritten form {candidate:?} is invalid: {source}")]
    Parse {
        /// The virtual URI.
        uri: Url,
        /// The identifier produced by the rewrite.
        candidate: String,
        /// The parse failure.
        #[source]
        source: url::ParseError,
    },
}

/// Per-document failures collected during a reconciliation.
///
/// None of these abort the reconciliation; the affected document is left out
/// of the session.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Walking the workspace hit an unreadable entry.
    #[error("failed to walk directory for source files under {root}: {source}")]
    Walk {
        /// The workspace root being walked.
        root: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// Reading a source file failed.
    #[error("failed to read source file {path}: {source}")]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No file-system location can be derived for a document.
    #[error("cannot derive a source location for {uri}")]
    Location {
        /// The document URI.
        uri: Url,
        /// The normalization failure that led here, if any.
        #[source]
        cause: Option<NormalizeError>,
    },
}

/// Errors reading client settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings payload does not have the expected shape.
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}
