//! Mapping document URIs to source locations.
//!
//! Virtual documents (untitled editor buffers) have no file behind them, but
//! the front end still needs a path-like location to attach diagnostics to.
//! Their URI is rewritten to a `file:` URI carrying the source extension.
//! Nothing here touches the file system.

use crate::error::{NormalizeError, ReconcileError};
use crate::SOURCE_EXTENSION;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Scheme used by editors for documents with no on-disk counterpart.
pub const VIRTUAL_SCHEME: &str = "inmemory";

/// Scheme of file-backed documents.
pub const FILE_SCHEME: &str = "file";

/// Whether the URI identifies a virtual document.
pub fn is_virtual(uri: &Url) -> bool {
    uri.scheme() == VIRTUAL_SCHEME
}

/// Normalize a document URI.
///
/// Virtual URIs become `file:` URIs with the source extension appended to
/// their path, e.g. `inmemory:///proj/Untitled-1` becomes
/// `file:///proj/Untitled-1.groovy`. Any other URI is returned unchanged.
/// Query and fragment of a virtual URI are dropped.
pub fn normalize(uri: &Url) -> Result<Url, NormalizeError> {
    if !is_virtual(uri) {
        return Ok(uri.clone());
    }

    let candidate = format!(
        "{FILE_SCHEME}://{}{}.{SOURCE_EXTENSION}",
        uri.host_str().unwrap_or(""),
        uri.path()
    );
    Url::parse(&candidate).map_err(|source| NormalizeError::Parse {
        uri: uri.clone(),
        candidate,
        source,
    })
}

/// Derive the source location of a document.
///
/// A failed normalization is logged and the original URI is used instead, in
/// which case the location usually cannot be derived and a
/// [`ReconcileError::Location`] carrying the cause is returned.
pub fn source_location(uri: &Url) -> Result<PathBuf, ReconcileError> {
    let (normalized, cause) = match normalize(uri) {
        Ok(normalized) => (normalized, None),
        Err(e) => {
            tracing::warn!("{e}");
            (uri.clone(), Some(e))
        }
    };

    match normalized.to_file_path() {
        Ok(path) => Ok(path),
        Err(()) => Err(ReconcileError::Location {
            uri: uri.clone(),
            cause,
        }),
    }
}

/// Lexically normalize a path: drop `.` components and resolve `..` against
/// the preceding component. Symlinks are not consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether `path` lies under `root`, comparing lexically normalized forms.
pub fn is_under(path: &Path, root: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}
