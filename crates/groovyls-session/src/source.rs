//! Source records tracked by a compiler session.

use crate::error::ReconcileError;
use crate::session::LibraryLoader;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Where a record's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentOrigin {
    /// Read from the file on disk.
    Disk,
    /// Taken from an open editor buffer.
    InMemory,
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk => f.write_str("disk"),
            Self::InMemory => f.write_str("in-memory"),
        }
    }
}

/// One document as handed to the compiler front end.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    uri: Url,
    location: PathBuf,
    origin: ContentOrigin,
    content: String,
    loader: Arc<LibraryLoader>,
}

impl SourceRecord {
    fn new(
        uri: Url,
        location: PathBuf,
        origin: ContentOrigin,
        content: String,
        loader: Arc<LibraryLoader>,
    ) -> Self {
        Self {
            uri,
            location,
            origin,
            content,
            loader,
        }
    }

    /// Build a record from a file on disk.
    pub fn from_disk(
        uri: Url,
        path: &Path,
        loader: Arc<LibraryLoader>,
    ) -> Result<Self, ReconcileError> {
        let bytes = fs::read(path).map_err(|source| ReconcileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Sources are UTF-8; invalid sequences become U+FFFD.
        let content = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::new(
            uri,
            path.to_path_buf(),
            ContentOrigin::Disk,
            content,
            loader,
        ))
    }

    /// Build a record from an editor buffer.
    pub fn in_memory(
        uri: Url,
        location: PathBuf,
        content: String,
        loader: Arc<LibraryLoader>,
    ) -> Self {
        Self::new(uri, location, ContentOrigin::InMemory, content, loader)
    }

    /// The document URI (the record's key).
    pub const fn uri(&self) -> &Url {
        &self.uri
    }

    /// Path-like location used when reporting diagnostics.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Where the content came from.
    pub const fn origin(&self) -> ContentOrigin {
        self.origin
    }

    /// The source text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The loader this record resolves library types against.
    pub fn loader(&self) -> &Arc<LibraryLoader> {
        &self.loader
    }

    /// Number of lines, counting a trailing empty line after the last newline.
    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.content.matches('\n').count() + 1
    }
}
