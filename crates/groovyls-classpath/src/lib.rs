//! Classpath resolution for compiler sessions.
//!
//! Expands the configured classpath entries, plus an optional library
//! auto-discovery directory, into the ordered list of archive files handed
//! to a session's library loader.
//!
//! # Entry forms
//!
//! - `path/to/lib.jar` - an existing archive file, appended as given
//! - `path/to/dir/*` - every archive directly inside `dir` (non-recursive)
//!
//! Entries that resolve to neither form are skipped without error.
//!
//! # Example
//!
//! ```ignore
//! use groovyls_classpath::resolve;
//!
//! let entries = vec!["libs/*".to_string(), "vendor/extra.jar".to_string()];
//! let classpath = resolve(&entries, None);
//! for archive in classpath.iter() {
//!     println!("{}", archive.display());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

/// Extension (without the dot) of library archives.
pub const ARCHIVE_EXTENSION: &str = "jar";

/// Suffix marking an entry as "all archives inside this directory".
pub const WILDCARD_MARKER: char = '*';

/// An ordered list of resolved archive paths.
///
/// Order is significant: the loader searches archives front to back, so the
/// same archive reached through two entries appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    archives: Vec<PathBuf>,
}

impl Classpath {
    /// Create an empty classpath.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an archive path.
    pub fn push(&mut self, archive: PathBuf) {
        self.archives.push(archive);
    }

    /// Iterate over archives in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.archives.iter().map(PathBuf::as_path)
    }

    /// Number of archives (duplicates included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Whether no archive was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// The archives as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.archives
    }

    /// Whether the given archive path is on the classpath.
    #[must_use]
    pub fn contains(&self, archive: &Path) -> bool {
        self.archives.iter().any(|a| a == archive)
    }

    /// Consume the classpath, returning the underlying list.
    #[must_use]
    pub fn into_vec(self) -> Vec<PathBuf> {
        self.archives
    }
}

impl FromIterator<PathBuf> for Classpath {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            archives: iter.into_iter().collect(),
        }
    }
}

/// Check whether a path names a regular archive file.
fn is_archive(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION) && path.is_file()
}

/// Collect the archives directly inside `dir`, sorted by file name.
///
/// Unreadable directories and entries are skipped.
fn archives_in(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping unreadable classpath directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut archives: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_archive(path))
        .collect();
    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    archives
}

/// Resolve a single configured entry, appending what it contributes.
fn resolve_entry(entry: &str, result: &mut Classpath) {
    if let Some(dir) = entry.strip_suffix(WILDCARD_MARKER) {
        let dir = Path::new(dir);
        if dir.is_dir() {
            for archive in archives_in(dir) {
                result.push(archive);
            }
        } else {
            tracing::debug!("Skipping classpath entry {entry:?}: not a directory");
        }
        return;
    }

    let path = Path::new(entry);
    if is_archive(path) {
        result.push(path.to_path_buf());
    } else {
        tracing::debug!("Skipping classpath entry {entry:?}: not an archive file");
    }
}

/// Resolve configured classpath entries into an ordered archive list.
///
/// Archives from `library_dir` (if it exists) come first, followed by each
/// entry's contribution in configuration order. No deduplication is done.
pub fn resolve<S: AsRef<str>>(entries: &[S], library_dir: Option<&Path>) -> Classpath {
    let mut result = Classpath::new();

    if let Some(dir) = library_dir {
        if dir.is_dir() {
            for archive in archives_in(dir) {
                result.push(archive);
            }
        } else {
            tracing::debug!("Library directory {} does not exist", dir.display());
        }
    }

    for entry in entries {
        resolve_entry(entry.as_ref(), &mut result);
    }

    tracing::debug!("Resolved classpath with {} archives", result.len());
    result
}
