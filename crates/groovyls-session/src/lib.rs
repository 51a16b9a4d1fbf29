//! Incremental compilation-session reconciliation.
//!
//! This crate keeps a compiler session in step with a workspace without
//! re-reading every document on every request. It decides which tracked
//! sources can be reused, which must be rebuilt because their content
//! changed, and which are new, whether a document lives on disk, in an
//! unsaved editor buffer, or only in memory.
//!
//! # Architecture
//!
//! - **Settings**: classpath entries and the library directory
//! - **Session**: configuration, library loader and source records, with an
//!   explicit `Uninitialized -> Active -> Invalidated` lifecycle
//! - **Manager**: diffs the session against the workspace tree and a
//!   [`ContentTracker`](groovyls_vfs::ContentTracker) on each request
//!
//! # Example
//!
//! ```ignore
//! use groovyls_session::{SessionManager, Settings};
//! use groovyls_vfs::FileContentsTracker;
//! use std::path::Path;
//!
//! let mut manager = SessionManager::new(Settings::from_env());
//! let mut tracker = FileContentsTracker::new();
//! let result = manager.reconcile(Some(Path::new("/proj")), &mut tracker);
//! for source in result.session.sources() {
//!     println!("{} ({})", source.location().display(), source.origin());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod manager;
mod session;
mod settings;
mod source;
pub mod uri;

pub use error::{NormalizeError, ReconcileError, SettingsError};
pub use manager::{Reconciliation, SessionManager};
pub use session::{
    CompilationSession, CompilerConfig, LibraryLoader, SessionState, DEFAULT_SOURCE_ENCODING,
};
pub use settings::{Settings, LIBRARY_DIR_ENV};
pub use source::{ContentOrigin, SourceRecord};

/// Extension (without the dot) of source files taking part in a session.
pub const SOURCE_EXTENSION: &str = "groovy";
