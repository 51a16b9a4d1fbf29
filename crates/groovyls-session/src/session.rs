//! Compiler session state.
//!
//! A [`CompilationSession`] owns the compiler configuration, the library
//! loader bound to it, and the live set of [`SourceRecord`]s. The session
//! persists across reconciliations and is only rebuilt from nothing when the
//! classpath configuration changes.

use crate::settings::Settings;
use crate::source::SourceRecord;
use groovyls_classpath::Classpath;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Encoding used to decode source files.
pub const DEFAULT_SOURCE_ENCODING: &str = "UTF-8";

/// Compiler configuration, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Encoding of source files.
    pub source_encoding: &'static str,
    /// Keep doc comments attached to the AST.
    pub retain_doc_comments: bool,
    /// Make doc comments available at runtime.
    pub runtime_doc_comments: bool,
    /// Resolved library archives, in lookup order.
    pub classpath: Classpath,
}

impl CompilerConfig {
    /// Create a configuration with the default options and a classpath.
    #[must_use]
    pub const fn new(classpath: Classpath) -> Self {
        Self {
            source_encoding: DEFAULT_SOURCE_ENCODING,
            retain_doc_comments: true,
            runtime_doc_comments: true,
            classpath,
        }
    }

    /// Resolve the classpath described by `settings` and build a configuration.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let classpath =
            groovyls_classpath::resolve(&settings.classpath, settings.library_dir.as_deref());
        Self::new(classpath)
    }
}

/// Library loader bound to one compiler configuration.
#[derive(Debug)]
pub struct LibraryLoader {
    config: Arc<CompilerConfig>,
}

impl LibraryLoader {
    /// Create a loader for a configuration.
    #[must_use]
    pub const fn new(config: Arc<CompilerConfig>) -> Self {
        Self { config }
    }

    /// The configuration this loader is bound to.
    pub const fn config(&self) -> &Arc<CompilerConfig> {
        &self.config
    }

    /// The archives this loader searches, in order.
    pub fn classpath(&self) -> &Classpath {
        &self.config.classpath
    }

    /// Find the first archive on the classpath with the given file name.
    pub fn find_archive(&self, file_name: &str) -> Option<&Path> {
        self.config
            .classpath
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == file_name))
    }
}

/// The live set of sources plus the configuration they compile against.
#[derive(Debug)]
pub struct CompilationSession {
    config: Arc<CompilerConfig>,
    loader: Arc<LibraryLoader>,
    /// Records keyed by URI; at most one per URI.
    sources: BTreeMap<Url, SourceRecord>,
}

impl CompilationSession {
    /// Create an empty session with a loader bound to `config`.
    #[must_use]
    pub fn new(config: Arc<CompilerConfig>) -> Self {
        let loader = Arc::new(LibraryLoader::new(Arc::clone(&config)));
        Self {
            config,
            loader,
            sources: BTreeMap::new(),
        }
    }

    /// The compiler configuration.
    pub const fn config(&self) -> &Arc<CompilerConfig> {
        &self.config
    }

    /// The loader shared by every record in this session.
    pub const fn loader(&self) -> &Arc<LibraryLoader> {
        &self.loader
    }

    /// Get the record for a URI.
    pub fn get(&self, uri: &Url) -> Option<&SourceRecord> {
        self.sources.get(uri)
    }

    /// Whether a record exists for a URI.
    pub fn contains(&self, uri: &Url) -> bool {
        self.sources.contains_key(uri)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the session has no records.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// URIs of all records, in order.
    pub fn uris(&self) -> impl Iterator<Item = &Url> {
        self.sources.keys()
    }

    /// All records, ordered by URI.
    pub fn sources(&self) -> impl Iterator<Item = &SourceRecord> {
        self.sources.values()
    }

    /// Add a record, replacing and returning any record with the same URI.
    pub fn add_source(&mut self, record: SourceRecord) -> Option<SourceRecord> {
        self.sources.insert(record.uri().clone(), record)
    }

    /// Remove the records for the given URIs. Returns how many were removed.
    pub fn remove_sources(&mut self, uris: &[Url]) -> usize {
        uris.iter()
            .filter(|uri| self.sources.remove(*uri).is_some())
            .count()
    }
}

/// Lifecycle of the session held by a session manager.
#[derive(Debug, Default)]
pub enum SessionState {
    /// No session has been built yet.
    #[default]
    Uninitialized,
    /// A session exists and is reconciled incrementally.
    Active(CompilationSession),
    /// The session was discarded; the next reconciliation is a full build.
    Invalidated,
}

impl SessionState {
    /// Whether a session is currently active.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&CompilationSession> {
        match self {
            Self::Active(session) => Some(session),
            _ => None,
        }
    }

    /// Make sure a session is active, creating one with `create` otherwise.
    ///
    /// Returns the session and whether it was just created.
    pub(crate) fn activate_with(
        &mut self,
        create: impl FnOnce() -> CompilationSession,
    ) -> (&mut CompilationSession, bool) {
        let created = !self.is_active();
        if created {
            *self = Self::Active(create());
        }
        match self {
            Self::Active(session) => (session, created),
            Self::Uninitialized | Self::Invalidated => unreachable!("session was just activated"),
        }
    }

    /// Drop the active session. No-op unless a session is active.
    pub(crate) fn invalidate(&mut self) -> bool {
        if self.is_active() {
            *self = Self::Invalidated;
            true
        } else {
            false
        }
    }
}
