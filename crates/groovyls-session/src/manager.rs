//! Session reconciliation.
//!
//! On each request the [`SessionManager`] brings its compiler session in
//! line with the workspace and the editor's open documents:
//!
//! 1. Build a session (configuration, loader, empty source set) if none is
//!    active. A new session means a *full build*: every eligible source is
//!    added regardless of what the tracker reports as changed.
//! 2. Otherwise drop every record whose URI the tracker reports as changed.
//! 3. Walk the workspace root and add disk-backed records for source files
//!    that are not open and are either part of a full build or changed.
//! 4. Add in-memory records for open documents (under the root, when one is
//!    given) that are part of a full build or changed. These replace any
//!    disk-backed record for the same URI.
//!
//! All removals finish before any addition, so a URI that is both changed
//! and open ends up with exactly one freshly built record.

use crate::error::{ReconcileError, SettingsError};
use crate::session::{CompilationSession, CompilerConfig, SessionState};
use crate::settings::Settings;
use crate::source::SourceRecord;
use crate::uri::{is_under, source_location};
use crate::SOURCE_EXTENSION;
use groovyls_vfs::ContentTracker;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;
use walkdir::WalkDir;

/// Outcome of one reconciliation.
#[derive(Debug)]
pub struct Reconciliation<'a> {
    /// The reconciled session, ready for the compiler front end.
    pub session: &'a CompilationSession,
    /// Whether the session was built from nothing.
    pub full_build: bool,
    /// Records dropped because their URI changed.
    pub removed: usize,
    /// Records added or replaced.
    pub added: usize,
    /// Per-document failures; the affected documents are not in the session.
    pub errors: Vec<ReconcileError>,
}

/// Owner of the compiler session and its lifecycle.
///
/// Not synchronized: callers serialize access, typically from the request
/// dispatch loop.
#[derive(Debug, Default)]
pub struct SessionManager {
    settings: Settings,
    state: SessionState,
}

impl SessionManager {
    /// Create a manager with the given settings. No session is built until
    /// the first [`reconcile`](Self::reconcile).
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: SessionState::Uninitialized,
        }
    }

    /// Create a manager configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Settings::from_env())
    }

    /// Current settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&CompilationSession> {
        self.state.session()
    }

    /// Replace the settings. The session is invalidated if they differ.
    pub fn set_settings(&mut self, settings: Settings) {
        if settings != self.settings {
            self.settings = settings;
            self.invalidate();
        }
    }

    /// Replace the additional classpath entries.
    pub fn set_classpath(&mut self, entries: Vec<String>) {
        let settings = Settings {
            classpath: entries,
            ..self.settings.clone()
        };
        self.set_settings(settings);
    }

    /// Replace the library auto-discovery directory.
    pub fn set_library_dir(&mut self, dir: Option<PathBuf>) {
        let settings = self.settings.clone().with_library_dir(dir);
        self.set_settings(settings);
    }

    /// Apply a client configuration payload. Returns whether it changed the
    /// classpath (and therefore invalidated the session).
    pub fn apply_client_settings(
        &mut self,
        payload: &serde_json::Value,
    ) -> Result<bool, SettingsError> {
        let mut settings = self.settings.clone();
        let changed = settings.apply_client_settings(payload)?;
        if changed {
            self.settings = settings;
            self.invalidate();
        }
        Ok(changed)
    }

    /// Discard the session, its configuration and its loader. The next
    /// reconciliation performs a full build.
    pub fn invalidate(&mut self) {
        if self.state.invalidate() {
            tracing::info!("Compiler session invalidated");
        }
    }

    /// Reconcile the session against the workspace and the tracker.
    ///
    /// With no `workspace_root`, every open document becomes a record
    /// wherever it lives. The tracker's changed set is consumed on every
    /// call, including full builds.
    pub fn reconcile<T>(
        &mut self,
        workspace_root: Option<&Path>,
        tracker: &mut T,
    ) -> Reconciliation<'_>
    where
        T: ContentTracker + ?Sized,
    {
        let changed = tracker.take_changed_uris();
        let tracker = &*tracker;

        let settings = &self.settings;
        let (session, full_build) = self.state.activate_with(|| {
            tracing::info!("Building compiler session");
            CompilationSession::new(Arc::new(CompilerConfig::from_settings(settings)))
        });

        // A full build ignores the changed set: everything is added.
        let changed = (!full_build).then_some(changed);
        let removed = changed
            .as_ref()
            .map_or(0, |changed| remove_changed(session, changed));

        let mut errors = Vec::new();
        let root = workspace_root.map(absolute_root);
        let mut added = 0;
        if let Some(root) = &root {
            added += add_workspace_files(session, root, tracker, changed.as_ref(), &mut errors);
        }
        added += add_open_documents(
            session,
            root.as_deref(),
            tracker,
            changed.as_ref(),
            &mut errors,
        );

        tracing::debug!(
            "Reconciled session (full build: {full_build}): removed {removed}, added {added}, {} errors",
            errors.len()
        );

        Reconciliation {
            session,
            full_build,
            removed,
            added,
            errors,
        }
    }
}

/// Whether a URI should be (re)built: always on a full build, otherwise only
/// when it changed.
fn is_wanted(changed: Option<&HashSet<Url>>, uri: &Url) -> bool {
    changed.map_or(true, |changed| changed.contains(uri))
}

fn report(errors: &mut Vec<ReconcileError>, err: ReconcileError) {
    tracing::warn!("{err}");
    errors.push(err);
}

fn absolute_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(e) => {
            tracing::warn!("Cannot resolve workspace root {}: {e}", root.display());
            root.to_path_buf()
        }
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}

/// Drop records whose URI changed. The removal set is collected before the
/// session is touched.
fn remove_changed(session: &mut CompilationSession, changed: &HashSet<Url>) -> usize {
    let stale: Vec<Url> = session
        .uris()
        .filter(|uri| changed.contains(*uri))
        .cloned()
        .collect();
    session.remove_sources(&stale)
}

fn add_workspace_files<T>(
    session: &mut CompilationSession,
    root: &Path,
    tracker: &T,
    changed: Option<&HashSet<Url>>,
    errors: &mut Vec<ReconcileError>,
) -> usize
where
    T: ContentTracker + ?Sized,
{
    if !root.exists() {
        tracing::debug!("Workspace root {} does not exist", root.display());
        return 0;
    }

    let mut added = 0;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                report(
                    errors,
                    ReconcileError::Walk {
                        root: root.to_path_buf(),
                        source,
                    },
                );
                continue;
            }
        };

        let path = entry.path();
        if !has_source_extension(path) {
            continue;
        }
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }
        let Ok(uri) = Url::from_file_path(path) else {
            tracing::debug!("Skipping {}: no file URI", path.display());
            continue;
        };
        // Open documents are added from their buffers instead.
        if tracker.is_open(&uri) || !is_wanted(changed, &uri) {
            continue;
        }

        match SourceRecord::from_disk(uri, path, Arc::clone(session.loader())) {
            Ok(record) => {
                tracing::debug!("Adding source file {}", path.display());
                session.add_source(record);
                added += 1;
            }
            Err(err) => report(errors, err),
        }
    }
    added
}

fn add_open_documents<T>(
    session: &mut CompilationSession,
    root: Option<&Path>,
    tracker: &T,
    changed: Option<&HashSet<Url>>,
    errors: &mut Vec<ReconcileError>,
) -> usize
where
    T: ContentTracker + ?Sized,
{
    let mut added = 0;
    for uri in tracker.open_uris() {
        if !is_wanted(changed, &uri) {
            continue;
        }

        let location = match source_location(&uri) {
            Ok(location) => location,
            Err(err) => {
                report(errors, err);
                continue;
            }
        };
        if root.is_some_and(|root| !is_under(&location, root)) {
            continue;
        }

        let Some(contents) = tracker.contents(&uri) else {
            tracing::warn!("Open document {uri} has no contents");
            continue;
        };

        tracing::debug!("Adding open document {uri}");
        let loader = Arc::clone(session.loader());
        session.add_source(SourceRecord::in_memory(uri, location, contents, loader));
        added += 1;
    }
    added
}
