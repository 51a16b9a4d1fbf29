//! Open-document tracking for the Groovy language server.
//!
//! The tracker holds the live text of every document the editor has open and
//! remembers which URIs changed since the session reconciler last asked.
//!
//! - [`ContentTracker`] is the contract the reconciler consumes
//! - [`FileContentsTracker`] is the in-memory implementation fed by LSP
//!   document notifications
//!
//! # Changed-set consumption
//!
//! [`ContentTracker::take_changed_uris`] clears the set it returns. The
//! reconciler treats every returned set as one-shot, so a URI is rebuilt
//! once per change no matter how many times the session is reconciled.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod document;

pub use document::Document;

use lsp_types::{
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, TextDocumentContentChangeEvent,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use url::Url;

/// Errors raised when translating LSP notifications.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The client sent a URI that is not a valid absolute URL.
    #[error("invalid document uri {uri}: {source}")]
    InvalidUri {
        /// The URI as received.
        uri: String,
        /// The parse failure.
        #[source]
        source: url::ParseError,
    },
}

/// Source of open-document state and change notifications.
pub trait ContentTracker {
    /// URIs modified since the previous call. The set is cleared on read.
    fn take_changed_uris(&mut self) -> HashSet<Url>;

    /// All currently open document URIs.
    fn open_uris(&self) -> Vec<Url>;

    /// Current buffer text of an open document.
    fn contents(&self, uri: &Url) -> Option<String>;

    /// Whether the document is currently open.
    fn is_open(&self, uri: &Url) -> bool;
}

fn parse_uri(uri: &lsp_types::Uri) -> Result<Url, TrackerError> {
    Url::parse(uri.as_str()).map_err(|source| TrackerError::InvalidUri {
        uri: uri.as_str().to_string(),
        source,
    })
}

/// In-memory tracker of open documents.
#[derive(Debug, Default)]
pub struct FileContentsTracker {
    /// Open documents indexed by URI.
    documents: HashMap<Url, Document>,
    /// URIs changed since the last `take_changed_uris`.
    changed: HashSet<Url>,
}

impl FileContentsTracker {
    /// Create a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, replacing any previous buffer for the same URI.
    pub fn open(&mut self, uri: Url, text: &str, version: i32) {
        tracing::debug!("Document opened: {uri}");
        self.changed.insert(uri.clone());
        self.documents.insert(uri, Document::new(text, version));
    }

    /// Apply edits to an open document.
    pub fn change(&mut self, uri: &Url, version: i32, changes: &[TextDocumentContentChangeEvent]) {
        match self.documents.get_mut(uri) {
            Some(doc) => doc.apply_changes(changes, version),
            None => tracing::debug!("Change for document that is not open: {uri}"),
        }
        self.changed.insert(uri.clone());
    }

    /// Close a document. Its on-disk version becomes authoritative again.
    pub fn close(&mut self, uri: &Url) {
        tracing::debug!("Document closed: {uri}");
        self.documents.remove(uri);
        self.changed.insert(uri.clone());
    }

    /// Record an external change (e.g. a file watcher event).
    pub fn mark_changed(&mut self, uri: Url) {
        self.changed.insert(uri);
    }

    /// Get an open document.
    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// URIs changed since the last read, without clearing them.
    pub fn pending_changes(&self) -> impl Iterator<Item = &Url> {
        self.changed.iter()
    }

    /// Handle `textDocument/didOpen`.
    pub fn did_open(&mut self, params: DidOpenTextDocumentParams) -> Result<(), TrackerError> {
        let item = params.text_document;
        let uri = parse_uri(&item.uri)?;
        self.open(uri, &item.text, item.version);
        Ok(())
    }

    /// Handle `textDocument/didChange`.
    pub fn did_change(&mut self, params: DidChangeTextDocumentParams) -> Result<(), TrackerError> {
        let uri = parse_uri(&params.text_document.uri)?;
        self.change(&uri, params.text_document.version, &params.content_changes);
        Ok(())
    }

    /// Handle `textDocument/didClose`.
    pub fn did_close(&mut self, params: DidCloseTextDocumentParams) -> Result<(), TrackerError> {
        let uri = parse_uri(&params.text_document.uri)?;
        self.close(&uri);
        Ok(())
    }

    /// Handle `workspace/didChangeWatchedFiles`.
    ///
    /// Every valid URI is marked changed; the first invalid one is returned
    /// as an error after the rest have been recorded.
    pub fn did_change_watched_files(
        &mut self,
        params: DidChangeWatchedFilesParams,
    ) -> Result<(), TrackerError> {
        tracing::debug!("Watched files changed: {} files", params.changes.len());
        let mut first_error = None;
        for change in params.changes {
            match parse_uri(&change.uri) {
                Ok(uri) => self.mark_changed(uri),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ContentTracker for FileContentsTracker {
    fn take_changed_uris(&mut self) -> HashSet<Url> {
        std::mem::take(&mut self.changed)
    }

    fn open_uris(&self) -> Vec<Url> {
        self.documents.keys().cloned().collect()
    }

    fn contents(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(Document::text)
    }

    fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }
}
