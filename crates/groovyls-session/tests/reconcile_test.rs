//! Integration tests for session reconciliation.

use groovyls_session::{ContentOrigin, ReconcileError, SessionManager, SessionState, Settings};
use groovyls_vfs::{ContentTracker, FileContentsTracker};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

fn write(dir: &Path, name: &str, content: &str) -> Url {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    file_uri(dir, name)
}

fn file_uri(dir: &Path, name: &str) -> Url {
    Url::from_file_path(dir.join(name)).unwrap()
}

fn content_of(manager: &SessionManager, uri: &Url) -> Option<String> {
    manager
        .session()
        .and_then(|s| s.get(uri))
        .map(|r| r.content().to_string())
}

#[test]
fn test_first_call_is_full_build() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "A.groovy", "class A {}");
    let b = write(dir.path(), "pkg/B.groovy", "class B {}");
    write(dir.path(), "notes.txt", "not a source");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    // Changes reported before the first build do not matter.
    tracker.mark_changed(file_uri(dir.path(), "Other.groovy"));

    let result = manager.reconcile(Some(dir.path()), &mut tracker);

    assert!(result.full_build);
    assert_eq!(result.added, 2);
    assert_eq!(result.removed, 0);
    assert!(result.errors.is_empty());
    let uris: HashSet<_> = result.session.uris().cloned().collect();
    assert_eq!(uris, HashSet::from([a.clone(), b]));

    let record = result.session.get(&a).unwrap();
    assert_eq!(record.origin(), ContentOrigin::Disk);
    assert_eq!(record.location(), dir.path().join("A.groovy"));
    assert!(manager.state().is_active());
}

#[test]
fn test_selective_invalidation() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "A.groovy", "a1");
    let b = write(dir.path(), "B.groovy", "b1");
    let c = write(dir.path(), "C.groovy", "c1");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(Some(dir.path()), &mut tracker);

    // Only A is reported; B and C change on disk behind the tracker's back.
    write(dir.path(), "A.groovy", "a2");
    write(dir.path(), "B.groovy", "b2");
    fs::remove_file(dir.path().join("C.groovy")).unwrap();
    tracker.mark_changed(a.clone());

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(!result.full_build);
    assert_eq!(result.removed, 1);
    assert_eq!(result.added, 1);

    assert_eq!(content_of(&manager, &a).as_deref(), Some("a2"));
    // Untouched records were not re-read.
    assert_eq!(content_of(&manager, &b).as_deref(), Some("b1"));
    assert_eq!(content_of(&manager, &c).as_deref(), Some("c1"));
}

#[test]
fn test_open_buffer_takes_precedence() {
    let dir = TempDir::new().unwrap();
    let uri = write(dir.path(), "Main.groovy", "X");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    tracker.open(uri.clone(), "Y", 1);

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    let record = result.session.get(&uri).unwrap();

    assert_eq!(record.content(), "Y");
    assert_eq!(record.origin(), ContentOrigin::InMemory);
    assert_eq!(result.session.len(), 1);
}

#[test]
fn test_open_then_close_round_trip() {
    let dir = TempDir::new().unwrap();
    let uri = write(dir.path(), "Main.groovy", "disk");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(Some(dir.path()), &mut tracker);
    assert_eq!(content_of(&manager, &uri).as_deref(), Some("disk"));

    tracker.open(uri.clone(), "buffer", 1);
    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert_eq!(result.removed, 1);
    assert_eq!(result.added, 1);
    assert_eq!(content_of(&manager, &uri).as_deref(), Some("buffer"));

    tracker.close(&uri);
    manager.reconcile(Some(dir.path()), &mut tracker);
    let session = manager.session().unwrap();
    let record = session.get(&uri).unwrap();
    assert_eq!(record.content(), "disk");
    assert_eq!(record.origin(), ContentOrigin::Disk);
    assert_eq!(session.len(), 1);
}

#[test]
fn test_unchanged_call_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "A.groovy", "a");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(Some(dir.path()), &mut tracker);

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(!result.full_build);
    assert_eq!(result.added, 0);
    assert_eq!(result.removed, 0);
    assert_eq!(result.session.len(), 1);
}

#[test]
fn test_deleted_and_created_files() {
    let dir = TempDir::new().unwrap();
    let old = write(dir.path(), "Old.groovy", "old");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(Some(dir.path()), &mut tracker);

    fs::remove_file(dir.path().join("Old.groovy")).unwrap();
    let new = write(dir.path(), "New.groovy", "new");
    tracker.mark_changed(old.clone());
    tracker.mark_changed(new.clone());

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(!result.session.contains(&old));
    assert_eq!(result.session.get(&new).map(|r| r.content()), Some("new"));
}

#[test]
fn test_non_utf8_file_is_kept() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("A.groovy"), b"// caf\xe9\nclass A {}\n").unwrap();
    let a = file_uri(dir.path(), "A.groovy");
    let b = write(dir.path(), "B.groovy", "class B {}");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    let result = manager.reconcile(Some(dir.path()), &mut tracker);

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.added, 2);
    assert!(result.session.contains(&b));
    let record = result.session.get(&a).unwrap();
    assert_eq!(record.content(), "// caf\u{fffd}\nclass A {}\n");
    assert_eq!(record.origin(), ContentOrigin::Disk);
}

#[test]
fn test_classpath_change_forces_full_build() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("lib");
    fs::create_dir(&lib).unwrap();
    fs::write(lib.join("dep.jar"), b"").unwrap();
    let a = write(dir.path(), "src/A.groovy", "a1");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(manager.session().unwrap().config().classpath.is_empty());

    // Changed on disk but never reported: only a full build picks it up.
    write(dir.path(), "src/A.groovy", "a2");
    manager.set_classpath(vec![format!("{}/*", lib.display())]);
    assert!(matches!(manager.state(), SessionState::Invalidated));

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(result.full_build);
    assert_eq!(result.session.config().classpath.len(), 1);
    assert!(result.session.loader().find_archive("dep.jar").is_some());
    assert_eq!(result.session.get(&a).map(|r| r.content()), Some("a2"));
}

#[test]
fn test_client_settings_invalidate() {
    let mut manager = SessionManager::new(Settings::new());
    let mut tracker = FileContentsTracker::new();
    manager.reconcile(None, &mut tracker);

    let payload = serde_json::json!({ "groovy": { "classpath": ["/nowhere/*"] } });
    assert!(manager.apply_client_settings(&payload).unwrap());
    assert!(manager.session().is_none());

    assert!(manager.reconcile(None, &mut tracker).full_build);
    assert!(!manager.apply_client_settings(&payload).unwrap());
    assert!(manager.state().is_active());
}

#[test]
fn test_virtual_document_included() {
    let root = PathBuf::from("/proj");
    let uri = Url::parse("inmemory:///proj/Script").unwrap();

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    tracker.open(uri.clone(), "println 1", 1);

    let result = manager.reconcile(Some(root.as_path()), &mut tracker);
    let record = result.session.get(&uri).expect("virtual document tracked");

    assert_eq!(record.location(), Path::new("/proj/Script.groovy"));
    assert_eq!(record.content(), "println 1");
    assert_eq!(record.origin(), ContentOrigin::InMemory);
    assert!(result.errors.is_empty());
}

#[test]
fn test_open_documents_outside_root_are_filtered() {
    let dir = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    let inside = file_uri(dir.path(), "In.groovy");
    let outside = file_uri(other.path(), "Out.groovy");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    tracker.open(inside.clone(), "in", 1);
    tracker.open(outside.clone(), "out", 1);

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(result.session.contains(&inside));
    assert!(!result.session.contains(&outside));
}

#[test]
fn test_without_root_only_open_documents() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "OnDisk.groovy", "disk");
    let open = file_uri(dir.path(), "Elsewhere.groovy");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    tracker.open(open.clone(), "buffer", 1);

    let result = manager.reconcile(None, &mut tracker);
    assert_eq!(result.session.len(), 1);
    assert!(result.session.contains(&open));

    // Later edits are picked up incrementally.
    tracker.open(open.clone(), "edited", 2);
    manager.reconcile(None, &mut tracker);
    assert_eq!(content_of(&manager, &open).as_deref(), Some("edited"));
}

#[test]
fn test_unlocatable_document_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "A.groovy", "a");
    let odd = Url::parse("untitled:Untitled-1").unwrap();

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    tracker.open(odd.clone(), "x", 1);

    let result = manager.reconcile(Some(dir.path()), &mut tracker);
    assert!(result.session.contains(&a));
    assert!(!result.session.contains(&odd));
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        &result.errors[0],
        ReconcileError::Location { uri, .. } if *uri == odd
    ));
}

#[test]
fn test_missing_root_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone");

    let mut manager = SessionManager::default();
    let mut tracker = FileContentsTracker::new();
    let result = manager.reconcile(Some(missing.as_path()), &mut tracker);

    assert!(result.session.is_empty());
    assert!(result.errors.is_empty());
}

/// A tracker that never clears its changed set.
struct StickyTracker {
    inner: FileContentsTracker,
    changed: HashSet<Url>,
}

impl ContentTracker for StickyTracker {
    fn take_changed_uris(&mut self) -> HashSet<Url> {
        self.changed.clone()
    }

    fn open_uris(&self) -> Vec<Url> {
        self.inner.open_uris()
    }

    fn contents(&self, uri: &Url) -> Option<String> {
        self.inner.contents(uri)
    }

    fn is_open(&self, uri: &Url) -> bool {
        self.inner.is_open(uri)
    }
}

#[test]
fn test_non_clearing_tracker_rebuilds_every_time() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "A.groovy", "a1");
    let b = write(dir.path(), "B.groovy", "b1");

    let mut manager = SessionManager::default();
    let mut tracker = StickyTracker {
        inner: FileContentsTracker::new(),
        changed: HashSet::from([a.clone()]),
    };
    manager.reconcile(Some(dir.path()), &mut tracker);

    for round in 0..3 {
        write(dir.path(), "A.groovy", &format!("a{round}"));
        let result = manager.reconcile(Some(dir.path()), &mut tracker);
        assert_eq!(result.removed, 1);
        assert_eq!(result.added, 1);
        assert_eq!(result.session.len(), 2);
    }
    assert_eq!(content_of(&manager, &a).as_deref(), Some("a2"));
    assert_eq!(content_of(&manager, &b).as_deref(), Some("b1"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    const NAMES: [&str; 3] = ["A.groovy", "B.groovy", "sub/C.groovy"];

    #[derive(Debug, Clone)]
    enum Op {
        Write(usize, u8),
        Delete(usize),
        Open(usize, u8),
        Close(usize),
        Reconcile,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..NAMES.len(), any::<u8>()).prop_map(|(i, v)| Op::Write(i, v)),
            (0..NAMES.len()).prop_map(Op::Delete),
            (0..NAMES.len(), any::<u8>()).prop_map(|(i, v)| Op::Open(i, v)),
            (0..NAMES.len()).prop_map(Op::Close),
            Just(Op::Reconcile),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// After every reconciliation the session holds exactly one record
        /// per live document, with the buffer winning over the disk.
        #[test]
        fn session_matches_workspace(ops in proptest::collection::vec(op(), 1..24)) {
            let dir = TempDir::new().unwrap();
            let mut manager = SessionManager::default();
            let mut tracker = FileContentsTracker::new();
            let mut disk: BTreeMap<usize, String> = BTreeMap::new();
            let mut open: BTreeMap<usize, String> = BTreeMap::new();

            for op in ops.into_iter().chain(std::iter::once(Op::Reconcile)) {
                match op {
                    Op::Write(i, v) => {
                        let text = format!("disk {v}");
                        let uri = write(dir.path(), NAMES[i], &text);
                        tracker.mark_changed(uri);
                        disk.insert(i, text);
                    }
                    Op::Delete(i) => {
                        if disk.remove(&i).is_some() {
                            fs::remove_file(dir.path().join(NAMES[i])).unwrap();
                        }
                        tracker.mark_changed(file_uri(dir.path(), NAMES[i]));
                    }
                    Op::Open(i, v) => {
                        let text = format!("buffer {v}");
                        tracker.open(file_uri(dir.path(), NAMES[i]), &text, 1);
                        open.insert(i, text);
                    }
                    Op::Close(i) => {
                        tracker.close(&file_uri(dir.path(), NAMES[i]));
                        open.remove(&i);
                    }
                    Op::Reconcile => {
                        let result = manager.reconcile(Some(dir.path()), &mut tracker);
                        prop_assert!(result.errors.is_empty());

                        let mut expected: BTreeMap<Url, (String, ContentOrigin)> = BTreeMap::new();
                        for (i, text) in &disk {
                            expected.insert(
                                file_uri(dir.path(), NAMES[*i]),
                                (text.clone(), ContentOrigin::Disk),
                            );
                        }
                        for (i, text) in &open {
                            expected.insert(
                                file_uri(dir.path(), NAMES[*i]),
                                (text.clone(), ContentOrigin::InMemory),
                            );
                        }

                        let actual: BTreeMap<Url, (String, ContentOrigin)> = result
                            .session
                            .sources()
                            .map(|r| (r.uri().clone(), (r.content().to_string(), r.origin())))
                            .collect();
                        prop_assert_eq!(actual, expected);
                    }
                }
            }
        }
    }
}
