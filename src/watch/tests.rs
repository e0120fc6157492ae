use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use super::debouncer::Debouncer;
use super::roots::WatchRoots;
use super::types::ChangeKind;
use crate::error::WatchError;

const WINDOW: Duration = Duration::from_millis(300);

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn rename_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Name(
        notify::event::RenameMode::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::Any,
    ))
}

// ----------------------------------------------------------------------------
// Debouncer
// ----------------------------------------------------------------------------

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new(WINDOW);
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.html"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.html"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/d.html"], rename_kind()));

    assert_eq!(debouncer.changes.len(), 4);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.html")],
        ChangeKind::Created
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/b.html")],
        ChangeKind::Modified
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/c.html")],
        ChangeKind::Removed
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/d.html")],
        ChangeKind::Renamed
    );
}

#[test]
fn test_metadata_only_change_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], metadata_kind()));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_temp_file_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/real.html"], modify_kind()));
    assert!(debouncer.last_event.is_some());
    let first_time = debouncer.last_event.unwrap();

    std::thread::sleep(Duration::from_millis(5));

    // Temp file event: should NOT update last_event or add to changes
    debouncer.add_event(&make_event(vec!["/tmp/.index.html.swp"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/index.html~"], modify_kind()));
    assert_eq!(debouncer.last_event.unwrap(), first_time);
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = Debouncer::new(WINDOW);

    // Same path: create then modify, first one (create) wins
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.html")],
        ChangeKind::Created
    );
}

#[test]
fn test_dedup_same_event() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(
        vec!["/tmp/a.html", "/tmp/a.html"],
        modify_kind(),
    ));
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new(WINDOW);

    // File removed, then restored (created) becomes Created
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.html")],
        ChangeKind::Created
    );
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new(WINDOW);

    // File created, then removed is a net no-op, discarded entirely
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));

    assert!(
        debouncer.changes.is_empty(),
        "created+removed should discard"
    );
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.html")],
        ChangeKind::Removed
    );
}

#[test]
fn test_take_respects_quiet_window() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));

    // Window still open, nothing is released
    assert!(debouncer.take_if_ready().is_none());
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_take_releases_after_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(1));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));

    std::thread::sleep(Duration::from_millis(10));

    let changes = debouncer.take_if_ready().expect("window elapsed");
    assert_eq!(changes.len(), 1);
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_sleep_duration_no_events() {
    let debouncer = Debouncer::new(WINDOW);
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_sleep_duration_after_event() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.last_event = Some(std::time::Instant::now());

    let dur = debouncer.sleep_duration();
    assert!(dur >= WINDOW - Duration::from_millis(10));
    assert!(dur <= WINDOW + Duration::from_millis(10));
}

// ----------------------------------------------------------------------------
// Watch roots
// ----------------------------------------------------------------------------

fn make_watcher() -> notify::RecommendedWatcher {
    notify::recommended_watcher(|_| {}).unwrap()
}

#[test]
fn test_add_existing_dir() {
    let temp = TempDir::new().unwrap();
    let mut watcher = make_watcher();
    let mut roots = WatchRoots::new();

    roots.add(&mut watcher, temp.path()).unwrap();
    assert_eq!(roots.desired_len(), 1);

    // Re-adding is a no-op
    roots.add(&mut watcher, temp.path()).unwrap();
    assert_eq!(roots.desired_len(), 1);
}

#[test]
fn test_add_missing_path_rejected() {
    let mut watcher = make_watcher();
    let mut roots = WatchRoots::new();

    let err = roots
        .add(&mut watcher, &PathBuf::from("/does/not/exist"))
        .unwrap_err();
    assert!(matches!(err, WatchError::NotFound(_)));
    assert_eq!(roots.desired_len(), 0);
}

#[test]
fn test_remove_unregisters_single_target() {
    let temp_a = TempDir::new().unwrap();
    let temp_b = TempDir::new().unwrap();
    let mut watcher = make_watcher();
    let mut roots = WatchRoots::new();

    roots.add(&mut watcher, temp_a.path()).unwrap();
    roots.add(&mut watcher, temp_b.path()).unwrap();

    roots.remove(&mut watcher, temp_a.path()).unwrap();
    assert_eq!(roots.desired_len(), 1);

    // Removing again is a no-op
    roots.remove(&mut watcher, temp_a.path()).unwrap();
    assert_eq!(roots.desired_len(), 1);
}

#[test]
fn test_maintain_reattaches_recreated_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("views");
    std::fs::create_dir(&root).unwrap();

    let mut watcher = make_watcher();
    let mut roots = WatchRoots::new();
    roots.add(&mut watcher, &root).unwrap();

    // Root vanishes; the stale handle is reaped, nothing re-attached yet
    std::fs::remove_dir(&root).unwrap();
    assert_eq!(roots.maintain(&mut watcher), 0);

    // Root comes back; maintain picks it up again
    std::fs::create_dir(&root).unwrap();
    assert_eq!(roots.maintain(&mut watcher), 1);
    assert_eq!(roots.desired_len(), 1);
}
