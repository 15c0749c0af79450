//! Integration tests for the task store on the file-backed key-value store.
//!
//! Covers persistence across store instances, the on-disk JSON shape,
//! fail-soft loading of damaged files, and timestamp ordering.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskbell::clock::ManualClock;
use taskbell::store::{FileKv, KeyValueStore, NewTask, TASKS_KEY, TaskPatch, TaskStore};
use taskbell_proto::{Priority, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
}

/// Opens a store on `dir` with its own manual clock.
fn open(dir: &std::path::Path) -> (TaskStore<FileKv>, ManualClock) {
    let clock = ManualClock::new(start());
    let store = TaskStore::load(FileKv::new(dir), Arc::new(clock.clone()));
    (store, clock)
}

// ===========================================================================
// Persistence
// ===========================================================================

#[test]
fn tasks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (mut store, _) = open(dir.path());
        store
            .add(
                NewTask::new("Pay rent")
                    .priority(Priority::High)
                    .due(Some(start() + Duration::days(2))),
            )
            .unwrap();
        store.add(NewTask::new("Buy milk").description("2 litres")).unwrap();
    }

    let (store, _) = open(dir.path());
    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Pay rent", "Buy milk"]);
    assert_eq!(store.tasks()[0].priority, Priority::High);
    assert_eq!(store.tasks()[0].due_date, Some(start() + Duration::days(2)));
    assert_eq!(store.tasks()[1].description, "2 litres");
}

#[test]
fn file_holds_camel_case_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, _) = open(dir.path());
    store
        .add(NewTask::new("Shape check").due(Some(start() + Duration::hours(1))))
        .unwrap();

    let text = std::fs::read_to_string(dir.path().join(TASKS_KEY)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let task = &value.as_array().unwrap()[0];
    assert_eq!(task["title"], "Shape check");
    assert_eq!(task["status"], "pending");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["dueDate"], "2025-03-14T10:00:00Z");
    assert!(task.get("createdAt").is_some());
    assert!(task.get("updatedAt").is_some());
}

#[test]
fn damaged_file_loads_empty_and_is_replaced_on_next_write() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(TASKS_KEY), "[{\"id\": 1,").unwrap();

    let (mut store, _) = open(dir.path());
    assert!(store.is_empty());

    store.add(NewTask::new("Fresh start")).unwrap();
    let (reopened, _) = open(dir.path());
    assert_eq!(reopened.len(), 1);
}

#[test]
fn reads_collection_written_by_hand() {
    let dir = tempfile::tempdir().unwrap();
    let kv = FileKv::new(dir.path());
    kv.set(
        TASKS_KEY,
        r#"[{"id":"1718000000000","title":"Legacy","description":"","status":"completed",
            "priority":"low","createdAt":"2024-06-10T06:13:20.000Z",
            "updatedAt":"2024-06-10T06:13:20.000Z"}]"#,
    )
    .unwrap();

    let (store, _) = open(dir.path());
    let task = &store.tasks()[0];
    assert_eq!(task.id.as_str(), "1718000000000");
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.due_date.is_none());
    assert_eq!(store.resolve_id("1718").unwrap(), task.id);
}

// ===========================================================================
// Mutations
// ===========================================================================

#[test]
fn every_mutation_advances_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, clock) = open(dir.path());
    let task = store.add(NewTask::new("Track me")).unwrap();
    let mut last = task.updated_at;

    store.toggle_status(&task.id).unwrap();
    let stamp = store.get(&task.id).unwrap().updated_at;
    assert!(stamp > last);
    last = stamp;

    clock.advance(Duration::seconds(5));
    store
        .update(
            &task.id,
            TaskPatch {
                description: Some("notes".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    let stamp = store.get(&task.id).unwrap().updated_at;
    assert_eq!(stamp, start() + Duration::seconds(5));
    assert!(stamp > last);
    last = stamp;

    // Clock goes backwards: stamps still move forward.
    clock.set(start() - Duration::hours(1));
    store.toggle_status(&task.id).unwrap();
    assert!(store.get(&task.id).unwrap().updated_at > last);
    assert_eq!(store.get(&task.id).unwrap().status, TaskStatus::Pending);
}

#[test]
fn delete_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, _) = open(dir.path());
    let keep = store.add(NewTask::new("Keep")).unwrap();
    let drop_me = store.add(NewTask::new("Drop")).unwrap();
    assert!(store.delete(&drop_me.id));
    assert!(!store.delete(&drop_me.id));

    let (reopened, _) = open(dir.path());
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.tasks()[0].id, keep.id);
}

#[test]
fn two_stores_on_one_directory_see_each_other_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (mut watcher, _) = open(dir.path());
    let (mut editor, _) = open(dir.path());

    editor.add(NewTask::new("From another process")).unwrap();
    assert!(watcher.is_empty());
    assert!(watcher.reload());
    assert_eq!(watcher.tasks()[0].title, "From another process");
    assert!(!watcher.reload());
}
