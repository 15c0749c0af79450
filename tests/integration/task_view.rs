//! Integration tests for the derivation pipeline over a store-managed
//! collection: search, filters, sorts, and counts.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskbell::clock::{Clock, ManualClock};
use taskbell::store::{MemoryKv, NewTask, TaskStore};
use taskbell::view::{Filter, SortKey, TaskCounts, TaskQuery, derive_view};
use taskbell_proto::{Priority, Task, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 4, 12, 0, 0).unwrap()
}

/// A store with a mixed collection, each task created one minute after the
/// previous one.
fn make_store() -> (TaskStore<MemoryKv>, ManualClock) {
    let clock = ManualClock::new(start());
    let mut store = TaskStore::load(MemoryKv::new(), Arc::new(clock.clone()));

    let fixtures = [
        NewTask::new("Buy milk").priority(Priority::Low),
        NewTask::new("File taxes")
            .priority(Priority::High)
            .due(Some(start() + Duration::days(3))),
        NewTask::new("Call plumber")
            .description("kitchen sink, ask about MILK frother too")
            .due(Some(start() + Duration::hours(2))),
        NewTask::new("Renew passport")
            .priority(Priority::High)
            .due(Some(start() - Duration::days(1))),
        NewTask::new("Water plants").priority(Priority::Low),
    ];
    for new in fixtures {
        store.add(new).unwrap();
        clock.advance(Duration::minutes(1));
    }
    let passport = store.tasks()[3].id.clone();
    store.toggle_status(&passport).unwrap();
    (store, clock)
}

fn titles(view: &[&Task]) -> Vec<String> {
    view.iter().map(|t| t.title.clone()).collect()
}

// ===========================================================================
// Filtering
// ===========================================================================

#[test]
fn empty_query_keeps_everything() {
    let (store, _) = make_store();
    let query = TaskQuery {
        sort: SortKey::Created,
        ..TaskQuery::default()
    };
    let mut view = titles(&derive_view(store.tasks(), &query));
    view.reverse();
    assert_eq!(
        view,
        vec!["Buy milk", "File taxes", "Call plumber", "Renew passport", "Water plants"]
    );
}

#[test]
fn search_hits_title_and_description() {
    let (store, _) = make_store();
    let query = TaskQuery {
        search: "milk".to_string(),
        ..TaskQuery::default()
    };
    assert_eq!(
        titles(&derive_view(store.tasks(), &query)),
        vec!["Call plumber", "Buy milk"]
    );
}

#[test]
fn status_and_priority_filters_combine() {
    let (store, _) = make_store();
    let query = TaskQuery {
        status: Filter::Only(TaskStatus::Pending),
        priority: Filter::Only(Priority::High),
        ..TaskQuery::default()
    };
    assert_eq!(titles(&derive_view(store.tasks(), &query)), vec!["File taxes"]);

    let completed = TaskQuery {
        status: "completed".parse().unwrap(),
        ..TaskQuery::default()
    };
    assert_eq!(
        titles(&derive_view(store.tasks(), &completed)),
        vec!["Renew passport"]
    );
}

// ===========================================================================
// Sorting
// ===========================================================================

#[test]
fn due_date_sort_puts_undated_last() {
    let (store, _) = make_store();
    let view = derive_view(store.tasks(), &TaskQuery::default());
    assert_eq!(
        titles(&view),
        vec!["Renew passport", "Call plumber", "File taxes", "Buy milk", "Water plants"]
    );
}

#[test]
fn priority_sort_is_stable() {
    let (store, _) = make_store();
    let query = TaskQuery {
        sort: SortKey::Priority,
        ..TaskQuery::default()
    };
    assert_eq!(
        titles(&derive_view(store.tasks(), &query)),
        vec!["File taxes", "Renew passport", "Call plumber", "Buy milk", "Water plants"]
    );
}

#[test]
fn view_does_not_touch_the_collection() {
    let (store, _) = make_store();
    let before = store.snapshot();
    let query = TaskQuery {
        sort: SortKey::Priority,
        search: "a".to_string(),
        ..TaskQuery::default()
    };
    let _ = derive_view(store.tasks(), &query);
    assert_eq!(store.tasks(), before.as_slice());
}

// ===========================================================================
// Counts
// ===========================================================================

#[test]
fn counts_track_time_and_status() {
    let (mut store, clock) = make_store();
    assert_eq!(
        TaskCounts::of(store.tasks(), clock.now()),
        TaskCounts {
            total: 5,
            completed: 1,
            overdue: 0,
        }
    );

    // Three hours on, the plumber call is overdue; the passport is done.
    clock.advance(Duration::hours(3));
    let counts = TaskCounts::of(store.tasks(), clock.now());
    assert_eq!(counts.overdue, 1);

    let plumber = store.tasks()[2].id.clone();
    store.toggle_status(&plumber).unwrap();
    let counts = TaskCounts::of(store.tasks(), clock.now());
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.overdue, 0);
}
