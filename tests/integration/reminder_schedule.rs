//! Integration tests for reminders: evaluation scenarios, the opt-in
//! controller driving the scheduler, and `watch` picking up edits made by
//! another store on the same backend.
//!
//! Timing tests run on paused tokio time; the wall clock is a
//! `ManualClock` advanced in step.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use taskbell::clock::ManualClock;
use taskbell::commands::Session;
use taskbell::config::ClientConfig;
use taskbell::notify::{Permission, RecordingGateway};
use taskbell::reminder::{self, NOTIFICATIONS_KEY, ReminderKind, Reminders};
use taskbell::store::{KeyValueStore, MemoryKv, NewTask, TaskStore};
use taskbell_proto::{Priority, Task, TaskId, TaskStatus};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 6, 17, 0, 0).unwrap()
}

fn minutes(n: i64) -> chrono::Duration {
    chrono::Duration::minutes(n)
}

fn task_due(title: &str, due_in: i64) -> Task {
    Task::new(TaskId::from_string(title), title, start() - minutes(120)).with_due_date(start() + minutes(due_in))
}

/// Lets spawned tasks run until they block again.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Moves the wall clock and tokio time forward together.
async fn advance(clock: &ManualClock, secs: u64) {
    clock.advance(chrono::Duration::seconds(i64::try_from(secs).unwrap()));
    tokio::time::advance(Duration::from_secs(secs)).await;
    settle().await;
}

// ===========================================================================
// Evaluation scenarios
// ===========================================================================

#[test]
fn high_priority_due_in_ten_minutes_fires_due_soon_only() {
    let tasks = [task_due("Board meeting", 10).with_priority(Priority::High)];
    let reminders = reminder::evaluate(&tasks, start());
    assert_eq!(reminders.len(), 1);
    assert!(matches!(reminders[0].kind, ReminderKind::DueSoon { minutes: 10 }));
    assert_eq!(reminders[0].body(), "\"Board meeting\" is due in 10 minute(s)");
}

#[test]
fn overdue_fires_two_minutes_late_but_not_six() {
    let tasks = [task_due("Send invoice", -2)];
    let now_events = reminder::evaluate(&tasks, start());
    assert_eq!(now_events.len(), 1);
    assert_eq!(now_events[0].title(), "⚠️ Overdue Task");

    assert!(reminder::evaluate(&tasks, start() + minutes(4)).is_empty());
}

#[test]
fn completed_task_never_fires() {
    let tasks = [task_due("Old chore", -60).with_status(TaskStatus::Completed)];
    for offset in [-120, -61, -60, -59, 0, 60] {
        assert!(reminder::evaluate(&tasks, start() + minutes(offset)).is_empty());
    }
}

// ===========================================================================
// Controller + scheduler
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn enabling_confirms_and_evaluates_immediately() {
    let kv = MemoryKv::new();
    let gateway = Arc::new(RecordingGateway::undecided(Permission::Granted));
    let clock = ManualClock::new(start());
    let mut reminders = Reminders::new(
        kv.clone(),
        Arc::clone(&gateway),
        Arc::new(clock.clone()),
        Duration::from_secs(60),
    );
    reminders.set_tasks(vec![task_due("Pick up kids", 12).with_priority(Priority::Low)]);

    reminders.enable().await.unwrap();
    settle().await;

    let titles: Vec<String> = gateway.take().into_iter().map(|n| n.title).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"🔔 Notifications Enabled".to_string()));
    assert!(titles.contains(&"⏰ Task Due Soon".to_string()));
    assert_eq!(kv.get(NOTIFICATIONS_KEY).unwrap().as_deref(), Some("true"));

    advance(&clock, 60).await;
    let shown = gateway.take();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].body, "\"Pick up kids\" is due in 11 minute(s)");

    reminders.disable().unwrap();
    advance(&clock, 300).await;
    assert!(gateway.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restored_reminders_survive_permission_revocation_silently() {
    let kv = MemoryKv::with_entry(NOTIFICATIONS_KEY, "true");
    let gateway = Arc::new(RecordingGateway::granted());
    let clock = ManualClock::new(start());
    let mut reminders = Reminders::new(
        kv,
        Arc::clone(&gateway),
        Arc::new(clock.clone()),
        Duration::from_secs(60),
    );
    reminders.set_tasks(vec![task_due("Stretch", 5)]);
    assert!(reminders.restore());
    settle().await;
    assert_eq!(gateway.take().len(), 1);

    // Permission pulled while running: ticks continue but nothing shows.
    gateway.set_permission(Permission::Denied);
    advance(&clock, 60).await;
    assert!(gateway.shown().is_empty());
    assert!(reminders.is_running());
}

// ===========================================================================
// watch
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn watch_picks_up_tasks_added_elsewhere() {
    let kv = MemoryKv::with_entry(NOTIFICATIONS_KEY, "true");
    let gateway = Arc::new(RecordingGateway::granted());
    let clock = ManualClock::new(start());
    let mut config = ClientConfig::with_data_dir("/unused");
    config.reload_interval = Duration::from_secs(5);
    let mut session = Session::open(
        kv.clone(),
        Arc::clone(&gateway),
        Arc::new(clock.clone()),
        config,
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let driver = {
        let gateway = Arc::clone(&gateway);
        async move {
            settle().await;
            assert!(gateway.shown().is_empty());

            let mut editor = TaskStore::load(kv, Arc::new(clock.clone()));
            editor
                .add(NewTask::new("Take out bins").due(Some(start() + minutes(8))))
                .unwrap();

            advance(&clock, 5).await;
            let shown = gateway.take();
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].title, "⏰ Task Due Soon");

            // Unchanged file: no extra evaluation on the next reload.
            advance(&clock, 5).await;
            assert!(gateway.shown().is_empty());

            stop_tx.send(()).unwrap();
        }
    };

    let mut out = Vec::new();
    let watching = session.watch(&mut out, async {
        let _ = stop_rx.await;
    });
    let (result, ()) = tokio::join!(watching, driver);
    result.unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Watching 0 task(s)"));
    assert!(out.ends_with("Stopped watching.\n"));
    assert_eq!(session.store().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn watch_pauses_when_turned_off_elsewhere() {
    let kv = MemoryKv::with_entry(NOTIFICATIONS_KEY, "true");
    let gateway = Arc::new(RecordingGateway::granted());
    let clock = ManualClock::new(start());
    TaskStore::load(kv.clone(), Arc::new(clock.clone()))
        .add(NewTask::new("Call the plumber").due(Some(start() + minutes(14))))
        .unwrap();
    let mut config = ClientConfig::with_data_dir("/unused");
    config.reload_interval = Duration::from_secs(5);
    let mut session = Session::open(
        kv.clone(),
        Arc::clone(&gateway),
        Arc::new(clock.clone()),
        config,
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let driver = {
        let gateway = Arc::clone(&gateway);
        async move {
            settle().await;
            assert_eq!(gateway.take().len(), 1);

            // `taskbell notify off` from another shell.
            kv.set(NOTIFICATIONS_KEY, "false").unwrap();
            advance(&clock, 5).await;
            for _ in 0..3 {
                advance(&clock, 60).await;
            }
            assert!(gateway.shown().is_empty());

            kv.set(NOTIFICATIONS_KEY, "true").unwrap();
            advance(&clock, 5).await;
            let shown = gateway.take();
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].title, "⏰ Task Due Soon");

            stop_tx.send(()).unwrap();
        }
    };

    let mut out = Vec::new();
    let watching = session.watch(&mut out, async {
        let _ = stop_rx.await;
    });
    let (result, ()) = tokio::join!(watching, driver);
    result.unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Reminders were turned off."));
    assert!(out.contains("Reminders are back on."));
    assert!(out.ends_with("Stopped watching.\n"));
}
