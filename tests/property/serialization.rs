//! Property-based round-trip tests for the task collection wire format.
//!
//! Uses proptest to verify:
//! 1. Any collection of tasks (mixed optional fields) survives
//!    encode → decode unchanged, time values included.
//! 2. Arbitrary text never causes a panic in `decode_tasks`.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use taskbell_proto::codec::{decode_tasks, encode_tasks};
use taskbell_proto::{Priority, Task, TaskId, TaskStatus};

/// Strategy for instants between 1970 and roughly 2100, with millisecond
/// and sub-millisecond precision.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    })
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![Just(TaskStatus::Pending), Just(TaskStatus::Completed)]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High)
    ]
}

/// Strategy for ids: fresh UUIDs or arbitrary legacy strings.
fn arb_id() -> impl Strategy<Value = TaskId> {
    prop_oneof![
        any::<u128>().prop_map(|n| TaskId::from_string(uuid::Uuid::from_u128(n).to_string())),
        "[0-9]{1,16}".prop_map(TaskId::from_string),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_id(),
        ".{1,40}",
        ".{0,80}",
        arb_status(),
        arb_priority(),
        proptest::option::of(arb_instant()),
        arb_instant(),
        0i64..10_000_000_000,
    )
        .prop_map(
            |(id, title, description, status, priority, due_date, created_at, delta_ms)| Task {
                id,
                title,
                description,
                status,
                priority,
                due_date,
                created_at,
                updated_at: created_at + chrono::Duration::milliseconds(delta_ms),
            },
        )
}

proptest! {
    #[test]
    fn task_collection_round_trips(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let json = encode_tasks(&tasks).unwrap();
        let decoded = decode_tasks(&json).unwrap();
        prop_assert_eq!(decoded, tasks);
    }

    #[test]
    fn decode_arbitrary_text_never_panics(text in ".{0,256}") {
        let _ = decode_tasks(&text);
    }
}
