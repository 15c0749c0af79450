//! Due-date reminders.
//!
//! [`evaluate`] is the pure per-task decision: given the task list and an
//! instant, which reminders fire right now. [`scheduler`] runs it on a
//! tokio interval, and [`control`] owns the opt-in flow around it.
//!
//! A pending task with a deadline is checked against three windows, first
//! match wins:
//!
//! 1. overdue by less than [`OVERDUE_GRACE_MINUTES`]
//! 2. due within [`DUE_SOON_MINUTES`]
//! 3. high priority and due within [`HIGH_PRIORITY_MINUTES`]
//!
//! There is no memory of what was already sent. A task due in ten minutes
//! fires on every tick until it is due; an overdue task stops firing once
//! the grace window has passed.

pub mod control;
pub mod scheduler;

use chrono::{DateTime, Duration, Utc};
use taskbell_proto::{Priority, Task, TaskId};

use crate::notify::{Notification, NotificationGateway, Permission};

pub use control::{NOTIFICATIONS_KEY, ReminderError, Reminders};
pub use scheduler::ReminderScheduler;

/// An overdue task keeps firing for this long after its deadline.
pub const OVERDUE_GRACE_MINUTES: i64 = 5;

/// Any pending task due within this many minutes fires a due-soon reminder.
pub const DUE_SOON_MINUTES: i64 = 15;

/// High-priority tasks due within this many minutes fire a reminder.
pub const HIGH_PRIORITY_MINUTES: i64 = 60;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Which window a reminder fired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// Deadline passed less than the grace window ago.
    Overdue {
        /// Whole minutes since the deadline, rounded down.
        minutes_ago: i64,
    },
    /// Deadline within the due-soon window.
    DueSoon {
        /// Minutes until the deadline, rounded up.
        minutes: i64,
    },
    /// High-priority task within the one-hour window.
    HighPriority {
        /// Hours until the deadline, rounded up.
        hours: i64,
    },
}

/// One reminder produced by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Task the reminder is about.
    pub task_id: TaskId,
    /// Task title at evaluation time.
    pub task_title: String,
    /// Window that matched.
    pub kind: ReminderKind,
    /// Priority hint the notification is emitted with.
    pub hint: Priority,
}

impl Reminder {
    /// Headline shown to the user.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self.kind {
            ReminderKind::Overdue { .. } => "⚠️ Overdue Task",
            ReminderKind::DueSoon { .. } => "⏰ Task Due Soon",
            ReminderKind::HighPriority { .. } => "🔴 High Priority Task",
        }
    }

    /// Detail line shown to the user.
    #[must_use]
    pub fn body(&self) -> String {
        let title = &self.task_title;
        match self.kind {
            ReminderKind::Overdue { minutes_ago } => {
                format!("\"{title}\" was due {}", time_ago(minutes_ago))
            }
            ReminderKind::DueSoon { minutes } => {
                format!("\"{title}\" is due in {minutes} minute(s)")
            }
            ReminderKind::HighPriority { hours } => {
                format!("\"{title}\" is due in {hours} hour(s)")
            }
        }
    }

    /// Builds the notification for this reminder, emitted at `now`.
    #[must_use]
    pub fn to_notification(&self, now: DateTime<Utc>) -> Notification {
        Notification::new(self.title(), self.body(), self.hint, now)
    }
}

/// Decides which window, if any, `task` falls in at `now`.
#[must_use]
pub fn classify(task: &Task, now: DateTime<Utc>) -> Option<ReminderKind> {
    if task.is_completed() {
        return None;
    }
    let due = task.due_date?;
    let until_ms = (due - now).num_milliseconds();

    if due < now && now - due < Duration::minutes(OVERDUE_GRACE_MINUTES) {
        Some(ReminderKind::Overdue {
            minutes_ago: (-until_ms).div_euclid(MINUTE_MS),
        })
    } else if now < due && due <= now + Duration::minutes(DUE_SOON_MINUTES) {
        Some(ReminderKind::DueSoon {
            minutes: ceil_div(until_ms, MINUTE_MS),
        })
    } else if task.priority == Priority::High
        && now < due
        && due <= now + Duration::minutes(HIGH_PRIORITY_MINUTES)
    {
        Some(ReminderKind::HighPriority {
            hours: ceil_div(until_ms, HOUR_MS),
        })
    } else {
        None
    }
}

/// Runs one evaluation pass over `tasks`. Reminders come out in task order.
#[must_use]
pub fn evaluate(tasks: &[Task], now: DateTime<Utc>) -> Vec<Reminder> {
    tasks
        .iter()
        .filter_map(|task| {
            let kind = classify(task, now)?;
            let hint = match kind {
                ReminderKind::DueSoon { .. } => task.priority,
                ReminderKind::Overdue { .. } | ReminderKind::HighPriority { .. } => Priority::High,
            };
            Some(Reminder {
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                kind,
                hint,
            })
        })
        .collect()
}

/// Shows `notification` if the gateway currently has permission.
///
/// Returns `true` when the notification was handed to the gateway.
pub fn emit<G: NotificationGateway>(gateway: &G, notification: &Notification) -> bool {
    if gateway.permission() != Permission::Granted {
        tracing::debug!(title = %notification.title, "notification suppressed, permission not granted");
        return false;
    }
    gateway.show(notification);
    true
}

/// Evaluates `tasks` at `now` and emits every resulting reminder.
///
/// Returns the number of notifications shown.
pub fn dispatch<G: NotificationGateway>(
    gateway: &G,
    tasks: &[Task],
    now: DateTime<Utc>,
) -> usize {
    let reminders = evaluate(tasks, now);
    let shown = reminders
        .iter()
        .filter(|reminder| emit(gateway, &reminder.to_notification(now)))
        .count();
    if shown > 0 {
        tracing::debug!(shown, "reminders dispatched");
    }
    shown
}

/// Renders a non-negative minute count as "N minute(s) ago", "N hour(s)
/// ago" or "N day(s) ago".
#[must_use]
pub fn time_ago(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes} minute(s) ago")
    } else if minutes < 1440 {
        format!("{} hour(s) ago", minutes / 60)
    } else {
        format!("{} day(s) ago", minutes / 1440)
    }
}

/// Ceiling division for a positive numerator.
const fn ceil_div(n: i64, d: i64) -> i64 {
    (n + d - 1) / d
}
