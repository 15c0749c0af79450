//! Task record and its enums.
//!
//! A [`Task`] is the only entity in `taskbell`: a flat, independent to-do
//! item with an optional deadline. Field names follow the camelCase JSON
//! wire shape (`dueDate`, `createdAt`, `updatedAt`) so that a persisted
//! collection can be read back without a translation layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending task counts as "due soon" when its deadline is less than this
/// many hours away.
pub const DUE_SOON_WINDOW_HOURS: i64 = 24;

/// Opaque, unique task identifier.
///
/// Freshly created ids are UUID v7 strings (time-ordered), but any string
/// read back from storage is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new time-ordered task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing a [`TaskStatus`] or [`Priority`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} `{value}`; expected one of: {expected}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not done yet.
    #[default]
    Pending,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Returns the other status. Toggling twice is the identity.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
                expected: "pending, completed",
            }),
        }
    }
}

/// How important a task is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Rank 1.
    Low,
    /// Rank 2. The default for new tasks.
    #[default]
    Medium,
    /// Rank 3.
    High,
}

impl Priority {
    /// Numeric rank used for sorting: high=3, medium=2, low=1.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
                expected: "low, medium, high",
            }),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique id, immutable after creation.
    pub id: TaskId,
    /// Display title. Non-empty when created through the store.
    pub title: String,
    /// Free text, possibly empty.
    #[serde(default)]
    pub description: String,
    /// Pending or completed.
    pub status: TaskStatus,
    /// Low, medium or high.
    pub priority: Priority,
    /// Optional deadline; `None` means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last mutated. Never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending, medium-priority task with no description and no
    /// deadline, stamped with `now` for both timestamps.
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Returns `true` when the task has been completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// A pending task whose deadline has passed.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < now)
    }

    /// A pending task due within the next [`DUE_SOON_WINDOW_HOURS`].
    #[must_use]
    pub fn is_due_soon(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed()
            && self
                .due_date
                .is_some_and(|due| due > now && due - now < Duration::hours(DUE_SOON_WINDOW_HOURS))
    }
}
