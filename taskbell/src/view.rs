//! Derivation pipeline: filtered, sorted views and aggregate counts.
//!
//! Everything here is pure. Given the same tasks, query and instant, the
//! result is the same; nothing is mutated and nothing is persisted.

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskbell_proto::{ParseEnumError, Priority, Task, TaskStatus};

/// Either "no filtering" or a single accepted value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter<T> {
    /// Accept every value.
    #[default]
    All,
    /// Accept only this value.
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    /// Returns `true` if `value` passes the filter.
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr<Err = ParseEnumError>> FromStr for Filter<T> {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(value) => value.fmt(f),
        }
    }
}

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Earliest deadline first; undated tasks last.
    #[default]
    DueDate,
    /// High before medium before low.
    Priority,
    /// Newest first.
    Created,
}

/// Search term, filters and sort key for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring matched against title and description.
    pub search: String,
    /// Status filter.
    pub status: Filter<TaskStatus>,
    /// Priority filter.
    pub priority: Filter<Priority>,
    /// Sort key.
    pub sort: SortKey,
}

/// Aggregate counts over the whole, unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    /// Number of tasks.
    pub total: usize,
    /// Tasks whose status is completed.
    pub completed: usize,
    /// Pending tasks whose deadline has passed.
    pub overdue: usize,
}

impl TaskCounts {
    /// Counts `tasks` as of `now`.
    #[must_use]
    pub fn of(tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self {
            total: tasks.len(),
            completed: tasks.iter().filter(|t| t.is_completed()).count(),
            overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
        }
    }
}

/// Returns `true` if `task` passes every part of `query`'s filter stage.
#[must_use]
pub fn matches(task: &Task, query: &TaskQuery) -> bool {
    let needle = query.search.to_lowercase();
    let text_match = task.title.to_lowercase().contains(&needle)
        || task.description.to_lowercase().contains(&needle);
    text_match && query.status.accepts(&task.status) && query.priority.accepts(&task.priority)
}

/// Filters then sorts `tasks` according to `query`.
///
/// All sorts are stable, so tasks that compare equal keep their input
/// order.
#[must_use]
pub fn derive_view<'a>(tasks: &'a [Task], query: &TaskQuery) -> Vec<&'a Task> {
    let mut view: Vec<&Task> = tasks.iter().filter(|t| matches(t, query)).collect();
    match query.sort {
        SortKey::DueDate => view.sort_by(|a, b| cmp_due(a.due_date, b.due_date)),
        SortKey::Priority => view.sort_by_key(|t| Reverse(t.priority.rank())),
        SortKey::Created => view.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    view
}

/// Dated before undated; dated ascending.
fn cmp_due(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
