//! Task store: the owned, ordered task collection and its persistence.
//!
//! [`TaskStore`] is the only component that mutates tasks. Every mutation
//! rewrites the whole collection through a [`KeyValueStore`] under
//! [`TASKS_KEY`]. Everyone else works from `&[Task]` borrows or owned
//! snapshots.

pub mod kv;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use taskbell_proto::codec::{self, CodecError};
use taskbell_proto::{Priority, Task, TaskId, TaskStatus};
use thiserror::Error;

use crate::clock::Clock;

pub use kv::{FileKv, KeyValueStore, KvError, MemoryKv};

/// Key under which the JSON task collection is persisted.
pub const TASKS_KEY: &str = "todo-tasks";

/// Errors that can occur during task operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// No task matches the given id or id prefix.
    #[error("task not found: {0}")]
    TaskNotFound(String),
    /// More than one task matches the given id prefix.
    #[error("task id prefix `{0}` matches more than one task")]
    AmbiguousId(String),
}

/// Errors that can occur while persisting the collection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The collection could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The backend rejected the write.
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// User-supplied fields for a new task. Title is required; everything else
/// has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Title; trimmed, must not be blank.
    pub title: String,
    /// Description; trimmed.
    pub description: String,
    /// Defaults to [`Priority::Medium`].
    pub priority: Priority,
    /// Defaults to [`TaskStatus::Pending`].
    pub status: TaskStatus,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Starts a new task with the given title and default everything else.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            status: TaskStatus::default(),
            due_date: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn due(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = due;
        self
    }
}

/// A partial update. `None` fields are left untouched.
///
/// `due_date` is doubly optional: `Some(None)` clears the deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New deadline, or `Some(None)` to remove it.
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// Returns `true` when the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }

    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Owned, insertion-ordered task collection backed by a [`KeyValueStore`].
pub struct TaskStore<K: KeyValueStore> {
    tasks: Vec<Task>,
    kv: K,
    clock: Arc<dyn Clock>,
}

impl<K: KeyValueStore> TaskStore<K> {
    /// Loads the collection from `kv`.
    ///
    /// Never fails: an absent, unreadable or malformed value yields an
    /// empty collection and a warning in the log.
    pub fn load(kv: K, clock: Arc<dyn Clock>) -> Self {
        let tasks = read_tasks(&kv);
        tracing::debug!(count = tasks.len(), "task store loaded");
        Self { tasks, kv, clock }
    }

    /// Re-reads the collection from the backend, replacing the in-memory
    /// copy. Returns `true` when the contents changed.
    pub fn reload(&mut self) -> bool {
        let tasks = read_tasks(&self.kv);
        if tasks == self.tasks {
            return false;
        }
        self.tasks = tasks;
        true
    }

    /// All tasks in insertion order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// An owned copy of the collection, for consumers that outlive a borrow.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` when there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Looks up a task by exact id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    /// Resolves a full id or a unique id prefix to a task id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] if nothing matches, or
    /// [`TaskError::AmbiguousId`] if the prefix matches several tasks.
    pub fn resolve_id(&self, prefix: &str) -> Result<TaskId, TaskError> {
        if let Some(task) = self.tasks.iter().find(|t| t.id.as_str() == prefix) {
            return Ok(task.id.clone());
        }
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| !prefix.is_empty() && t.id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (Some(_), Some(_)) => Err(TaskError::AmbiguousId(prefix.to_string())),
            (None, _) => Err(TaskError::TaskNotFound(prefix.to_string())),
        }
    }

    /// Creates a task, appends it and saves.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`] if the trimmed title is empty.
    pub fn add(&mut self, new: NewTask) -> Result<Task, TaskError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(TaskError::TitleEmpty);
        }

        let mut id = TaskId::new();
        while self.get(&id).is_some() {
            id = TaskId::new();
        }

        let now = self.clock.now();
        let task = Task {
            id,
            title: title.to_string(),
            description: new.description.trim().to_string(),
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        self.tasks.push(task.clone());
        tracing::debug!(task_id = %task.id, "task added");
        self.save();
        Ok(task)
    }

    /// Merges `patch` into the task with `id`, stamps `updated_at` and
    /// saves. Returns `None` without saving when no task has that id.
    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Option<&Task> {
        let index = self.index_of(id)?;
        let stamp = self.next_stamp(self.tasks[index].updated_at);
        let task = &mut self.tasks[index];
        patch.apply(task);
        task.updated_at = stamp;
        tracing::debug!(task_id = %id, "task updated");
        self.save();
        Some(&self.tasks[index])
    }

    /// Removes the task with `id` and saves. Returns `false` without saving
    /// when no task has that id.
    pub fn delete(&mut self, id: &TaskId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.tasks.remove(index);
        tracing::debug!(task_id = %id, "task deleted");
        self.save();
        true
    }

    /// Flips the status of the task with `id`, stamps `updated_at` and
    /// saves. Returns the new status, or `None` when no task has that id.
    pub fn toggle_status(&mut self, id: &TaskId) -> Option<TaskStatus> {
        let index = self.index_of(id)?;
        let stamp = self.next_stamp(self.tasks[index].updated_at);
        let task = &mut self.tasks[index];
        task.status = task.status.toggled();
        task.updated_at = stamp;
        let status = task.status;
        tracing::debug!(task_id = %id, %status, "task status toggled");
        self.save();
        Some(status)
    }

    /// Writes the whole collection to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if encoding or the backend write fails.
    pub fn try_save(&self) -> Result<(), StoreError> {
        let text = codec::encode_tasks(&self.tasks)?;
        self.kv.set(TASKS_KEY, &text)?;
        Ok(())
    }

    /// Writes the whole collection, logging instead of failing.
    pub fn save(&self) {
        if let Err(err) = self.try_save() {
            tracing::warn!(error = %err, "failed to persist tasks");
        }
    }

    fn index_of(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == *id)
    }

    /// Mutation timestamp strictly after `previous`, even when the clock has
    /// not moved (or moved backwards) since the last write.
    fn next_stamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }
}

fn read_tasks(kv: &impl KeyValueStore) -> Vec<Task> {
    match kv.get(TASKS_KEY) {
        Ok(Some(text)) => match codec::decode_tasks(&text) {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(error = %err, "stored tasks are malformed, starting empty");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(err) => {
            tracing::warn!(error = %err, "could not read stored tasks, starting empty");
            Vec::new()
        }
    }
}
