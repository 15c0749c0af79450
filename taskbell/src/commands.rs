//! CLI subcommands and the session that executes them.
//!
//! A [`Session`] owns the task store for one invocation. One-shot commands
//! mutate or print and return; `watch` keeps the reminder scheduler running
//! in the foreground until a shutdown future resolves.

use std::fmt::Write as _;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use taskbell_proto::{Priority, Task, TaskId, TaskStatus};
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::{ClientConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::notify::NotificationGateway;
use crate::reminder::{ReminderError, Reminders};
use crate::store::{KeyValueStore, NewTask, TaskError, TaskPatch, TaskStore};
use crate::view::{self, Filter, SortKey, TaskCounts, TaskQuery};

/// Shortest id prefix shown by `list`.
const MIN_ID_WIDTH: usize = 8;

/// Errors that end a command unsuccessfully.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A task operation was rejected.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Reminders could not be turned on or off.
    #[error(transparent)]
    Reminder(#[from] ReminderError),

    /// A `--due` value could not be parsed.
    #[error("invalid due date `{0}`; expected RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM`")]
    InvalidDue(String),

    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Subcommands.
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task.
    Add {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(short, long, default_value = "")]
        description: String,
        /// low, medium or high.
        #[arg(short, long, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Deadline (RFC 3339, or local `YYYY-MM-DD HH:MM`).
        #[arg(long, value_parser = parse_due)]
        due: Option<DateTime<Utc>>,
    },
    /// Change fields of a task.
    Edit {
        /// Task id or unique id prefix.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(short, long)]
        description: Option<String>,
        /// New priority.
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New status.
        #[arg(long)]
        status: Option<TaskStatus>,
        /// New deadline.
        #[arg(long, value_parser = parse_due, conflicts_with = "no_due")]
        due: Option<DateTime<Utc>>,
        /// Remove the deadline.
        #[arg(long)]
        no_due: bool,
    },
    /// Flip a task between pending and completed.
    Toggle {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Delete a task.
    #[command(alias = "delete")]
    Rm {
        /// Task id or unique id prefix.
        id: String,
    },
    /// List tasks.
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show task counts.
    Stats,
    /// Turn due-date reminders on or off.
    Notify {
        /// on, off, toggle or status.
        #[arg(value_enum, default_value_t = NotifyAction::Status)]
        action: NotifyAction,
    },
    /// Run reminders in the foreground until Ctrl-C.
    Watch,
}

/// Arguments of `list`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only tasks whose title or description contains this text.
    #[arg(short, long, default_value = "")]
    pub search: String,
    /// all, pending or completed.
    #[arg(long, default_value = "all")]
    pub status: Filter<TaskStatus>,
    /// all, low, medium or high.
    #[arg(long, default_value = "all")]
    pub priority: Filter<Priority>,
    /// Sort order; defaults to the configured `default_sort`.
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,
}

/// `notify` actions.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    /// Ask for permission and turn reminders on.
    On,
    /// Turn reminders off.
    Off,
    /// Flip the current state.
    Toggle,
    /// Print the current state.
    Status,
}

/// State for one CLI invocation.
pub struct Session<K: KeyValueStore + Clone, G: NotificationGateway> {
    store: TaskStore<K>,
    kv: K,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    config: ClientConfig,
}

impl<K: KeyValueStore + Clone, G: NotificationGateway> Session<K, G> {
    /// Loads the task store from `kv`.
    #[must_use]
    pub fn open(kv: K, gateway: Arc<G>, clock: Arc<dyn Clock>, config: ClientConfig) -> Self {
        let store = TaskStore::load(kv.clone(), Arc::clone(&clock));
        Self {
            store,
            kv,
            gateway,
            clock,
            config,
        }
    }

    /// The task store.
    #[must_use]
    pub const fn store(&self) -> &TaskStore<K> {
        &self.store
    }

    /// Runs `command`, writing user-facing output to `out`, then flushes
    /// `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the command cannot be carried out.
    /// An unknown task id is not an error; it is reported on `out`.
    pub async fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), CommandError> {
        self.dispatch(command, out).await?;
        out.flush()?;
        Ok(())
    }

    async fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), CommandError> {
        match command {
            Command::Add {
                title,
                description,
                priority,
                due,
            } => self.add(NewTask::new(title).description(description).priority(priority).due(due), out),
            Command::Edit {
                id,
                title,
                description,
                priority,
                status,
                due,
                no_due,
            } => {
                let patch = TaskPatch {
                    title,
                    description,
                    priority,
                    status,
                    due_date: if no_due { Some(None) } else { due.map(Some) },
                };
                self.edit(&id, patch, out)
            }
            Command::Toggle { id } => self.toggle(&id, out),
            Command::Rm { id } => self.remove(&id, out),
            Command::List(args) => self.list(&args, out),
            Command::Stats => self.stats(out),
            Command::Notify { action } => self.notify(action, out).await,
            Command::Watch => {
                self.watch(out, async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %err, "could not listen for Ctrl-C");
                    }
                })
                .await
            }
        }
    }

    fn add<W: Write>(&mut self, new: NewTask, out: &mut W) -> Result<(), CommandError> {
        let task = self.store.add(new)?;
        let width = id_width(self.store.tasks());
        writeln!(out, "Added {}  {}", short_id(&task.id, width), task.title)?;
        Ok(())
    }

    fn edit<W: Write>(&mut self, prefix: &str, mut patch: TaskPatch, out: &mut W) -> Result<(), CommandError> {
        let Some(id) = self.lookup(prefix, out)? else {
            return Ok(());
        };
        if let Some(title) = patch.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err(TaskError::TitleEmpty.into());
            }
        }
        if let Some(description) = patch.description.as_mut() {
            *description = description.trim().to_string();
        }
        if patch.is_empty() {
            writeln!(out, "Nothing to change.")?;
            return Ok(());
        }
        if let Some(task) = self.store.update(&id, patch) {
            writeln!(out, "Updated {}", task.title)?;
        }
        Ok(())
    }

    fn toggle<W: Write>(&mut self, prefix: &str, out: &mut W) -> Result<(), CommandError> {
        let Some(id) = self.lookup(prefix, out)? else {
            return Ok(());
        };
        if let Some(status) = self.store.toggle_status(&id) {
            let title = self.store.get(&id).map_or("", |t| t.title.as_str());
            writeln!(out, "Marked {title} as {status}.")?;
        }
        Ok(())
    }

    fn remove<W: Write>(&mut self, prefix: &str, out: &mut W) -> Result<(), CommandError> {
        let Some(id) = self.lookup(prefix, out)? else {
            return Ok(());
        };
        let title = self.store.get(&id).map(|t| t.title.clone()).unwrap_or_default();
        if self.store.delete(&id) {
            writeln!(out, "Deleted {title}.")?;
        }
        Ok(())
    }

    fn list<W: Write>(&self, args: &ListArgs, out: &mut W) -> Result<(), CommandError> {
        let query = TaskQuery {
            search: args.search.clone(),
            status: args.status,
            priority: args.priority,
            sort: args.sort.unwrap_or(self.config.default_sort),
        };
        let tasks = self.store.tasks();
        let rows = view::derive_view(tasks, &query);

        if tasks.is_empty() {
            writeln!(out, "No tasks yet. Add one with `taskbell add <title>`.")?;
            return Ok(());
        }
        if rows.is_empty() {
            writeln!(out, "No tasks match.")?;
            return Ok(());
        }

        let now = self.clock.now();
        let width = id_width(tasks);
        for task in &rows {
            writeln!(out, "{}", self.render_row(task, width, now))?;
        }
        writeln!(out, "{} of {} task(s)", rows.len(), tasks.len())?;
        Ok(())
    }

    fn render_row(&self, task: &Task, width: usize, now: DateTime<Utc>) -> String {
        let check = if task.is_completed() { "[x]" } else { "[ ]" };
        let mut row = format!(
            "{:<width$}  {check} {:<6}  {}",
            short_id(&task.id, width),
            task.priority,
            task.title
        );
        if let Some(due) = task.due_date {
            let local = due.with_timezone(&Local);
            let mut shown = String::new();
            if write!(shown, "{}", local.format(&self.config.timestamp_format)).is_err() {
                tracing::warn!(format = %self.config.timestamp_format, "bad timestamp format");
                shown = local.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
            }
            row.push_str("  due ");
            row.push_str(&shown);
        }
        if task.is_overdue(now) {
            row.push_str("  OVERDUE");
        } else if task.is_due_soon(now) {
            row.push_str("  DUE SOON");
        }
        if !task.description.is_empty() {
            row.push_str(&format!("\n{:width$}      {}", "", task.description));
        }
        row
    }

    fn stats<W: Write>(&self, out: &mut W) -> Result<(), CommandError> {
        let counts = TaskCounts::of(self.store.tasks(), self.clock.now());
        writeln!(out, "total:     {}", counts.total)?;
        writeln!(out, "completed: {}", counts.completed)?;
        writeln!(out, "pending:   {}", counts.total - counts.completed)?;
        writeln!(out, "overdue:   {}", counts.overdue)?;
        Ok(())
    }

    async fn notify<W: Write>(&mut self, action: NotifyAction, out: &mut W) -> Result<(), CommandError> {
        let mut reminders = self.reminders().preference_only();
        reminders.restore();
        match action {
            NotifyAction::On => {
                reminders.enable().await?;
                writeln!(out, "Reminders are on.")?;
            }
            NotifyAction::Off => {
                reminders.disable()?;
                writeln!(out, "Reminders are off.")?;
            }
            NotifyAction::Toggle => {
                let on = reminders.toggle().await?;
                writeln!(out, "Reminders are {}.", if on { "on" } else { "off" })?;
            }
            NotifyAction::Status => {
                let state = if reminders.is_enabled() { "on" } else { "off" };
                let support = if reminders.is_supported() { "" } else { ", unsupported here" };
                writeln!(
                    out,
                    "Reminders are {state} (permission: {}{support}).",
                    reminders.permission()
                )?;
            }
        }
        Ok(())
    }

    /// Runs the reminder scheduler until `shutdown` resolves, reloading the
    /// task list every `reload_interval` and rescheduling when it changed.
    /// The enabled preference is re-read on the same cadence: turning
    /// reminders off elsewhere pauses the scheduler until they are back on.
    ///
    /// Returns immediately with a hint when reminders are turned off.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Output`] if writing to `out` fails.
    pub async fn watch<W, F>(&mut self, out: &mut W, shutdown: F) -> Result<(), CommandError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let mut reminders = self.reminders();
        reminders.set_tasks(self.store.snapshot());
        if !reminders.restore() {
            writeln!(out, "Reminders are off. Run `taskbell notify on` to enable them.")?;
            return Ok(());
        }
        writeln!(
            out,
            "Watching {} task(s) for reminders. Press Ctrl-C to stop.",
            self.store.len()
        )?;
        out.flush()?;

        let mut reload = tokio::time::interval(self.config.reload_interval);
        reload.set_missed_tick_behavior(MissedTickBehavior::Delay);
        reload.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = reload.tick() => {
                    if self.store.reload() {
                        tracing::info!(count = self.store.len(), "task list changed, rescheduling");
                        reminders.set_tasks(self.store.snapshot());
                    }
                    let was_enabled = reminders.is_enabled();
                    match (was_enabled, reminders.refresh()) {
                        (true, false) => {
                            writeln!(out, "Reminders were turned off. Waiting for `taskbell notify on`.")?;
                            out.flush()?;
                        }
                        (false, true) => {
                            writeln!(out, "Reminders are back on.")?;
                            out.flush()?;
                        }
                        _ => {}
                    }
                }
            }
        }

        writeln!(out, "Stopped watching.")?;
        Ok(())
    }

    fn reminders(&self) -> Reminders<K, G> {
        Reminders::new(
            self.kv.clone(),
            Arc::clone(&self.gateway),
            Arc::clone(&self.clock),
            self.config.tick_interval,
        )
    }

    /// Resolves an id prefix, reporting an unknown id on `out`.
    fn lookup<W: Write>(&self, prefix: &str, out: &mut W) -> Result<Option<TaskId>, CommandError> {
        match self.store.resolve_id(prefix) {
            Ok(id) => Ok(Some(id)),
            Err(TaskError::TaskNotFound(prefix)) => {
                writeln!(out, "No task matches `{prefix}`.")?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Parses a `--due` value. Zone-less forms are read as local time.
///
/// # Errors
///
/// Returns [`CommandError::InvalidDue`] if no accepted form matches.
pub fn parse_due(input: &str) -> Result<DateTime<Utc>, CommandError> {
    parse_due_in(input, &Local)
}

/// Like [`parse_due`], reading zone-less forms in `tz`.
///
/// # Errors
///
/// Returns [`CommandError::InvalidDue`] if no accepted form matches.
pub fn parse_due_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>, CommandError> {
    let s = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format)
            && let Some(local) = tz.from_local_datetime(&naive).earliest()
        {
            return Ok(local.with_timezone(&Utc));
        }
    }
    Err(CommandError::InvalidDue(input.to_string()))
}

/// Width of the id column: long enough that every shown prefix is unique.
fn id_width(tasks: &[Task]) -> usize {
    let mut ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    let shared = ids
        .windows(2)
        .map(|pair| {
            pair[0]
                .chars()
                .zip(pair[1].chars())
                .take_while(|(a, b)| a == b)
                .count()
        })
        .max()
        .unwrap_or(0);
    (shared + 1).max(MIN_ID_WIDTH)
}

fn short_id(id: &TaskId, width: usize) -> String {
    id.as_str().chars().take(width).collect()
}
