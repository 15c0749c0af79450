//! Notification gateway abstraction.
//!
//! Defines the [`NotificationGateway`] trait the reminder layer emits
//! through, and the implementations:
//! - [`console::ConsoleGateway`]: writes reminders to the terminal
//! - [`recording::RecordingGateway`]: captures reminders for tests

pub mod console;
pub mod recording;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use taskbell_proto::Priority;

pub use console::ConsoleGateway;
pub use recording::RecordingGateway;

/// How long a non-persistent notification stays visible.
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Whether the gateway may display notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Permission {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// Not decided yet; a request may prompt.
    #[default]
    Default,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Display options derived from a notification's priority hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Stays until the user dismisses it.
    pub persistent: bool,
    /// Closes by itself after this long; `None` when persistent.
    pub auto_dismiss: Option<Duration>,
    /// `task-<unix millis of emission>`.
    pub tag: String,
}

impl NotifyOptions {
    /// High hints are persistent; everything else auto-dismisses.
    #[must_use]
    pub fn for_hint(hint: Priority, emitted_at: DateTime<Utc>) -> Self {
        let persistent = hint == Priority::High;
        Self {
            persistent,
            auto_dismiss: (!persistent).then_some(AUTO_DISMISS_AFTER),
            tag: format!("task-{}", emitted_at.timestamp_millis()),
        }
    }
}

/// A single user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short headline, e.g. "⏰ Task Due Soon".
    pub title: String,
    /// One-line detail.
    pub body: String,
    /// Priority the notification was emitted with.
    pub hint: Priority,
    /// Display options.
    pub options: NotifyOptions,
}

impl Notification {
    /// Builds a notification, deriving its options from `hint`.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        hint: Priority,
        emitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            hint,
            options: NotifyOptions::for_hint(hint, emitted_at),
        }
    }
}

/// A place notifications can be shown.
///
/// `show` is fire-and-forget: display failures are the gateway's concern
/// and are never reported back to the reminder layer.
pub trait NotificationGateway: Send + Sync + 'static {
    /// Returns `false` when this environment cannot display notifications
    /// at all.
    fn is_supported(&self) -> bool;

    /// The current permission, without prompting.
    fn permission(&self) -> Permission;

    /// Asks for permission. Resolves to [`Permission::Granted`] or
    /// [`Permission::Denied`].
    fn request_permission(&self) -> impl std::future::Future<Output = Permission> + Send;

    /// Displays `notification`.
    fn show(&self, notification: &Notification);
}
