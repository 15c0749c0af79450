//! Opt-in flow around the reminder scheduler.
//!
//! [`Reminders`] owns the persisted "enabled" preference, asks the gateway
//! for permission when the user opts in, and starts or stops the
//! [`ReminderScheduler`] to match.

use std::sync::Arc;
use std::time::Duration;

use taskbell_proto::{Priority, Task};
use thiserror::Error;

use super::ReminderScheduler;
use crate::clock::Clock;
use crate::notify::{Notification, NotificationGateway, Permission};
use crate::store::{KeyValueStore, KvError};

/// Key under which the enabled preference is persisted (`"true"`/`"false"`).
pub const NOTIFICATIONS_KEY: &str = "notifications-enabled";

/// Errors that can occur when turning reminders on or off.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The environment cannot show notifications at all.
    #[error("notifications are not supported in this environment")]
    Unsupported,
    /// The user refused notification permission.
    #[error("notification permission was denied")]
    PermissionDenied,
    /// The preference could not be persisted.
    #[error("failed to persist notification preference: {0}")]
    Kv(#[from] KvError),
}

/// Reminder on/off state plus the scheduler it drives.
pub struct Reminders<K: KeyValueStore, G: NotificationGateway> {
    kv: K,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    scheduler: ReminderScheduler<G>,
    enabled: bool,
    autostart: bool,
}

impl<K: KeyValueStore, G: NotificationGateway> Reminders<K, G> {
    /// Creates a disabled controller. Call [`restore`](Self::restore) to
    /// pick up the persisted preference.
    #[must_use]
    pub fn new(kv: K, gateway: Arc<G>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let scheduler = ReminderScheduler::new(Arc::clone(&gateway), Arc::clone(&clock), period);
        Self {
            kv,
            gateway,
            clock,
            scheduler,
            enabled: false,
            autostart: true,
        }
    }

    /// Manages the preference and permission only; the scheduler is never
    /// started. For one-shot commands that exit right after.
    #[must_use]
    pub fn preference_only(mut self) -> Self {
        self.autostart = false;
        self
    }

    fn start_scheduler(&mut self) {
        if self.autostart {
            self.scheduler.start();
        }
    }

    fn saved_preference(&self) -> bool {
        match self.kv.get(NOTIFICATIONS_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                tracing::warn!(error = %err, "could not read notification preference");
                false
            }
        }
    }

    /// Re-enables reminders if they were left on and permission is still
    /// granted. Never prompts and never fails; returns the resulting state.
    pub fn restore(&mut self) -> bool {
        let saved = self.saved_preference();
        let permission = self.gateway.permission();
        if saved && permission == Permission::Granted {
            self.enabled = true;
            self.start_scheduler();
        } else if saved {
            tracing::debug!(%permission, "reminders left disabled, permission not granted");
        }
        self.enabled
    }

    /// Re-reads the persisted preference and the gateway permission,
    /// stopping or restarting the scheduler when either changed underneath
    /// this controller (for example `notify off` from another process).
    /// Never prompts and never writes; returns the resulting state.
    pub fn refresh(&mut self) -> bool {
        let wanted = self.saved_preference() && self.gateway.permission() == Permission::Granted;
        if wanted && !self.enabled {
            self.enabled = true;
            self.start_scheduler();
            tracing::info!("reminders re-enabled");
        } else if !wanted && self.enabled {
            self.enabled = false;
            self.scheduler.stop();
            tracing::info!("reminders turned off elsewhere");
        }
        self.enabled
    }

    /// Turns reminders on, asking for permission if needed.
    ///
    /// On success the preference is persisted, the scheduler starts and a
    /// confirmation notification is shown. Does nothing when already on.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Unsupported`] or
    /// [`ReminderError::PermissionDenied`] and stays disabled when the
    /// gateway cannot be used, or [`ReminderError::Kv`] if the preference
    /// cannot be written.
    pub async fn enable(&mut self) -> Result<(), ReminderError> {
        if self.enabled {
            return Ok(());
        }
        if !self.gateway.is_supported() {
            return Err(ReminderError::Unsupported);
        }
        let permission = match self.gateway.permission() {
            Permission::Granted => Permission::Granted,
            _ => self.gateway.request_permission().await,
        };
        if permission != Permission::Granted {
            tracing::info!(%permission, "notification permission refused");
            return Err(ReminderError::PermissionDenied);
        }

        self.kv.set(NOTIFICATIONS_KEY, "true")?;
        self.enabled = true;
        self.start_scheduler();
        super::emit(
            self.gateway.as_ref(),
            &Notification::new(
                "🔔 Notifications Enabled",
                "You'll now receive reminders for your tasks!",
                Priority::Medium,
                self.clock.now(),
            ),
        );
        tracing::info!("reminders enabled");
        Ok(())
    }

    /// Turns reminders off and stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Kv`] if the preference cannot be written;
    /// the current state is kept in that case.
    pub fn disable(&mut self) -> Result<(), ReminderError> {
        self.kv.set(NOTIFICATIONS_KEY, "false")?;
        self.enabled = false;
        self.scheduler.stop();
        tracing::info!("reminders disabled");
        Ok(())
    }

    /// Flips the state. Returns whether reminders are on afterwards.
    ///
    /// # Errors
    ///
    /// See [`enable`](Self::enable) and [`disable`](Self::disable).
    pub async fn toggle(&mut self) -> Result<bool, ReminderError> {
        if self.enabled {
            self.disable()?;
        } else {
            self.enable().await?;
        }
        Ok(self.enabled)
    }

    /// Whether reminders are on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The gateway's current permission.
    #[must_use]
    pub fn permission(&self) -> Permission {
        self.gateway.permission()
    }

    /// Whether the gateway can show notifications at all.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.gateway.is_supported()
    }

    /// Hands a fresh task snapshot to the scheduler.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.scheduler.update_tasks(tasks);
    }

    /// Whether the evaluation loop is currently alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}
