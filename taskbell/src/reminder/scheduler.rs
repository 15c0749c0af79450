//! Recurring reminder evaluation on a tokio interval.
//!
//! The loop evaluates once on start, then every period. A new task snapshot
//! pushed through [`ReminderScheduler::update_tasks`] triggers an immediate
//! evaluation and restarts the period. Evaluations run inside the loop
//! task, so two of them never overlap.

use std::sync::Arc;
use std::time::Duration;

use taskbell_proto::Task;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::notify::NotificationGateway;

/// Default time between evaluations.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the evaluation loop task.
///
/// The loop never sees the task store; it works from the latest snapshot
/// sent through a `watch` channel. Stopping, or dropping the scheduler,
/// aborts the loop.
pub struct ReminderScheduler<G: NotificationGateway> {
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    period: Duration,
    tasks_tx: watch::Sender<Vec<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl<G: NotificationGateway> ReminderScheduler<G> {
    /// Creates a stopped scheduler with an empty task snapshot.
    #[must_use]
    pub fn new(gateway: Arc<G>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (tasks_tx, _) = watch::channel(Vec::new());
        Self {
            gateway,
            clock,
            period,
            tasks_tx,
            handle: None,
        }
    }

    /// Returns `true` while the loop task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts the loop. Evaluates the current snapshot immediately.
    ///
    /// Does nothing if already running. Must be called from within a tokio
    /// runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let rx = self.tasks_tx.subscribe();
        let gateway = Arc::clone(&self.gateway);
        let clock = Arc::clone(&self.clock);
        let period = self.period;
        self.handle = Some(tokio::spawn(run_loop(gateway, clock, period, rx)));
        tracing::info!(period_secs = period.as_secs(), "reminder scheduler started");
    }

    /// Aborts the loop. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("reminder scheduler stopped");
        }
    }

    /// Replaces the task snapshot. A running loop re-evaluates right away
    /// and restarts its period; a stopped one picks the snapshot up on the
    /// next start.
    pub fn update_tasks(&self, tasks: Vec<Task>) {
        self.tasks_tx.send_replace(tasks);
    }
}

impl<G: NotificationGateway> Drop for ReminderScheduler<G> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_loop<G: NotificationGateway>(
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    period: Duration,
    mut tasks_rx: watch::Receiver<Vec<Task>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = tasks_rx.changed() => {
                if changed.is_err() {
                    // Sender gone: the scheduler was dropped.
                    return;
                }
                ticker.reset();
            }
        }

        let tasks = tasks_rx.borrow_and_update().clone();
        let now = clock.now();
        tracing::trace!(tasks = tasks.len(), %now, "evaluating reminders");
        super::dispatch(gateway.as_ref(), &tasks, now);
    }
}
