//! In-memory gateway that records what it was asked to show.

use parking_lot::Mutex;

use super::{Notification, NotificationGateway, Permission};

/// Records every shown notification instead of displaying it.
///
/// `answer` is what a permission request resolves to while the current
/// permission is still [`Permission::Default`].
#[derive(Debug)]
pub struct RecordingGateway {
    supported: bool,
    permission: Mutex<Permission>,
    answer: Permission,
    requests: Mutex<usize>,
    shown: Mutex<Vec<Notification>>,
}

impl RecordingGateway {
    /// A supported gateway with permission already granted.
    #[must_use]
    pub fn granted() -> Self {
        Self::new(true, Permission::Granted, Permission::Granted)
    }

    /// A supported gateway that has not asked yet and will get `answer`.
    #[must_use]
    pub fn undecided(answer: Permission) -> Self {
        Self::new(true, Permission::Default, answer)
    }

    /// A gateway for an environment with no notification support.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(false, Permission::Denied, Permission::Denied)
    }

    fn new(supported: bool, permission: Permission, answer: Permission) -> Self {
        Self {
            supported,
            permission: Mutex::new(permission),
            answer,
            requests: Mutex::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Changes the current permission, as if the user edited it elsewhere.
    pub fn set_permission(&self, permission: Permission) {
        *self.permission.lock() = permission;
    }

    /// A copy of everything shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }

    /// Drains and returns everything shown so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.shown.lock())
    }

    /// How many times permission was requested.
    #[must_use]
    pub fn request_count(&self) -> usize {
        *self.requests.lock()
    }
}

impl NotificationGateway for RecordingGateway {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> Permission {
        *self.requests.lock() += 1;
        let mut current = self.permission.lock();
        if *current == Permission::Default {
            *current = self.answer;
        }
        *current
    }

    fn show(&self, notification: &Notification) {
        self.shown.lock().push(notification.clone());
    }
}
