//! Terminal notification gateway.
//!
//! Writes each notification as a line on stderr, ringing the terminal bell
//! for persistent ones. stdout stays reserved for command output.

use std::io::{IsTerminal, Write};

use super::{Notification, NotificationGateway, Permission};

/// Shows notifications on the controlling terminal.
///
/// A terminal needs no prompt, so permission follows support: granted when
/// stderr is a terminal, denied otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleGateway {
    supported: bool,
}

impl ConsoleGateway {
    /// Detects whether stderr is attached to a terminal.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            supported: std::io::stderr().is_terminal(),
        }
    }

    /// Forces support on or off, e.g. when stderr is redirected on purpose.
    #[must_use]
    pub const fn with_support(supported: bool) -> Self {
        Self { supported }
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::detect()
    }
}

impl NotificationGateway for ConsoleGateway {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        if self.supported {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn request_permission(&self) -> Permission {
        self.permission()
    }

    fn show(&self, notification: &Notification) {
        let bell = if notification.options.persistent { "\x07" } else { "" };
        let mut err = std::io::stderr().lock();
        if let Err(e) = writeln!(err, "{bell}{}  {}", notification.title, notification.body) {
            tracing::debug!(error = %e, "failed to write notification");
            return;
        }
        tracing::info!(
            tag = %notification.options.tag,
            hint = %notification.hint,
            title = %notification.title,
            "notification shown"
        );
    }
}
