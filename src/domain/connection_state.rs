//! Live channel connection state machine.
//!
//! [`ConnectionFsm`] holds the transition rules without any I/O so the
//! async driver in [`crate::ws::connection`] only has to feed it channel
//! events and act on what it returns.
//!
//! ```text
//!            begin_attempt            on_open
//! Disconnected ──────────► Connecting ───────► Connected
//!      ▲                        │                  │
//!      └──────── on_close ──────┴──────────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::backoff::{Backoff, BackoffPolicy};

/// Connectivity of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel and no attempt in progress.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Channel open; outbound frames go straight to the device.
    Connected,
}

impl ConnectionState {
    /// Returns `true` only for [`ConnectionState::Connected`].
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// What the driver must do after a close event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    /// Wait this long before the next attempt.
    pub delay: Duration,
    /// Whether the connectivity-false hook should fire.
    pub notify: bool,
}

/// Connection state plus the backoff it owns.
#[derive(Debug, Clone)]
pub struct ConnectionFsm {
    state: ConnectionState,
    backoff: Backoff,
    reconnect_pending: bool,
}

impl ConnectionFsm {
    /// Creates a machine in [`ConnectionState::Disconnected`] with the
    /// backoff at its floor.
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff: Backoff::new(policy),
            reconnect_pending: false,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Delay the next reconnect would wait.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.backoff.current()
    }

    /// Returns `true` while a reconnect is scheduled but not yet started.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// `Disconnected → Connecting`. Consumes any pending reconnect.
    ///
    /// Returns `false` and changes nothing if a channel exists or an
    /// attempt is already running.
    pub fn begin_attempt(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            return false;
        }
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
        true
    }

    /// `Connecting → Connected`. Resets the backoff to its floor.
    ///
    /// Returns `true` if the connectivity-true hook should fire.
    pub fn on_open(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.backoff.reset();
        true
    }

    /// `Connecting | Connected → Disconnected`.
    ///
    /// Failed connects and dropped channels are handled identically: the
    /// caller gets the delay to wait, and the backoff grows for the next
    /// failure. Returns `None` if a reconnect is already scheduled, so a
    /// repeated close never produces a second timer.
    pub fn on_close(&mut self) -> Option<ReconnectPlan> {
        let notify = self.state != ConnectionState::Disconnected;
        if !notify && self.reconnect_pending {
            return None;
        }
        self.state = ConnectionState::Disconnected;
        self.reconnect_pending = true;
        Some(ReconnectPlan {
            delay: self.backoff.advance(),
            notify,
        })
    }
}
