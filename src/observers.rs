//! Collaborator hooks registered by the embedding application.
//!
//! Each inbound variant has at most one hook. Registering a second hook
//! for the same variant replaces the first. A missing hook is a normal
//! no-op at dispatch time.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::LinkError;

type ValueHook = Arc<dyn Fn(Value) + Send + Sync>;
type LineHook = Arc<dyn Fn(String) + Send + Sync>;
type ConnectivityHook = Arc<dyn Fn(bool) + Send + Sync>;
type NoticeHook = Arc<dyn Fn(&LinkError) + Send + Sync>;

/// Set of optional hooks, built before the session starts.
///
/// ```
/// use astropixels_link::Observers;
///
/// let observers = Observers::new()
///     .on_log(|line| println!("device: {line}"))
///     .on_connectivity(|up| println!("link {}", if up { "up" } else { "down" }));
/// assert!(observers.has_log());
/// ```
#[derive(Clone, Default)]
pub struct Observers {
    state: Option<ValueHook>,
    log: Option<LineHook>,
    health: Option<ValueHook>,
    ota_progress: Option<ValueHook>,
    connectivity: Option<ConnectivityHook>,
    notice: Option<NoticeHook>,
}

impl Observers {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook for full device state snapshots.
    #[must_use]
    pub fn on_state(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.state = Some(Arc::new(f));
        self
    }

    /// Hook for device log lines.
    #[must_use]
    pub fn on_log(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.log = Some(Arc::new(f));
        self
    }

    /// Hook for health reports.
    #[must_use]
    pub fn on_health(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.health = Some(Arc::new(f));
        self
    }

    /// Hook for firmware update progress. The value is passed through as
    /// the device sent it, normally a percentage number.
    #[must_use]
    pub fn on_ota_progress(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.ota_progress = Some(Arc::new(f));
        self
    }

    /// Hook invoked on every connectivity transition.
    #[must_use]
    pub fn on_connectivity(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.connectivity = Some(Arc::new(f));
        self
    }

    /// Hook for non-fatal notices such as rejected commands or
    /// unauthorized writes.
    #[must_use]
    pub fn on_notice(mut self, f: impl Fn(&LinkError) + Send + Sync + 'static) -> Self {
        self.notice = Some(Arc::new(f));
        self
    }

    /// Returns `true` if a state hook is registered.
    #[must_use]
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Returns `true` if a log hook is registered.
    #[must_use]
    pub fn has_log(&self) -> bool {
        self.log.is_some()
    }

    pub(crate) fn state(&self, data: Value) {
        if let Some(f) = &self.state {
            f(data);
        }
    }

    pub(crate) fn log(&self, line: String) {
        if let Some(f) = &self.log {
            f(line);
        }
    }

    pub(crate) fn health(&self, data: Value) {
        if let Some(f) = &self.health {
            f(data);
        }
    }

    pub(crate) fn ota_progress(&self, progress: Value) {
        if let Some(f) = &self.ota_progress {
            f(progress);
        }
    }

    pub(crate) fn connectivity(&self, up: bool) {
        if let Some(f) = &self.connectivity {
            f(up);
        }
    }

    /// Forwards `err` to the notice hook if it is an operator-facing
    /// variant.
    pub(crate) fn notice(&self, err: &LinkError) {
        if !err.is_notice() {
            return;
        }
        tracing::debug!(code = err.code(), error = %err, "notice");
        if let Some(f) = &self.notice {
            f(err);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("state", &self.state.is_some())
            .field("log", &self.log.is_some())
            .field("health", &self.health.is_some())
            .field("ota_progress", &self.ota_progress.is_some())
            .field("connectivity", &self.connectivity.is_some())
            .field("notice", &self.notice.is_some())
            .finish()
    }
}
