//! State bootstrap and polling while the live channel is down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::DeviceApi;
use crate::observers::Observers;
use crate::ws::ConnectionManager;

/// Fetches `/api/state` once at startup and then on an interval whenever
/// the live channel is not connected. Results go to the `state` hook.
#[derive(Debug, Clone)]
pub struct StatePoller {
    api: DeviceApi,
    connection: Arc<ConnectionManager>,
    observers: Observers,
    interval: Duration,
}

impl StatePoller {
    /// Creates a poller. A zero `interval` keeps only the startup fetch.
    #[must_use]
    pub fn new(
        api: DeviceApi,
        connection: Arc<ConnectionManager>,
        observers: Observers,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            connection,
            observers,
            interval,
        }
    }

    /// Fetches state once and hands it to the `state` hook.
    ///
    /// Returns `true` if a snapshot was delivered. Failures are logged at
    /// debug level only.
    pub async fn poll_once(&self) -> bool {
        match self.api.fetch_state().await {
            Ok(state) => {
                self.observers.state(state);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "state poll failed");
                false
            }
        }
    }

    /// Spawns the bootstrap fetch followed by the polling loop.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        self.poll_once().await;
        if self.interval.is_zero() {
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and the bootstrap already ran.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !self.connection.is_connected() {
                self.poll_once().await;
            }
        }
    }
}
