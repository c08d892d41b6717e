//! Transport selection for operator commands.
//!
//! A command goes over the live channel when it is open and through the
//! `POST /api/cmd` fallback otherwise. Callers never see an error: every
//! failure is reported through the notice hook and summarised in the
//! returned [`SendOutcome`].

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::DeviceApi;
use crate::domain::Command;
use crate::observers::Observers;
use crate::ws::ConnectionManager;

/// How a send attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued on the open live channel.
    LiveChannel,
    /// Accepted by the device through the fallback request.
    Fallback,
    /// The channel looked open but closed before the write. Dropped
    /// silently, with no fallback and no retry.
    Dropped,
    /// Failed validation; nothing left the client.
    Invalid,
    /// The fallback request failed (unreachable, unauthorized, rejected).
    Failed,
}

/// Validates commands and routes them to the device.
#[derive(Debug, Clone)]
pub struct CommandSender {
    connection: Arc<ConnectionManager>,
    api: DeviceApi,
    observers: Observers,
}

impl CommandSender {
    /// Creates a sender over the given channel owner and REST client.
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager>, api: DeviceApi, observers: Observers) -> Self {
        Self {
            connection,
            api,
            observers,
        }
    }

    /// Validates `raw` and delivers it over the best available transport.
    pub async fn send(&self, raw: &str) -> SendOutcome {
        let cmd = match Command::parse(raw) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(error = %e, "command rejected before send");
                self.observers.notice(&e);
                return SendOutcome::Invalid;
            }
        };

        if self.connection.is_connected() {
            return if self.connection.send_raw(cmd.as_str()) {
                tracing::debug!(%cmd, "command sent on live channel");
                SendOutcome::LiveChannel
            } else {
                tracing::debug!(%cmd, "live channel closed under the write, command dropped");
                SendOutcome::Dropped
            };
        }

        match self.api.post_command(&cmd).await {
            Ok(()) => {
                tracing::debug!(%cmd, "command sent via fallback");
                SendOutcome::Fallback
            }
            // Already reported as a notice by the API client.
            Err(_) => SendOutcome::Failed,
        }
    }

    /// Fire-and-forget variant of [`Self::send`].
    #[must_use]
    pub fn send_detached(&self, raw: impl Into<String>) -> JoinHandle<SendOutcome> {
        let sender = self.clone();
        let raw = raw.into();
        tokio::spawn(async move { sender.send(&raw).await })
    }
}
