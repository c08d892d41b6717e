//! Live channel owner: connect, read/write loop, reconnect with backoff.
//!
//! [`ConnectionManager`] is the only holder of the WebSocket. Everything
//! else sees two narrow capabilities: "can I send right now" and "send
//! this raw payload". The driver task spawned by
//! [`ConnectionManager::spawn`] runs until aborted, reconnecting forever.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::dispatcher::Dispatcher;
use crate::domain::{BackoffPolicy, ConnectionFsm, ConnectionState};
use crate::observers::Observers;

type DeviceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owner of the live channel and its lifecycle.
#[derive(Debug)]
pub struct ConnectionManager {
    url: Url,
    policy: BackoffPolicy,
    state_tx: watch::Sender<ConnectionState>,
    /// Present only while a channel is open. Dropping it discards
    /// anything still queued.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    wake: Notify,
}

impl ConnectionManager {
    /// Creates a manager for the live channel at `url`. Nothing connects
    /// until [`Self::spawn`] is called.
    #[must_use]
    pub fn new(url: Url, policy: BackoffPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url,
            policy,
            state_tx,
            outbound: Mutex::new(None),
            wake: Notify::new(),
        }
    }

    /// Live channel URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current connectivity state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Returns `true` while the channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns `true` if a write would currently be handed to an open
    /// channel.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.is_connected() && self.sender_slot().is_some()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Queues `payload` as one text frame on the open channel.
    ///
    /// Returns `false` if no channel is open. The payload is then
    /// dropped: there is no buffering across reconnects and no retry.
    pub fn send_raw(&self, payload: &str) -> bool {
        match self.sender_slot().as_ref() {
            Some(tx) => tx.send(payload.to_string()).is_ok(),
            None => false,
        }
    }

    /// Skips the remaining backoff wait and reconnects immediately.
    ///
    /// Has no effect unless a reconnect is currently pending. Only one
    /// attempt is ever in flight.
    pub fn reconnect_now(&self) {
        self.wake.notify_waiters();
    }

    /// Spawns the driver task. Hooks for inbound frames and connectivity
    /// come from `observers`.
    #[must_use]
    pub fn spawn(self: &Arc<Self>, observers: Observers) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(observers))
    }

    /// Marks the channel as gone after the driver task was aborted.
    pub(crate) fn mark_stopped(&self) {
        self.install_sender(None);
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    #[cfg(test)]
    pub(crate) fn force_state(&self, state: ConnectionState) {
        self.publish(state);
    }

    fn sender_slot(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install_sender(&self, tx: Option<mpsc::UnboundedSender<String>>) {
        *self.sender_slot() = tx;
    }

    fn publish(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    async fn run(self: Arc<Self>, observers: Observers) {
        let dispatcher = Dispatcher::new(observers.clone());
        let mut fsm = ConnectionFsm::new(self.policy);

        loop {
            if fsm.begin_attempt() {
                self.publish(fsm.state());
            }
            tracing::info!(url = %self.url, "connecting to device");

            match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((socket, _response)) => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.install_sender(Some(tx));
                    if fsm.on_open() {
                        self.publish(fsm.state());
                        tracing::info!(url = %self.url, "live channel open");
                        observers.connectivity(true);
                    }
                    self.pump(socket, rx, &dispatcher).await;
                    self.install_sender(None);
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "connect failed");
                }
            }

            // Register for manual wake-ups before anyone can observe the
            // Disconnected state, so a trigger is never missed.
            let wake = self.wake.notified();
            tokio::pin!(wake);
            wake.as_mut().enable();

            let Some(plan) = fsm.on_close() else {
                continue;
            };
            self.publish(fsm.state());
            if plan.notify {
                observers.connectivity(false);
            }
            tracing::info!(
                delay_ms = u64::try_from(plan.delay.as_millis()).unwrap_or(u64::MAX),
                "live channel down, reconnect scheduled"
            );

            tokio::select! {
                () = tokio::time::sleep(plan.delay) => {}
                () = &mut wake => {
                    tracing::debug!("manual reconnect supersedes backoff timer");
                }
            }
        }
    }

    /// Read/write loop for one open channel. Returns when the channel
    /// closes or errors.
    async fn pump(
        &self,
        socket: DeviceSocket,
        mut outbound: mpsc::UnboundedReceiver<String>,
        dispatcher: &Dispatcher,
    ) {
        let (mut ws_tx, mut ws_rx) = socket.split();

        loop {
            tokio::select! {
                // Frame from the device
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => dispatcher.on_frame(&text),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "live channel read failed");
                            break;
                        }
                        _ => {}
                    }
                }
                // Command from the sender
                Some(payload) = outbound.recv() => {
                    if let Err(e) = ws_tx.send(Message::text(payload)).await {
                        tracing::debug!(error = %e, "live channel write dropped");
                        break;
                    }
                }
            }
        }

        tracing::debug!(url = %self.url, "live channel closed");
    }
}
