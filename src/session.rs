//! One operator session: owns every piece of link state.
//!
//! Nothing in the crate is global. The embedding application builds a
//! [`Session`] once and passes it (or its parts) to whoever needs it.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::DeviceApi;
use crate::auth::TokenStore;
use crate::config::LinkConfig;
use crate::domain::ConnectionState;
use crate::error::LinkError;
use crate::observers::Observers;
use crate::service::{CommandSender, SendOutcome, StatePoller};
use crate::ws::ConnectionManager;

/// Running link to one device.
///
/// Dropping the session stops its background tasks.
#[derive(Debug)]
pub struct Session {
    connection: Arc<ConnectionManager>,
    api: DeviceApi,
    sender: CommandSender,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Starts the live channel driver and the state poller.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidConfig`] if the live channel URL cannot
    /// be derived or the HTTP client cannot be built.
    pub fn start(
        config: &LinkConfig,
        observers: Observers,
        token: TokenStore,
    ) -> Result<Self, LinkError> {
        let connection = Arc::new(ConnectionManager::new(config.ws_url()?, config.backoff));
        let api = DeviceApi::new(config, token, observers.clone())?;
        let sender = CommandSender::new(Arc::clone(&connection), api.clone(), observers.clone());
        let poller = StatePoller::new(
            api.clone(),
            Arc::clone(&connection),
            observers.clone(),
            config.state_poll_interval,
        );

        tracing::info!(
            base_url = %config.base_url,
            ws_url = %connection.url(),
            "starting device session"
        );
        let tasks = vec![connection.spawn(observers), poller.spawn()];

        Ok(Self {
            connection,
            api,
            sender,
            tasks,
        })
    }

    /// Validates and sends one operator command.
    pub async fn send_command(&self, raw: &str) -> SendOutcome {
        self.sender.send(raw).await
    }

    /// Command sender, for callers that want to hold it separately.
    #[must_use]
    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    /// REST client for administrative writes and reads.
    #[must_use]
    pub fn api(&self) -> &DeviceApi {
        &self.api
    }

    /// API token store.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        self.api.token_store()
    }

    /// Owner of the live channel.
    #[must_use]
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Current connectivity as a boolean.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Receiver observing connectivity transitions.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Cuts a pending backoff wait short.
    pub fn reconnect_now(&self) {
        self.connection.reconnect_now();
    }

    /// Stops the background tasks and waits for them to finish.
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        self.connection.mark_stopped();
        tracing::info!("device session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
