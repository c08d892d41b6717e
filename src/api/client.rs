//! HTTP client for the device REST API.
//!
//! Writes attach the API token and report failures through the notice
//! hook before returning them. Reads only return errors; a failed state
//! poll is not something the operator needs to hear about.

use reqwest::multipart;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::dto::{
    Ack, FACTORY_RESET_KEY, FIRMWARE_PATH, HEALTH_PATH, PREF_PATH, Preferences, REBOOT_PATH,
    STATE_PATH, WriteRequest,
};
use crate::auth::{TOKEN_HEADER, TokenStore};
use crate::config::LinkConfig;
use crate::domain::Command;
use crate::error::LinkError;
use crate::observers::Observers;

/// Device REST client shared by the command sender, the state poller and
/// administrative callers.
#[derive(Debug, Clone)]
pub struct DeviceApi {
    http: Client,
    base_url: Url,
    token: TokenStore,
    observers: Observers,
}

impl DeviceApi {
    /// Builds a client for the device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: &LinkConfig,
        token: TokenStore,
        observers: Observers,
    ) -> Result<Self, LinkError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| LinkError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token,
            observers,
        })
    }

    /// Token store consulted on every write.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.token
    }

    /// Sends `cmd` through `POST /api/cmd`.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub async fn post_command(&self, cmd: &Command) -> Result<(), LinkError> {
        self.write(&WriteRequest::command(cmd.as_str()))
            .await
            .map(drop)
    }

    /// Performs a state-changing `POST`.
    ///
    /// The token is attached as `X-AP-Token` when one is stored. Failures
    /// are passed to the notice hook and then returned. Nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`LinkError::TransportUnavailable`] if the device cannot be reached.
    /// - [`LinkError::Unauthorized`] on `401`.
    /// - [`LinkError::Rejected`] on any other non-2xx status.
    pub async fn write(&self, req: &WriteRequest) -> Result<Response, LinkError> {
        let result = self.try_write(req).await;
        if let Err(e) = &result {
            tracing::warn!(path = req.path(), error = %e, "device write failed");
            self.observers.notice(e);
        }
        result
    }

    async fn try_write(&self, req: &WriteRequest) -> Result<Response, LinkError> {
        let mut builder = self.http.post(self.url(req.path())?);
        if !req.fields().is_empty() {
            builder = builder.form(req.fields());
        }
        self.send_authorized(builder).await
    }

    async fn send_authorized(&self, builder: RequestBuilder) -> Result<Response, LinkError> {
        let builder = match self.token.get() {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        };
        let response = builder.send().await?;
        LinkError::check_write_status(response.status())?;
        Ok(response)
    }

    /// Stores one preference, optionally rebooting the device afterwards.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub async fn set_preference(&self, key: &str, val: &str, reboot: bool) -> Result<(), LinkError> {
        self.write(&WriteRequest::preference(key, val, reboot))
            .await
            .map(drop)
    }

    /// Erases every stored preference on the device.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub async fn factory_reset(&self) -> Result<(), LinkError> {
        self.set_preference(FACTORY_RESET_KEY, "", false).await
    }

    /// Restarts the controller. The live channel drops shortly after and
    /// reconnects on its own.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub async fn reboot(&self) -> Result<Ack, LinkError> {
        let response = self.write(&WriteRequest::new(REBOOT_PATH)).await?;
        Ok(response.json::<Ack>().await.unwrap_or_default())
    }

    /// Uploads a firmware image. The device flashes it and restarts.
    ///
    /// Progress arrives on the live channel as `ota` frames.
    ///
    /// # Errors
    ///
    /// Same classes as [`Self::write`]; the device answers `500` when
    /// flashing fails.
    pub async fn upload_firmware(
        &self,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<String, LinkError> {
        let result = self.try_upload(file_name, image).await;
        if let Err(e) = &result {
            tracing::warn!(file_name, error = %e, "firmware upload failed");
            self.observers.notice(e);
        }
        result
    }

    async fn try_upload(&self, file_name: &str, image: Vec<u8>) -> Result<String, LinkError> {
        let part = multipart::Part::bytes(image).file_name(file_name.to_string());
        let form = multipart::Form::new().part("firmware", part);
        let builder = self.http.post(self.url(FIRMWARE_PATH)?).multipart(form);
        let response = self.send_authorized(builder).await?;
        Ok(response.text().await.unwrap_or_default())
    }

    /// Fetches the full device state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::TransportUnavailable`] if the device cannot be
    /// reached or answers with something other than JSON, and
    /// [`LinkError::Rejected`] on a non-2xx status.
    pub async fn fetch_state(&self) -> Result<Value, LinkError> {
        self.get_json(STATE_PATH, &[]).await
    }

    /// Fetches the health report.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_state`].
    pub async fn fetch_health(&self) -> Result<Value, LinkError> {
        self.get_json(HEALTH_PATH, &[]).await
    }

    /// Reads the named preferences. Keys the device does not know come
    /// back as empty strings.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_state`].
    pub async fn fetch_preferences(&self, keys: &[&str]) -> Result<Preferences, LinkError> {
        let joined = keys.join(",");
        self.get_json(PREF_PATH, &[("keys", joined.as_str())]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LinkError> {
        let mut builder = self.http.get(self.url(path)?);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    fn url(&self, path: &str) -> Result<Url, LinkError> {
        self.base_url
            .join(path)
            .map_err(|e| LinkError::InvalidConfig(format!("bad path {path}: {e}")))
    }
}
