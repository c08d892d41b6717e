//! Request and response shapes of the device REST API.

use std::collections::HashMap;

use serde::Deserialize;

/// `POST` endpoint taking one Marcduino command as form field `cmd`.
pub const COMMAND_PATH: &str = "/api/cmd";
/// `GET` endpoint returning the device state snapshot.
pub const STATE_PATH: &str = "/api/state";
/// `GET` endpoint returning the health report.
pub const HEALTH_PATH: &str = "/api/health";
/// `GET`/`POST` endpoint for stored preferences.
pub const PREF_PATH: &str = "/api/pref";
/// `POST` endpoint that restarts the controller.
pub const REBOOT_PATH: &str = "/api/reboot";
/// `POST` multipart endpoint receiving a firmware image.
pub const FIRMWARE_PATH: &str = "/upload/firmware";

/// Preference key the device treats as "erase all preferences".
pub const FACTORY_RESET_KEY: &str = "_clear";

/// A state-changing request against the device.
///
/// Sent through [`super::DeviceApi::write`], which attaches the API token
/// and reports failures as notices.
///
/// ```
/// use astropixels_link::api::WriteRequest;
///
/// let req = WriteRequest::new("/api/pref").field("key", "msound").field("val", "1");
/// assert_eq!(req.path(), "/api/pref");
/// assert_eq!(req.fields().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    path: String,
    fields: Vec<(String, String)>,
}

impl WriteRequest {
    /// A write to `path` with an empty body.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fields: Vec::new(),
        }
    }

    /// Appends one form field. Fields are sent in insertion order.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Form fields.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// `POST /api/cmd` with `cmd=<command>`.
    #[must_use]
    pub fn command(cmd: &str) -> Self {
        Self::new(COMMAND_PATH).field("cmd", cmd)
    }

    /// `POST /api/pref` storing `val` under `key`, optionally rebooting
    /// once the device has answered.
    #[must_use]
    pub fn preference(key: &str, val: &str, reboot: bool) -> Self {
        let req = Self::new(PREF_PATH).field("key", key).field("val", val);
        if reboot { req.field("reboot", "1") } else { req }
    }
}

/// Generic `{"ok": true, "msg": ...}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
    /// Whether the device accepted the request.
    #[serde(default)]
    pub ok: bool,
    /// Optional message (e.g. `"rebooting"`).
    #[serde(default)]
    pub msg: Option<String>,
}

/// Preference values keyed by name. Unknown keys come back as `""`.
pub type Preferences = HashMap<String, String>;
