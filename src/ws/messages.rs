//! Inbound live channel frames.
//!
//! The device pushes JSON records shaped `{type, data|line|progress}`.
//! Outbound frames are bare command strings and need no type here.
//!
//! Payload fields are optional on the wire. A recognised `type` always
//! decodes, with a missing payload becoming `null` (or an empty line).

use serde::Deserialize;
use serde_json::Value;

use crate::error::LinkError;

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Full device state snapshot.
    State {
        /// State payload, passed through untouched.
        #[serde(default)]
        data: Value,
    },
    /// One captured serial log line.
    Log {
        /// Log text.
        #[serde(default)]
        line: String,
    },
    /// Health report (I2C probes, heap, uptime).
    Health {
        /// Health payload, passed through untouched.
        #[serde(default)]
        data: Value,
    },
    /// Firmware update progress.
    #[serde(rename = "ota")]
    UpdateProgress {
        /// Progress value as reported by the device, usually a number.
        #[serde(default)]
        progress: Value,
    },
    /// Any other `type`. Dropped by the dispatcher.
    #[serde(other)]
    Unrecognized,
}

impl InboundMessage {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ParseIgnored`] if `raw` is not a JSON object
    /// with a string `type`.
    pub fn decode(raw: &str) -> Result<Self, LinkError> {
        serde_json::from_str(raw).map_err(|e| LinkError::ParseIgnored(e.to_string()))
    }

    /// Wire name of the variant, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::State { .. } => "state",
            Self::Log { .. } => "log",
            Self::Health { .. } => "health",
            Self::UpdateProgress { .. } => "ota",
            Self::Unrecognized => "unrecognized",
        }
    }
}
