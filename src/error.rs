//! Link error taxonomy with stable numeric codes.
//!
//! [`LinkError`] is the single error type of the crate. None of its
//! variants is fatal: the worst outcome is a command that never reaches
//! the device, which is made observable through the notice hook rather
//! than by failing the caller.

use reqwest::StatusCode;

/// Client-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category     | Surfaced as                      |
/// |-----------|--------------|----------------------------------|
/// | 1000–1999 | Validation   | notice                           |
/// | 2000–2999 | Transport    | notice / connectivity boolean    |
/// | 3000–3999 | Device reply | notice                           |
/// | 4000–4999 | Local        | returned to the caller / logged  |
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Manual command failed validation and was never sent.
    #[error("command rejected: {0}")]
    ValidationRejected(String),

    /// Fallback HTTP request could not reach the device.
    #[error("device unreachable: {0}")]
    TransportUnavailable(String),

    /// Device refused a write for a missing or invalid token.
    #[error("unauthorized: device rejected the API token")]
    Unauthorized,

    /// Device answered a write with a non-success status other than 401.
    #[error("device rejected request with status {status}")]
    Rejected {
        /// HTTP status returned by the device.
        status: u16,
    },

    /// Inbound frame was malformed or carried an unknown type.
    #[error("inbound frame ignored: {0}")]
    ParseIgnored(String),

    /// Live channel closed. Always recoverable.
    #[error("live channel lost")]
    ConnectivityLost,

    /// Configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Durable token storage failed.
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl LinkError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::ValidationRejected(_) => 1001,
            Self::ParseIgnored(_) => 1002,
            Self::TransportUnavailable(_) => 2001,
            Self::ConnectivityLost => 2002,
            Self::Unauthorized => 3001,
            Self::Rejected { .. } => 3002,
            Self::InvalidConfig(_) => 4001,
            Self::Storage(_) => 4002,
        }
    }

    /// Returns `true` for variants the operator should be told about.
    ///
    /// Parse failures and connectivity loss are expected noise and only
    /// show up in logs or as the connectivity boolean.
    #[must_use]
    pub const fn is_notice(&self) -> bool {
        matches!(
            self,
            Self::ValidationRejected(_)
                | Self::TransportUnavailable(_)
                | Self::Unauthorized
                | Self::Rejected { .. }
        )
    }

    /// Classifies the status of a write response.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Unauthorized`] for `401` and
    /// [`LinkError::Rejected`] for any other non-2xx status.
    pub fn check_write_status(status: StatusCode) -> Result<(), Self> {
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Self::Unauthorized)
        } else {
            Err(Self::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

impl From<reqwest::Error> for LinkError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportUnavailable(err.to_string())
    }
}
