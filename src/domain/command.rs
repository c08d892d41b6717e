//! Validated operator command.
//!
//! The device's Marcduino parser does no input sanitization of its own, so
//! [`Command`] is the only gate between operator input and the wire. A
//! `Command` can only be built through [`Command::parse`], which makes
//! "every command on the network has passed validation" a type-level fact.

use std::fmt;

use crate::error::LinkError;

/// Longest command the device's receive buffer accepts.
pub const MAX_COMMAND_LEN: usize = 63;

/// Returns `true` if `raw` is an acceptable manual command: 1 to 63
/// characters, every one printable ASCII (`0x20..=0x7E`).
#[must_use]
pub fn validate(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_COMMAND_LEN
        && raw.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// An immutable command string that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ValidationRejected`] if `raw` is empty, longer
    /// than [`MAX_COMMAND_LEN`], or contains a non-printable or non-ASCII
    /// character.
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        if validate(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(LinkError::ValidationRejected(rejection_reason(raw)))
        }
    }

    /// Returns the command text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn rejection_reason(raw: &str) -> String {
    if raw.is_empty() {
        "empty command".to_string()
    } else if raw.len() > MAX_COMMAND_LEN {
        format!("{} bytes exceeds {MAX_COMMAND_LEN}", raw.len())
    } else {
        "non-printable character".to_string()
    }
}
