//! Domain layer: command validation, connection state, backoff.
//!
//! Everything here is pure. The async drivers in [`crate::ws`] and
//! [`crate::service`] feed these types events and act on the results.

pub mod backoff;
pub mod command;
pub mod connection_state;
pub mod describe;

pub use backoff::{Backoff, BackoffPolicy, MIN_DELAY};
pub use command::{Command, MAX_COMMAND_LEN, validate};
pub use connection_state::{ConnectionFsm, ConnectionState, ReconnectPlan};
