//! Service layer: command routing and state polling.

pub mod command_sender;
pub mod state_poller;

pub use command_sender::{CommandSender, SendOutcome};
pub use state_poller::StatePoller;
