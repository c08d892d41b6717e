//! Live channel: connection lifecycle, inbound frames, dispatch.
//!
//! The device serves one WebSocket at `/ws`. Outbound frames are raw
//! command strings; inbound frames are JSON telemetry records.

pub mod connection;
pub mod dispatcher;
pub mod messages;

pub use connection::ConnectionManager;
pub use dispatcher::Dispatcher;
pub use messages::InboundMessage;
