//! # astropixels-link
//!
//! Realtime operator link for AstroPixels dome controllers.
//!
//! The crate keeps a WebSocket open to the controller, reconnecting with
//! backoff whenever the device reboots or WiFi drops, routes inbound
//! telemetry (state, log lines, health, firmware progress) to registered
//! hooks, and delivers operator commands over the socket when it is open
//! or through the REST fallback when it is not.
//!
//! ## Architecture
//!
//! ```text
//! Operator input
//!     │
//!     ├── Command (domain/)          validation gate
//!     ├── CommandSender (service/)   transport selection
//!     │       ├── ConnectionManager (ws/)   live channel, backoff
//!     │       └── DeviceApi (api/)          POST /api/cmd + X-AP-Token
//!     │
//! Device ── /ws ── Dispatcher (ws/) ── Observers hooks
//!        ── /api/state ── StatePoller (service/)
//! ```
//!
//! Everything is owned by one [`Session`].

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod observers;
pub mod service;
pub mod session;
pub mod ws;

pub use config::LinkConfig;
pub use error::LinkError;
pub use observers::Observers;
pub use session::Session;
