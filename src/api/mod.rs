//! Device REST API: fallback command path, authenticated writes, reads.
//!
//! All paths are relative to the configured device base URL.

pub mod client;
pub mod dto;

pub use client::DeviceApi;
pub use dto::{Ack, Preferences, WriteRequest};
