//! Routes inbound frames to registered hooks.

use crate::observers::Observers;

use super::messages::InboundMessage;

/// Decodes inbound frames and hands each to at most one hook.
///
/// Malformed frames and unknown types are dropped with a debug log and
/// never surface to the application. Frames are dispatched in the order
/// they are passed in and nothing is buffered.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    observers: Observers,
}

impl Dispatcher {
    /// Creates a dispatcher over a fixed set of hooks.
    #[must_use]
    pub fn new(observers: Observers) -> Self {
        Self { observers }
    }

    /// Handles one raw text frame.
    pub fn on_frame(&self, raw: &str) {
        match InboundMessage::decode(raw) {
            Ok(msg) => self.dispatch(msg),
            Err(e) => tracing::debug!(error = %e, "dropping malformed frame"),
        }
    }

    /// Routes an already decoded message.
    pub fn dispatch(&self, msg: InboundMessage) {
        tracing::trace!(kind = msg.kind(), "inbound frame");
        match msg {
            InboundMessage::State { data } => self.observers.state(data),
            InboundMessage::Log { line } => self.observers.log(line),
            InboundMessage::Health { data } => self.observers.health(data),
            InboundMessage::UpdateProgress { progress } => self.observers.ota_progress(progress),
            InboundMessage::Unrecognized => tracing::debug!("dropping frame of unknown type"),
        }
    }
}
