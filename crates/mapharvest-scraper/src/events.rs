//! Push-based progress events from the engine to its host.
//!
//! Emission is synchronous and fire-and-forget: the engine never waits on a
//! consumer and never fails because one went away. Hosts that want a live
//! feed (dashboard, CLI progress) consume a [`ChannelSink`]; embedders that
//! only care about the final record sequence use [`NullSink`].

use mapharvest_core::{BusinessRecord, SessionMetrics};
use serde::Serialize;
use tokio::sync::mpsc;

/// One progress event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Counter snapshot; sent after every locator query and after every
    /// listing cycle.
    UpdateMetrics(SessionMetrics),

    /// Full accumulated record sequence; sent whenever a new unique record
    /// is accepted.
    UpdateData { records: Vec<BusinessRecord> },

    /// Human-readable fatal failure; sent exactly once, when the session
    /// transitions to its error state.
    Error { message: String },
}

/// Observer interface the engine emits through.
pub trait EventSink {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Forwards events over an unbounded channel.
///
/// Sending never blocks; events emitted after the receiver is dropped are
/// discarded, preserving fire-and-forget semantics.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
