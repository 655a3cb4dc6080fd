use async_trait::async_trait;
use linkmesh_types::{Envelope, Seq};
use tokio::sync::mpsc;

use crate::error::TransportResult;

/// The transport-agnostic adapter a [`linkmesh_link::Link`] sits on top of
/// (spec.md §4.3).
///
/// A `Connector` guarantees ordered delivery within one direction and
/// assigns outbound sequence numbers monotonically, starting at 1,
/// independently per endpoint. It knows nothing about message kinds,
/// schemas or routing — only about framing a `(type, data)` pair into an
/// [`Envelope`] and handing inbound envelopes back out through a channel.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Frame `data` under `type_` and transmit it, returning the sequence
    /// number assigned to this outbound envelope.
    async fn send(&self, type_: &str, data: serde_json::Value) -> TransportResult<Seq>;

    /// True while the underlying transport is open.
    fn is_connected(&self) -> bool;

    /// Take ownership of the inbound envelope stream. Callable exactly
    /// once per connector (the owning [`linkmesh_link::Link`] calls this at
    /// construction to spawn its dispatch loop); later calls return `None`.
    fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<Envelope>>;
}
