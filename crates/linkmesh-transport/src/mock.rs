//! An in-memory [`Connector`] pair, wired together with `tokio::mpsc`
//! channels. Used by every integration test and by `demos/simulate`, the
//! way the teacher's test suites lean on an in-process transport rather
//! than a real socket.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use linkmesh_types::{Envelope, Seq};
use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};
use crate::trait_def::Connector;

/// One end of an in-memory duplex link. Sending writes to the peer's
/// inbound channel; `take_receiver` hands out this end's own inbound
/// channel.
#[derive(Debug)]
pub struct MockConnector {
    outbound: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    next_seq: AtomicU64,
    connected: AtomicBool,
}

impl MockConnector {
    /// Sever the connection: further sends on this end fail, and dropping
    /// `outbound` closes the peer's inbound channel, so the peer's
    /// `Link` dispatch loop observes `recv() == None` and runs
    /// `fail_pending_on_disconnect` (spec.md §3 "Lifecycles" / §8 testable
    /// property 6) rather than just sitting on a connector that still
    /// looks open from the peer's side.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.outbound.lock().expect("mock connector mutex poisoned").take();
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn send(&self, type_: &str, data: serde_json::Value) -> TransportResult<Seq> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = Envelope::new(type_, Some(seq), data);
        let outbound = self.outbound.lock().expect("mock connector mutex poisoned");
        match outbound.as_ref() {
            Some(sender) => sender
                .send(envelope)
                .map_err(|e| TransportError::SendFailed(e.to_string()))
                .map(|()| seq),
            None => Err(TransportError::Disconnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        self.inbound.lock().expect("mock connector mutex poisoned").take()
    }
}

/// Build two connected [`MockConnector`]s: whatever `a` sends, `b` receives
/// and vice versa.
pub fn mock_pair() -> (MockConnector, MockConnector) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    let a = MockConnector {
        outbound: Mutex::new(Some(a_tx)),
        inbound: Mutex::new(Some(a_rx)),
        next_seq: AtomicU64::new(0),
        connected: AtomicBool::new(true),
    };
    let b = MockConnector {
        outbound: Mutex::new(Some(b_tx)),
        inbound: Mutex::new(Some(b_rx)),
        next_seq: AtomicU64::new(0),
        connected: AtomicBool::new(true),
    };
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn assigns_monotonic_seq_per_endpoint() {
        let (a, _b) = mock_pair();
        assert_eq!(a.send("ping_request", json!({})).await.unwrap(), 1);
        assert_eq!(a.send("ping_request", json!({})).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pairs_deliver_to_each_other() {
        let (a, b) = mock_pair();
        let mut b_rx = b.take_receiver().unwrap();
        a.send("ping_request", json!({"x": 1})).await.unwrap();
        let received = b_rx.recv().await.unwrap();
        assert_eq!(received.type_, "ping_request");
        assert_eq!(received.data, json!({"x": 1}));
    }

    #[tokio::test]
    async fn disconnect_fails_further_sends() {
        let (a, _b) = mock_pair();
        a.disconnect();
        assert!(!a.is_connected());
        assert!(a.send("ping_request", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn disconnect_closes_the_peers_inbound_channel() {
        let (a, b) = mock_pair();
        let mut b_rx = b.take_receiver().unwrap();
        a.disconnect();
        assert_eq!(b_rx.recv().await, None);
    }

    #[tokio::test]
    async fn take_receiver_is_one_shot() {
        let (a, _b) = mock_pair();
        assert!(a.take_receiver().is_some());
        assert!(a.take_receiver().is_none());
    }
}
