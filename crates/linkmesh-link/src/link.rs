//! The mutable per-connection dispatch object (spec.md §4.4 "Link").
//!
//! A `Link` owns exactly one [`Connector`] and the three tables attach
//! populates against it: inbound validators, request/event handlers, and
//! pending-response awaiters. Its own `(pair, local_role)` is fixed for its
//! lifetime and determines, together with a [`MessageDescriptor`]'s
//! declared links, whether a given message may be sent or must be handled
//! here (see [`crate::attach`]).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use linkmesh_schema::CompiledSchema;
use linkmesh_types::{Envelope, EnvelopeKind, LinkSpec, Role, Seq};
use linkmesh_transport::Connector;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::context::{CallContext, CallerIdentity};
use crate::error::{Error, Result};
use crate::handler::{EventHandler, RequestHandler};
use crate::route::RouteTable;

/// Default correlated-request timeout, used whenever a caller does not ask
/// for a different one (spec.md's Open Question #1 — see `DESIGN.md`).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub(crate) enum HandlerEntry {
    Request(Arc<dyn RequestHandler>),
    Event(Arc<dyn EventHandler>),
}

/// One live connection between two adjacent roles.
///
/// `pair` is the edge's canonical declared direction (e.g. always
/// `(Controller, Host)`, never `(Host, Controller)`, for a controller-host
/// connection) and is identical on both ends; `local_role` says which of
/// `pair.source`/`pair.target` *this* process is. Together they let
/// [`crate::attach`] decide, per catalog entry, whether this end may
/// originate the message or must handle it — including messages declared
/// in the reverse direction, which ride the same connection the other way.
pub struct Link {
    pub pair: LinkSpec,
    pub local_role: Role,
    connector: Arc<dyn Connector>,
    routes: Arc<dyn RouteTable>,
    pub(crate) handlers: DashMap<String, HandlerEntry>,
    pub(crate) validators: DashMap<String, Arc<CompiledSchema>>,
    pending: DashMap<(String, Seq), oneshot::Sender<Envelope>>,
    identity: RwLock<Option<CallerIdentity>>,
    default_timeout: Duration,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("pair", &self.pair)
            .field("local_role", &self.local_role)
            .finish_non_exhaustive()
    }
}

impl Link {
    /// Build a `Link` over an already-connected [`Connector`] and spawn its
    /// dispatch loop. `connector.take_receiver()` is consumed exactly once
    /// here.
    pub fn new(pair: LinkSpec, local_role: Role, connector: Arc<dyn Connector>, routes: Arc<dyn RouteTable>) -> Arc<Link> {
        let receiver = connector
            .take_receiver()
            .expect("connector's inbound receiver was already taken");

        let link = Arc::new(Link {
            pair,
            local_role,
            connector,
            routes,
            handlers: DashMap::new(),
            validators: DashMap::new(),
            pending: DashMap::new(),
            identity: RwLock::new(None),
            default_timeout: DEFAULT_TIMEOUT,
        });

        let dispatch_link = link.clone();
        tokio::spawn(async move { dispatch_loop(dispatch_link, receiver).await });

        link
    }

    pub fn is_connected(&self) -> bool {
        self.connector.is_connected()
    }

    pub fn identity(&self) -> Option<CallerIdentity> {
        self.identity.read().clone()
    }

    pub fn set_identity(&self, identity: CallerIdentity) {
        *self.identity.write() = Some(identity);
    }

    pub(crate) fn set_handler(&self, wire_type: String, validator: Arc<CompiledSchema>, entry: HandlerEntry) {
        if self.handlers.contains_key(&wire_type) {
            panic!("{}: duplicate handler registration for {wire_type}", self.pair);
        }
        self.validators.insert(wire_type.clone(), validator);
        self.handlers.insert(wire_type, entry);
    }

    pub(crate) fn set_validator(&self, wire_type: String, validator: Arc<CompiledSchema>) {
        self.validators.insert(wire_type, validator);
    }

    /// Send a correlated request and await its response, using this link's
    /// default timeout.
    pub async fn send_request(&self, base_name: &str, data: Value) -> Result<Value> {
        self.send_request_timeout(base_name, data, self.default_timeout).await
    }

    /// Send a correlated request and await its response within `timeout`.
    pub async fn send_request_timeout(&self, base_name: &str, data: Value, timeout: Duration) -> Result<Value> {
        let seq = self.connector.send(&format!("{base_name}_request"), data).await?;
        let response_type = format!("{base_name}_response");
        let (tx, rx) = oneshot::channel();
        self.pending.insert((response_type.clone(), seq), tx);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(envelope)) => match envelope.data_error() {
                Some(message) => Err(Error::Request(message.to_string())),
                None => Ok(envelope.data),
            },
            Ok(Err(_)) => Err(Error::Disconnected),
            Err(_) => {
                self.pending.remove(&(response_type, seq));
                Err(Error::Timeout)
            }
        }
    }

    /// Send a one-way event; there is nothing to await.
    pub async fn send_event(&self, base_name: &str, data: Value) -> Result<()> {
        self.connector.send(&format!("{base_name}_event"), data).await?;
        Ok(())
    }

    /// Relay a forwarded request to the downstream link whose instance
    /// currently owns `data.instance_id` (spec.md §4.4).
    pub async fn forward_request_to_instance(&self, base_name: &str, data: Value) -> Result<Value> {
        let instance_id = required_instance_id(&data)?;
        let target = self
            .routes
            .downstream_for_instance(instance_id)
            .await
            .ok_or_else(|| Error::Request(format!("instance {instance_id} is not assigned to a connected host")))?;
        target.send_request(base_name, data).await
    }

    /// Relay a forwarded request up to this node's single upstream link.
    pub async fn forward_request_to_controller(&self, base_name: &str, data: Value) -> Result<Value> {
        let upstream = self
            .routes
            .upstream()
            .await
            .ok_or_else(|| Error::Forwarding(format!("{base_name}: no upstream link")))?;
        upstream.send_request(base_name, data).await
    }

    /// Relay a forwarded event to the downstream link whose instance
    /// currently owns `data.instance_id`.
    pub async fn forward_event_to_instance(&self, base_name: &str, data: Value) -> Result<()> {
        let instance_id = required_instance_id(&data)?;
        let target = self
            .routes
            .downstream_for_instance(instance_id)
            .await
            .ok_or_else(|| Error::Forwarding(format!("{base_name}: instance {instance_id} has no connected host")))?;
        target.send_event(base_name, data).await
    }

    /// Relay a forwarded event up to this node's single upstream link.
    pub async fn forward_event_to_controller(&self, base_name: &str, data: Value) -> Result<()> {
        let upstream = self
            .routes
            .upstream()
            .await
            .ok_or_else(|| Error::Forwarding(format!("{base_name}: no upstream link")))?;
        upstream.send_event(base_name, data).await
    }

    /// Fan an event out to every downstream link. Each hop is independent —
    /// one failing does not stop the rest — and the count of links it
    /// actually reached is returned for logging.
    pub async fn broadcast_event_to_instances(&self, base_name: &str, data: Value) -> usize {
        let mut delivered = 0;
        for downstream in self.routes.downstream_links().await {
            match downstream.send_event(base_name, data.clone()).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(link = %downstream.pair, message = base_name, error = %err, "broadcast fan-out failed for one downstream link");
                }
            }
        }
        delivered
    }

    async fn dispatch(self: Arc<Self>, envelope: Envelope) {
        let Some(kind) = envelope.kind() else {
            warn!(link = %self.pair, wire_type = %envelope.type_, "dropping envelope with unrecognized type suffix");
            return;
        };

        let Some(validator) = self.validators.get(&envelope.type_).map(|v| v.clone()) else {
            warn!(link = %self.pair, wire_type = %envelope.type_, "dropping envelope with no registered validator");
            return;
        };

        if let Err(issues) = validator.validate(&envelope.data) {
            warn!(link = %self.pair, wire_type = %envelope.type_, ?issues, "dropping envelope that failed validation");
            if kind == EnvelopeKind::Request {
                self.reply_error(&envelope, "request failed schema validation").await;
            }
            return;
        }

        if kind == EnvelopeKind::Response {
            self.resolve_pending(envelope);
            return;
        }

        let base_name = envelope.base_name().unwrap_or(&envelope.type_).to_string();
        let Some(entry) = self.handlers.get(&envelope.type_).map(|e| e.clone()) else {
            warn!(link = %self.pair, message = %base_name, "dropping envelope with no registered handler");
            return;
        };

        let ctx = CallContext::new(self.pair, self.identity());
        match entry {
            HandlerEntry::Request(handler) => {
                let result = handler.call(ctx, envelope.data.clone()).await;
                match result {
                    Ok(payload) => self.reply_success(&envelope, payload).await,
                    Err(Error::Request(message)) => self.reply_error(&envelope, &message).await,
                    // Forwarding failures are already a caller-visible refusal
                    // (no assigned instance, no upstream link, downstream
                    // error) — spec.md §7 "Forwarding error ... propagated
                    // upward as a request error" — so they surface with their
                    // own message, not the generic internal-error one below.
                    Err(Error::Forwarding(message)) => self.reply_error(&envelope, &message).await,
                    Err(other) => {
                        error!(link = %self.pair, message = %base_name, error = %other, "request handler failed internally");
                        self.reply_error(&envelope, "internal error").await;
                    }
                }
            }
            HandlerEntry::Event(handler) => {
                if let Err(err) = handler.call(ctx, envelope.data).await {
                    error!(link = %self.pair, message = %base_name, error = %err, "event handler failed");
                }
            }
        }
    }

    fn resolve_pending(&self, envelope: Envelope) {
        let Some(seq) = envelope.data_seq() else {
            warn!(link = %self.pair, wire_type = %envelope.type_, "dropping response with no seq in data");
            return;
        };
        match self.pending.remove(&(envelope.type_.clone(), seq)) {
            Some((_, tx)) => {
                let _ = tx.send(envelope);
            }
            None => {
                debug!(link = %self.pair, wire_type = %envelope.type_, seq, "dropping response with no matching pending request (likely timed out)");
            }
        }
    }

    async fn reply_success(&self, request: &Envelope, mut payload: Value) {
        if let (Some(seq), Some(obj)) = (request.seq, payload.as_object_mut()) {
            obj.insert("seq".to_string(), Value::from(seq));
        }
        self.send_reply(request, payload).await;
    }

    async fn reply_error(&self, request: &Envelope, message: &str) {
        let payload = serde_json::json!({ "seq": request.seq, "error": message });
        self.send_reply(request, payload).await;
    }

    async fn send_reply(&self, request: &Envelope, payload: Value) {
        let base_name = request.base_name().unwrap_or(&request.type_);
        if let Err(err) = self.connector.send(&format!("{base_name}_response"), payload).await {
            warn!(link = %self.pair, message = %base_name, error = %err, "failed to send response");
        }
    }

    /// Fail every pending request with a disconnection error (spec.md §3
    /// "Lifecycles": teardown fails all pending-response entries). Dropping
    /// the oneshot sender is enough — the awaiting `send_request_timeout`
    /// observes the channel close and maps it to [`Error::Disconnected`].
    fn fail_pending_on_disconnect(&self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmesh_schema::CompiledSchema;
    use linkmesh_transport::mock_pair;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready};

    use crate::route::NoRoutes;

    /// Exercises `send_request_timeout`'s future directly with `tokio-test`,
    /// rather than racing real scheduling: it must stay pending until a
    /// matching response envelope is dispatched, not before.
    #[tokio::test]
    async fn send_request_future_stays_pending_until_the_response_arrives() {
        let pair = LinkSpec::new(Role::Control, Role::Controller);
        let (conn_control, conn_controller) = mock_pair();
        let link = Link::new(pair, Role::Control, Arc::new(conn_control), Arc::new(NoRoutes));

        let response_schema = Arc::new(
            CompiledSchema::compile(json!({"type": "object", "properties": {}, "required": []})).unwrap(),
        );
        link.set_validator("echo_response".to_string(), response_schema);

        let mut task = tokio_test::task::spawn(link.send_request_timeout("echo", json!({}), Duration::from_secs(5)));
        assert_pending!(task.poll());

        conn_controller.send("echo_response", json!({"seq": 1})).await.unwrap();
        tokio::task::yield_now().await;

        let value = assert_ready!(task.poll()).unwrap();
        assert_eq!(value["seq"], 1);
    }
}

fn required_instance_id(data: &Value) -> Result<i64> {
    data.get("instance_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Forwarding("payload has no instance_id to forward on".to_string()))
}

async fn dispatch_loop(link: Arc<Link>, mut receiver: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = receiver.recv().await {
        let link = link.clone();
        tokio::spawn(async move { link.dispatch(envelope).await });
    }
    link.fail_pending_on_disconnect();
    debug!(link = %link.pair, "dispatch loop ended, connector's inbound stream closed");
}
