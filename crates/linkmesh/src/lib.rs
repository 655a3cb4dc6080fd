//! Node facade for the linkmesh link protocol.
//!
//! The four lower crates (`linkmesh-types`, `-schema`, `-transport`,
//! `-link`) are transport- and role-agnostic; this crate is where a real
//! `controller`/`host`/`instance`/`control` process lives. It caches the
//! fixed catalog behind a [`catalog`] accessor, loads per-node
//! configuration the way `turbomcp-server::config` layers defaults (here
//! via the `config` crate instead, per this workspace's ambient stack),
//! initializes `tracing` the way every teacher binary does at `main`, and
//! supplies a concrete [`linkmesh_link::RouteTable`] a node can register
//! its live downstream/upstream links against.

mod config;
mod logging;
mod routes;

use std::sync::OnceLock;

pub use linkmesh_link::{
    attach_all, send_event, send_request, CallContext, CallerIdentity, Error, EventFuture, EventHandler, HandlerTable,
    Link, NoRoutes, RequestFuture, RequestHandler, Result as LinkResult, RouteTable, SubscriberSet, DEFAULT_TIMEOUT,
};
pub use linkmesh_schema::{Broadcast, CatalogError, Forward, Kind, MessageDescriptor, MessageRegistry};
pub use linkmesh_transport::{mock_pair, Connector, MockConnector, TransportError, WebSocketConnector};
pub use linkmesh_types::{Envelope, EnvelopeKind, LinkSpec, Role, Seq};

pub use config::{ConfigError, NodeConfig};
pub use logging::init_logging;
pub use routes::DownstreamRegistry;

static CATALOG: OnceLock<MessageRegistry> = OnceLock::new();

/// The fixed, process-wide message catalog (spec.md §4.2), built once and
/// shared by every [`Link`] in the process.
///
/// Panics if the catalog fails to build — an invariant violation in the
/// fixed catalog is a programming error, not a runtime condition a node can
/// recover from (spec.md §7 "Missing handler" / construction errors are
/// fatal startup errors).
pub fn catalog() -> &'static MessageRegistry {
    CATALOG.get_or_init(|| linkmesh_schema::catalog::build().expect("fixed catalog must satisfy every invariant"))
}

/// A random host enrollment token, the shape `generate_host_token`'s
/// handler hands back to a newly-registered host.
pub fn generate_host_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Stamp a log line with the moment it was observed, the shape
/// `query_log`'s handler attaches to each returned entry.
pub fn log_timestamp() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
