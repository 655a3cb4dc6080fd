//! Link dispatch, the attach driver, and forwarding/broadcast primitives
//! (spec.md §4.4-§4.7).
//!
//! [`Link`] owns one [`linkmesh_transport::Connector`] and the validator,
//! handler and pending-response tables [`attach_all`] populates against it.
//! A node builds a [`HandlerTable`] of its own business logic, builds one
//! `Link` per connection, calls `attach_all` once per link, and then just
//! lets the dispatch loop run.

mod attach;
mod context;
mod error;
mod event;
mod handler;
mod link;
mod request;
mod route;
mod subscriber;

pub use attach::attach_all;
pub use context::{CallContext, CallerIdentity};
pub use error::{Error, Result};
pub use event::send as send_event;
pub use handler::{EventFuture, EventHandler, HandlerTable, RequestFuture, RequestHandler};
pub use link::{Link, DEFAULT_TIMEOUT};
pub use request::send as send_request;
pub use route::{NoRoutes, RouteTable};
pub use subscriber::SubscriberSet;
