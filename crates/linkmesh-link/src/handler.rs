//! Explicit handler tables, replacing the teacher's convention-based
//! `"<name><suffix>"` method lookup with a table a node builds once at
//! startup and hands to the attach driver (spec.md "Design Notes" #1).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::context::CallContext;
use crate::error::Error;

pub type RequestFuture = Pin<Box<dyn Future<Output = Result<Value, Error>> + Send>>;
pub type EventFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// A request handler: takes the caller's context and the validated request
/// payload, returns the success payload or an [`Error::Request`] /
/// internal error.
pub trait RequestHandler: Send + Sync {
    fn call(&self, ctx: CallContext, data: Value) -> RequestFuture;
}

impl<F, Fut> RequestHandler for F
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, Error>> + Send + 'static,
{
    fn call(&self, ctx: CallContext, data: Value) -> RequestFuture {
        Box::pin((self)(ctx, data))
    }
}

/// An event handler: invoked fire-and-forget, errors are logged only
/// (spec.md §4.6 — events never produce a response envelope).
pub trait EventHandler: Send + Sync {
    fn call(&self, ctx: CallContext, data: Value) -> EventFuture;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, ctx: CallContext, data: Value) -> EventFuture {
        Box::pin((self)(ctx, data))
    }
}

/// A node's complete set of request/event handlers, keyed by the catalog's
/// message name (not the wire type — no `_request`/`_event` suffix).
///
/// Built once with the builder methods below and handed to
/// [`crate::attach::attach_all`]; a message with neither a registered
/// handler nor an applicable `forwardTo` rule fails attach with
/// [`Error::MissingHandler`].
#[derive(Default)]
pub struct HandlerTable {
    requests: HashMap<&'static str, Arc<dyn RequestHandler>>,
    events: HashMap<&'static str, Arc<dyn EventHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request(mut self, name: &'static str, handler: impl RequestHandler + 'static) -> Self {
        self.requests.insert(name, Arc::new(handler));
        self
    }

    pub fn on_event(mut self, name: &'static str, handler: impl EventHandler + 'static) -> Self {
        self.events.insert(name, Arc::new(handler));
        self
    }

    pub fn request(&self, name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.requests.get(name).cloned()
    }

    pub fn event(&self, name: &str) -> Option<Arc<dyn EventHandler>> {
        self.events.get(name).cloned()
    }
}
