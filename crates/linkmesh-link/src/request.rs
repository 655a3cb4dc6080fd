//! Attach/send logic for `Kind::Request` catalog entries (spec.md §4.5).

use std::sync::Arc;

use linkmesh_schema::{Forward, MessageDescriptor, MessageRegistry};
use serde_json::Value;

use crate::attach::{may_originate, must_handle};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::handler::{HandlerTable, RequestFuture, RequestHandler};
use crate::link::{HandlerEntry, Link};

/// `Request.send` (spec.md §4.5): validate `data` against `name`'s request
/// schema — failing locally, with no wire transmission, if it does not
/// match (spec.md §8 testable property 5) — then send it over `link` and
/// await the correlated response.
pub async fn send(registry: &MessageRegistry, link: &Link, name: &str, data: Value) -> Result<Value> {
    let descriptor = registry.get(name).ok_or_else(|| Error::UnknownMessage(name.to_string()))?;
    let schema = descriptor.request_schema.as_ref().expect("a Request descriptor always carries a request schema");
    schema.validate(&data).map_err(Error::Validation)?;
    link.send_request(name, data).await
}

pub(crate) fn attach(descriptor: &Arc<MessageDescriptor>, link: &Arc<Link>, handlers: &HandlerTable) -> Result<()> {
    if may_originate(descriptor, link) {
        let response_schema = descriptor
            .response_schema
            .clone()
            .expect("a Request descriptor always carries a response schema");
        link.set_validator(format!("{}_response", descriptor.name), response_schema);
    }

    if must_handle(descriptor, link) {
        let handler = resolve_handler(descriptor, link, handlers)?;
        let request_schema = descriptor
            .request_schema
            .clone()
            .expect("a Request descriptor always carries a request schema");
        link.set_handler(format!("{}_request", descriptor.name), request_schema, HandlerEntry::Request(handler));
    }

    Ok(())
}

fn resolve_handler(
    descriptor: &Arc<MessageDescriptor>,
    link: &Arc<Link>,
    handlers: &HandlerTable,
) -> Result<Arc<dyn RequestHandler>> {
    if let Some(handler) = handlers.request(descriptor.name) {
        return Ok(guard_permission(descriptor, handler));
    }
    if let Some(forward) = descriptor.forward_to {
        let forwarding: Arc<dyn RequestHandler> = Arc::new(ForwardingHandler {
            link: link.clone(),
            name: descriptor.name,
            forward,
        });
        return Ok(guard_permission(descriptor, forwarding));
    }
    Err(Error::MissingHandler {
        link: link.pair.to_string(),
        message: descriptor.name.to_string(),
    })
}

fn guard_permission(descriptor: &MessageDescriptor, handler: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
    match descriptor.permission {
        Some(permission) => Arc::new(PermissionGuard { inner: handler, permission }),
        None => handler,
    }
}

/// Wraps a request handler declared on a `control-controller` message:
/// checked once, here, rather than scattered across every handler body
/// (spec.md §5 "permission checking").
struct PermissionGuard {
    inner: Arc<dyn RequestHandler>,
    permission: &'static str,
}

impl RequestHandler for PermissionGuard {
    fn call(&self, ctx: CallContext, data: Value) -> RequestFuture {
        let inner = self.inner.clone();
        let permission = self.permission;
        Box::pin(async move {
            if !ctx.has_permission(permission) {
                return Err(Error::Request(format!("missing permission: {permission}")));
            }
            inner.call(ctx, data).await
        })
    }
}

/// The default handler for a request with `forwardTo` set and no explicit
/// override registered: relay it to the appropriate downstream or upstream
/// link and return whatever it answers with.
struct ForwardingHandler {
    link: Arc<Link>,
    name: &'static str,
    forward: Forward,
}

impl RequestHandler for ForwardingHandler {
    fn call(&self, _ctx: CallContext, data: Value) -> RequestFuture {
        let link = self.link.clone();
        let name = self.name;
        let forward = self.forward;
        Box::pin(async move {
            match forward {
                Forward::Instance => link.forward_request_to_instance(name, data).await,
                Forward::Controller => link.forward_request_to_controller(name, data).await,
            }
        })
    }
}
