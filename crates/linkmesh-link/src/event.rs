//! Attach/send logic for `Kind::Event` catalog entries (spec.md §4.6).

use std::sync::Arc;

use linkmesh_schema::{Broadcast, Forward, MessageDescriptor, MessageRegistry};
use serde_json::Value;

use crate::attach::must_handle;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::handler::{EventFuture, EventHandler, HandlerTable};
use crate::link::{HandlerEntry, Link};

/// `Event.send` (spec.md §4.6): validate `data` against `name`'s event
/// schema, then transmit a single envelope — no correlation, no await.
pub async fn send(registry: &MessageRegistry, link: &Link, name: &str, data: Value) -> Result<()> {
    let descriptor = registry.get(name).ok_or_else(|| Error::UnknownMessage(name.to_string()))?;
    let schema = descriptor.event_schema.as_ref().expect("an Event descriptor always carries an event schema");
    schema.validate(&data).map_err(Error::Validation)?;
    link.send_event(name, data).await
}

pub(crate) fn attach(descriptor: &Arc<MessageDescriptor>, link: &Arc<Link>, handlers: &HandlerTable) -> Result<()> {
    // Events never produce a response envelope, so there is nothing for the
    // originating end to validate ahead of time — only the receiving end
    // needs a handler.
    if must_handle(descriptor, link) {
        let handler = resolve_handler(descriptor, link, handlers)?;
        let event_schema = descriptor
            .event_schema
            .clone()
            .expect("an Event descriptor always carries an event schema");
        link.set_handler(format!("{}_event", descriptor.name), event_schema, HandlerEntry::Event(handler));
    }
    Ok(())
}

fn resolve_handler(
    descriptor: &Arc<MessageDescriptor>,
    link: &Arc<Link>,
    handlers: &HandlerTable,
) -> Result<Arc<dyn EventHandler>> {
    let explicit = handlers.event(descriptor.name);
    let base: Option<Arc<dyn EventHandler>> = match explicit {
        Some(handler) => Some(handler),
        None => descriptor.forward_to.map(|forward| {
            Arc::new(ForwardingHandler { link: link.clone(), name: descriptor.name, forward }) as Arc<dyn EventHandler>
        }),
    };

    // spec.md §4.6: broadcastTo always fires *before* whatever handler this
    // link would otherwise run — an explicit handler included — never
    // instead of it.
    if let Some(Broadcast::Instance) = descriptor.broadcast_to {
        return Ok(Arc::new(BroadcastThen {
            link: link.clone(),
            name: descriptor.name,
            then: base,
        }));
    }

    base.ok_or_else(|| Error::MissingHandler { link: link.pair.to_string(), message: descriptor.name.to_string() })
}

/// The default handler for an event with `forwardTo` set and no explicit
/// override: relay it up or down to the appropriate link.
struct ForwardingHandler {
    link: Arc<Link>,
    name: &'static str,
    forward: Forward,
}

impl EventHandler for ForwardingHandler {
    fn call(&self, _ctx: CallContext, data: Value) -> EventFuture {
        let link = self.link.clone();
        let name = self.name;
        let forward = self.forward;
        Box::pin(async move {
            match forward {
                Forward::Instance => link.forward_event_to_instance(name, data).await,
                Forward::Controller => link.forward_event_to_controller(name, data).await,
            }
        })
    }
}

/// Fans an event out to every downstream instance link, then — if this
/// link also has a handler of its own (explicit, or a `forwardTo` rule) —
/// runs that too (spec.md §4.6).
struct BroadcastThen {
    link: Arc<Link>,
    name: &'static str,
    then: Option<Arc<dyn EventHandler>>,
}

impl EventHandler for BroadcastThen {
    fn call(&self, ctx: CallContext, data: Value) -> EventFuture {
        let link = self.link.clone();
        let name = self.name;
        let then = self.then.clone();
        Box::pin(async move {
            link.broadcast_event_to_instances(name, data.clone()).await;
            match then {
                Some(handler) => handler.call(ctx, data).await,
                None => Ok(()),
            }
        })
    }
}
