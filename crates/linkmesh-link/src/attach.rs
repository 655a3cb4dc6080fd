//! The attach driver (spec.md §4.7): walks the catalog once per `Link` and
//! wires each applicable entry to either a response validator (this end may
//! originate it) or a handler (this end must handle it).

use std::sync::Arc;

use linkmesh_schema::{Kind, MessageDescriptor, MessageRegistry};

use crate::error::Result;
use crate::handler::HandlerTable;
use crate::link::Link;
use crate::{event, request};

/// True if `link` may send `descriptor`'s message: either the descriptor
/// declares `link.pair` directly and this end plays `pair.source`, or it
/// declares the reverse pair and this end plays `pair.target` (spec.md §3
/// invariant 4, read from the originating side).
pub(crate) fn may_originate(descriptor: &MessageDescriptor, link: &Link) -> bool {
    (descriptor.is_source_of(link.pair) && link.local_role == link.pair.source)
        || (descriptor.is_target_of(link.pair) && link.local_role == link.pair.target)
}

/// True if `link` must handle `descriptor`'s message: the same invariant,
/// read from the receiving side.
pub(crate) fn must_handle(descriptor: &MessageDescriptor, link: &Link) -> bool {
    (descriptor.is_source_of(link.pair) && link.local_role == link.pair.target)
        || (descriptor.is_target_of(link.pair) && link.local_role == link.pair.source)
}

/// Walk every catalog entry in declaration order and attach it to `link` if
/// it applies to `link.pair`.
///
/// A descriptor this link must handle but that has neither an explicit
/// entry in `handlers` nor an applicable `forwardTo`/`broadcastTo` rule
/// fails attach with [`crate::Error::MissingHandler`] — a node wired up
/// wrong should refuse to start rather than silently drop traffic later.
pub fn attach_all(registry: &MessageRegistry, link: &Arc<Link>, handlers: &HandlerTable) -> Result<()> {
    for descriptor in registry.entries() {
        match descriptor.kind {
            Kind::Request => request::attach(descriptor, link, handlers)?,
            Kind::Event => event::attach(descriptor, link, handlers)?,
        }
    }
    Ok(())
}
