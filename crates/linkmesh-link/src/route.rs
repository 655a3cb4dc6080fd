//! Where a [`crate::Link`] sends a message it does not handle itself
//! (spec.md §4.4 "forwarding and broadcast primitives").
//!
//! A bare `Link` only knows its own connector; it has no notion of
//! siblings. A node that needs to forward — the controller relaying to a
//! host, a host relaying to an instance — supplies a [`RouteTable`]
//! implementation that knows how to find them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::link::Link;

/// Looks up sibling links for forwarding and broadcast. Implemented per
/// node role by whatever owns the node's live connection table.
#[async_trait]
pub trait RouteTable: Send + Sync + std::fmt::Debug {
    /// The downstream link whose instance currently owns `instance_id`,
    /// if any is assigned.
    async fn downstream_for_instance(&self, instance_id: i64) -> Option<Arc<Link>>;

    /// Every downstream link this node has — the controller's hosts, or a
    /// host's instances — for fan-out broadcast.
    async fn downstream_links(&self) -> Vec<Arc<Link>>;

    /// The single upstream link, if this node has a parent to forward to
    /// (a host's link to its controller, an instance's link to its host).
    async fn upstream(&self) -> Option<Arc<Link>>;
}

/// A [`RouteTable`] for links with no siblings to route to: `control`'s
/// single link to its controller, and any node that never forwards.
#[derive(Debug, Default)]
pub struct NoRoutes;

#[async_trait]
impl RouteTable for NoRoutes {
    async fn downstream_for_instance(&self, _instance_id: i64) -> Option<Arc<Link>> {
        None
    }

    async fn downstream_links(&self) -> Vec<Arc<Link>> {
        Vec::new()
    }

    async fn upstream(&self) -> Option<Arc<Link>> {
        None
    }
}
