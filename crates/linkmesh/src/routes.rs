//! A concrete [`RouteTable`]: an explicit, node-owned collection of live
//! downstream links plus one optional upstream link (spec.md Design Notes
//! #5 — "represent downstream links as an explicit collection owned by
//! each node", replacing the teacher's implicit traversal over whatever
//! connection map happens to exist).
//!
//! One `DownstreamRegistry` instance serves both node shapes in this
//! protocol: a controller's downstream is its connected hosts (keyed by
//! host id, with an `instance_id -> host link` index kept in step by
//! whoever assigns instances to hosts); a host's downstream is its
//! connected instances (keyed by instance id, which doubles as the index
//! key since a host's own instances need no extra indirection).

use std::sync::Arc;

use linkmesh_link::{Link, RouteTable};
use parking_lot::RwLock;

use dashmap::DashMap;

/// Registration identity for a downstream link: the controller uses host
/// ids, a host uses instance ids.
pub type DownstreamId = i64;

#[derive(Default, Debug)]
pub struct DownstreamRegistry {
    /// Every live downstream link, keyed by its registration id — the set
    /// [`RouteTable::downstream_links`] fans a broadcast out over.
    downstream: DashMap<DownstreamId, Arc<Link>>,
    /// `instance_id -> downstream link` for [`RouteTable::downstream_for_instance`].
    /// On a host this is the same link found in `downstream` under the
    /// same key; on a controller it is the host link an instance was last
    /// assigned to, which may change independently of `downstream`'s
    /// membership.
    instance_routes: DashMap<i64, Arc<Link>>,
    upstream: RwLock<Option<Arc<Link>>>,
}

impl DownstreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a downstream link under `id`.
    pub fn register(&self, id: DownstreamId, link: Arc<Link>) {
        self.downstream.insert(id, link);
    }

    /// Drop a downstream link, and with it any instance routes that were
    /// pointing at it.
    pub fn unregister(&self, id: DownstreamId) {
        if let Some((_, link)) = self.downstream.remove(&id) {
            self.instance_routes.retain(|_, route| !Arc::ptr_eq(route, &link));
        }
    }

    /// Route `instance_id` at the downstream link registered under `id`.
    /// `register(id, ..)` must already have happened; a controller calls
    /// this from its `assign_instance_host` / `assign_instance` handlers,
    /// a host calls it as each of its own instances connects (`id ==
    /// instance_id` in that case).
    pub fn assign_instance(&self, instance_id: i64, id: DownstreamId) -> bool {
        match self.downstream.get(&id) {
            Some(link) => {
                self.instance_routes.insert(instance_id, link.clone());
                true
            }
            None => false,
        }
    }

    pub fn unassign_instance(&self, instance_id: i64) {
        self.instance_routes.remove(&instance_id);
    }

    pub fn set_upstream(&self, link: Arc<Link>) {
        *self.upstream.write() = Some(link);
    }

    pub fn clear_upstream(&self) {
        *self.upstream.write() = None;
    }

    pub fn downstream_count(&self) -> usize {
        self.downstream.len()
    }
}

#[async_trait::async_trait]
impl RouteTable for DownstreamRegistry {
    async fn downstream_for_instance(&self, instance_id: i64) -> Option<Arc<Link>> {
        self.instance_routes.get(&instance_id).map(|entry| entry.clone())
    }

    async fn downstream_links(&self) -> Vec<Arc<Link>> {
        self.downstream.iter().map(|entry| entry.value().clone()).collect()
    }

    async fn upstream(&self) -> Option<Arc<Link>> {
        self.upstream.read().clone()
    }
}
