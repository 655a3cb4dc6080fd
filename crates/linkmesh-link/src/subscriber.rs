//! A reusable subscriber set (spec.md GLOSSARY "Subscription"): tracks which
//! links asked to receive a class of update events and pushes to all of
//! them, pruning any that have disconnected since.
//!
//! Subscriptions are business logic the controller's own `subscribe_*`
//! handlers own — this just holds the bookkeeping every one of those
//! handlers needs in common, the way the teacher's router keeps a
//! `DashMap` of live sessions rather than re-deriving membership per call.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use crate::link::Link;

#[derive(Default)]
pub struct SubscriberSet {
    links: Mutex<Vec<Weak<Link>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `link` as a subscriber. Idempotent: subscribing twice from
    /// the same link only pushes once.
    pub fn subscribe(&self, link: &Arc<Link>) {
        let mut links = self.links.lock();
        if links.iter().any(|existing| existing.as_ptr() == Arc::as_ptr(link)) {
            return;
        }
        links.push(Arc::downgrade(link));
    }

    /// Push `event_name` to every live subscriber, dropping any whose link
    /// has since been freed.
    pub async fn publish(&self, event_name: &str, data: Value) {
        let live: Vec<Arc<Link>> = {
            let mut links = self.links.lock();
            links.retain(|weak| weak.strong_count() > 0);
            links.iter().filter_map(Weak::upgrade).collect()
        };
        for link in live {
            if let Err(err) = link.send_event(event_name, data.clone()).await {
                warn!(link = %link.pair, event = event_name, error = %err, "failed to push to one subscriber");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.links.lock().iter().filter(|w| w.strong_count() > 0).count()
    }
}
