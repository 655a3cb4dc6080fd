//! Process-wide, read-only catalog of [`MessageDescriptor`]s (spec.md §4.2).

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{DescriptorError, MessageDescriptor};

/// Every way building the fixed catalog can fail at startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate message name in catalog: {0}")]
    DuplicateName(String),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// A read-only, process-wide mapping from message name to
/// [`MessageDescriptor`] (spec.md §4.2).
///
/// Populated once via [`MessageRegistry::build`] and never mutated again.
/// `entries()` preserves catalog declaration order so the attach driver
/// (spec.md §4.7) iterates deterministically.
#[derive(Debug)]
pub struct MessageRegistry {
    order: Vec<Arc<MessageDescriptor>>,
    by_name: HashMap<&'static str, Arc<MessageDescriptor>>,
}

impl MessageRegistry {
    /// Build a registry from descriptor results, failing on the first
    /// construction error or duplicate name.
    ///
    /// Descriptor results (rather than descriptors) are accepted so callers
    /// can build the catalog with `?` inside a single `vec![...]` literal —
    /// see `catalog::build()`.
    pub fn build(
        descriptors: Vec<Result<MessageDescriptor, DescriptorError>>,
    ) -> Result<MessageRegistry, CatalogError> {
        let mut order = Vec::with_capacity(descriptors.len());
        let mut by_name = HashMap::with_capacity(descriptors.len());
        for result in descriptors {
            let descriptor = Arc::new(result?);
            if by_name.contains_key(descriptor.name) {
                return Err(CatalogError::DuplicateName(descriptor.name.to_string()));
            }
            by_name.insert(descriptor.name, descriptor.clone());
            order.push(descriptor);
        }
        Ok(MessageRegistry { order, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.by_name.get(name)
    }

    /// All descriptors in catalog declaration order.
    pub fn entries(&self) -> &[Arc<MessageDescriptor>] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EventSpec, Forward, Kind, RequestSpec};
    use linkmesh_types::{LinkSpec, Role};
    use serde_json::json;

    fn minimal_request(name: &'static str) -> Result<MessageDescriptor, DescriptorError> {
        static LINKS: &[LinkSpec] = &[];
        MessageDescriptor::request(RequestSpec {
            name,
            links: LINKS,
            permission: None,
            forward_to: None,
            request_schema: json!({"type": "object", "properties": {}, "required": []}),
            response_schema: json!({"type": "object", "properties": {}, "required": []}),
        })
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = MessageRegistry::build(vec![minimal_request("ping"), minimal_request("ping")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(n) if n == "ping"));
    }

    #[test]
    fn preserves_declaration_order() {
        let registry =
            MessageRegistry::build(vec![minimal_request("a"), minimal_request("b")]).unwrap();
        let names: Vec<&str> = registry.entries().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().kind, Kind::Request);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn propagates_descriptor_construction_errors() {
        static LINKS: &[LinkSpec] = &[LinkSpec::new(Role::Control, Role::Controller)];
        let bad = MessageDescriptor::event(EventSpec {
            name: "broken",
            links: LINKS,
            forward_to: Some(Forward::Controller),
            broadcast_to: None,
            event_schema: json!({"type": "object"}),
        });
        assert!(bad.is_ok()); // events never check the permission invariant
    }
}
