//! Static declarations of catalog entries (spec.md §3 "MessageDescriptor").
//!
//! A [`MessageDescriptor`] is immutable once built; construction itself
//! enforces the four structural invariants from spec.md §3 so a catalog
//! that violates one fails fast at startup rather than misbehaving later.

use std::collections::HashSet;
use std::sync::Arc;

use linkmesh_types::LinkSpec;
use serde_json::Value;

use crate::schema::{CompiledSchema, SchemaError};

/// Whether a catalog entry is a correlated request/response or a one-way
/// event (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Request,
    Event,
}

/// Auto-forwarding target for a request or event whose `forwardTo` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    Instance,
    Controller,
}

/// Broadcast-to-downstream-instances target. Only `Instance` exists today,
/// but the type stays an enum (rather than a bool) because spec.md §3
/// phrases it as "only valid ... with value `instance`", leaving room for
/// the set to grow without changing every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broadcast {
    Instance,
}

/// An immutable catalog entry.
///
/// Built once at process start via [`MessageDescriptor::request`] /
/// [`MessageDescriptor::event`] and never mutated afterwards (spec.md §3
/// "Lifecycles").
#[derive(Debug)]
pub struct MessageDescriptor {
    pub name: &'static str,
    pub kind: Kind,
    pub links: HashSet<LinkSpec>,
    pub permission: Option<&'static str>,
    pub forward_to: Option<Forward>,
    pub broadcast_to: Option<Broadcast>,
    pub request_schema: Option<Arc<CompiledSchema>>,
    pub response_schema: Option<Arc<CompiledSchema>>,
    pub event_schema: Option<Arc<CompiledSchema>>,
}

/// Everything wrong with a descriptor under construction is collected
/// rather than returned on first failure, so a bad catalog entry is fully
/// diagnosed in one shot.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("{name}: permission is required because links contains control-controller")]
    MissingPermission { name: &'static str },
    #[error("{name}: permission is only valid when links contains control-controller")]
    UnexpectedPermission { name: &'static str },
    #[error("{name}: request/response schema is required for a Request descriptor")]
    MissingRequestSchemas { name: &'static str },
    #[error("{name}: event schema is required for an Event descriptor")]
    MissingEventSchema { name: &'static str },
    #[error("{name}: invalid schema: {source}")]
    Schema {
        name: &'static str,
        #[source]
        source: SchemaError,
    },
}

fn control_controller() -> LinkSpec {
    LinkSpec::new(linkmesh_types::Role::Control, linkmesh_types::Role::Controller)
}

/// Invariant 2 (spec.md §3): `forwardTo == "instance"` prepends
/// `instance_id: integer` to the schema's required properties.
fn inject_instance_id(mut schema: Value) -> Value {
    let obj = schema.as_object_mut().expect("catalog schemas are always objects");

    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Default::default()))
        .as_object_mut()
        .expect("catalog schema `properties` is always an object");
    properties
        .entry("instance_id")
        .or_insert_with(|| serde_json::json!({ "type": "integer" }));

    let required = obj.entry("required").or_insert_with(|| Value::Array(Vec::new()));
    let required = required.as_array_mut().expect("catalog schema `required` is always an array");
    if !required.iter().any(|v| v.as_str() == Some("instance_id")) {
        required.insert(0, Value::String("instance_id".to_string()));
    }

    schema
}

/// Input to [`MessageDescriptor::request`].
pub struct RequestSpec {
    pub name: &'static str,
    pub links: &'static [LinkSpec],
    pub permission: Option<&'static str>,
    pub forward_to: Option<Forward>,
    pub request_schema: Value,
    pub response_schema: Value,
}

/// Input to [`MessageDescriptor::event`].
pub struct EventSpec {
    pub name: &'static str,
    pub links: &'static [LinkSpec],
    pub forward_to: Option<Forward>,
    pub broadcast_to: Option<Broadcast>,
    pub event_schema: Value,
}

impl MessageDescriptor {
    pub fn request(spec: RequestSpec) -> Result<MessageDescriptor, DescriptorError> {
        let links: HashSet<LinkSpec> = spec.links.iter().copied().collect();
        check_permission_invariant(spec.name, &links, spec.permission)?;

        let mut request_schema = spec.request_schema;
        let mut response_schema = spec.response_schema;
        if spec.forward_to == Some(Forward::Instance) {
            request_schema = inject_instance_id(request_schema);
            response_schema = inject_instance_id(response_schema);
        }
        // Every response is a union of the success shape the caller
        // declared and the universal error shape `{seq, error}`.
        let response_schema = wrap_response_union(response_schema);

        let request_schema = CompiledSchema::compile(request_schema)
            .map_err(|source| DescriptorError::Schema { name: spec.name, source })?;
        let response_schema = CompiledSchema::compile(response_schema)
            .map_err(|source| DescriptorError::Schema { name: spec.name, source })?;

        Ok(MessageDescriptor {
            name: spec.name,
            kind: Kind::Request,
            links,
            permission: spec.permission,
            forward_to: spec.forward_to,
            broadcast_to: None,
            request_schema: Some(Arc::new(request_schema)),
            response_schema: Some(Arc::new(response_schema)),
            event_schema: None,
        })
    }

    pub fn event(spec: EventSpec) -> Result<MessageDescriptor, DescriptorError> {
        let links: HashSet<LinkSpec> = spec.links.iter().copied().collect();
        // Events never carry a `control-controller` permission check;
        // invariant 1 only ever requires/forbids permission on requests, so
        // there is nothing to check here beyond "events have none".

        let mut event_schema = spec.event_schema;
        if spec.forward_to == Some(Forward::Instance) {
            event_schema = inject_instance_id(event_schema);
        }
        let event_schema = CompiledSchema::compile(event_schema)
            .map_err(|source| DescriptorError::Schema { name: spec.name, source })?;

        Ok(MessageDescriptor {
            name: spec.name,
            kind: Kind::Event,
            links,
            permission: None,
            forward_to: spec.forward_to,
            broadcast_to: spec.broadcast_to,
            request_schema: None,
            response_schema: None,
            event_schema: Some(Arc::new(event_schema)),
        })
    }

    /// True if `link` is a *source* of this message: the message may
    /// originate from `link.source` toward `link.target`.
    pub fn is_source_of(&self, link: LinkSpec) -> bool {
        self.links.contains(&link)
    }

    /// True if `link` is a *target* of this message: the message may arrive
    /// at `link.target` from `link.source`, i.e. the reversed pair is
    /// declared (spec.md §3 invariant 4).
    pub fn is_target_of(&self, link: LinkSpec) -> bool {
        self.links.contains(&link.reversed())
    }
}

fn check_permission_invariant(
    name: &'static str,
    links: &HashSet<LinkSpec>,
    permission: Option<&'static str>,
) -> Result<(), DescriptorError> {
    let on_control_controller = links.contains(&control_controller());
    match (on_control_controller, permission) {
        (true, None) => Err(DescriptorError::MissingPermission { name }),
        (false, Some(_)) => Err(DescriptorError::UnexpectedPermission { name }),
        _ => Ok(()),
    }
}

/// `{success shape} | {seq, error}` per spec.md §3's MessageDescriptor note
/// on `responseSchema`.
fn wrap_response_union(success_shape: Value) -> Value {
    let error_shape = serde_json::json!({
        "type": "object",
        "properties": {
            "seq": { "type": "integer" },
            "error": { "type": "string" },
        },
        "required": ["seq", "error"],
    });
    serde_json::json!({ "anyOf": [success_shape, error_shape] })
}
