//! `request::send`/`event::send` validate outbound payloads against the
//! catalog before touching the wire (spec.md §4.5, §4.6, §8 testable
//! property 5).

use std::sync::Arc;

use linkmesh_link::{attach_all, send_event, send_request, Error, HandlerTable, Link, NoRoutes};
use linkmesh_schema::descriptor::{EventSpec, RequestSpec};
use linkmesh_schema::{MessageDescriptor, MessageRegistry};
use linkmesh_transport::mock_pair;
use linkmesh_types::{LinkSpec, Role};
use serde_json::{json, Value};

fn obj(required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": { "msg": { "type": "string" } },
        "required": required,
    })
}

#[tokio::test]
async fn send_request_rejects_invalid_payload_before_it_reaches_the_wire() {
    let pair = LinkSpec::new(Role::Control, Role::Controller);
    let registry = MessageRegistry::build(vec![MessageDescriptor::request(RequestSpec {
        name: "echo",
        links: &[pair],
        permission: None,
        forward_to: None,
        request_schema: obj(&["msg"]),
        response_schema: obj(&["msg"]),
    })])
    .unwrap();

    let (conn_control, conn_controller) = mock_pair();
    let link_control = Link::new(pair, Role::Control, Arc::new(conn_control), Arc::new(NoRoutes));
    let link_controller = Link::new(pair, Role::Controller, Arc::new(conn_controller), Arc::new(NoRoutes));

    // No handler is attached on the controller side: if an invalid payload
    // ever reached the wire, awaiting the response would hang (no one can
    // answer it) rather than fail fast. We never get there.
    attach_all(&registry, &link_control, &HandlerTable::new()).unwrap();

    let result = send_request(&registry, &link_control, "echo", json!({"wrong": "shape"})).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    let _ = link_controller;
}

#[tokio::test]
async fn send_request_rejects_unknown_message_name() {
    let pair = LinkSpec::new(Role::Control, Role::Controller);
    let registry = MessageRegistry::build(vec![]).unwrap();
    let (conn_control, _conn_controller) = mock_pair();
    let link_control = Link::new(pair, Role::Control, Arc::new(conn_control), Arc::new(NoRoutes));

    let result = send_request(&registry, &link_control, "no_such_message", json!({})).await;
    assert!(matches!(result, Err(Error::UnknownMessage(ref name)) if name == "no_such_message"));
}

#[tokio::test]
async fn send_request_forwards_valid_payload_and_returns_response() {
    let pair = LinkSpec::new(Role::Control, Role::Controller);
    let registry = MessageRegistry::build(vec![MessageDescriptor::request(RequestSpec {
        name: "echo",
        links: &[pair],
        permission: None,
        forward_to: None,
        request_schema: obj(&["msg"]),
        response_schema: obj(&["msg"]),
    })])
    .unwrap();

    let (conn_control, conn_controller) = mock_pair();
    let link_control = Link::new(pair, Role::Control, Arc::new(conn_control), Arc::new(NoRoutes));
    let link_controller = Link::new(pair, Role::Controller, Arc::new(conn_controller), Arc::new(NoRoutes));

    let handlers = HandlerTable::new().on_request("echo", |_ctx, data: Value| async move { Ok(data) });
    attach_all(&registry, &link_controller, &handlers).unwrap();
    attach_all(&registry, &link_control, &HandlerTable::new()).unwrap();

    let response = send_request(&registry, &link_control, "echo", json!({"msg": "hi"})).await.unwrap();
    assert_eq!(response["msg"], "hi");
}

#[tokio::test]
async fn send_event_rejects_invalid_payload_before_it_reaches_the_wire() {
    let pair = LinkSpec::new(Role::Controller, Role::Host);
    let registry = MessageRegistry::build(vec![MessageDescriptor::event(EventSpec {
        name: "host_update",
        links: &[pair],
        forward_to: None,
        broadcast_to: None,
        event_schema: obj(&["msg"]),
    })])
    .unwrap();

    let (conn_controller, _conn_host) = mock_pair();
    let link_controller = Link::new(pair, Role::Controller, Arc::new(conn_controller), Arc::new(NoRoutes));

    let result = send_event(&registry, &link_controller, "host_update", json!({"wrong": "shape"})).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn send_event_rejects_unknown_message_name() {
    let pair = LinkSpec::new(Role::Controller, Role::Host);
    let registry = MessageRegistry::build(vec![]).unwrap();
    let (conn_controller, _conn_host) = mock_pair();
    let link_controller = Link::new(pair, Role::Controller, Arc::new(conn_controller), Arc::new(NoRoutes));

    let result = send_event(&registry, &link_controller, "no_such_event", json!({})).await;
    assert!(matches!(result, Err(Error::UnknownMessage(ref name)) if name == "no_such_event"));
}
