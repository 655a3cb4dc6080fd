//! The fixed message catalog (spec.md §6, expanded in SPEC_FULL.md §6).
//!
//! [`build`] constructs the full [`MessageRegistry`] once; callers normally
//! reach it through `linkmesh::catalog()`, which caches the result behind a
//! `OnceLock`.

use linkmesh_types::{LinkSpec, Role};
use serde_json::{json, Value};

use crate::descriptor::{Broadcast, EventSpec, Forward, MessageDescriptor, RequestSpec};
use crate::registry::{CatalogError, MessageRegistry};

// --- link-chain shorthands -------------------------------------------------

const CONTROL_CONTROLLER: LinkSpec = LinkSpec::new(Role::Control, Role::Controller);
const CONTROLLER_CONTROL: LinkSpec = LinkSpec::new(Role::Controller, Role::Control);
const CONTROLLER_HOST: LinkSpec = LinkSpec::new(Role::Controller, Role::Host);
const HOST_CONTROLLER: LinkSpec = LinkSpec::new(Role::Host, Role::Controller);
const HOST_INSTANCE: LinkSpec = LinkSpec::new(Role::Host, Role::Instance);
const INSTANCE_HOST: LinkSpec = LinkSpec::new(Role::Instance, Role::Host);

/// A request that only ever flows directly from control to the controller:
/// the controller answers it locally, no forwarding.
const CONTROL_ONLY: &[LinkSpec] = &[CONTROL_CONTROLLER];
/// A request forwarded all the way to a specific instance; the same
/// envelope is revalidated and re-sent unmodified at each hop (SPEC_FULL.md
/// §3 note), so every real hop link must be declared.
const TO_INSTANCE: &[LinkSpec] = &[CONTROL_CONTROLLER, CONTROLLER_HOST, HOST_INSTANCE];
/// Internal controller -> host only, never touched by control.
const CONTROLLER_TO_HOST: &[LinkSpec] = &[CONTROLLER_HOST];
/// Internal host -> controller only.
const HOST_TO_CONTROLLER: &[LinkSpec] = &[HOST_CONTROLLER];
/// An event bubbling from an instance up to the controller.
const EVENT_TO_CONTROLLER: &[LinkSpec] = &[INSTANCE_HOST, HOST_CONTROLLER];
/// An event the controller broadcasts down through hosts to instances.
const EVENT_TO_INSTANCES: &[LinkSpec] = &[CONTROLLER_HOST, HOST_INSTANCE];
/// An event the controller pushes to a subscribed control client.
const EVENT_TO_CONTROL: &[LinkSpec] = &[CONTROLLER_CONTROL];
/// An event that only ever crosses the host-instance hop.
const EVENT_HOST_INSTANCE: &[LinkSpec] = &[HOST_INSTANCE];

// --- schema builders --------------------------------------------------------

fn string() -> Value {
    json!({ "type": "string" })
}

fn integer() -> Value {
    json!({ "type": "integer" })
}

fn boolean() -> Value {
    json!({ "type": "boolean" })
}

fn any() -> Value {
    json!({})
}

fn array_of(items: Value) -> Value {
    json!({ "type": "array", "items": items })
}

fn obj(properties: &[(&str, Value)], required: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> =
        properties.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn empty() -> Value {
    obj(&[], &[])
}

fn host_shape() -> Value {
    obj(
        &[("id", integer()), ("name", string()), ("connected", boolean())],
        &["id", "name", "connected"],
    )
}

fn instance_shape() -> Value {
    obj(
        &[
            ("id", integer()),
            ("name", string()),
            ("assigned_host", json!({ "anyOf": [integer(), json!(null)] })),
            ("status", string()),
        ],
        &["id", "name", "status"],
    )
}

/// Request descriptors with no forwarding share this shape: build the
/// request/response schemas inline and let the macro fill in the rest.
macro_rules! request {
    ($name:literal, $links:expr, $perm:expr, $req:expr, $resp:expr) => {
        MessageDescriptor::request(RequestSpec {
            name: $name,
            links: $links,
            permission: $perm,
            forward_to: None,
            request_schema: $req,
            response_schema: $resp,
        })
    };
}

/// Requests forwarded to a specific instance: same shape as [`request!`]
/// plus `forward_to: Forward::Instance` (which prepends `instance_id`).
macro_rules! to_instance {
    ($name:literal, $perm:expr, $req:expr, $resp:expr) => {
        MessageDescriptor::request(RequestSpec {
            name: $name,
            links: TO_INSTANCE,
            permission: Some($perm),
            forward_to: Some(Forward::Instance),
            request_schema: $req,
            response_schema: $resp,
        })
    };
}

macro_rules! event {
    ($name:literal, $links:expr, $forward_to:expr, $broadcast_to:expr, $schema:expr) => {
        MessageDescriptor::event(EventSpec {
            name: $name,
            links: $links,
            forward_to: $forward_to,
            broadcast_to: $broadcast_to,
            event_schema: $schema,
        })
    };
}

/// Build the full fixed catalog. Fails fast (spec.md §3 "Lifecycles") on
/// the first invariant violation or duplicate name.
pub fn build() -> Result<MessageRegistry, CatalogError> {
    MessageRegistry::build(vec![
        // --- connection control -------------------------------------------
        request!(
            "ping",
            &[HOST_CONTROLLER, INSTANCE_HOST],
            None,
            empty(),
            empty()
        ),
        request!(
            "prepare_disconnect",
            &[CONTROLLER_HOST, HOST_INSTANCE],
            None,
            empty(),
            empty()
        ),
        request!(
            "prepare_controller_disconnect",
            CONTROLLER_TO_HOST,
            None,
            empty(),
            empty()
        ),
        request!(
            "debug_dump_ws",
            CONTROL_ONLY,
            Some("core.debug.dump_ws"),
            obj(&[("enabled", boolean())], &["enabled"]),
            empty()
        ),
        // --- controller configuration ---------------------------------------
        request!(
            "get_controller_config",
            CONTROL_ONLY,
            Some("core.controller.config.get"),
            empty(),
            obj(&[("serialized_config", any())], &["serialized_config"])
        ),
        request!(
            "set_controller_config_field",
            CONTROL_ONLY,
            Some("core.controller.config.set"),
            obj(&[("field", string()), ("value", any())], &["field", "value"]),
            empty()
        ),
        request!(
            "set_controller_config_prop",
            CONTROL_ONLY,
            Some("core.controller.config.set"),
            obj(
                &[("field", string()), ("prop", string()), ("value", any())],
                &["field", "prop", "value"],
            ),
            empty()
        ),
        // --- host management --------------------------------------------------
        request!(
            "list_hosts",
            CONTROL_ONLY,
            Some("core.host.list"),
            empty(),
            obj(&[("list", array_of(host_shape()))], &["list"])
        ),
        request!(
            "subscribe_hosts",
            CONTROL_ONLY,
            Some("core.host.subscribe"),
            empty(),
            empty()
        ),
        request!(
            "generate_host_token",
            CONTROL_ONLY,
            Some("core.host.generate_token"),
            obj(&[("host_id", integer())], &["host_id"]),
            obj(&[("token", string())], &["token"])
        ),
        request!(
            "create_host_config",
            CONTROL_ONLY,
            Some("core.host.config.create"),
            obj(&[("name", string())], &["name"]),
            obj(&[("serialized_config", any())], &["serialized_config"])
        ),
        // --- instance management -----------------------------------------------
        request!(
            "get_instance",
            CONTROL_ONLY,
            Some("core.instance.get"),
            obj(&[("instance_id", integer())], &["instance_id"]),
            obj(&[("instance", instance_shape())], &["instance"])
        ),
        request!(
            "list_instances",
            CONTROL_ONLY,
            Some("core.instance.list"),
            empty(),
            obj(&[("list", array_of(instance_shape()))], &["list"])
        ),
        request!(
            "subscribe_instances",
            CONTROL_ONLY,
            Some("core.instance.subscribe"),
            empty(),
            empty()
        ),
        request!(
            "create_instance",
            CONTROL_ONLY,
            Some("core.instance.create"),
            obj(&[("name", string()), ("serialized_config", any())], &["name"]),
            obj(&[("instance", instance_shape())], &["instance"])
        ),
        request!(
            "get_instance_config_field",
            CONTROL_ONLY,
            Some("core.instance.get_config"),
            obj(&[("instance_id", integer()), ("field", string())], &["instance_id", "field"]),
            obj(&[("value", any())], &["value"])
        ),
        request!(
            "set_instance_config_field",
            CONTROL_ONLY,
            Some("core.instance.set_config"),
            obj(
                &[("instance_id", integer()), ("field", string()), ("value", any())],
                &["instance_id", "field", "value"],
            ),
            empty()
        ),
        request!(
            "set_instance_config_prop",
            CONTROL_ONLY,
            Some("core.instance.set_config"),
            obj(
                &[
                    ("instance_id", integer()),
                    ("field", string()),
                    ("prop", string()),
                    ("value", any()),
                ],
                &["instance_id", "field", "prop", "value"],
            ),
            empty()
        ),
        request!(
            "assign_instance_host",
            CONTROL_ONLY,
            Some("core.instance.assign_host"),
            obj(
                &[("instance_id", integer()), ("host_id", json!({ "anyOf": [integer(), json!(null)] }))],
                &["instance_id", "host_id"],
            ),
            empty()
        ),
        to_instance!(
            "start_instance",
            "core.instance.start",
            obj(&[("save", json!({ "anyOf": [string(), json!(null)] }))], &[]),
            empty()
        ),
        to_instance!("stop_instance", "core.instance.stop", empty(), empty()),
        to_instance!("kill_instance", "core.instance.kill", empty(), empty()),
        to_instance!("delete_instance", "core.instance.delete", empty(), empty()),
        to_instance!(
            "load_scenario",
            "core.instance.load_scenario",
            obj(&[("scenario", string())], &["scenario"]),
            empty()
        ),
        to_instance!(
            "export_instance_data",
            "core.instance.export_data",
            empty(),
            obj(&[("stream_id", string())], &["stream_id"])
        ),
        to_instance!(
            "extract_players",
            "core.instance.extract_players",
            empty(),
            obj(&[("players", array_of(string()))], &["players"])
        ),
        to_instance!(
            "send_rcon",
            "core.instance.send_rcon",
            obj(&[("command", string())], &["command"]),
            obj(&[("result", string())], &["result"])
        ),
        // --- internal controller <-> host --------------------------------------
        request!(
            "assign_instance",
            CONTROLLER_TO_HOST,
            None,
            obj(&[("instance_id", integer()), ("serialized_config", any())], &["instance_id"]),
            empty()
        ),
        request!(
            "unassign_instance",
            CONTROLLER_TO_HOST,
            None,
            obj(&[("instance_id", integer())], &["instance_id"]),
            empty()
        ),
        request!(
            "update_instances",
            HOST_TO_CONTROLLER,
            None,
            obj(&[("instances", array_of(instance_shape()))], &["instances"]),
            empty()
        ),
        request!(
            "get_metrics",
            CONTROLLER_TO_HOST,
            None,
            empty(),
            obj(&[("serialized_metrics", array_of(any()))], &["serialized_metrics"])
        ),
        // --- save files --------------------------------------------------------
        to_instance!(
            "list_saves",
            "core.instance.save.list",
            empty(),
            obj(&[("list", array_of(string()))], &["list"])
        ),
        to_instance!(
            "create_save",
            "core.instance.save.create",
            obj(&[("name", string())], &["name"]),
            empty()
        ),
        to_instance!(
            "rename_save",
            "core.instance.save.rename",
            obj(&[("old_name", string()), ("new_name", string())], &["old_name", "new_name"]),
            empty()
        ),
        to_instance!(
            "copy_save",
            "core.instance.save.copy",
            obj(&[("source", string()), ("destination", string())], &["source", "destination"]),
            empty()
        ),
        to_instance!(
            "delete_save",
            "core.instance.save.delete",
            obj(&[("name", string())], &["name"]),
            empty()
        ),
        to_instance!(
            "download_save",
            "core.instance.save.download",
            obj(&[("name", string())], &["name"]),
            obj(&[("stream_id", string())], &["stream_id"])
        ),
        to_instance!(
            "transfer_save",
            "core.instance.save.transfer",
            obj(
                &[("name", string()), ("target_instance_id", integer())],
                &["name", "target_instance_id"],
            ),
            empty()
        ),
        to_instance!(
            "pull_save",
            "core.instance.save.pull",
            obj(&[("name", string()), ("url", string())], &["name", "url"]),
            empty()
        ),
        to_instance!(
            "push_save",
            "core.instance.save.push",
            obj(&[("name", string()), ("url", string())], &["name", "url"]),
            empty()
        ),
        request!(
            "subscribe_saves",
            CONTROL_ONLY,
            Some("core.save.subscribe"),
            obj(&[("instance_id", json!({ "anyOf": [integer(), json!(null)] }))], &[]),
            empty()
        ),
        // --- mod packs and mods -------------------------------------------------
        request!(
            "get_mod_pack",
            CONTROL_ONLY,
            Some("core.mod_pack.get"),
            obj(&[("id", integer())], &["id"]),
            obj(&[("mod_pack", any())], &["mod_pack"])
        ),
        request!(
            "create_mod_pack",
            CONTROL_ONLY,
            Some("core.mod_pack.create"),
            obj(&[("mod_pack", any())], &["mod_pack"]),
            obj(&[("mod_pack", any())], &["mod_pack"])
        ),
        request!(
            "update_mod_pack",
            CONTROL_ONLY,
            Some("core.mod_pack.update"),
            obj(&[("id", integer()), ("mod_pack", any())], &["id", "mod_pack"]),
            empty()
        ),
        request!(
            "delete_mod_pack",
            CONTROL_ONLY,
            Some("core.mod_pack.delete"),
            obj(&[("id", integer())], &["id"]),
            empty()
        ),
        request!(
            "list_mod_packs",
            CONTROL_ONLY,
            Some("core.mod_pack.list"),
            empty(),
            obj(&[("list", array_of(any()))], &["list"])
        ),
        request!(
            "search_mod_packs",
            CONTROL_ONLY,
            Some("core.mod_pack.search"),
            obj(&[("query", string())], &["query"]),
            obj(&[("results", array_of(any()))], &["results"])
        ),
        request!(
            "subscribe_mod_packs",
            CONTROL_ONLY,
            Some("core.mod_pack.subscribe"),
            empty(),
            empty()
        ),
        request!(
            "get_mod",
            CONTROL_ONLY,
            Some("core.mod.get"),
            obj(&[("name", string()), ("version", string())], &["name", "version"]),
            obj(&[("mod_info", any())], &["mod_info"])
        ),
        request!(
            "download_mod",
            CONTROL_ONLY,
            Some("core.mod.download"),
            obj(&[("name", string()), ("version", string())], &["name", "version"]),
            obj(&[("stream_id", string())], &["stream_id"])
        ),
        request!(
            "delete_mod",
            CONTROL_ONLY,
            Some("core.mod.delete"),
            obj(&[("name", string()), ("version", string())], &["name", "version"]),
            empty()
        ),
        request!(
            "search_mods",
            CONTROL_ONLY,
            Some("core.mod.search"),
            obj(&[("query", string())], &["query"]),
            obj(&[("results", array_of(any()))], &["results"])
        ),
        request!(
            "list_mods",
            CONTROL_ONLY,
            Some("core.mod.list"),
            empty(),
            obj(&[("list", array_of(any()))], &["list"])
        ),
        request!(
            "subscribe_mods",
            CONTROL_ONLY,
            Some("core.mod.subscribe"),
            empty(),
            empty()
        ),
        // --- users and roles -----------------------------------------------------
        request!(
            "get_user",
            CONTROL_ONLY,
            Some("core.user.get"),
            obj(&[("name", string())], &["name"]),
            obj(&[("user", any())], &["user"])
        ),
        request!(
            "create_user",
            CONTROL_ONLY,
            Some("core.user.create"),
            obj(&[("name", string())], &["name"]),
            obj(&[("user", any())], &["user"])
        ),
        request!(
            "update_user",
            CONTROL_ONLY,
            Some("core.user.update"),
            obj(&[("name", string()), ("user", any())], &["name", "user"]),
            empty()
        ),
        request!(
            "delete_user",
            CONTROL_ONLY,
            Some("core.user.delete"),
            obj(&[("name", string())], &["name"]),
            empty()
        ),
        request!(
            "list_users",
            CONTROL_ONLY,
            Some("core.user.list"),
            empty(),
            obj(&[("list", array_of(any()))], &["list"])
        ),
        request!(
            "subscribe_users",
            CONTROL_ONLY,
            Some("core.user.subscribe"),
            empty(),
            empty()
        ),
        request!(
            "set_user_admin",
            CONTROL_ONLY,
            Some("core.user.set_admin"),
            obj(&[("name", string()), ("admin", boolean())], &["name", "admin"]),
            empty()
        ),
        request!(
            "set_user_banned",
            CONTROL_ONLY,
            Some("core.user.set_banned"),
            obj(
                &[("name", string()), ("banned", boolean()), ("reason", string())],
                &["name", "banned"],
            ),
            empty()
        ),
        request!(
            "set_user_whitelisted",
            CONTROL_ONLY,
            Some("core.user.set_whitelisted"),
            obj(&[("name", string()), ("whitelisted", boolean())], &["name", "whitelisted"]),
            empty()
        ),
        request!(
            "revoke_user_token",
            CONTROL_ONLY,
            Some("core.user.revoke_token"),
            obj(&[("name", string())], &["name"]),
            empty()
        ),
        request!(
            "get_role",
            CONTROL_ONLY,
            Some("core.role.get"),
            obj(&[("id", integer())], &["id"]),
            obj(&[("role", any())], &["role"])
        ),
        request!(
            "create_role",
            CONTROL_ONLY,
            Some("core.role.create"),
            obj(&[("name", string()), ("permissions", array_of(string()))], &["name"]),
            obj(&[("role", any())], &["role"])
        ),
        request!(
            "update_role",
            CONTROL_ONLY,
            Some("core.role.update"),
            obj(&[("id", integer()), ("role", any())], &["id", "role"]),
            empty()
        ),
        request!(
            "delete_role",
            CONTROL_ONLY,
            Some("core.role.delete"),
            obj(&[("id", integer())], &["id"]),
            empty()
        ),
        request!(
            "list_roles",
            CONTROL_ONLY,
            Some("core.role.list"),
            empty(),
            obj(&[("list", array_of(any()))], &["list"])
        ),
        request!(
            "set_default_role_permission",
            CONTROL_ONLY,
            Some("core.role.set_default_permission"),
            obj(&[("permission", string()), ("granted", boolean())], &["permission", "granted"]),
            empty()
        ),
        // --- logs ----------------------------------------------------------------
        request!(
            "subscribe_logs",
            CONTROL_ONLY,
            Some("core.log.subscribe"),
            empty(),
            empty()
        ),
        request!(
            "query_log",
            CONTROL_ONLY,
            Some("core.log.query"),
            obj(&[("max_lines", integer())], &[]),
            obj(&[("log", array_of(any()))], &["log"])
        ),
        // --- events ----------------------------------------------------------------
        event!(
            "debug_ws_message",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("message", any())], &["message"])
        ),
        event!(
            "account_update",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("account", any())], &["account"])
        ),
        event!(
            "host_update",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("host", host_shape())], &["host"])
        ),
        event!(
            "mod_pack_update",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("mod_pack", any())], &["mod_pack"])
        ),
        event!(
            "mod_update",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("mod_info", any())], &["mod_info"])
        ),
        event!(
            "user_update",
            EVENT_TO_CONTROL,
            None,
            None,
            obj(&[("user", any())], &["user"])
        ),
        event!(
            "log_message",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            obj(&[("level", string()), ("message", string())], &["level", "message"])
        ),
        event!(
            "instance_initialized",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            empty()
        ),
        event!(
            "instance_status_changed",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            obj(&[("status", string())], &["status"])
        ),
        event!(
            "instance_update",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            obj(&[("instance", instance_shape())], &["instance"])
        ),
        event!(
            "save_list_update",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            obj(&[("list", array_of(string()))], &["list"])
        ),
        event!(
            "player_event",
            EVENT_TO_CONTROLLER,
            Some(Forward::Controller),
            None,
            obj(&[("player", string()), ("kind", string())], &["player", "kind"])
        ),
        event!(
            "banlist_update",
            EVENT_TO_INSTANCES,
            None,
            Some(Broadcast::Instance),
            obj(
                &[("name", string()), ("banned", boolean()), ("reason", string())],
                &["name", "banned"],
            )
        ),
        event!(
            "adminlist_update",
            EVENT_TO_INSTANCES,
            None,
            Some(Broadcast::Instance),
            obj(&[("name", string()), ("admin", boolean())], &["name", "admin"])
        ),
        event!(
            "whitelist_update",
            EVENT_TO_INSTANCES,
            None,
            Some(Broadcast::Instance),
            obj(&[("name", string()), ("whitelisted", boolean())], &["name", "whitelisted"])
        ),
        event!(
            "sync_user_lists",
            EVENT_HOST_INSTANCE,
            None,
            None,
            obj(
                &[
                    ("banlist", array_of(any())),
                    ("adminlist", array_of(any())),
                    ("whitelist", array_of(any())),
                ],
                &["banlist", "adminlist", "whitelist"],
            )
        ),
        event!(
            "controller_connection_event",
            EVENT_HOST_INSTANCE,
            None,
            None,
            obj(&[("connected", boolean())], &["connected"])
        ),
    ])
}
