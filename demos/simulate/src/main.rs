//! Wires up `control`, `controller`, `host` and `instance` nodes over the
//! in-memory mock transport and runs the multi-hop scenarios from spec.md §8
//! end to end: a forwarded request (#3, permission-checked per #1/#2), a
//! broadcast-to-instances fan-out (#4), and a control-facing subscriber
//! fan-out via `SubscriberSet` (#5). Meant to be read and run, in the
//! teacher's `demo/src/main.rs` spirit — not a test.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use linkmesh::{
    attach_all, catalog, init_logging, mock_pair, send_event, send_request, CallContext, CallerIdentity,
    DownstreamRegistry, HandlerTable, Link, LinkSpec, NoRoutes, Role, SubscriberSet,
};
use serde_json::{json, Value};
use tracing::info;

/// Runs the control -> controller -> host -> instance link-protocol demo
/// end to end over the in-memory mock transport.
#[derive(Parser, Debug)]
#[command(name = "linkmesh-simulate", about = "Illustrates the typed link protocol over the in-memory mock transport")]
struct Args {
    /// Permission granted to the demo's `control` caller identity. Pass a
    /// permission other than `core.instance.start` (or `--grant=` with no
    /// value) to exercise spec.md §8 scenario 2 — the forwarded
    /// `start_instance` request is denied before it ever reaches the host.
    #[arg(long, default_value = "core.instance.start")]
    grant: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let registry = catalog();

    // --- topology: control <-> controller <-> host <-> instance --------
    //
    // Each node owns one `Link` per peer connection. A message forwarded
    // onward is relayed over the *same process's own link to the next
    // hop* — so the handler that receives a forwarded request/event on
    // one link looks up its downstream target among the links *this*
    // process keeps to its children, not among the peer's own links.
    let control_controller = LinkSpec::new(Role::Control, Role::Controller);
    let controller_host = LinkSpec::new(Role::Controller, Role::Host);
    let host_instance = LinkSpec::new(Role::Host, Role::Instance);

    let (conn_control, conn_controller_down) = mock_pair();
    let (conn_controller_up, conn_host_down) = mock_pair();
    let (conn_host_up, conn_instance) = mock_pair();

    // The controller's downstream routing lives on its control-facing
    // link (that's where forwarded requests/events arrive); the host's
    // lives on its controller-facing link, for the same reason.
    let controller_routes = Arc::new(DownstreamRegistry::new());
    let host_routes = Arc::new(DownstreamRegistry::new());

    let link_control = Link::new(control_controller, Role::Control, Arc::new(conn_control), Arc::new(NoRoutes));
    let link_controller_down =
        Link::new(control_controller, Role::Controller, Arc::new(conn_controller_down), controller_routes.clone());
    let link_controller_up =
        Link::new(controller_host, Role::Controller, Arc::new(conn_controller_up), Arc::new(NoRoutes));
    let link_host_down = Link::new(controller_host, Role::Host, Arc::new(conn_host_down), host_routes.clone());
    let link_host_up = Link::new(host_instance, Role::Host, Arc::new(conn_host_up), Arc::new(NoRoutes));
    let link_instance = Link::new(host_instance, Role::Instance, Arc::new(conn_instance), Arc::new(NoRoutes));

    // One host (id 1), one instance (id 7), assigned at startup. The
    // registered downstream is always *this process's own sending link*
    // toward the next hop: the controller forwards over its link to the
    // host (`link_controller_up`), the host forwards over its link to
    // the instance (`link_host_up`).
    host_routes.register(7, link_host_up.clone());
    host_routes.assign_instance(7, 7);
    controller_routes.register(1, link_controller_up.clone());
    controller_routes.assign_instance(7, 1);

    // A second `control` session (e.g. a second dashboard tab) connected to
    // the same controller, to give `SubscriberSet`'s fan-out something to
    // fan out to.
    let (conn_control_2, conn_controller_down_2) = mock_pair();
    let link_control_2 = Link::new(control_controller, Role::Control, Arc::new(conn_control_2), Arc::new(NoRoutes));
    let link_controller_down_2 =
        Link::new(control_controller, Role::Controller, Arc::new(conn_controller_down_2), controller_routes.clone());

    // --- handlers ---------------------------------------------------------
    let control_handlers = HandlerTable::new().on_event("host_update", |_ctx: CallContext, data: Value| async move {
        info!(?data, "control: received host_update");
        Ok(())
    });

    let instance_handlers = HandlerTable::new()
        .on_request("start_instance", |_ctx: CallContext, data: Value| async move {
            info!(instance_id = ?data.get("instance_id"), save = ?data.get("save"), "instance: starting");
            Ok(json!({}))
        })
        .on_event("banlist_update", |_ctx: CallContext, data: Value| async move {
            info!(?data, "instance: received banlist update");
            Ok(())
        });

    let empty_handlers = HandlerTable::new();

    attach_all(registry, &link_instance, &instance_handlers).context("instance attach")?;
    attach_all(registry, &link_host_up, &empty_handlers).context("host-to-instance attach")?;
    attach_all(registry, &link_host_down, &empty_handlers).context("host-to-controller attach")?;
    attach_all(registry, &link_controller_up, &empty_handlers).context("controller-to-host attach")?;
    attach_all(registry, &link_controller_down, &empty_handlers).context("controller-to-control attach")?;
    attach_all(registry, &link_controller_down_2, &empty_handlers).context("controller-to-control (2) attach")?;
    attach_all(registry, &link_control, &control_handlers).context("control attach")?;
    attach_all(registry, &link_control_2, &control_handlers).context("control (2) attach")?;

    // `control`'s caller identity lives on the controller's end of the
    // control-controller link, the end that actually runs the permission
    // check (spec.md §4.5) — including for `start_instance`'s forwarding
    // handler, since it carries a `permission` of its own.
    link_controller_down.set_identity(CallerIdentity::new("demo-admin", HashSet::from([args.grant.clone()])));

    // --- scenario 3 (or 2, with `--grant` set to anything but
    // "core.instance.start"): forwarded request control -> controller ->
    // host -> instance, permission-checked at the controller before it is
    // ever forwarded.
    match send_request(registry, &link_control, "start_instance", json!({"instance_id": 7, "save": "a.zip"})).await {
        Ok(response) => info!(?response, "control: start_instance completed"),
        Err(err) => info!(error = %err, granted = %args.grant, "control: start_instance was refused"),
    }

    // --- scenario 4: broadcast fan-out. The controller originates the
    // banlist_update (e.g. from an admin action on `control`); each host
    // rebroadcasts it to every instance it owns. With one host and one
    // instance here, the instance observes exactly one copy.
    send_event(
        registry,
        &link_controller_up,
        "banlist_update",
        json!({"name": "griefer", "banned": true, "reason": "demo"}),
    )
    .await
    .context("banlist_update should send")?;

    // --- scenario 5: control-facing fan-out. Every connected `control`
    // session subscribes to host status pushes; the controller publishes
    // one `host_update` and `SubscriberSet` delivers it to each of them
    // (and would quietly drop any session that had since disconnected).
    let host_subscribers = SubscriberSet::new();
    host_subscribers.subscribe(&link_controller_down);
    host_subscribers.subscribe(&link_controller_down_2);
    host_subscribers
        .publish("host_update", json!({"host": {"id": 1, "name": "demo-host", "connected": true}}))
        .await;
    info!(subscribers = host_subscribers.subscriber_count(), "controller: published host_update");

    // Give the spawned dispatch tasks a moment to finish logging before exit.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    Ok(())
}
