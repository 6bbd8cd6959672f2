//! Interactive-free demo of the controller end to end: registers one
//! domain, a source and a sink, loads a class, then drives a connection
//! request, a volume step and a disconnect entirely through the hook
//! surface `ControllerFacade` exposes — no direct `Controller`/`Registry`
//! access, the same boundary a real daemon binding would have to respect.

use std::rc::Rc;

use anyhow::{Context, Result};
use routingctl_app::ControllerFacade;
use routingctl_config::ControllerConfig;
use routingctl_core::model::{AvailabilityInfo, Availability, AvailabilityReason};
use routingctl_sim::{FakeDaemon, MixingPolicyEngine};

const SAMPLE_CONFIG: &str = r#"
classes:
  - name: Entertainment
    type: Playback
    topologies: []
    default_volume: 60
    volume_persistence: false
"#;

fn available() -> AvailabilityInfo {
    AvailabilityInfo { availability: Availability::Available, reason: AvailabilityReason::NewMedia }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    routingctl_app::startup_controller();

    let config = ControllerConfig::from_yaml(SAMPLE_CONFIG).context("parsing demo configuration")?;

    let daemon = Rc::new(FakeDaemon::new());
    let mut facade =
        ControllerFacade::new(Box::new(Rc::clone(&daemon)), Box::new(MixingPolicyEngine::new(Vec::new())));
    facade.apply_config(&config).context("loading classes")?;

    routingctl_app::set_controller_ready();

    facade.hook_system_register_domain("Local")?;
    facade.hook_system_register_source("MediaPlayer", "Local", "Entertainment")?;
    facade.hook_system_register_sink("Speaker", "Local", "Entertainment")?;
    facade.hook_system_domain_registration_complete("Local")?;
    facade.hook_system_source_availability_state_change("MediaPlayer", available())?;
    facade.hook_system_sink_availability_state_change("Speaker", available())?;

    // The route resolver needs either a topology match or the
    // non-topology-route-allowed fallback; this demo uses the latter so it
    // needs no topology configuration of its own.
    facade.hook_user_set_system_property(routingctl_core::model::NON_TOPOLOGY_ROUTE_ALLOWED, 1)?;
    daemon.add_route(
        routingctl_core::ids::SourceId(1),
        routingctl_core::ids::SinkId(1),
        vec![1],
    );

    println!("requesting connection MediaPlayer -> Speaker");
    let connection_id = facade
        .hook_user_connection_request("MediaPlayer", "Speaker")
        .context("connection request")?;
    println!("main connection id: {connection_id}");

    // Drain whatever asynchronous primitives the connect issued and feed
    // acknowledgments back until the dispatcher has nothing left in flight.
    loop {
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            break;
        }
        for (handle, result) in acks {
            facade.cb_ack(handle, result);
        }
    }

    println!("raising Speaker volume by 15");
    facade.hook_user_volume_step("Speaker", 15)?;
    loop {
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            break;
        }
        for (handle, result) in acks {
            facade.cb_ack(handle, result);
        }
    }

    println!("disconnecting MediaPlayer -> Speaker");
    facade.hook_user_disconnection_request("MediaPlayer:Speaker")?;
    loop {
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            break;
        }
        for (handle, result) in acks {
            facade.cb_ack(handle, result);
        }
    }

    println!("daemon calls issued: {:?}", daemon.calls());

    let normal = routingctl_app::set_controller_rundown(0);
    println!("rundown normal: {normal}");
    Ok(())
}
