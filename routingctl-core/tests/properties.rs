//! Property-based tests for the invariants spec.md §8 calls out (P1-P7),
//! driven against the real dispatcher and the same fake daemon/policy
//! engine `routingctl-sim` ships for scenario tests — grounded on the one
//! crate in the pack that tests state machines this way
//! (`spark-core/tests/state_machine_properties.rs`): generate a sequence of
//! operations with `proptest`, drive the real state machine through it, and
//! assert an invariant over the end state rather than over a shadow model.

use std::rc::Rc;

use proptest::prelude::*;
use routingctl_core::action::container::{ClassActionConnect, MainConnectionActionDisconnect};
use routingctl_core::action::root::RootAction;
use routingctl_core::action::{ActionCtx, ListOutcome};
use routingctl_core::handle_store::HandleStore;
use routingctl_core::ids::{ClassId, DomainId, SinkId, SourceId};
use routingctl_core::model::{
    Availability, AvailabilityInfo, AvailabilityReason, ClassType, ConnectionState, MuteState,
    SourceState,
};
use routingctl_core::registry::{Class, Domain, Registry, Sink, Source};
use routingctl_core::resolver::resolve_route;
use routingctl_core::trigger::{Trigger, TriggerQueue};
use routingctl_core::Controller;
use routingctl_sim::{FakeDaemon, MixingPolicyEngine};

fn available() -> AvailabilityInfo {
    AvailabilityInfo { availability: Availability::Available, reason: AvailabilityReason::Unknown }
}

fn new_source(id: SourceId, name: &str, class_id: ClassId, state: SourceState) -> Source {
    Source {
        id,
        name: name.to_string(),
        domain_id: DomainId(1),
        class_id,
        availability: available(),
        state,
        interrupt_state: routingctl_core::model::InterruptState::Off,
        volume: 0,
        main_volume: 0,
        sound_properties: Default::default(),
        main_sound_properties: Default::default(),
        notification_configs: Vec::new(),
        persist_volume: false,
        observing_routes: Vec::new(),
    }
}

fn new_sink(id: SinkId, name: &str, class_id: ClassId) -> Sink {
    Sink {
        id,
        name: name.to_string(),
        domain_id: DomainId(1),
        class_id,
        availability: available(),
        mute_state: MuteState::Unmuted,
        volume: 40,
        main_volume: 40,
        sound_properties: Default::default(),
        main_sound_properties: Default::default(),
        notification_configs: Vec::new(),
        persist_volume: false,
    }
}

fn new_class(id: ClassId, name: &str) -> Class {
    Class {
        id,
        name: name.to_string(),
        class_type: ClassType::Playback,
        properties: Default::default(),
        topologies: Vec::new(),
        default_volume: 80,
        volume_persistence: false,
        last_volume: Default::default(),
        last_main_connection_volume: Default::default(),
        last_sound_property: Default::default(),
        main_connections: Vec::new(),
    }
}

fn run_to_quiescence(daemon: &FakeDaemon, controller: &mut Controller) {
    loop {
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            break;
        }
        for (handle, result) in acks {
            controller.acknowledge(handle, result);
        }
    }
}

/// Three independent 1:1 source/sink pairs, each reachable only through the
/// `non-topology-route-allowed` fallback, so every request resolves to
/// exactly one hop and the only source of failure is the request itself.
fn three_pair_controller() -> (Rc<FakeDaemon>, Controller) {
    let daemon = Rc::new(FakeDaemon::new());
    let mut controller =
        Controller::new(Box::new(Rc::clone(&daemon)), Box::new(MixingPolicyEngine::new(Vec::new())));
    controller.registry.register_domain(Domain {
        id: DomainId(1),
        name: "Local".into(),
        state: routingctl_core::model::DomainState::Controlled,
    });
    controller.registry.register_class(new_class(ClassId(1), "Entertainment"));
    for i in 1..=3u16 {
        let source_id = SourceId(i);
        let sink_id = SinkId(i);
        controller.registry.register_source(new_source(
            source_id,
            &format!("Source{i}"),
            ClassId(1),
            SourceState::Off,
        ));
        controller.registry.register_sink(new_sink(sink_id, &format!("Sink{i}"), ClassId(1)));
        daemon.add_route(source_id, sink_id, vec![1]);
    }
    controller.registry.set_system_property(routingctl_core::model::NON_TOPOLOGY_ROUTE_ALLOWED, 1);
    (daemon, controller)
}

fn pair_request(pair: u16, connect: bool, controller: &mut Controller) {
    if connect {
        controller.triggers.enqueue(Trigger::UserConnectionRequest {
            source_name: format!("Source{pair}"),
            sink_name: format!("Sink{pair}"),
            class_name: "Entertainment".into(),
        });
    } else {
        controller.triggers.enqueue(Trigger::UserDisconnectRequest {
            connection_name: format!("Source{pair}:Sink{pair}"),
        });
    }
}

/// One step of a randomized connect/disconnect workload: which of the three
/// independent pairs to act on, and whether to connect or disconnect.
fn op_strategy() -> impl Strategy<Value = (u16, bool)> {
    (1..=3u16, any::<bool>())
}

proptest! {
    /// P1 + P6: after an arbitrary sequence of connect/disconnect requests
    /// on independent pairs runs to quiescence, each pair's connection state
    /// matches the last operation applied to it (I1/I2) and repeating a
    /// connect on an already-connected pair never issues a second `Connect`
    /// primitive (idempotent connect).
    #[test]
    fn state_matches_last_operation_and_connect_is_idempotent(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let (daemon, mut controller) = three_pair_controller();
        let mut last_op = [None; 4]; // index by pair (1..=3), slot 0 unused

        for (pair, connect) in ops {
            pair_request(pair, connect, &mut controller);
            controller.pump();
            run_to_quiescence(&daemon, &mut controller);
            last_op[pair as usize] = Some(connect);

            let connect_calls_before = daemon
                .calls()
                .iter()
                .filter(|c| matches!(c, routingctl_sim::DaemonCall::Connect { source_id, .. } if *source_id == SourceId(pair)))
                .count();
            if connect {
                // A second connect request on an already-Connected pair must
                // not add a new Connect call.
                pair_request(pair, true, &mut controller);
                controller.pump();
                run_to_quiescence(&daemon, &mut controller);
                let connect_calls_after = daemon
                    .calls()
                    .iter()
                    .filter(|c| matches!(c, routingctl_sim::DaemonCall::Connect { source_id, .. } if *source_id == SourceId(pair)))
                    .count();
                prop_assert_eq!(connect_calls_after, connect_calls_before.max(1));
            }
        }

        for pair in 1..=3u16 {
            let Some(connect) = last_op[pair as usize] else { continue };
            let expected = if connect { ConnectionState::Connected } else { ConnectionState::Disconnected };
            let mc = controller
                .registry
                .main_connections()
                .find(|mc| mc.main_source == SourceId(pair));
            match mc {
                Some(mc) => prop_assert_eq!(mc.state, expected),
                None => prop_assert!(!connect, "a pair last told to connect must have a main connection"),
            }
        }

        // P2: no handle is ever left outstanding once every trigger this
        // sequence produced has been acknowledged.
        prop_assert!(controller.handles.is_empty());
        prop_assert!(controller.triggers.is_empty());
    }
}

/// Builds two or three main connections that all share one route hop
/// (mirrors the direct-registry-construction S4 scenario) and returns their
/// ids plus the shared hop's id.
fn shared_hop_fixture(registry: &mut Registry, connection_count: usize) -> (Vec<routingctl_core::ids::MainConnectionId>, routingctl_core::ids::RouteElementId) {
    registry.register_domain(Domain {
        id: DomainId(1),
        name: "Local".into(),
        state: routingctl_core::model::DomainState::Controlled,
    });
    registry.register_class(new_class(ClassId(1), "Entertainment"));
    registry.register_sink(new_sink(SinkId(1), "Speaker", ClassId(1)));

    let mut connections = Vec::new();
    let mut shared_hop = None;
    for i in 0..connection_count {
        let source_id = SourceId(i as u16 + 1);
        registry.register_source(new_source(source_id, &format!("Src{i}"), ClassId(1), SourceState::On));
        let conn = registry.allocate_main_connection(
            format!("Src{i}:Speaker"),
            source_id,
            SinkId(1),
            ClassId(1),
            Vec::new(),
        );
        let hop = registry.intern_route_element(source_id, SinkId(1), DomainId(1), 1, conn);
        // Every connection after the first attaches to the first one's hop
        // as its own shared route element instead of getting a fresh one.
        let hop = if let Some(shared) = shared_hop {
            registry.attach_route_observer(shared, conn);
            shared
        } else {
            shared_hop = Some(hop);
            hop
        };
        registry.route_element_mut(hop).unwrap().state = ConnectionState::Connected;
        if let Some(mc) = registry.main_connection_mut(conn) {
            mc.route = vec![hop];
            mc.state = ConnectionState::Connected;
        }
        connections.push(conn);
    }
    (connections, shared_hop.unwrap())
}

fn drive_root(
    root: &mut RootAction,
    registry: &mut Registry,
    handles: &mut HandleStore,
    triggers: &mut TriggerQueue,
    daemon: &FakeDaemon,
) -> ListOutcome {
    loop {
        let outcome = {
            let mut ctx = ActionCtx { registry, handles, triggers, primitives: daemon };
            root.step(&mut ctx)
        };
        if !matches!(outcome, ListOutcome::Blocked) {
            return outcome;
        }
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            return outcome;
        }
        for (handle, result) in acks {
            if let Some(leaf) = handles.take(handle) {
                let mut ctx = ActionCtx { registry, handles, triggers, primitives: daemon };
                leaf.borrow_mut().acknowledge(handle, result, &mut ctx);
            }
        }
    }
}

proptest! {
    /// P3: however many connections share one route hop, and in whatever
    /// order they are disconnected, the hop stays `Connected` until the
    /// last referencing connection tears down, then (and only then) goes
    /// `Disconnected`.
    #[test]
    fn shared_route_element_survives_until_last_referencing_connection_disconnects(
        connection_count in 2..=3usize,
        order_seed in prop::collection::vec(0..3usize, 2..=3),
    ) {
        let mut registry = Registry::new();
        let (connections, shared_hop) = shared_hop_fixture(&mut registry, connection_count);

        // Turn an arbitrary seed of indices into a permutation of
        // `0..connection_count` by repeatedly picking (seed mod remaining).
        let mut remaining: Vec<usize> = (0..connection_count).collect();
        let mut order = Vec::new();
        for raw in order_seed.into_iter().take(connection_count) {
            if remaining.is_empty() {
                break;
            }
            let pick = raw % remaining.len();
            order.push(remaining.remove(pick));
        }
        prop_assert_eq!(order.len(), connection_count);

        let daemon = FakeDaemon::new();
        let mut handles = HandleStore::new();
        let mut triggers = TriggerQueue::new();

        for (step, idx) in order.iter().enumerate() {
            let mut root = RootAction::new();
            root.append(std::rc::Rc::new(std::cell::RefCell::new(
                MainConnectionActionDisconnect::new(connections[*idx]),
            )));
            let outcome = drive_root(&mut root, &mut registry, &mut handles, &mut triggers, &daemon);
            prop_assert!(matches!(outcome, ListOutcome::Completed));

            let is_last = step + 1 == order.len();
            let expected = if is_last { ConnectionState::Disconnected } else { ConnectionState::Connected };
            prop_assert_eq!(registry.route_element(shared_hop).unwrap().state, expected);
        }

        for conn in &connections {
            prop_assert_eq!(registry.main_connection(*conn).unwrap().state, ConnectionState::Disconnected);
        }
    }
}

proptest! {
    /// P7: resolving the same (source, sink, class) request against the
    /// same registry/daemon state twice always produces the same ordered
    /// list of hops — the resolver consults no hidden state.
    #[test]
    fn route_resolution_is_deterministic(hop_count in 1..=3usize, non_topology_allowed in any::<bool>()) {
        let daemon = FakeDaemon::new();
        let mut registry = Registry::new();
        registry.register_domain(Domain {
            id: DomainId(1),
            name: "Local".into(),
            state: routingctl_core::model::DomainState::Controlled,
        });
        registry.register_class(new_class(ClassId(1), "Entertainment"));
        registry.register_source(new_source(SourceId(1), "Src", ClassId(1), SourceState::On));
        registry.register_sink(new_sink(SinkId(1), "Sink", ClassId(1)));
        let formats: Vec<routingctl_core::model::ConnectionFormat> = (1..=hop_count as u16).collect();
        daemon.add_route(SourceId(1), SinkId(1), formats);

        let first = resolve_route(&registry, &daemon, SourceId(1), SinkId(1), ClassId(1), non_topology_allowed);
        let second = resolve_route(&registry, &daemon, SourceId(1), SinkId(1), ClassId(1), non_topology_allowed);

        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.len(), b.len());
                for (ha, hb) in a.iter().zip(b.iter()) {
                    prop_assert_eq!(ha.source_id, hb.source_id);
                    prop_assert_eq!(ha.sink_id, hb.sink_id);
                    prop_assert_eq!(ha.format, hb.format);
                }
            }
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "resolve_route gave different Ok/Err verdicts for identical state"),
        }
    }
}

/// P4: a sequential container that fails partway through undoes every child
/// it had already completed, not just the one that failed. `ClassActionConnect`
/// builds one `MainConnectionActionConnect` child; forcing the daemon's
/// second primitive (the `SourceActionSetState` that follows a successful
/// route connect) to fail drives the whole tree through its undo path, and
/// the already-connected route hop must come back down.
#[test]
fn failing_mid_sequence_undoes_already_completed_steps() {
    let daemon = FakeDaemon::new();
    let mut registry = Registry::new();
    let mut handles = HandleStore::new();
    let mut triggers = TriggerQueue::new();

    registry.register_domain(Domain {
        id: DomainId(1),
        name: "Local".into(),
        state: routingctl_core::model::DomainState::Controlled,
    });
    registry.register_class(new_class(ClassId(1), "Entertainment"));
    registry.register_source(new_source(SourceId(1), "Media", ClassId(1), SourceState::Off));
    registry.register_sink(new_sink(SinkId(1), "Speaker", ClassId(1)));
    registry.set_system_property(routingctl_core::model::NON_TOPOLOGY_ROUTE_ALLOWED, 1);
    daemon.add_route(SourceId(1), SinkId(1), vec![1]);

    let mut root = RootAction::new();
    root.append(Rc::new(std::cell::RefCell::new(ClassActionConnect::new(
        ClassId(1),
        SourceId(1),
        SinkId(1),
    ))));

    loop {
        let outcome = {
            let mut ctx =
                ActionCtx { registry: &mut registry, handles: &mut handles, triggers: &mut triggers, primitives: &daemon };
            root.step(&mut ctx)
        };
        if !matches!(outcome, ListOutcome::Blocked) {
            break;
        }
        let acks = daemon.drain_acks();
        if acks.is_empty() {
            break;
        }
        for (handle, result) in acks {
            // Fail the first acknowledgment after the route hop connects
            // (the source-state leaf) so the tree has one completed child
            // (the route connect) to undo.
            let result = if matches!(result, Ok(())) && daemon.calls().len() > 1 {
                Err(routingctl_core::error::RoutingError::DatabaseError("forced mid-sequence failure".into()))
            } else {
                result
            };
            if let Some(leaf) = handles.take(handle) {
                let mut ctx = ActionCtx {
                    registry: &mut registry,
                    handles: &mut handles,
                    triggers: &mut triggers,
                    primitives: &daemon,
                };
                leaf.borrow_mut().acknowledge(handle, result, &mut ctx);
            }
        }
    }

    assert!(daemon.calls().iter().any(|c| matches!(c, routingctl_sim::DaemonCall::Disconnect { .. })));
    let mc = registry.main_connections().find(|mc| mc.main_source == SourceId(1));
    if let Some(mc) = mc {
        assert_ne!(mc.state, ConnectionState::Connected, "a failed connect must not leave the connection Connected");
    }
}
