//! The local mirror (C2): every entity the controller knows about, indexed
//! by id and by name, plus the two concrete observer relations the action
//! tree consults when deciding whether a route hop or a source may be torn
//! down (§3, §4.5).
//!
//! The original describes a generic "owners and observers" relation keyed by
//! element kind; nothing in this controller ever needs a kind-filtered bag
//! of arbitrary elements, only "which main connections observe this route
//! element" and "which route elements observe this source" — so those two
//! relations are modeled directly on the entities instead (see DESIGN.md).

mod entities;

pub use entities::*;

use std::collections::HashMap;

use tracing::debug;

use crate::ids::{
    ClassId, ConverterId, CrossfaderId, DomainId, GatewayId, MainConnectionId, RouteElementId,
    SinkId, SourceId,
};
use crate::model::{ConnectionFormat, NON_TOPOLOGY_ROUTE_ALLOWED};

#[derive(Debug, Default)]
pub struct Registry {
    domains: HashMap<DomainId, Domain>,
    sources: HashMap<SourceId, Source>,
    sinks: HashMap<SinkId, Sink>,
    gateways: HashMap<GatewayId, Gateway>,
    converters: HashMap<ConverterId, Converter>,
    crossfaders: HashMap<CrossfaderId, Crossfader>,
    classes: HashMap<ClassId, Class>,
    route_elements: HashMap<RouteElementId, RouteElement>,
    main_connections: HashMap<MainConnectionId, MainConnection>,
    system_properties: HashMap<String, i32>,

    next_route_element: u16,
    next_main_connection: u16,
    next_domain: u16,
    next_source: u16,
    next_sink: u16,
    next_gateway: u16,
    next_converter: u16,
    next_crossfader: u16,
    next_class: u16,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_route_element: 1,
            next_main_connection: 1,
            next_domain: 1,
            next_source: 1,
            next_sink: 1,
            next_gateway: 1,
            next_converter: 1,
            next_crossfader: 1,
            next_class: 1,
            ..Default::default()
        }
    }

    // -- id allocation (§3 "stable numeric identifier assigned by the
    // daemon"; `routingctl-app`'s hooks stand in for the daemon side that
    // would otherwise mint these, so allocation lives here next to the
    // route-element/main-connection counters it mirrors) ------------------

    pub fn allocate_domain_id(&mut self) -> DomainId {
        let id = DomainId(self.next_domain);
        self.next_domain += 1;
        id
    }

    pub fn allocate_source_id(&mut self) -> SourceId {
        let id = SourceId(self.next_source);
        self.next_source += 1;
        id
    }

    pub fn allocate_sink_id(&mut self) -> SinkId {
        let id = SinkId(self.next_sink);
        self.next_sink += 1;
        id
    }

    pub fn allocate_gateway_id(&mut self) -> GatewayId {
        let id = GatewayId(self.next_gateway);
        self.next_gateway += 1;
        id
    }

    pub fn allocate_converter_id(&mut self) -> ConverterId {
        let id = ConverterId(self.next_converter);
        self.next_converter += 1;
        id
    }

    pub fn allocate_crossfader_id(&mut self) -> CrossfaderId {
        let id = CrossfaderId(self.next_crossfader);
        self.next_crossfader += 1;
        id
    }

    pub fn allocate_class_id(&mut self) -> ClassId {
        let id = ClassId(self.next_class);
        self.next_class += 1;
        id
    }

    // -- registration (§6 hookSystemRegister*) ---------------------------

    pub fn register_domain(&mut self, domain: Domain) {
        debug!(id = %domain.id, name = %domain.name, "domain registered");
        self.domains.insert(domain.id, domain);
    }

    /// Deregisters a domain and cascades to every source and sink it owns
    /// (§3 Lifecycle: "Sources/sinks/gateways/domains: ... deregistration
    /// removes all main connections that reference them") — a domain going
    /// away takes its elements, and therefore their main connections, with
    /// it.
    pub fn deregister_domain(&mut self, id: DomainId) -> Option<Domain> {
        let orphaned_sources: Vec<_> = self.sources_in_domain(id).collect();
        let orphaned_sinks: Vec<_> = self.sinks_in_domain(id).collect();
        for source_id in orphaned_sources {
            self.deregister_source(source_id);
        }
        for sink_id in orphaned_sinks {
            self.deregister_sink(sink_id);
        }
        self.domains.remove(&id)
    }

    pub fn register_source(&mut self, source: Source) {
        debug!(id = %source.id, name = %source.name, "source registered");
        self.sources.insert(source.id, source);
    }

    /// Deregisters a source and every main connection that references it —
    /// directly as its main source, or via a route hop that now has nowhere
    /// to run (§3 Lifecycle: "deregistration removes all main connections
    /// that reference them").
    pub fn deregister_source(&mut self, id: SourceId) -> Option<Source> {
        let orphaned_routes: Vec<_> = self
            .route_elements
            .values()
            .filter(|re| re.source_id == id)
            .map(|re| re.id)
            .collect();
        self.remove_connections_referencing(|mc| mc.main_source == id, &orphaned_routes);
        for route_id in orphaned_routes {
            self.route_elements.remove(&route_id);
        }
        let removed = self.sources.remove(&id);
        if removed.is_some() {
            debug!(%id, "source deregistered");
        }
        removed
    }

    pub fn register_sink(&mut self, sink: Sink) {
        debug!(id = %sink.id, name = %sink.name, "sink registered");
        self.sinks.insert(sink.id, sink);
    }

    /// Mirrors [`deregister_source`](Self::deregister_source) for sinks.
    pub fn deregister_sink(&mut self, id: SinkId) -> Option<Sink> {
        let orphaned_routes: Vec<_> = self
            .route_elements
            .values()
            .filter(|re| re.sink_id == id)
            .map(|re| re.id)
            .collect();
        self.remove_connections_referencing(|mc| mc.main_sink == id, &orphaned_routes);
        for route_id in orphaned_routes {
            self.route_elements.remove(&route_id);
        }
        let removed = self.sinks.remove(&id);
        if removed.is_some() {
            debug!(%id, "sink deregistered");
        }
        removed
    }

    /// Forcibly removes every main connection matching `endpoint_match` or
    /// referencing one of `orphaned_routes`, regardless of transition
    /// observers — the element backing it is gone, so there is nothing left
    /// to gracefully disconnect. Any leaf action still holding a handle
    /// against the removed element should be aborted by the caller first
    /// (see [`Controller::abort_handles_for`](crate::controller::Controller::abort_handles_for)).
    fn remove_connections_referencing(
        &mut self,
        endpoint_match: impl Fn(&MainConnection) -> bool,
        orphaned_routes: &[RouteElementId],
    ) {
        let doomed: Vec<MainConnectionId> = self
            .main_connections
            .values()
            .filter(|mc| endpoint_match(mc) || mc.route.iter().any(|r| orphaned_routes.contains(r)))
            .map(|mc| mc.id)
            .collect();
        for id in doomed {
            let Some(mc) = self.main_connections.remove(&id) else {
                continue;
            };
            if let Some(class) = self.classes.get_mut(&mc.class_id) {
                class.main_connections.retain(|c| *c != id);
            }
            for route_id in &mc.route {
                if !orphaned_routes.contains(route_id) {
                    self.detach_route_observer(*route_id, id);
                }
            }
            debug!(%id, "main connection removed: referenced element deregistered");
        }
    }

    pub fn register_gateway(&mut self, gw: Gateway) {
        self.gateways.insert(gw.id, gw);
    }

    pub fn deregister_gateway(&mut self, id: GatewayId) -> Option<Gateway> {
        self.gateways.remove(&id)
    }

    pub fn register_converter(&mut self, conv: Converter) {
        self.converters.insert(conv.id, conv);
    }

    pub fn deregister_converter(&mut self, id: ConverterId) -> Option<Converter> {
        self.converters.remove(&id)
    }

    pub fn register_crossfader(&mut self, cf: Crossfader) {
        self.crossfaders.insert(cf.id, cf);
    }

    pub fn deregister_crossfader(&mut self, id: CrossfaderId) -> Option<Crossfader> {
        self.crossfaders.remove(&id)
    }

    pub fn register_class(&mut self, class: Class) {
        self.classes.insert(class.id, class);
    }

    // -- lookups -----------------------------------------------------------

    pub fn domain(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(&id)
    }

    pub fn domain_mut(&mut self, id: DomainId) -> Option<&mut Domain> {
        self.domains.get_mut(&id)
    }

    pub fn domain_by_name(&self, name: &str) -> Option<&Domain> {
        self.domains.values().find(|d| d.name == name)
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.sources.get_mut(&id)
    }

    pub fn source_by_name(&self, name: &str) -> Option<&Source> {
        self.sources.values().find(|s| s.name == name)
    }

    pub fn sources_in_domain(&self, domain_id: DomainId) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.values().filter(move |s| s.domain_id == domain_id).map(|s| s.id)
    }

    pub fn sinks_in_domain(&self, domain_id: DomainId) -> impl Iterator<Item = SinkId> + '_ {
        self.sinks.values().filter(move |s| s.domain_id == domain_id).map(|s| s.id)
    }

    pub fn sink(&self, id: SinkId) -> Option<&Sink> {
        self.sinks.get(&id)
    }

    pub fn sink_mut(&mut self, id: SinkId) -> Option<&mut Sink> {
        self.sinks.get_mut(&id)
    }

    pub fn sink_by_name(&self, name: &str) -> Option<&Sink> {
        self.sinks.values().find(|s| s.name == name)
    }

    pub fn gateway(&self, id: GatewayId) -> Option<&Gateway> {
        self.gateways.get(&id)
    }

    pub fn gateway_mut(&mut self, id: GatewayId) -> Option<&mut Gateway> {
        self.gateways.get_mut(&id)
    }

    pub fn gateway_by_name(&self, name: &str) -> Option<&Gateway> {
        self.gateways.values().find(|g| g.name == name)
    }

    pub fn gateways(&self) -> impl Iterator<Item = &Gateway> {
        self.gateways.values()
    }

    pub fn converters(&self) -> impl Iterator<Item = &Converter> {
        self.converters.values()
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(&id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes.values().find(|c| c.name == name)
    }

    pub fn converter_mut(&mut self, id: ConverterId) -> Option<&mut Converter> {
        self.converters.get_mut(&id)
    }

    pub fn converter_by_name(&self, name: &str) -> Option<&Converter> {
        self.converters.values().find(|c| c.name == name)
    }

    pub fn crossfader_by_name(&self, name: &str) -> Option<&Crossfader> {
        self.crossfaders.values().find(|c| c.name == name)
    }

    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(&id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    pub fn route_element(&self, id: RouteElementId) -> Option<&RouteElement> {
        self.route_elements.get(&id)
    }

    /// Route elements hinging on `id` as their source — used by a caller
    /// about to deregister a source to abort outstanding handles on those
    /// hops first (§9 Open Question resolution).
    pub fn route_elements_for_source(&self, id: SourceId) -> Vec<RouteElementId> {
        self.route_elements.values().filter(|re| re.source_id == id).map(|re| re.id).collect()
    }

    /// Mirrors [`route_elements_for_source`](Self::route_elements_for_source) for sinks.
    pub fn route_elements_for_sink(&self, id: SinkId) -> Vec<RouteElementId> {
        self.route_elements.values().filter(|re| re.sink_id == id).map(|re| re.id).collect()
    }

    pub fn route_element_mut(&mut self, id: RouteElementId) -> Option<&mut RouteElement> {
        self.route_elements.get_mut(&id)
    }

    pub fn main_connection(&self, id: MainConnectionId) -> Option<&MainConnection> {
        self.main_connections.get(&id)
    }

    pub fn main_connection_mut(&mut self, id: MainConnectionId) -> Option<&mut MainConnection> {
        self.main_connections.get_mut(&id)
    }

    pub fn main_connections(&self) -> impl Iterator<Item = &MainConnection> {
        self.main_connections.values()
    }

    // -- route element lifecycle (I3: dedup by (source, sink, format)) -----

    /// Finds an existing route element for this hop, or allocates a fresh
    /// one in `Disconnected` state. Either way the caller's main connection
    /// id is recorded as an observer.
    pub fn intern_route_element(
        &mut self,
        source_id: SourceId,
        sink_id: SinkId,
        domain_id: DomainId,
        format: ConnectionFormat,
        observer: MainConnectionId,
    ) -> RouteElementId {
        let key = (source_id, sink_id, format);
        let existing = self
            .route_elements
            .values()
            .find(|re| re.key() == key)
            .map(|re| re.id);

        let id = existing.unwrap_or_else(|| {
            let id = RouteElementId(self.next_route_element);
            self.next_route_element += 1;
            self.route_elements.insert(
                id,
                RouteElement {
                    id,
                    source_id,
                    sink_id,
                    domain_id,
                    connection_format: format,
                    state: crate::model::ConnectionState::Disconnected,
                    observing_connections: Vec::new(),
                },
            );
            id
        });

        self.attach_route_observer(id, observer);
        if let Some(source) = self.sources.get_mut(&source_id) {
            if !source.observing_routes.contains(&id) {
                source.observing_routes.push(id);
            }
        }
        id
    }

    pub fn attach_route_observer(&mut self, route_id: RouteElementId, conn: MainConnectionId) {
        if let Some(re) = self.route_elements.get_mut(&route_id) {
            if !re.observing_connections.contains(&conn) {
                re.observing_connections.push(conn);
            }
        }
    }

    pub fn detach_route_observer(&mut self, route_id: RouteElementId, conn: MainConnectionId) {
        if let Some(re) = self.route_elements.get_mut(&route_id) {
            re.observing_connections.retain(|c| *c != conn);
        }
        if let Some(re) = self.route_elements.get(&route_id) {
            if re.observing_connections.is_empty() {
                let source_id = re.source_id;
                if let Some(source) = self.sources.get_mut(&source_id) {
                    source.observing_routes.retain(|r| *r != route_id);
                }
                self.route_elements.remove(&route_id);
            }
        }
    }

    /// Count of *other* main connections still observing `route_id` in a
    /// non-`Disconnected` state — the shared-route disconnect rule (§4.5):
    /// a hop stays up if anyone else still needs it.
    pub fn route_element_shared(
        &self,
        route_id: RouteElementId,
        excluding: MainConnectionId,
    ) -> bool {
        let Some(re) = self.route_elements.get(&route_id) else {
            return false;
        };
        re.observing_connections.iter().any(|&conn| {
            conn != excluding
                && self
                    .main_connections
                    .get(&conn)
                    .is_some_and(|mc| mc.state != crate::model::ConnectionState::Disconnected)
        })
    }

    /// Count of *other* route elements still observing `source_id` in a
    /// non-disconnected state — the shared-source rule (§4.5): a source's
    /// `SetState(OFF)` is skipped while another hop still uses it.
    pub fn source_shared(&self, source_id: SourceId, excluding: RouteElementId) -> bool {
        let Some(source) = self.sources.get(&source_id) else {
            return false;
        };
        source.observing_routes.iter().any(|&route_id| {
            route_id != excluding
                && self
                    .route_elements
                    .get(&route_id)
                    .is_some_and(|re| re.state != crate::model::ConnectionState::Disconnected)
        })
    }

    // -- main connection lifecycle -----------------------------------------

    pub fn allocate_main_connection(
        &mut self,
        name: String,
        main_source: SourceId,
        main_sink: SinkId,
        class_id: ClassId,
        route: Vec<RouteElementId>,
    ) -> MainConnectionId {
        let id = MainConnectionId(self.next_main_connection);
        self.next_main_connection += 1;
        self.main_connections.insert(
            id,
            MainConnection {
                id,
                name,
                route,
                main_source,
                main_sink,
                class_id,
                state: crate::model::ConnectionState::Disconnected,
                priority: 0,
                main_volume: 0,
                transition_observers: 0,
            },
        );
        if let Some(class) = self.classes.get_mut(&class_id) {
            class.main_connections.push(id);
        }
        id
    }

    /// Removes a main connection once it is `Disconnected` with no
    /// remaining transition observers (I5 + lifecycle note in §3).
    pub fn try_retire_main_connection(&mut self, id: MainConnectionId) {
        let Some(mc) = self.main_connections.get(&id) else {
            return;
        };
        if mc.state == crate::model::ConnectionState::Disconnected && mc.transition_observers == 0
        {
            let route = mc.route.clone();
            let class_id = mc.class_id;
            self.main_connections.remove(&id);
            if let Some(class) = self.classes.get_mut(&class_id) {
                class.main_connections.retain(|c| *c != id);
            }
            for route_id in route {
                self.detach_route_observer(route_id, id);
            }
            debug!(%id, "main connection retired");
        }
    }

    // -- system properties (§4.3 step 5, §6 hook_user_set_system_property) -

    pub fn set_system_property(&mut self, key: impl Into<String>, value: i32) {
        self.system_properties.insert(key.into(), value);
    }

    pub fn system_property(&self, key: &str) -> Option<i32> {
        self.system_properties.get(key).copied()
    }

    /// Whether the daemon's `non-topology-route-allowed` toggle is set
    /// (non-zero), consulted by the resolver (§4.3 step 5).
    pub fn non_topology_route_allowed(&self) -> bool {
        self.system_property(NON_TOPOLOGY_ROUTE_ALLOWED).unwrap_or(0) != 0
    }

    // -- main connection lookups by endpoint (§4.5 class-level containers) -

    /// Finds a main connection in `class_id` whose (main source, main sink)
    /// matches the requested endpoints — the "existing connection with the
    /// desired endpoints" class-queue lookup used by `ActionConnect` (§4.5)
    /// and P6 (idempotent connect).
    pub fn find_main_connection(
        &self,
        class_id: ClassId,
        source_id: SourceId,
        sink_id: SinkId,
    ) -> Option<MainConnectionId> {
        let class = self.classes.get(&class_id)?;
        class
            .main_connections
            .iter()
            .find(|id| {
                self.main_connections.get(id).is_some_and(|mc| {
                    mc.main_source == source_id && mc.main_sink == sink_id
                })
            })
            .copied()
    }

    pub fn register_transition_observer(&mut self, id: MainConnectionId) {
        if let Some(mc) = self.main_connections.get_mut(&id) {
            mc.transition_observers += 1;
        }
    }

    pub fn unregister_transition_observer(&mut self, id: MainConnectionId) {
        if let Some(mc) = self.main_connections.get_mut(&id) {
            mc.transition_observers = mc.transition_observers.saturating_sub(1);
        }
        self.try_retire_main_connection(id);
    }
}
