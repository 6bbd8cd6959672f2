//! Route resolver (C3, §4.3): turns a `(source, sink, class)` request into
//! an ordered list of route-element specs, by walking the class's topology
//! entries and falling back to the daemon's raw routing graph when none
//! matches and the system allows it.

use crate::error::{RoutingError, RoutingResult};
use crate::ids::{ClassId, DomainId, SinkId, SourceId};
use crate::model::{ConnectionFormat, NON_TOPOLOGY_ROUTE_ALLOWED};
use crate::primitives::RoutingPrimitives;
use crate::registry::{ElementName, Registry, TopologyToken};

/// One resolved hop, not yet interned into the registry as a `RouteElement`.
#[derive(Debug, Clone)]
pub struct RouteHopSpec {
    pub source_id: SourceId,
    pub sink_id: SinkId,
    pub domain_id: DomainId,
    pub format: ConnectionFormat,
}

#[derive(Debug, Clone, Copy)]
enum Waypoint {
    Source(SourceId, DomainId),
    Sink(SinkId, DomainId),
}

/// Whether the daemon's `non-topology-route-allowed` system property is
/// set — passed in rather than read from a registry-wide property bag,
/// since it is the only system property the resolver consults.
pub fn resolve_route(
    registry: &Registry,
    primitives: &dyn RoutingPrimitives,
    source_id: SourceId,
    sink_id: SinkId,
    class_id: ClassId,
    non_topology_route_allowed: bool,
) -> RoutingResult<Vec<RouteHopSpec>> {
    let source = registry
        .source(source_id)
        .ok_or_else(|| RoutingError::NonExistent(format!("source {source_id}")))?;
    let sink = registry
        .sink(sink_id)
        .ok_or_else(|| RoutingError::NonExistent(format!("sink {sink_id}")))?;

    if let Some(class) = registry.class(class_id) {
        for topology in &class.topologies {
            if let Some(waypoints) = match_topology(registry, topology, source_id, sink_id) {
                if let Some(hops) = waypoints_to_hops(primitives, &waypoints) {
                    return Ok(hops);
                }
            }
        }
    }

    if non_topology_route_allowed {
        let candidates = primitives.get_route(source_id, sink_id);
        if let Some(hop) = candidates.first() {
            let format = primitives
                .choose_connection_format(&hop.formats)
                .ok_or_else(|| RoutingError::NoRoute {
                    source: source.name.clone(),
                    sink: sink.name.clone(),
                })?;
            return Ok(vec![RouteHopSpec {
                source_id,
                sink_id,
                domain_id: sink.domain_id,
                format,
            }]);
        }
    }

    Err(RoutingError::NoRoute {
        source: source.name.clone(),
        sink: sink.name.clone(),
    })
}

/// Attempts to match one topology entry against the requested endpoints,
/// substituting wildcard tokens for concrete registered elements and
/// expanding gateway tokens into their two conversion-boundary waypoints.
fn match_topology(
    registry: &Registry,
    topology: &crate::registry::Topology,
    source_id: SourceId,
    sink_id: SinkId,
) -> Option<Vec<Waypoint>> {
    let mut waypoints = Vec::new();
    let mut tokens = topology.tokens.iter().peekable();

    while let Some(token) = tokens.next() {
        match token {
            TopologyToken::Source(name) => {
                let id = match name {
                    ElementName::Wildcard => source_id,
                    ElementName::Named(n) => registry.source_by_name(n)?.id,
                };
                if waypoints.is_empty() && id != source_id {
                    return None;
                }
                let domain = registry.source(id)?.domain_id;
                waypoints.push(Waypoint::Source(id, domain));
            }
            TopologyToken::Sink(name) => {
                let id = match name {
                    ElementName::Wildcard => sink_id,
                    ElementName::Named(n) => registry.sink_by_name(n)?.id,
                };
                let domain = registry.sink(id)?.domain_id;
                waypoints.push(Waypoint::Sink(id, domain));
            }
            TopologyToken::Gateway(name) => {
                let gw = match name {
                    ElementName::Wildcard => registry.gateways().next()?,
                    ElementName::Named(n) => registry.gateway_by_name(n)?,
                };
                waypoints.push(Waypoint::Sink(gw.sink_id, gw.sink_domain_id));
                waypoints.push(Waypoint::Source(gw.source_id, gw.source_domain_id));
            }
            TopologyToken::LBracket => {
                // An optional bracketed span: if the single gateway token it
                // wraps isn't registered, skip straight to the matching
                // RBracket and keep walking with the endpoints on either
                // side joined directly.
                if let Some(TopologyToken::Gateway(name)) = tokens.peek().cloned() {
                    let present = match name {
                        ElementName::Wildcard => registry.gateways().next().is_some(),
                        ElementName::Named(n) => registry.gateway_by_name(n).is_some(),
                    };
                    if !present {
                        // consume Gateway token and the closing bracket
                        tokens.next();
                        if !matches!(tokens.peek(), Some(TopologyToken::RBracket)) {
                            return None;
                        }
                        tokens.next();
                    }
                }
            }
            TopologyToken::RBracket => {}
        }
    }

    // The final waypoint must land on the requested sink.
    match waypoints.last() {
        Some(Waypoint::Sink(id, _)) if *id == sink_id => Some(waypoints),
        _ => None,
    }
}

fn waypoints_to_hops(
    primitives: &dyn RoutingPrimitives,
    waypoints: &[Waypoint],
) -> Option<Vec<RouteHopSpec>> {
    let mut hops = Vec::new();
    let mut i = 0;
    while i + 1 < waypoints.len() {
        match (waypoints[i], waypoints[i + 1]) {
            (Waypoint::Source(source_id, _), Waypoint::Sink(sink_id, domain_id)) => {
                let candidates = primitives.get_route(source_id, sink_id);
                let hop = candidates.first()?;
                let format = primitives.choose_connection_format(&hop.formats)?;
                hops.push(RouteHopSpec {
                    source_id,
                    sink_id,
                    domain_id,
                    format,
                });
                i += 1;
            }
            // Sink -> Source adjacency is a gateway's own conversion
            // boundary, not a route element in its own right.
            (Waypoint::Sink(_, _), Waypoint::Source(_, _)) => {
                i += 1;
            }
            _ => return None,
        }
    }
    if hops.is_empty() {
        None
    } else {
        Some(hops)
    }
}
