//! Entity records owned exclusively by the [`Registry`](super::Registry)
//! (§3 "Entities and identity").

use std::collections::HashMap;

use crate::ids::{
    ClassId, ConverterId, CrossfaderId, DomainId, GatewayId, MainConnectionId, RouteElementId,
    SinkId, SourceId,
};
use crate::model::{
    AvailabilityInfo, ClassType, ConnectionFormat, ConnectionState, DomainState, InterruptState,
    MuteState, NotificationConfiguration, SoundProperties, SourceState,
};

#[derive(Debug, Clone)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub state: DomainState,
}

#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub domain_id: DomainId,
    pub class_id: ClassId,
    pub availability: AvailabilityInfo,
    pub state: SourceState,
    pub interrupt_state: InterruptState,
    pub volume: i16,
    pub main_volume: i16,
    pub sound_properties: SoundProperties,
    pub main_sound_properties: SoundProperties,
    pub notification_configs: Vec<NotificationConfiguration>,
    pub persist_volume: bool,
    /// Route elements whose `source_id` is this source — used by the
    /// shared-source rule (§4.5).
    pub observing_routes: Vec<RouteElementId>,
}

#[derive(Debug, Clone)]
pub struct Sink {
    pub id: SinkId,
    pub name: String,
    pub domain_id: DomainId,
    pub class_id: ClassId,
    pub availability: AvailabilityInfo,
    pub mute_state: MuteState,
    pub volume: i16,
    pub main_volume: i16,
    pub sound_properties: SoundProperties,
    pub main_sound_properties: SoundProperties,
    pub notification_configs: Vec<NotificationConfiguration>,
    pub persist_volume: bool,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    pub id: GatewayId,
    pub name: String,
    pub source_id: SourceId,
    pub sink_id: SinkId,
    pub source_domain_id: DomainId,
    pub sink_domain_id: DomainId,
    pub conversion_matrix: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct Converter {
    pub id: ConverterId,
    pub name: String,
    pub source_id: SourceId,
    pub sink_id: SinkId,
    pub domain_id: DomainId,
    pub conversion_matrix: Vec<bool>,
}

/// Supplemented element (SPEC_FULL.md #1): a source hot-swapped between two
/// sinks. No action drives it (audio DSP / hot-sink behavior is out of
/// scope) — it exists only so register/deregister hooks and the registry's
/// identity model stay faithful to the original hook surface.
#[derive(Debug, Clone)]
pub struct Crossfader {
    pub id: CrossfaderId,
    pub name: String,
    pub source_id: SourceId,
    pub sink_a: SinkId,
    pub sink_b: SinkId,
}

/// A topology element: a concrete element name, or a wildcard matching any
/// already-registered element of the expected kind on this class (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementName {
    Named(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyToken {
    Source(ElementName),
    Sink(ElementName),
    Gateway(ElementName),
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub tokens: Vec<TopologyToken>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub class_type: ClassType,
    pub properties: HashMap<String, i32>,
    pub topologies: Vec<Topology>,
    pub default_volume: i16,
    pub volume_persistence: bool,
    /// Keyed by sink name, or `"*"` for the class-wide default.
    pub last_volume: HashMap<String, i16>,
    pub last_main_connection_volume: HashMap<String, i16>,
    pub last_sound_property: HashMap<String, i16>,
    pub main_connections: Vec<MainConnectionId>,
}

#[derive(Debug, Clone)]
pub struct RouteElement {
    pub id: RouteElementId,
    pub source_id: SourceId,
    pub sink_id: SinkId,
    pub domain_id: DomainId,
    pub connection_format: ConnectionFormat,
    pub state: ConnectionState,
    /// Main connections referencing this hop — reference count driving I3's
    /// dedup and the shared-route disconnect rule (§4.5).
    pub observing_connections: Vec<MainConnectionId>,
}

impl RouteElement {
    pub fn key(&self) -> (SourceId, SinkId, ConnectionFormat) {
        (self.source_id, self.sink_id, self.connection_format)
    }
}

#[derive(Debug, Clone)]
pub struct MainConnection {
    pub id: MainConnectionId,
    pub name: String,
    pub route: Vec<RouteElementId>,
    pub main_source: SourceId,
    pub main_sink: SinkId,
    pub class_id: ClassId,
    pub state: ConnectionState,
    pub priority: i16,
    pub main_volume: i16,
    /// Count of container actions currently registered as transition
    /// observers (I5). Not an id set: nothing needs to distinguish *which*
    /// container, only whether any remain.
    pub transition_observers: u32,
}

impl MainConnection {
    pub fn is_non_terminal(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Disconnecting
        )
    }
}
