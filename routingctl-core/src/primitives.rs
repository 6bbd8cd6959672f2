//! The daemon-facing primitives a leaf action drives (§6). In the original
//! these are `IAmControlReceive` calls; here they are a trait so
//! `routingctl-sim` can supply a fake implementation in tests and a real
//! daemon binding can supply another without touching the action tree.

use crate::error::RoutingResult;
use crate::ids::{Handle, RouteElementId, SinkId, SourceId};
use crate::model::{ConnectionFormat, MuteState, NotificationConfiguration, SourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampType {
    Linear,
    Exponential,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeRamp {
    pub ramp_type: RampType,
    pub time_ms: u16,
}

/// One hop the daemon's route resolver is willing to offer between two
/// endpoints (§4.3 step 2, `getRoute`). `via` is empty for a direct,
/// same-domain hop.
#[derive(Debug, Clone)]
pub struct DaemonRouteHop {
    pub source_id: SourceId,
    pub sink_id: SinkId,
    pub formats: Vec<ConnectionFormat>,
}

/// The asynchronous and synchronous calls a leaf action may issue against
/// the routing daemon. Every asynchronous call returns immediately with a
/// freshly allocated handle; completion arrives later as an acknowledgment
/// the dispatcher routes back to the leaf (§5).
pub trait RoutingPrimitives {
    fn connect(
        &self,
        handle: Handle,
        source_id: SourceId,
        sink_id: SinkId,
        format: ConnectionFormat,
    ) -> RoutingResult<()>;

    fn disconnect(&self, handle: Handle, route_id: RouteElementId) -> RoutingResult<()>;

    fn set_source_state(
        &self,
        handle: Handle,
        source_id: SourceId,
        state: SourceState,
    ) -> RoutingResult<()>;

    fn set_sink_volume(
        &self,
        handle: Handle,
        sink_id: SinkId,
        volume: i16,
        ramp: VolumeRamp,
    ) -> RoutingResult<()>;

    fn set_source_volume(
        &self,
        handle: Handle,
        source_id: SourceId,
        volume: i16,
        ramp: VolumeRamp,
    ) -> RoutingResult<()>;

    /// `hook_user_set_sink_mute_state` (§6) drives this; not in the
    /// original's daemon-primitive enumeration (§6 lists only the volume,
    /// sound-property and notification mutators) but required by the mute
    /// leaf (§4.4 "analogous leaves ... Mute") and by the hook surface — the
    /// gap is resolved in DESIGN.md by treating mute as its own primitive,
    /// analogous to `set_sink_volume`.
    fn set_sink_mute_state(&self, handle: Handle, sink_id: SinkId, mute: MuteState) -> RoutingResult<()>;

    fn set_sink_sound_property(
        &self,
        handle: Handle,
        sink_id: SinkId,
        property: (String, i16),
    ) -> RoutingResult<()>;

    fn set_source_sound_property(
        &self,
        handle: Handle,
        source_id: SourceId,
        property: (String, i16),
    ) -> RoutingResult<()>;

    fn set_sink_notification_configuration(
        &self,
        handle: Handle,
        sink_id: SinkId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()>;

    fn set_source_notification_configuration(
        &self,
        handle: Handle,
        source_id: SourceId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()>;

    /// Best-effort cancellation of an in-flight primitive on timeout (§4.6).
    fn abort_action(&self, handle: Handle);

    /// Candidate hops between two endpoints, as the daemon's routing graph
    /// sees it — independent of whether a topology config entry exists for
    /// them (§4.3 step 5, `non-topology-route-allowed`).
    fn get_route(&self, source_id: SourceId, sink_id: SinkId) -> Vec<DaemonRouteHop>;

    /// Connection format negotiation when a topology step leaves the choice
    /// open (§6 `getConnectionFormatChoice`): defaults to the first format
    /// the daemon reports for the hop.
    fn choose_connection_format(&self, available: &[ConnectionFormat]) -> Option<ConnectionFormat> {
        available.first().copied()
    }
}
