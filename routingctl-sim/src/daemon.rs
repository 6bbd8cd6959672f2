//! An in-memory fake of the daemon-side routing primitives (§6). Records
//! every call it receives so a test can assert on what the action tree
//! issued, and queues a pending acknowledgment for every asynchronous call
//! rather than resolving it inline — the test driver decides when (and in
//! what order) to feed each one back through
//! [`Controller::acknowledge`](routingctl_core::Controller::acknowledge),
//! which is what lets S5's out-of-order acknowledgment scenario and S6's
//! never-acknowledged timeout scenario be expressed at all.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use routingctl_core::error::{RoutingError, RoutingResult};
use routingctl_core::ids::{Handle, RouteElementId, SinkId, SourceId};
use routingctl_core::model::{ConnectionFormat, MuteState, NotificationConfiguration, SourceState};
use routingctl_core::primitives::{DaemonRouteHop, RoutingPrimitives, VolumeRamp};

/// One call the action tree issued against the fake daemon, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonCall {
    Connect { source_id: SourceId, sink_id: SinkId, format: ConnectionFormat },
    Disconnect { route_id: RouteElementId },
    SetSourceState { source_id: SourceId, state: SourceState },
    SetSinkVolume { sink_id: SinkId, volume: i16 },
    SetSourceVolume { source_id: SourceId, volume: i16 },
    SetSinkMute { sink_id: SinkId, mute: MuteState },
    SetSinkSoundProperty { sink_id: SinkId, property: (String, i16) },
    SetSourceSoundProperty { source_id: SourceId, property: (String, i16) },
    SetSinkNotificationConfiguration { sink_id: SinkId, config: NotificationConfiguration },
    SetSourceNotificationConfiguration { source_id: SourceId, config: NotificationConfiguration },
    AbortAction { handle: Handle },
}

#[derive(Debug, Default)]
pub struct FakeDaemon {
    routes: RefCell<HashMap<(SourceId, SinkId), Vec<DaemonRouteHop>>>,
    calls: RefCell<Vec<DaemonCall>>,
    pending_acks: RefCell<VecDeque<(Handle, RoutingResult<()>)>>,
    aborted: RefCell<Vec<Handle>>,
    /// Consumed by the next asynchronous call's queued acknowledgment, then
    /// reset to `Ok(())` — lets a test arrange exactly one failing
    /// primitive (S6-style scenarios) without touching every call site.
    next_result: Cell<Option<bool>>,
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one daemon-enumerated hop between `source_id` and
    /// `sink_id` (§4.3 step 1, `get_route`). Topology-driven resolution
    /// additionally needs the endpoints and any gateways registered in the
    /// controller's own registry; this only supplies what `get_route`
    /// reports.
    pub fn add_route(&self, source_id: SourceId, sink_id: SinkId, formats: Vec<ConnectionFormat>) {
        self.routes
            .borrow_mut()
            .entry((source_id, sink_id))
            .or_default()
            .push(DaemonRouteHop { source_id, sink_id, formats });
    }

    /// Arranges for the *next* asynchronous primitive issued to fail
    /// instead of queuing a successful acknowledgment.
    pub fn fail_next_call(&self) {
        self.next_result.set(Some(false));
    }

    pub fn calls(&self) -> Vec<DaemonCall> {
        self.calls.borrow().clone()
    }

    pub fn aborted_handles(&self) -> Vec<Handle> {
        self.aborted.borrow().clone()
    }

    /// Pops every currently queued acknowledgment, in issue order. A test
    /// driving the straight-line happy path calls this after each
    /// `Controller::pump`/hook invocation and feeds the results back via
    /// `Controller::acknowledge`.
    pub fn drain_acks(&self) -> Vec<(Handle, RoutingResult<()>)> {
        self.pending_acks.borrow_mut().drain(..).collect()
    }

    /// Pulls exactly the acknowledgment for `handle` out of the pending
    /// queue, leaving the others queued — S5's "daemon acknowledges H2
    /// first" scenario.
    pub fn take_ack(&self, handle: Handle) -> Option<RoutingResult<()>> {
        let mut pending = self.pending_acks.borrow_mut();
        let idx = pending.iter().position(|(h, _)| *h == handle)?;
        pending.remove(idx).map(|(_, result)| result)
    }

    pub fn pending_handles(&self) -> Vec<Handle> {
        self.pending_acks.borrow().iter().map(|(h, _)| *h).collect()
    }

    fn queue_ack(&self, handle: Handle) {
        let result = if self.next_result.take() == Some(false) {
            Err(RoutingError::DatabaseError("fake daemon: injected failure".into()))
        } else {
            Ok(())
        };
        self.pending_acks.borrow_mut().push_back((handle, result));
    }

    fn record(&self, call: DaemonCall) {
        self.calls.borrow_mut().push(call);
    }
}

/// Lets a test hand the controller a `Box<dyn RoutingPrimitives>` while
/// keeping its own `Rc` to inspect calls and feed back acknowledgments —
/// `FakeDaemon` itself is `!Clone` and `Controller` takes ownership of its
/// primitives, so the shared handle has to be the thing boxed.
impl RoutingPrimitives for std::rc::Rc<FakeDaemon> {
    fn connect(
        &self,
        handle: Handle,
        source_id: SourceId,
        sink_id: SinkId,
        format: ConnectionFormat,
    ) -> RoutingResult<()> {
        (**self).connect(handle, source_id, sink_id, format)
    }

    fn disconnect(&self, handle: Handle, route_id: RouteElementId) -> RoutingResult<()> {
        (**self).disconnect(handle, route_id)
    }

    fn set_source_state(
        &self,
        handle: Handle,
        source_id: SourceId,
        state: SourceState,
    ) -> RoutingResult<()> {
        (**self).set_source_state(handle, source_id, state)
    }

    fn set_sink_volume(
        &self,
        handle: Handle,
        sink_id: SinkId,
        volume: i16,
        ramp: VolumeRamp,
    ) -> RoutingResult<()> {
        (**self).set_sink_volume(handle, sink_id, volume, ramp)
    }

    fn set_source_volume(
        &self,
        handle: Handle,
        source_id: SourceId,
        volume: i16,
        ramp: VolumeRamp,
    ) -> RoutingResult<()> {
        (**self).set_source_volume(handle, source_id, volume, ramp)
    }

    fn set_sink_mute_state(&self, handle: Handle, sink_id: SinkId, mute: MuteState) -> RoutingResult<()> {
        (**self).set_sink_mute_state(handle, sink_id, mute)
    }

    fn set_sink_sound_property(
        &self,
        handle: Handle,
        sink_id: SinkId,
        property: (String, i16),
    ) -> RoutingResult<()> {
        (**self).set_sink_sound_property(handle, sink_id, property)
    }

    fn set_source_sound_property(
        &self,
        handle: Handle,
        source_id: SourceId,
        property: (String, i16),
    ) -> RoutingResult<()> {
        (**self).set_source_sound_property(handle, source_id, property)
    }

    fn set_sink_notification_configuration(
        &self,
        handle: Handle,
        sink_id: SinkId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()> {
        (**self).set_sink_notification_configuration(handle, sink_id, config)
    }

    fn set_source_notification_configuration(
        &self,
        handle: Handle,
        source_id: SourceId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()> {
        (**self).set_source_notification_configuration(handle, source_id, config)
    }

    fn abort_action(&self, handle: Handle) {
        (**self).abort_action(handle)
    }

    fn get_route(&self, source_id: SourceId, sink_id: SinkId) -> Vec<DaemonRouteHop> {
        (**self).get_route(source_id, sink_id)
    }

    fn choose_connection_format(&self, available: &[ConnectionFormat]) -> Option<ConnectionFormat> {
        (**self).choose_connection_format(available)
    }
}

impl RoutingPrimitives for FakeDaemon {
    fn connect(
        &self,
        handle: Handle,
        source_id: SourceId,
        sink_id: SinkId,
        format: ConnectionFormat,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::Connect { source_id, sink_id, format });
        self.queue_ack(handle);
        Ok(())
    }

    fn disconnect(&self, handle: Handle, route_id: RouteElementId) -> RoutingResult<()> {
        self.record(DaemonCall::Disconnect { route_id });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_source_state(
        &self,
        handle: Handle,
        source_id: SourceId,
        state: SourceState,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSourceState { source_id, state });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_sink_volume(
        &self,
        handle: Handle,
        sink_id: SinkId,
        volume: i16,
        _ramp: VolumeRamp,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSinkVolume { sink_id, volume });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_source_volume(
        &self,
        handle: Handle,
        source_id: SourceId,
        volume: i16,
        _ramp: VolumeRamp,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSourceVolume { source_id, volume });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_sink_mute_state(&self, handle: Handle, sink_id: SinkId, mute: MuteState) -> RoutingResult<()> {
        self.record(DaemonCall::SetSinkMute { sink_id, mute });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_sink_sound_property(
        &self,
        handle: Handle,
        sink_id: SinkId,
        property: (String, i16),
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSinkSoundProperty { sink_id, property });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_source_sound_property(
        &self,
        handle: Handle,
        source_id: SourceId,
        property: (String, i16),
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSourceSoundProperty { source_id, property });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_sink_notification_configuration(
        &self,
        handle: Handle,
        sink_id: SinkId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSinkNotificationConfiguration { sink_id, config });
        self.queue_ack(handle);
        Ok(())
    }

    fn set_source_notification_configuration(
        &self,
        handle: Handle,
        source_id: SourceId,
        config: NotificationConfiguration,
    ) -> RoutingResult<()> {
        self.record(DaemonCall::SetSourceNotificationConfiguration { source_id, config });
        self.queue_ack(handle);
        Ok(())
    }

    fn abort_action(&self, handle: Handle) {
        self.record(DaemonCall::AbortAction { handle });
        self.aborted.borrow_mut().push(handle);
        let mut pending = self.pending_acks.borrow_mut();
        pending.retain(|(h, _)| *h != handle);
    }

    fn get_route(&self, source_id: SourceId, sink_id: SinkId) -> Vec<DaemonRouteHop> {
        self.routes.borrow().get(&(source_id, sink_id)).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routingctl_core::ids::HandleKind;

    #[test]
    fn connect_queues_a_successful_ack_by_default() {
        let daemon = FakeDaemon::new();
        let handle = Handle { kind: HandleKind::Connect, ticket: 1 };
        daemon.connect(handle, SourceId(1), SinkId(1), 0).unwrap();
        let acks = daemon.drain_acks();
        assert_eq!(acks, vec![(handle, Ok(()))]);
        assert_eq!(daemon.calls().len(), 1);
    }

    #[test]
    fn fail_next_call_injects_exactly_one_failure() {
        let daemon = FakeDaemon::new();
        daemon.fail_next_call();
        let h1 = Handle { kind: HandleKind::Connect, ticket: 1 };
        let h2 = Handle { kind: HandleKind::Connect, ticket: 2 };
        daemon.connect(h1, SourceId(1), SinkId(1), 0).unwrap();
        daemon.connect(h2, SourceId(1), SinkId(2), 0).unwrap();
        let acks = daemon.drain_acks();
        assert!(acks[0].1.is_err());
        assert!(acks[1].1.is_ok());
    }

    #[test]
    fn take_ack_pulls_out_of_order() {
        let daemon = FakeDaemon::new();
        let h1 = Handle { kind: HandleKind::SetSourceState, ticket: 1 };
        let h2 = Handle { kind: HandleKind::SetSourceState, ticket: 2 };
        daemon.set_source_state(h1, SourceId(1), SourceState::On).unwrap();
        daemon.set_source_state(h2, SourceId(2), SourceState::On).unwrap();
        assert!(daemon.take_ack(h2).unwrap().is_ok());
        assert_eq!(daemon.pending_handles(), vec![h1]);
    }

    #[test]
    fn abort_action_clears_the_pending_ack() {
        let daemon = FakeDaemon::new();
        let handle = Handle { kind: HandleKind::Connect, ticket: 1 };
        daemon.connect(handle, SourceId(1), SinkId(1), 0).unwrap();
        daemon.abort_action(handle);
        assert!(daemon.pending_handles().is_empty());
        assert_eq!(daemon.aborted_handles(), vec![handle]);
    }
}
