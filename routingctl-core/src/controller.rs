//! The dispatcher (C7) and its owning context (§4.7, §9 "Singletons").
//!
//! `Controller` is the one explicit context the design note in §9 calls for:
//! it owns the registry, handle store, trigger queue and root action, and is
//! created once at startup by the hosting layer (`routingctl-app`) and
//! passed around by reference — there is no process-wide singleton anywhere
//! in this crate, matching `pmocontrol`'s `ControlPoint` context object
//! rather than the original's `CAmHandleStore::instance()`-style statics.

use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::action::container::{
    ClassActionConnect, ClassActionDisconnect, MainConnectionActionConnect,
    MainConnectionActionDisconnect, MainConnectionActionSuspend, VolumeChange,
    VolumeSequenceAction, VolumeTarget,
};
use crate::action::leaf::{
    NotificationConfigAction, NotificationTarget, PropertyTarget, SinkMuteAction, SinkVolumeAction,
    SoundPropertyAction, SourceVolumeAction,
};
use crate::action::root::RootAction;
use crate::action::{ActionCtx, ActionRef, ListOutcome};
use crate::error::{RoutingError, RoutingResult};
use crate::handle_store::HandleStore;
use crate::ids::Handle;
use crate::model::{MuteState, NotificationConfiguration};
use crate::policy::{ActionDescriptor, ActionKind, ParamKey, PolicyEngine};
use crate::primitives::{RoutingPrimitives, VolumeRamp};
use crate::registry::Registry;
use crate::trigger::{Trigger, TriggerQueue};

/// Notification events a command-side IPC stub would subscribe to
/// (SPEC_FULL.md supplement #6). No wire format is specified here — this is
/// ambient plumbing, not the command protocol spec.md keeps out of scope.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    NewMainConnection { connection_name: String },
    RemovedMainConnection { connection_name: String },
    MainConnectionStateChanged { connection_name: String, state: crate::model::ConnectionState },
    VolumeChanged { sink_name: String, volume: i16 },
}

/// The process-wide context (§9 "one explicit Controller context created at
/// startup... passed by reference to all components"). Owns every piece C1,
/// C2, C6 and C8 need; `primitives` and `policy` are the external
/// collaborators spec.md §2 leaves as traits.
pub struct Controller {
    pub registry: Registry,
    pub handles: HandleStore,
    pub triggers: TriggerQueue,
    root: RootAction,
    primitives: Box<dyn RoutingPrimitives>,
    policy: Box<dyn PolicyEngine>,
    events: tokio::sync::broadcast::Sender<ControllerEvent>,
    /// Every action instantiated by the most recent `pump()` call, in
    /// dispatch order. `routingctl-app`'s hook layer reads this right after
    /// a `pump()` it triggered itself to recover e.g. the
    /// `ClassActionConnect` it just built — the only way to answer
    /// `hook_user_connection_request` synchronously (§6) without the
    /// dispatcher handing ids back through some side channel of its own.
    /// Cleared at the start of every `pump()`, so it only ever reflects the
    /// most recent call, never history.
    last_dispatch: Vec<ActionRef>,
}

impl Controller {
    pub fn new(primitives: Box<dyn RoutingPrimitives>, policy: Box<dyn PolicyEngine>) -> Self {
        let (events, _rx) = tokio::sync::broadcast::channel(64);
        Self {
            registry: Registry::new(),
            handles: HandleStore::new(),
            triggers: TriggerQueue::new(),
            root: RootAction::new(),
            primitives,
            policy,
            events,
            last_dispatch: Vec::new(),
        }
    }

    /// Subscribes to the command-side notification stream.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Actions instantiated by the most recent `pump()`, in dispatch order.
    pub fn last_dispatch(&self) -> &[ActionRef] {
        &self.last_dispatch
    }

    /// `getConnectionFormatChoice` (§6), forwarded to the policy engine —
    /// exposed here because `policy` itself is a private field.
    pub fn connection_format_choice(
        &self,
        source_id: crate::ids::SourceId,
        sink_id: crate::ids::SinkId,
        class_id: crate::ids::ClassId,
        possible: &[crate::model::ConnectionFormat],
    ) -> Vec<crate::model::ConnectionFormat> {
        self.policy.connection_format_choice(source_id, sink_id, class_id, possible)
    }

    fn publish(&self, event: ControllerEvent) {
        debug!(?event, "controller event");
        // No subscribers is the common case in tests; a send error here only
        // means nobody is listening, never a failure of the controller itself.
        let _ = self.events.send(event);
    }

    /// The dispatcher loop (§4.7). Runs until the root has in-flight
    /// children it cannot finish synchronously, or the trigger queue is
    /// empty — at which point control returns to whatever marshaled the
    /// inbound hook or acknowledgment onto this task (§5).
    ///
    /// `ActionCtx` is built inline from individual field borrows (rather than
    /// via a helper returning the struct) so the borrow checker can see that
    /// `self.root` is disjoint from the fields `ctx` borrows; a helper method
    /// taking `&mut self` would lock the whole struct for its lifetime.
    pub fn pump(&mut self) {
        self.last_dispatch.clear();
        loop {
            if !self.root.is_empty() {
                let mut ctx = ActionCtx {
                    registry: &mut self.registry,
                    handles: &mut self.handles,
                    triggers: &mut self.triggers,
                    primitives: self.primitives.as_ref(),
                };
                let outcome = self.root.step(&mut ctx);
                if !matches!(outcome, ListOutcome::Completed | ListOutcome::UndoCompleted) {
                    if matches!(outcome, ListOutcome::Failed | ListOutcome::UndoFailed) {
                        warn!(?outcome, "root action reached a failed terminal state");
                        self.root.cleanup();
                    } else {
                        // Still in flight (Blocked): step 1 of §4.7 — no new
                        // trigger is consumed until this settles.
                        return;
                    }
                } else {
                    self.root.cleanup();
                }
            }

            let Some(trigger) = self.triggers.dequeue() else {
                return;
            };

            if let Trigger::ConnectionStateChange { connection_name, state } = &trigger {
                self.publish(ControllerEvent::MainConnectionStateChanged {
                    connection_name: connection_name.clone(),
                    state: *state,
                });
            }

            let kind = trigger.kind();
            let descriptors = {
                let registry = &self.registry;
                self.policy.process(&trigger, registry)
            };
            if descriptors.is_empty() {
                debug!(kind, "policy engine returned no actions, trigger dropped");
                continue;
            }
            info!(kind, count = descriptors.len(), "dispatching action descriptors");
            for descriptor in descriptors {
                match self.instantiate(&descriptor) {
                    Ok(Some(action)) => {
                        self.last_dispatch.push(action.clone());
                        self.root.append(action);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(kind, error = %e, "failed to instantiate action descriptor"),
                }
            }
        }
    }

    /// Routes a daemon acknowledgment to the leaf awaiting it (I4), then
    /// resumes the dispatcher loop since the root may now be unblocked.
    pub fn acknowledge(&mut self, handle: Handle, result: RoutingResult<()>) {
        let Some(leaf) = self.handles.take(handle) else {
            return;
        };
        {
            let mut ctx = ActionCtx {
                registry: &mut self.registry,
                handles: &mut self.handles,
                triggers: &mut self.triggers,
                primitives: self.primitives.as_ref(),
            };
            leaf.borrow_mut().acknowledge(handle, result, &mut ctx);
        }
        self.pump();
    }

    /// Aborts every handle currently outstanding against `tag`, best-effort,
    /// and delivers each an `Aborted` acknowledgment (§9 Open Question: a
    /// deregister hook for an element with outstanding handles marks those
    /// handles aborted rather than deferring deregistration). Call this
    /// before removing the element from the registry.
    pub fn abort_handles_for(&mut self, tag: crate::ids::ElementTag) {
        for handle in self.handles.handles_for(tag) {
            self.primitives.abort_action(handle);
            warn!(%handle, ?tag, "aborting handle for element about to be deregistered");
            let Some(leaf) = self.handles.take(handle) else {
                continue;
            };
            let mut ctx = ActionCtx {
                registry: &mut self.registry,
                handles: &mut self.handles,
                triggers: &mut self.triggers,
                primitives: self.primitives.as_ref(),
            };
            leaf.borrow_mut().acknowledge(
                handle,
                Err(RoutingError::Aborted(format!("element {tag:?} deregistered"))),
                &mut ctx,
            );
        }
    }

    /// Deregisters a source, aborting any outstanding handle tied to it or
    /// to a route hop it anchors first, then cascading the removal of every
    /// main connection that referenced it (§3 Lifecycle, §9 Open Question).
    pub fn deregister_source(&mut self, id: crate::ids::SourceId) {
        for route_id in self.registry.route_elements_for_source(id) {
            self.abort_handles_for(crate::ids::ElementTag::RouteElement(route_id));
        }
        self.abort_handles_for(crate::ids::ElementTag::Source(id));
        self.registry.deregister_source(id);
        self.pump();
    }

    /// Mirrors [`deregister_source`](Self::deregister_source) for sinks.
    pub fn deregister_sink(&mut self, id: crate::ids::SinkId) {
        for route_id in self.registry.route_elements_for_sink(id) {
            self.abort_handles_for(crate::ids::ElementTag::RouteElement(route_id));
        }
        self.abort_handles_for(crate::ids::ElementTag::Sink(id));
        self.registry.deregister_sink(id);
        self.pump();
    }

    /// Deregisters every source and sink owned by `id` first (aborting
    /// their outstanding handles exactly as [`deregister_source`]/
    /// [`deregister_sink`] would individually), then the domain itself
    /// (§3 Lifecycle).
    pub fn deregister_domain(&mut self, id: crate::ids::DomainId) {
        let sources: Vec<_> = self
            .registry
            .sources_in_domain(id)
            .collect();
        let sinks: Vec<_> = self.registry.sinks_in_domain(id).collect();
        for source_id in sources {
            for route_id in self.registry.route_elements_for_source(source_id) {
                self.abort_handles_for(crate::ids::ElementTag::RouteElement(route_id));
            }
            self.abort_handles_for(crate::ids::ElementTag::Source(source_id));
        }
        for sink_id in sinks {
            for route_id in self.registry.route_elements_for_sink(sink_id) {
                self.abort_handles_for(crate::ids::ElementTag::RouteElement(route_id));
            }
            self.abort_handles_for(crate::ids::ElementTag::Sink(sink_id));
        }
        self.registry.deregister_domain(id);
        self.pump();
    }

    /// Routes a wall-clock timeout to the leaf holding `handle` (§4.6, §5
    /// "Cancellation and timeouts").
    pub fn timeout(&mut self, handle: Handle) {
        if let Some(leaf) = self.handles.peek(handle) {
            let mut ctx = ActionCtx {
                registry: &mut self.registry,
                handles: &mut self.handles,
                triggers: &mut self.triggers,
                primitives: self.primitives.as_ref(),
            };
            leaf.borrow_mut().timeout(handle, &mut ctx);
        }
        self.pump();
    }

    // -- descriptor → action-tree instantiation (§4.7 step 4) --------------

    fn instantiate(&mut self, d: &ActionDescriptor) -> RoutingResult<Option<ActionRef>> {
        let Some(kind) = d.kind else {
            return Ok(None);
        };
        let leaf = |a: ActionRef| Ok(Some(a));
        match kind {
            ActionKind::ClassConnect => {
                let class_id = self.class_id(d)?;
                let source_id = self.source_id(d)?;
                let sink_id = self.sink_id(d)?;
                if let Some(existing) =
                    self.registry.find_main_connection(class_id, source_id, sink_id)
                {
                    // P6: idempotent connect still surfaces through the
                    // action tree (so the caller's synchronous id lookup via
                    // `ClassActionConnect::resolved()` behaves identically)
                    // but issues no new daemon primitives beyond whatever
                    // `MainConnectionActionConnect` finds already done.
                    let _ = existing;
                }
                leaf(rc(ClassActionConnect::new(class_id, source_id, sink_id)))
            }
            ActionKind::ClassDisconnect => {
                let class_id = self.class_id(d)?;
                let source_id = self.optional_source_id(d);
                let sink_id = self.optional_sink_id(d);
                leaf(rc(ClassActionDisconnect::new(class_id, source_id, sink_id)))
            }
            ActionKind::MainConnectionConnect => {
                let conn_id = self.main_connection_id(d)?;
                leaf(rc(MainConnectionActionConnect::new(conn_id)))
            }
            ActionKind::MainConnectionDisconnect => {
                let conn_id = self.main_connection_id(d)?;
                leaf(rc(MainConnectionActionDisconnect::new(conn_id)))
            }
            ActionKind::MainConnectionSuspend => {
                let conn_id = self.main_connection_id(d)?;
                leaf(rc(MainConnectionActionSuspend::new(conn_id)))
            }
            ActionKind::VolumeSequence => {
                let mut changes = Vec::new();
                if let Some(name) = d.text(ParamKey::SinkName) {
                    let sink_id = self
                        .registry
                        .sink_by_name(name)
                        .ok_or_else(|| RoutingError::NonExistent(format!("sink {name}")))?
                        .id;
                    let volume = d.int(ParamKey::Volume).unwrap_or_default();
                    changes.push(VolumeChange {
                        target: VolumeTarget::Sink(sink_id),
                        volume,
                        ramp: VolumeRamp { ramp_type: crate::primitives::RampType::Linear, time_ms: 0 },
                    });
                }
                if let Some(name) = d.text(ParamKey::SourceName) {
                    let source_id = self
                        .registry
                        .source_by_name(name)
                        .ok_or_else(|| RoutingError::NonExistent(format!("source {name}")))?
                        .id;
                    let volume = d.int(ParamKey::Volume).unwrap_or_default();
                    changes.push(VolumeChange {
                        target: VolumeTarget::Source(source_id),
                        volume,
                        ramp: VolumeRamp { ramp_type: crate::primitives::RampType::Linear, time_ms: 0 },
                    });
                }
                leaf(rc(VolumeSequenceAction::new(changes)))
            }
            ActionKind::SinkVolume => {
                let sink_id = self.sink_id(d)?;
                let volume = d.int(ParamKey::Volume).unwrap_or_default();
                leaf(rc(SinkVolumeAction::new(
                    sink_id,
                    volume,
                    VolumeRamp { ramp_type: crate::primitives::RampType::Linear, time_ms: 0 },
                )))
            }
            ActionKind::SourceVolume => {
                let source_id = self.source_id(d)?;
                let volume = d.int(ParamKey::Volume).unwrap_or_default();
                leaf(rc(SourceVolumeAction::new(
                    source_id,
                    volume,
                    VolumeRamp { ramp_type: crate::primitives::RampType::Linear, time_ms: 0 },
                )))
            }
            ActionKind::SinkMute => {
                let sink_id = self.sink_id(d)?;
                let mute = if d.boolean(ParamKey::Mute).unwrap_or(false) {
                    MuteState::Muted
                } else {
                    MuteState::Unmuted
                };
                leaf(rc(SinkMuteAction::new(sink_id, mute)))
            }
            ActionKind::SinkSoundProperty => {
                let sink_id = self.sink_id(d)?;
                let (kind, value) = self.property(d)?;
                leaf(rc(SoundPropertyAction::new(PropertyTarget::Sink(sink_id), kind, value)))
            }
            ActionKind::SourceSoundProperty => {
                let source_id = self.source_id(d)?;
                let (kind, value) = self.property(d)?;
                leaf(rc(SoundPropertyAction::new(PropertyTarget::Source(source_id), kind, value)))
            }
            ActionKind::SinkNotificationConfig => {
                let sink_id = self.sink_id(d)?;
                let config = self.notification_config(d)?;
                leaf(rc(NotificationConfigAction::new(NotificationTarget::Sink(sink_id), config)))
            }
            ActionKind::SourceNotificationConfig => {
                let source_id = self.source_id(d)?;
                let config = self.notification_config(d)?;
                leaf(rc(NotificationConfigAction::new(
                    NotificationTarget::Source(source_id),
                    config,
                )))
            }
        }
    }

    fn class_id(&self, d: &ActionDescriptor) -> RoutingResult<crate::ids::ClassId> {
        let name = d
            .text(ParamKey::ClassName)
            .ok_or_else(|| RoutingError::NotPossible("missing class name".into()))?;
        self.registry
            .classes()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("class {name}")))
    }

    fn source_id(&self, d: &ActionDescriptor) -> RoutingResult<crate::ids::SourceId> {
        let name = d
            .text(ParamKey::SourceName)
            .ok_or_else(|| RoutingError::NotPossible("missing source name".into()))?;
        self.registry
            .source_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {name}")))
    }

    fn sink_id(&self, d: &ActionDescriptor) -> RoutingResult<crate::ids::SinkId> {
        let name = d
            .text(ParamKey::SinkName)
            .ok_or_else(|| RoutingError::NotPossible("missing sink name".into()))?;
        self.registry
            .sink_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {name}")))
    }

    fn optional_source_id(&self, d: &ActionDescriptor) -> Option<crate::ids::SourceId> {
        d.text(ParamKey::SourceName).and_then(|n| self.registry.source_by_name(n)).map(|s| s.id)
    }

    fn optional_sink_id(&self, d: &ActionDescriptor) -> Option<crate::ids::SinkId> {
        d.text(ParamKey::SinkName).and_then(|n| self.registry.sink_by_name(n)).map(|s| s.id)
    }

    fn main_connection_id(&self, d: &ActionDescriptor) -> RoutingResult<crate::ids::MainConnectionId> {
        let name = d
            .text(ParamKey::MainConnectionName)
            .ok_or_else(|| RoutingError::NotPossible("missing main connection name".into()))?;
        self.registry
            .main_connections()
            .find(|mc| mc.name == name)
            .map(|mc| mc.id)
            .ok_or_else(|| RoutingError::NonExistent(format!("main connection {name}")))
    }

    fn property(&self, d: &ActionDescriptor) -> RoutingResult<(String, i16)> {
        let kind = d
            .text(ParamKey::PropertyKind)
            .ok_or_else(|| RoutingError::NotPossible("missing property kind".into()))?
            .to_string();
        let value = d
            .int(ParamKey::PropertyValue)
            .ok_or_else(|| RoutingError::NotPossible("missing property value".into()))?
            as i16;
        Ok((kind, value))
    }

    fn notification_config(&self, d: &ActionDescriptor) -> RoutingResult<NotificationConfiguration> {
        let kind = d.int(ParamKey::NotificationKind).unwrap_or_default() as u16;
        let parameter = d.int(ParamKey::NotificationParameter).unwrap_or_default() as i16;
        let status = match d.int(ParamKey::NotificationStatus).unwrap_or_default() {
            1 => crate::model::NotificationStatus::Periodic,
            2 => crate::model::NotificationStatus::Minimum,
            3 => crate::model::NotificationStatus::Maximum,
            4 => crate::model::NotificationStatus::ChangeOnly,
            _ => crate::model::NotificationStatus::Off,
        };
        Ok(NotificationConfiguration { kind, status, parameter })
    }
}

fn rc<A: crate::action::Action + 'static>(action: A) -> ActionRef {
    Rc::new(std::cell::RefCell::new(action))
}

impl Controller {
    /// Surfaces command-side notifications for completed top-level work.
    /// Called by `routingctl-app`'s hook layer after a synchronous
    /// `hook_user_connection_request`/`hook_user_disconnection_request`
    /// resolves a main connection id, so the event carries its final name
    /// (SPEC_FULL.md supplement #6).
    pub fn notify_new_main_connection(&self, connection_name: impl Into<String>) {
        self.publish(ControllerEvent::NewMainConnection { connection_name: connection_name.into() });
    }

    pub fn notify_removed_main_connection(&self, connection_name: impl Into<String>) {
        self.publish(ControllerEvent::RemovedMainConnection { connection_name: connection_name.into() });
    }

    pub fn notify_volume_changed(&self, sink_name: impl Into<String>, volume: i16) {
        self.publish(ControllerEvent::VolumeChanged { sink_name: sink_name.into(), volume });
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("pending_triggers", &self.triggers.len())
            .field("pending_handles", &self.handles.len())
            .finish()
    }
}

/// Convenience re-export for callers matching on acknowledgment kinds.
pub type AckResult = RoutingResult<()>;
