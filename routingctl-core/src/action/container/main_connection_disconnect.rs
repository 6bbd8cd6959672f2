//! `MainConnectionActionDisconnect` (§4.5).
//!
//! Grounded on `CAmMainConnectionActionDisconnect.cpp`, mirroring
//! [`MainConnectionActionConnect`](super::main_connection_connect::MainConnectionActionConnect)
//! with the shared-route and shared-source skip rules: a hop or a source is
//! only torn down if nothing else still needs it (P3).

use std::collections::HashSet;

use crate::action::container::leaf_ref;
use crate::action::leaf::{RouteActionDisconnect, SourceActionSetState};
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::MainConnectionId;
use crate::model::{ConnectionState, SourceState};
use crate::trigger::Trigger;

/// Order in which a main connection's hops are driven relative to its
/// source-vs-sink endpoints (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSourceStateDirection {
    MainSinkToMainSource,
    MainSourceToMainSink,
}

impl Default for SetSourceStateDirection {
    fn default() -> Self {
        SetSourceStateDirection::MainSinkToMainSource
    }
}

pub struct MainConnectionActionDisconnect {
    conn_id: MainConnectionId,
    direction: SetSourceStateDirection,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl MainConnectionActionDisconnect {
    pub fn new(conn_id: MainConnectionId) -> Self {
        Self::with_direction(conn_id, SetSourceStateDirection::default())
    }

    pub fn with_direction(conn_id: MainConnectionId, direction: SetSourceStateDirection) -> Self {
        Self {
            conn_id,
            direction,
            children: ChildList::new(ListMode::Sequential, true),
            built: false,
            status: ActionStatus::NotStarted,
            undo_required: true,
        }
    }

    fn build(&mut self, ctx: &mut ActionCtx) -> Result<(), RoutingError> {
        let mc = ctx
            .registry
            .main_connection(self.conn_id)
            .ok_or_else(|| RoutingError::NonExistent(format!("main connection {}", self.conn_id)))?
            .clone();

        // §4.5: reverse under the default direction (sink -> source), matching
        // `CAmMainConnectionActionDisconnect.cpp`'s `std::reverse` under the
        // default `SD_MAINSINK_TO_MAINSOURCE`.
        let mut route = mc.route.clone();
        if self.direction == SetSourceStateDirection::MainSinkToMainSource {
            route.reverse();
        }

        // Shared-source rule (§4.5): a SourceActionSetState(OFF) is emitted
        // only if the source has no other route-observer in a non-DISCONNECTED
        // state and its current state is not UNKNOWN.
        let mut seen_sources = HashSet::new();
        for route_id in &route {
            let Some(re) = ctx.registry.route_element(*route_id) else {
                continue;
            };
            let (source_id, state) = (re.source_id, re.state);
            if !seen_sources.insert(source_id) {
                continue;
            }
            let source_known = ctx
                .registry
                .source(source_id)
                .is_some_and(|s| s.state != SourceState::Unknown);
            if source_known && !ctx.registry.source_shared(source_id, *route_id) {
                self.children
                    .push(leaf_ref(SourceActionSetState::new(source_id, SourceState::Off)));
            }
            let _ = state;
        }

        // Shared-route rule + domain-gone skip: route elements with domain 0
        // (domain deregistered) are skipped entirely; shared hops are left
        // connected for the remaining observer.
        for route_id in &route {
            let Some(re) = ctx.registry.route_element(*route_id) else {
                continue;
            };
            if re.domain_id == crate::ids::DomainId(0) {
                continue;
            }
            if ctx.registry.route_element_shared(*route_id, self.conn_id) {
                continue;
            }
            self.children
                .push(leaf_ref(RouteActionDisconnect::new(*route_id)));
        }

        self.built = true;
        Ok(())
    }

    fn publish_state(&self, ctx: &mut ActionCtx, state: ConnectionState) {
        if let Some(mc) = ctx.registry.main_connection(self.conn_id) {
            ctx.triggers.enqueue_priority(Trigger::ConnectionStateChange {
                connection_name: mc.name.clone(),
                state,
            });
        }
    }

    fn do_execute(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        let Some(mc) = ctx.registry.main_connection(self.conn_id) else {
            self.status = ActionStatus::Failed;
            return StepOutcome::Err(RoutingError::NonExistent(format!(
                "main connection {}",
                self.conn_id
            )));
        };
        if mc.state == ConnectionState::Disconnected {
            self.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }

        if !self.built {
            if let Err(e) = self.build(ctx) {
                self.status = ActionStatus::Failed;
                return StepOutcome::Err(e);
            }
            ctx.registry.register_transition_observer(self.conn_id);
            if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                mc.state = ConnectionState::Disconnecting;
            }
        }
        self.status = ActionStatus::Executing;
        self.drive(ctx)
    }

    fn do_undo(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
            mc.state = ConnectionState::Connecting;
        }
        self.status = ActionStatus::Undoing;
        self.drive(ctx)
    }

    fn drive(&mut self, ctx: &mut ActionCtx) -> StepOutcome {
        let outcome = self.children.step(ctx);
        match super::status_for_outcome(outcome) {
            None => StepOutcome::WaitForChild,
            Some(ActionStatus::Completed) => {
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = ConnectionState::Disconnected;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.publish_state(ctx, ConnectionState::Disconnected);
                self.status = ActionStatus::Completed;
                StepOutcome::Ok
            }
            Some(ActionStatus::Failed) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::Failed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "disconnect of main connection {} failed",
                    self.conn_id
                )))
            }
            Some(ActionStatus::UndoComplete) => {
                let source_state = ctx
                    .registry
                    .main_connection(self.conn_id)
                    .and_then(|mc| ctx.registry.source(mc.main_source))
                    .map(|s| s.state);
                let restored = match source_state {
                    Some(SourceState::On) => ConnectionState::Connected,
                    _ => ConnectionState::Suspended,
                };
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = restored;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "undo of main connection {} disconnect failed",
                    self.conn_id
                )))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for MainConnectionActionDisconnect {
    fn label(&self) -> String {
        format!("MainConnectionActionDisconnect({})", self.conn_id)
    }

    fn status(&self) -> ActionStatus {
        self.status
    }

    fn undo_required(&self) -> bool {
        self.undo_required
    }

    fn set_undo_required(&mut self, required: bool) {
        self.undo_required = required;
    }

    fn execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        self.do_execute(self_ref, ctx)
    }

    fn undo(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        self.do_undo(self_ref, ctx)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
