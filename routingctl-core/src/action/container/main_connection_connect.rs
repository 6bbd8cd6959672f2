//! `MainConnectionActionConnect` (§4.5).
//!
//! Grounded on `CAmMainConnectionActionConnect.cpp`: already-`Connected` is
//! a synchronous no-op; an unroutable connection fails before touching the
//! daemon; otherwise the route is driven in [`SetSourceStateDirection`]
//! order (default: sink -> source, i.e. the route reversed) — one
//! `RouteActionConnect` per hop, then one `SourceActionSetState(On)` per
//! hop's source — and the resulting connection state follows the source's
//! final state (`On` -> `Connected`, anything else -> `Suspended`).

use std::collections::HashSet;

use crate::action::container::{leaf_ref, SetSourceStateDirection};
use crate::action::leaf::{RouteActionConnect, SourceActionSetState};
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::MainConnectionId;
use crate::model::{ConnectionState, SourceState};
use crate::trigger::Trigger;

pub struct MainConnectionActionConnect {
    conn_id: MainConnectionId,
    direction: SetSourceStateDirection,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl MainConnectionActionConnect {
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

        // §4.5 step 2: snapshot the route and reverse it under the default
        // direction (sink -> source), matching
        // `CAmMainConnectionActionConnect.cpp`'s `std::reverse` under the
        // default `SD_MAINSINK_TO_MAINSOURCE`.
        let mut route = mc.route.clone();
        if self.direction == SetSourceStateDirection::MainSinkToMainSource {
            route.reverse();
        }

        for route_id in &route {
            self.children.push(leaf_ref(RouteActionConnect::new(*route_id)));
        }
        // §4.5 step 4: one SourceActionSetState(ON) per route element's
        // source, in the same order — not just the main source, since a
        // multi-hop path (through a gateway) has one source per hop.
        let mut seen = HashSet::new();
        for route_id in &route {
            let Some(re) = ctx.registry.route_element(*route_id) else {
                continue;
            };
            if seen.insert(re.source_id) {
                self.children
                    .push(leaf_ref(SourceActionSetState::new(re.source_id, SourceState::On)));
            }
        }
        self.built = true;
        Ok(())
    }

    /// Publishes the state transition as a `CONNECTION_STATE_CHANGE` trigger
    /// (§7: "every element state change... is published... so policy may
    /// react") so the policy engine sees it on its next dispatch.
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
        if mc.state == ConnectionState::Connected {
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
                mc.state = ConnectionState::Connecting;
            }
        }
        self.status = ActionStatus::Executing;
        self.drive(ctx)
    }

    fn do_undo(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
            mc.state = ConnectionState::Disconnecting;
        }
        self.status = ActionStatus::Undoing;
        self.drive(ctx)
    }

    fn drive(&mut self, ctx: &mut ActionCtx) -> StepOutcome {
        let outcome = self.children.step(ctx);
        match super::status_for_outcome(outcome) {
            None => StepOutcome::WaitForChild,
            Some(ActionStatus::Completed) => {
                let source_state = ctx
                    .registry
                    .main_connection(self.conn_id)
                    .and_then(|mc| ctx.registry.source(mc.main_source))
                    .map(|s| s.state);
                let final_state = match source_state {
                    Some(SourceState::On) => ConnectionState::Connected,
                    _ => ConnectionState::Suspended,
                };
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = final_state;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.publish_state(ctx, final_state);
                self.status = ActionStatus::Completed;
                StepOutcome::Ok
            }
            Some(ActionStatus::Failed) => {
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = ConnectionState::Disconnected;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.publish_state(ctx, ConnectionState::Disconnected);
                self.status = ActionStatus::Failed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "connect of main connection {} failed",
                    self.conn_id
                )))
            }
            Some(ActionStatus::UndoComplete) => {
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = ConnectionState::Disconnected;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "undo of main connection {} connect failed",
                    self.conn_id
                )))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for MainConnectionActionConnect {
    fn label(&self) -> String {
        format!("MainConnectionActionConnect({})", self.conn_id)
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
