//! `MainConnectionActionSuspend` (§4.5).
//!
//! Grounded on `CAmMainConnectionActionSuspend.cpp`: suspending a connection
//! that isn't even connected first runs a full
//! [`MainConnectionActionConnect`](super::main_connection_connect::MainConnectionActionConnect)
//! as a nested child, then pauses the hop sources that nothing else still
//! needs running.

use std::collections::HashSet;

use crate::action::container::leaf_ref;
use crate::action::container::main_connection_connect::MainConnectionActionConnect;
use crate::action::leaf::SourceActionSetState;
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::MainConnectionId;
use crate::model::{ConnectionState, SourceState};
use crate::trigger::Trigger;

pub struct MainConnectionActionSuspend {
    conn_id: MainConnectionId,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl MainConnectionActionSuspend {
    pub fn new(conn_id: MainConnectionId) -> Self {
        Self {
            conn_id,
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

        if matches!(mc.state, ConnectionState::Disconnected | ConnectionState::Unknown) {
            self.children
                .push(leaf_ref(MainConnectionActionConnect::new(self.conn_id)));
        }

        // For each route element's source: pause it only if (it has at most
        // one route-observer, or it is already OFF) and no other main
        // connection is still relying on this hop being CONNECTED (§4.5).
        let mut seen = HashSet::new();
        for route_id in &mc.route {
            let Some(re) = ctx.registry.route_element(*route_id) else {
                continue;
            };
            let source_id = re.source_id;
            if !seen.insert(source_id) {
                continue;
            }
            let low_fanout_or_off = ctx.registry.source(source_id).is_some_and(|s| {
                s.observing_routes.len() <= 1 || s.state == SourceState::Off
            });
            let other_holds_connected =
                re.state == ConnectionState::Connected && ctx.registry.route_element_shared(*route_id, self.conn_id);
            if low_fanout_or_off && !other_holds_connected {
                self.children
                    .push(leaf_ref(SourceActionSetState::new(source_id, SourceState::Paused)));
            }
        }

        self.built = true;
        Ok(())
    }

    fn do_execute(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        let Some(mc) = ctx.registry.main_connection(self.conn_id) else {
            self.status = ActionStatus::Failed;
            return StepOutcome::Err(RoutingError::NonExistent(format!(
                "main connection {}",
                self.conn_id
            )));
        };
        if mc.state == ConnectionState::Suspended {
            self.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }

        if !self.built {
            if let Err(e) = self.build(ctx) {
                self.status = ActionStatus::Failed;
                return StepOutcome::Err(e);
            }
            ctx.registry.register_transition_observer(self.conn_id);
        }
        self.status = ActionStatus::Executing;
        self.drive(ctx)
    }

    fn do_undo(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        self.status = ActionStatus::Undoing;
        self.drive(ctx)
    }

    fn drive(&mut self, ctx: &mut ActionCtx) -> StepOutcome {
        let outcome = self.children.step(ctx);
        match super::status_for_outcome(outcome) {
            None => StepOutcome::WaitForChild,
            Some(ActionStatus::Completed) => {
                if let Some(mc) = ctx.registry.main_connection_mut(self.conn_id) {
                    mc.state = ConnectionState::Suspended;
                }
                ctx.registry.unregister_transition_observer(self.conn_id);
                if let Some(mc) = ctx.registry.main_connection(self.conn_id) {
                    ctx.triggers.enqueue_priority(Trigger::ConnectionStateChange {
                        connection_name: mc.name.clone(),
                        state: ConnectionState::Suspended,
                    });
                }
                self.status = ActionStatus::Completed;
                StepOutcome::Ok
            }
            Some(ActionStatus::Failed) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::Failed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "suspend of main connection {} failed",
                    self.conn_id
                )))
            }
            Some(ActionStatus::UndoComplete) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                ctx.registry.unregister_transition_observer(self.conn_id);
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "undo of main connection {} suspend failed",
                    self.conn_id
                )))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for MainConnectionActionSuspend {
    fn label(&self) -> String {
        format!("MainConnectionActionSuspend({})", self.conn_id)
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
