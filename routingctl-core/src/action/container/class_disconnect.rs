//! `ClassActionDisconnect` (§4.5): selects the main connections in a class
//! matching an optional source/sink filter and appends a
//! `MainConnectionActionDisconnect` per connection.
//!
//! Grounded on `CAmClassActionDisconnect.cpp`. No filter means "every main
//! connection currently owned by this class" (the "disconnect all of
//! Phone" shape a mixing rule issues when a higher-priority class takes
//! over, §1).

use crate::action::container::leaf_ref;
use crate::action::container::main_connection_disconnect::MainConnectionActionDisconnect;
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::{ClassId, SinkId, SourceId};

pub struct ClassActionDisconnect {
    class_id: ClassId,
    source_filter: Option<SourceId>,
    sink_filter: Option<SinkId>,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl ClassActionDisconnect {
    pub fn new(class_id: ClassId, source_filter: Option<SourceId>, sink_filter: Option<SinkId>) -> Self {
        Self {
            class_id,
            source_filter,
            sink_filter,
            children: ChildList::new(ListMode::Sequential, true),
            built: false,
            status: ActionStatus::NotStarted,
            undo_required: true,
        }
    }

    fn build(&mut self, ctx: &mut ActionCtx) {
        let Some(class) = ctx.registry.class(self.class_id) else {
            return;
        };
        let matching: Vec<_> = class
            .main_connections
            .iter()
            .copied()
            .filter(|id| {
                ctx.registry.main_connection(*id).is_some_and(|mc| {
                    self.source_filter.is_none_or(|s| mc.main_source == s)
                        && self.sink_filter.is_none_or(|s| mc.main_sink == s)
                })
            })
            .collect();
        for conn_id in matching {
            self.children
                .push(leaf_ref(MainConnectionActionDisconnect::new(conn_id)));
        }
    }

    fn drive(&mut self, ctx: &mut ActionCtx) -> StepOutcome {
        let outcome = self.children.step(ctx);
        match super::status_for_outcome(outcome) {
            None => StepOutcome::WaitForChild,
            Some(ActionStatus::Completed) => {
                self.status = ActionStatus::Completed;
                StepOutcome::Ok
            }
            Some(ActionStatus::Failed) => {
                self.status = ActionStatus::Failed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "class disconnect on {} failed",
                    self.class_id
                )))
            }
            Some(ActionStatus::UndoComplete) => {
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "undo of class disconnect on {} failed",
                    self.class_id
                )))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for ClassActionDisconnect {
    fn label(&self) -> String {
        format!("ClassActionDisconnect({})", self.class_id)
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

    fn execute(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if !self.built {
            self.build(ctx);
            self.built = true;
        }
        if self.children.is_empty() {
            self.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }
        self.status = ActionStatus::Executing;
        self.drive(ctx)
    }

    fn undo(&mut self, _self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        self.status = ActionStatus::Undoing;
        self.drive(ctx)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
