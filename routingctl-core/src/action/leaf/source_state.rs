//! `SourceActionSetState` (§4.4): drives one source to a target
//! `SourceState`.
//!
//! Grounded on `CAmSourceActionSetState.cpp`: already-at-target is a
//! synchronous no-op; otherwise the state is applied to the mirror
//! optimistically and confirmed (or rolled back) on acknowledgment.

use crate::action::leaf::{impl_action_bookkeeping, LeafState};
use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
use crate::error::RoutingResult;
use crate::ids::{Handle, HandleKind, SourceId};
use crate::model::SourceState;

pub struct SourceActionSetState {
    source_id: SourceId,
    target: SourceState,
    previous: Option<SourceState>,
    handle: Option<Handle>,
    state: LeafState,
}

impl SourceActionSetState {
    pub fn new(source_id: SourceId, target: SourceState) -> Self {
        Self {
            source_id,
            target,
            previous: None,
            handle: None,
            state: LeafState::new(),
        }
    }

    fn apply(&mut self, ctx: &mut ActionCtx, self_ref: &ActionRef, target: SourceState) -> StepOutcome {
        let Some(source) = ctx.registry.source(self.source_id) else {
            self.state.status = ActionStatus::Failed;
            return StepOutcome::Err(crate::error::RoutingError::NonExistent(format!(
                "source {}",
                self.source_id
            )));
        };
        if source.state == target {
            self.state.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }

        let handle = ctx.handles.save(HandleKind::SetSourceState, self_ref.clone());
        match ctx.primitives.set_source_state(handle, self.source_id, target) {
            Ok(()) => {
                if let Some(source) = ctx.registry.source_mut(self.source_id) {
                    source.state = target;
                }
                self.handle = Some(handle);
                StepOutcome::WaitForChild
            }
            Err(e) => {
                ctx.handles.clear(handle);
                self.state.status = ActionStatus::Failed;
                StepOutcome::Err(e)
            }
        }
    }

    fn do_execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        self.previous = ctx.registry.source(self.source_id).map(|s| s.state);
        let target = self.target;
        let outcome = self.apply(ctx, self_ref, target);
        if matches!(outcome, StepOutcome::WaitForChild) {
            self.state.status = ActionStatus::Executing;
        }
        outcome
    }

    fn do_undo(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        let Some(previous) = self.previous else {
            self.state.status = ActionStatus::UndoComplete;
            return StepOutcome::Ok;
        };
        let outcome = self.apply(ctx, self_ref, previous);
        match outcome {
            StepOutcome::Ok => self.state.status = ActionStatus::UndoComplete,
            StepOutcome::WaitForChild => self.state.status = ActionStatus::Undoing,
            StepOutcome::Err(_) => self.state.status = ActionStatus::UndoFailed,
        }
        outcome
    }

    fn do_acknowledge(&mut self, handle: Handle, result: RoutingResult<()>, _ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        self.handle = None;
        let undoing = self.state.status == ActionStatus::Undoing;
        self.state.status = match (undoing, result) {
            (false, Ok(())) => ActionStatus::Completed,
            (false, Err(_)) => ActionStatus::Failed,
            (true, Ok(())) => ActionStatus::UndoComplete,
            (true, Err(_)) => ActionStatus::UndoFailed,
        };
    }

    fn do_timeout(&mut self, handle: Handle, ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        ctx.primitives.abort_action(handle);
        ctx.handles.clear(handle);
        self.handle = None;
        self.state.status = if self.state.status == ActionStatus::Undoing {
            ActionStatus::UndoFailed
        } else {
            ActionStatus::Failed
        };
    }
}

impl_action_bookkeeping!(
    SourceActionSetState,
    "SourceActionSetState",
    |this: &SourceActionSetState| this.handle.map(|_| crate::ids::ElementTag::Source(this.source_id))
);
