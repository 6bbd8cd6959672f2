//! `SinkVolumeAction` (§4.4): ramps one sink to an absolute volume.

use crate::action::leaf::{impl_action_bookkeeping, LeafState};
use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
use crate::error::RoutingResult;
use crate::ids::{Handle, HandleKind, SinkId};
use crate::primitives::VolumeRamp;

pub struct SinkVolumeAction {
    sink_id: SinkId,
    target: i16,
    ramp: VolumeRamp,
    previous: Option<i16>,
    handle: Option<Handle>,
    state: LeafState,
}

impl SinkVolumeAction {
    pub fn new(sink_id: SinkId, target: i16, ramp: VolumeRamp) -> Self {
        Self {
            sink_id,
            target,
            ramp,
            previous: None,
            handle: None,
            state: LeafState::new(),
        }
    }

    fn apply(&mut self, ctx: &mut ActionCtx, self_ref: &ActionRef, target: i16) -> StepOutcome {
        let Some(sink) = ctx.registry.sink(self.sink_id) else {
            self.state.status = ActionStatus::Failed;
            return StepOutcome::Err(crate::error::RoutingError::NonExistent(format!(
                "sink {}",
                self.sink_id
            )));
        };
        if sink.volume == target {
            self.state.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }
        let handle = ctx.handles.save(HandleKind::SetSinkVolume, self_ref.clone());
        match ctx
            .primitives
            .set_sink_volume(handle, self.sink_id, target, self.ramp)
        {
            Ok(()) => {
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
        self.previous = ctx.registry.sink(self.sink_id).map(|s| s.volume);
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

    fn do_acknowledge(&mut self, handle: Handle, result: RoutingResult<()>, ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        self.handle = None;
        let undoing = self.state.status == ActionStatus::Undoing;
        match &result {
            Ok(()) => {
                let value = if undoing { self.previous } else { Some(self.target) };
                if let (Some(value), Some(sink)) = (value, ctx.registry.sink_mut(self.sink_id)) {
                    sink.volume = value;
                }
            }
            Err(_) => {}
        }
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

impl_action_bookkeeping!(SinkVolumeAction, "SinkVolumeAction", |this: &SinkVolumeAction| this
    .handle
    .map(|_| crate::ids::ElementTag::Sink(this.sink_id)));
