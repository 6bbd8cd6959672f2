//! `SoundPropertyAction` (§4.4): sets one sound property (e.g. Bass,
//! Treble) on either a sink or a source. The two sides share identical
//! semantics in the original (`CAmSinkSoundPropertyAction` /
//! `CAmSourceSoundPropertyAction`), so this leaf is parameterized over
//! which endpoint it targets instead of being duplicated.

use crate::action::leaf::{impl_action_bookkeeping, LeafState};
use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
use crate::error::RoutingResult;
use crate::ids::{Handle, HandleKind, SinkId, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    Sink(SinkId),
    Source(SourceId),
}

pub struct SoundPropertyAction {
    target: PropertyTarget,
    property: String,
    value: i16,
    previous: Option<i16>,
    handle: Option<Handle>,
    state: LeafState,
}

impl SoundPropertyAction {
    pub fn new(target: PropertyTarget, property: impl Into<String>, value: i16) -> Self {
        Self {
            target,
            property: property.into(),
            value,
            previous: None,
            handle: None,
            state: LeafState::new(),
        }
    }

    fn current(&self, ctx: &ActionCtx) -> Option<i16> {
        match self.target {
            PropertyTarget::Sink(id) => ctx.registry.sink(id)?.sound_properties.get(&self.property),
            PropertyTarget::Source(id) => ctx
                .registry
                .source(id)?
                .sound_properties
                .get(&self.property),
        }
    }

    fn apply(&mut self, ctx: &mut ActionCtx, self_ref: &ActionRef, value: i16) -> StepOutcome {
        if self.current(ctx) == Some(value) {
            self.state.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }
        let property = (self.property.clone(), value);
        let (kind, outcome) = match self.target {
            PropertyTarget::Sink(id) => {
                let handle = ctx
                    .handles
                    .save(HandleKind::SetSinkSoundProperty, self_ref.clone());
                (
                    handle,
                    ctx.primitives.set_sink_sound_property(handle, id, property),
                )
            }
            PropertyTarget::Source(id) => {
                let handle = ctx
                    .handles
                    .save(HandleKind::SetSourceSoundProperty, self_ref.clone());
                (
                    handle,
                    ctx.primitives
                        .set_source_sound_property(handle, id, property),
                )
            }
        };
        match outcome {
            Ok(()) => {
                self.handle = Some(kind);
                StepOutcome::WaitForChild
            }
            Err(e) => {
                ctx.handles.clear(kind);
                self.state.status = ActionStatus::Failed;
                StepOutcome::Err(e)
            }
        }
    }

    fn do_execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        self.previous = self.current(ctx);
        let value = self.value;
        let outcome = self.apply(ctx, self_ref, value);
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
        if result.is_ok() {
            let value = if undoing { self.previous } else { Some(self.value) };
            if let Some(value) = value {
                match self.target {
                    PropertyTarget::Sink(id) => {
                        if let Some(sink) = ctx.registry.sink_mut(id) {
                            sink.sound_properties.set(self.property.clone(), value);
                        }
                    }
                    PropertyTarget::Source(id) => {
                        if let Some(source) = ctx.registry.source_mut(id) {
                            source.sound_properties.set(self.property.clone(), value);
                        }
                    }
                }
            }
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

impl_action_bookkeeping!(
    SoundPropertyAction,
    "SoundPropertyAction",
    |this: &SoundPropertyAction| this.handle.map(|_| match this.target {
        PropertyTarget::Sink(id) => crate::ids::ElementTag::Sink(id),
        PropertyTarget::Source(id) => crate::ids::ElementTag::Source(id),
    })
);
