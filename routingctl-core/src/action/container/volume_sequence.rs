//! Volume-change sequencer (§2 C5 "volume-change sequencer"): drives an
//! ordered batch of sink/source volume leaves as one action-tree node.
//!
//! Grounded on `CAmClassActionSetVolume.cpp`/`CAmSystemActionSetVolumes.cpp`:
//! a single mixing-rule response (e.g. "duck Entertainment while Phone is
//! active", S3) names several sinks to ramp in one policy-descriptor
//! parameter list; this container is what the dispatcher builds for that
//! descriptor instead of one root-level action per sink.

use crate::action::container::leaf_ref;
use crate::action::leaf::{SinkVolumeAction, SourceVolumeAction};
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::{SinkId, SourceId};
use crate::primitives::VolumeRamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTarget {
    Sink(SinkId),
    Source(SourceId),
}

#[derive(Debug, Clone, Copy)]
pub struct VolumeChange {
    pub target: VolumeTarget,
    pub volume: i16,
    pub ramp: VolumeRamp,
}

pub struct VolumeSequenceAction {
    changes: Vec<VolumeChange>,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl VolumeSequenceAction {
    pub fn new(changes: Vec<VolumeChange>) -> Self {
        Self {
            changes,
            children: ChildList::new(ListMode::Sequential, true),
            built: false,
            status: ActionStatus::NotStarted,
            undo_required: true,
        }
    }

    fn build(&mut self) {
        for change in &self.changes {
            let leaf: ActionRef = match change.target {
                VolumeTarget::Sink(id) => {
                    leaf_ref(SinkVolumeAction::new(id, change.volume, change.ramp))
                }
                VolumeTarget::Source(id) => {
                    leaf_ref(SourceVolumeAction::new(id, change.volume, change.ramp))
                }
            };
            self.children.push(leaf);
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
                StepOutcome::Err(RoutingError::NotPossible("volume sequence failed".into()))
            }
            Some(ActionStatus::UndoComplete) => {
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(
                    "undo of volume sequence failed".into(),
                ))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for VolumeSequenceAction {
    fn label(&self) -> String {
        format!("VolumeSequenceAction({} changes)", self.changes.len())
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
            self.build();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_completes_without_children() {
        let mut action = VolumeSequenceAction::new(Vec::new());
        assert!(!action.built);
        assert_eq!(action.changes.len(), 0);
    }
}
