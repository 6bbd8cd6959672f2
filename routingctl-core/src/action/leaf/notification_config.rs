//! `NotificationConfigAction` (SPEC_FULL.md supplement #2): applies a
//! notification configuration to a sink or source
//! (`hookUserSetMainSinkNotificationConfiguration` /
//! `...MainSourceNotificationConfiguration` in the original). No undo: the
//! original never reverses a notification configuration change either.

use crate::action::leaf::{impl_action_bookkeeping, LeafState};
use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
use crate::error::RoutingResult;
use crate::ids::{Handle, HandleKind, SinkId, SourceId};
use crate::model::NotificationConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget {
    Sink(SinkId),
    Source(SourceId),
}

pub struct NotificationConfigAction {
    target: NotificationTarget,
    config: NotificationConfiguration,
    handle: Option<Handle>,
    state: LeafState,
}

impl NotificationConfigAction {
    pub fn new(target: NotificationTarget, config: NotificationConfiguration) -> Self {
        Self {
            target,
            config,
            handle: None,
            state: LeafState::new(),
        }
    }

    fn do_execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        let config = self.config;
        let (handle, outcome) = match self.target {
            NotificationTarget::Sink(id) => {
                let handle = ctx
                    .handles
                    .save(HandleKind::SetSinkNotificationConfiguration, self_ref.clone());
                (
                    handle,
                    ctx.primitives
                        .set_sink_notification_configuration(handle, id, config),
                )
            }
            NotificationTarget::Source(id) => {
                let handle = ctx.handles.save(
                    HandleKind::SetSourceNotificationConfiguration,
                    self_ref.clone(),
                );
                (
                    handle,
                    ctx.primitives
                        .set_source_notification_configuration(handle, id, config),
                )
            }
        };
        match outcome {
            Ok(()) => {
                self.handle = Some(handle);
                self.state.status = ActionStatus::Executing;
                StepOutcome::WaitForChild
            }
            Err(e) => {
                ctx.handles.clear(handle);
                self.state.status = ActionStatus::Failed;
                StepOutcome::Err(e)
            }
        }
    }

    fn do_undo(&mut self, _self_ref: &ActionRef, _ctx: &mut ActionCtx) -> StepOutcome {
        self.state.status = ActionStatus::UndoComplete;
        StepOutcome::Ok
    }

    fn do_acknowledge(&mut self, handle: Handle, result: RoutingResult<()>, ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        self.handle = None;
        if result.is_ok() {
            match self.target {
                NotificationTarget::Sink(id) => {
                    if let Some(sink) = ctx.registry.sink_mut(id) {
                        replace_config(&mut sink.notification_configs, self.config);
                    }
                }
                NotificationTarget::Source(id) => {
                    if let Some(source) = ctx.registry.source_mut(id) {
                        replace_config(&mut source.notification_configs, self.config);
                    }
                }
            }
        }
        self.state.status = if result.is_ok() {
            ActionStatus::Completed
        } else {
            ActionStatus::Failed
        };
    }

    fn do_timeout(&mut self, handle: Handle, ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        ctx.primitives.abort_action(handle);
        ctx.handles.clear(handle);
        self.handle = None;
        self.state.status = ActionStatus::Failed;
    }
}

fn replace_config(configs: &mut Vec<NotificationConfiguration>, new: NotificationConfiguration) {
    if let Some(existing) = configs.iter_mut().find(|c| c.kind == new.kind) {
        *existing = new;
    } else {
        configs.push(new);
    }
}

impl_action_bookkeeping!(
    NotificationConfigAction,
    "NotificationConfigAction",
    |this: &NotificationConfigAction| this.handle.map(|_| match this.target {
        NotificationTarget::Sink(id) => crate::ids::ElementTag::Sink(id),
        NotificationTarget::Source(id) => crate::ids::ElementTag::Source(id),
    })
);
