//! Leaf actions (C4): each wraps exactly one daemon primitive.

mod mute;
mod notification_config;
mod route_connect;
mod route_disconnect;
mod sink_volume;
mod sound_property;
mod source_state;
mod source_volume;

pub use mute::SinkMuteAction;
pub use notification_config::{NotificationConfigAction, NotificationTarget};
pub use route_connect::RouteActionConnect;
pub use route_disconnect::RouteActionDisconnect;
pub use sink_volume::SinkVolumeAction;
pub use sound_property::{PropertyTarget, SoundPropertyAction};
pub use source_state::SourceActionSetState;
pub use source_volume::SourceVolumeAction;

use crate::action::ActionStatus;

/// Bookkeeping every leaf shares: its own status and undo flag. Concrete
/// leaves embed this and delegate the trait's status accessors to it.
#[derive(Debug, Clone)]
pub struct LeafState {
    pub status: ActionStatus,
    pub undo_required: bool,
}

impl LeafState {
    pub fn new() -> Self {
        Self {
            status: ActionStatus::NotStarted,
            undo_required: false,
        }
    }
}

impl Default for LeafState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared boilerplate for implementing `Action`'s four bookkeeping methods
/// on a leaf struct that embeds a `LeafState` field named `state`.
macro_rules! impl_action_bookkeeping {
    ($ty:ty, $label:expr) => {
        impl_action_bookkeeping!($ty, $label, |_this: &$ty| None);
    };
    ($ty:ty, $label:expr, |$this:ident: &$ty2:ty| $tag:expr) => {
        impl crate::action::Action for $ty {
            fn label(&self) -> String {
                $label.to_string()
            }

            fn element_tag(&self) -> Option<crate::ids::ElementTag> {
                let $this: &$ty2 = self;
                $tag
            }

            fn status(&self) -> crate::action::ActionStatus {
                self.state.status
            }

            fn undo_required(&self) -> bool {
                self.state.undo_required
            }

            fn set_undo_required(&mut self, required: bool) {
                self.state.undo_required = required;
            }

            fn execute(
                &mut self,
                self_ref: &crate::action::ActionRef,
                ctx: &mut crate::action::ActionCtx,
            ) -> crate::action::StepOutcome {
                self.do_execute(self_ref, ctx)
            }

            fn undo(
                &mut self,
                self_ref: &crate::action::ActionRef,
                ctx: &mut crate::action::ActionCtx,
            ) -> crate::action::StepOutcome {
                self.do_undo(self_ref, ctx)
            }

            fn acknowledge(
                &mut self,
                handle: crate::ids::Handle,
                result: Result<(), crate::error::RoutingError>,
                ctx: &mut crate::action::ActionCtx,
            ) {
                self.do_acknowledge(handle, result, ctx)
            }

            fn timeout(&mut self, handle: crate::ids::Handle, ctx: &mut crate::action::ActionCtx) {
                self.do_timeout(handle, ctx)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

pub(crate) use impl_action_bookkeeping;
