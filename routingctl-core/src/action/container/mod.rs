//! Container actions (§4.5): compose leaves (and, for class-level
//! containers, other containers) into a [`ChildList`](super::ChildList).

mod class_connect;
mod class_disconnect;
pub mod main_connection_connect;
pub mod main_connection_disconnect;
mod main_connection_suspend;
mod volume_sequence;

pub use class_connect::ClassActionConnect;
pub use class_disconnect::ClassActionDisconnect;
pub use main_connection_connect::MainConnectionActionConnect;
pub use main_connection_disconnect::{MainConnectionActionDisconnect, SetSourceStateDirection};
pub use main_connection_suspend::MainConnectionActionSuspend;
pub use volume_sequence::{VolumeChange, VolumeSequenceAction, VolumeTarget};

use crate::action::{ActionRef, ActionStatus};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn leaf_ref<A: crate::action::Action + 'static>(action: A) -> ActionRef {
    Rc::new(RefCell::new(action))
}

/// Shared status-mapping helper: once a `ChildList` reaches a terminal
/// `ListOutcome`, this is the container's own terminal `ActionStatus`.
pub(crate) fn status_for_outcome(outcome: crate::action::ListOutcome) -> Option<ActionStatus> {
    use crate::action::ListOutcome::*;
    match outcome {
        Blocked => None,
        Completed => Some(ActionStatus::Completed),
        Failed => Some(ActionStatus::Failed),
        UndoCompleted => Some(ActionStatus::UndoComplete),
        UndoFailed => Some(ActionStatus::UndoFailed),
    }
}
