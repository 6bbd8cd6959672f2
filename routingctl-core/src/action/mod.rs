//! The hierarchical action tree (C5/C8): a composable command pattern where
//! container actions own ordered child actions and leaves drive asynchronous
//! daemon primitives (§4.4, §4.5).
//!
//! Nodes are `Rc<RefCell<dyn Action>>`. A `Box` would be the more obviously
//! "exclusive ownership" choice matching §3's "container exclusively owns its
//! children", but the [`HandleStore`](crate::handle_store::HandleStore) must
//! be able to reach the exact leaf awaiting an acknowledgment without
//! re-walking the tree from the root on every callback — `Rc<RefCell<_>>`
//! gives it a cheap clone of the same node the container holds, which is
//! safe here only because the whole controller is single-threaded (§5); nothing
//! else ever clones a node out from under its owning container.

pub mod container;
pub mod leaf;
pub mod root;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RoutingError;
use crate::handle_store::HandleStore;
use crate::ids::Handle;
use crate::primitives::RoutingPrimitives;
use crate::registry::Registry;
use crate::trigger::TriggerQueue;

pub type ActionRef = Rc<RefCell<dyn Action>>;

/// What [`HandleStore`] holds onto for the duration of one outstanding
/// primitive: enough to call back into the exact leaf.
pub type LeafHandle = ActionRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    NotStarted,
    Executing,
    Undoing,
    Completed,
    Failed,
    UndoComplete,
    UndoFailed,
}

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionStatus::Completed
                | ActionStatus::Failed
                | ActionStatus::UndoComplete
                | ActionStatus::UndoFailed
        )
    }
}

/// What `execute`/`undo` returns to their caller (§4.4 table).
#[derive(Debug)]
pub enum StepOutcome {
    /// Synchronous success; caller may consider this step terminal already.
    Ok,
    /// Awaiting an acknowledgment; caller must stop driving this node.
    WaitForChild,
    /// Hard failure.
    Err(RoutingError),
}

/// Everything a node needs to mutate shared state while stepping: the
/// registry (the local mirror, source of truth for policy decisions between
/// daemon round-trips), the handle store, the trigger queue (for publishing
/// `CONNECTION_STATE_CHANGE`, §4.5), and the daemon-side primitives leaves
/// call into.
pub struct ActionCtx<'a> {
    pub registry: &'a mut Registry,
    pub handles: &'a mut HandleStore,
    pub triggers: &'a mut TriggerQueue,
    pub primitives: &'a dyn RoutingPrimitives,
}

/// Shared interface for every node of the action tree (§9 "generic container
/// with a child vector" design note).
pub trait Action {
    fn label(&self) -> String;
    fn status(&self) -> ActionStatus;
    fn undo_required(&self) -> bool;
    fn set_undo_required(&mut self, required: bool);

    /// Drives this node forward. First called while `status() ==
    /// NotStarted`; a `ChildList` calls it again on every subsequent
    /// `step()` while `status()` is `Executing`, since a container has no
    /// other way to notice a grandchild leaf's acknowledgment landed
    /// (acknowledgments are routed straight to the leaf, §4.6/`HandleStore`,
    /// bypassing the tree). Implementations must therefore be idempotent:
    /// a leaf with a handle already outstanding just reports
    /// `WaitForChild` again without reissuing the primitive; a container
    /// just re-steps its own `ChildList`, which is already safe to call
    /// repeatedly. `self_ref` is the same `Rc` the caller holds in its
    /// child vector — a leaf that issues an asynchronous primitive clones
    /// it into the handle store so the dispatcher can call back without
    /// re-walking the tree.
    fn execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome;

    /// Drives this node's undo. First called while `status() == Completed`
    /// (P4: never on a node that stayed `NotStarted`); called again on
    /// every subsequent `step_undo()` while `status()` is `Undoing`, for
    /// the same reason `execute` is re-called while `Executing`.
    fn undo(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome;

    /// Invoked by the handle store when `handle` (previously saved by this
    /// leaf) is acknowledged. No-op default for containers, which never
    /// hold a handle directly.
    fn acknowledge(&mut self, _handle: Handle, _result: Result<(), RoutingError>, _ctx: &mut ActionCtx) {}

    /// Invoked when `handle` times out. No-op default for containers.
    fn timeout(&mut self, _handle: Handle, _ctx: &mut ActionCtx) {}

    /// The element a leaf's currently outstanding handle (if any) is acting
    /// on — `None` for containers and for leaves with no handle in flight.
    /// Used by [`HandleStore::abort_for`](crate::handle_store::HandleStore::abort_for)
    /// to find handles to abort when that element is deregistered.
    fn element_tag(&self) -> Option<crate::ids::ElementTag> {
        None
    }

    /// Lets a façade that just dispatched a descriptor (`Controller::pump`)
    /// recover the concrete action it instantiated — e.g. to read a freshly
    /// built `ClassActionConnect::resolved()` for the synchronous half of
    /// `hook_user_connection_request` (§6). Every implementor just returns
    /// `self`; downcasting is the caller's job via `Any::downcast_ref`.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Whether a [`ChildList`] drives its children one at a time (ordinary
/// containers, §4.5: "execution is strictly sequential") or all at once
/// (the root action, C8: "holding all in-flight top-level actions" — see
/// DESIGN.md for why the root is the one exception).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Sequential,
    FanOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Blocked,
    Completed,
    Failed,
    UndoCompleted,
    UndoFailed,
}

/// The shared driving logic behind every container (§4.5): builds the child
/// vector, steps children per `mode`, and performs reverse-order undo of
/// already-completed children on failure (P4).
pub struct ChildList {
    mode: ListMode,
    children: Vec<ActionRef>,
    current: usize,
    undo_index: Option<usize>,
    undo_required: bool,
    undo_all_ok: bool,
}

impl ChildList {
    pub fn new(mode: ListMode, undo_required: bool) -> Self {
        Self {
            mode,
            children: Vec::new(),
            current: 0,
            undo_index: None,
            undo_required,
            undo_all_ok: true,
        }
    }

    pub fn push(&mut self, child: ActionRef) {
        self.children.push(child);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[ActionRef] {
        &self.children
    }

    pub fn step(&mut self, ctx: &mut ActionCtx) -> ListOutcome {
        if self.undo_index.is_some() {
            return self.step_undo(ctx);
        }
        match self.mode {
            ListMode::Sequential => self.step_sequential(ctx),
            ListMode::FanOut => self.step_fanout(ctx),
        }
    }

    fn step_sequential(&mut self, ctx: &mut ActionCtx) -> ListOutcome {
        while self.current < self.children.len() {
            let child = self.children[self.current].clone();
            let status = child.borrow().status();
            match status {
                // `Executing` is re-driven, not just polled: a container
                // only finds out a grandchild leaf's handle was acknowledged
                // by calling `execute()` again and letting it re-step its
                // own children (see the trait doc on `Action::execute`).
                ActionStatus::NotStarted | ActionStatus::Executing => {
                    let outcome = child.borrow_mut().execute(&child.clone(), ctx);
                    match outcome {
                        StepOutcome::Ok => {
                            self.current += 1;
                        }
                        StepOutcome::WaitForChild => return ListOutcome::Blocked,
                        StepOutcome::Err(e) => return self.fail(ctx, e),
                    }
                }
                ActionStatus::Completed => self.current += 1,
                ActionStatus::Failed => {
                    return self.fail(ctx, RoutingError::NotPossible("child action failed".into()));
                }
                ActionStatus::Undoing | ActionStatus::UndoComplete | ActionStatus::UndoFailed => {
                    self.current += 1;
                }
            }
        }
        ListOutcome::Completed
    }

    fn step_fanout(&mut self, ctx: &mut ActionCtx) -> ListOutcome {
        let mut blocked = false;
        for child in self.children.clone() {
            let status = child.borrow().status();
            if matches!(status, ActionStatus::NotStarted | ActionStatus::Executing) {
                let outcome = child.borrow_mut().execute(&child.clone(), ctx);
                if let StepOutcome::Err(_) = outcome {
                    // Each fanned-out child manages its own undo; a sibling
                    // failing never aborts the others (they are independent
                    // top-level actions, see DESIGN.md).
                }
            }
            if !child.borrow().status().is_terminal() {
                blocked = true;
            }
        }
        if blocked {
            ListOutcome::Blocked
        } else {
            ListOutcome::Completed
        }
    }

    fn fail(&mut self, ctx: &mut ActionCtx, err: RoutingError) -> ListOutcome {
        if !self.undo_required || self.current == 0 {
            tracing::debug!(error = %err, "container failing without undo");
            return ListOutcome::Failed;
        }
        self.undo_index = Some(self.current - 1);
        self.undo_all_ok = true;
        self.step_undo(ctx)
    }

    fn step_undo(&mut self, ctx: &mut ActionCtx) -> ListOutcome {
        loop {
            let Some(i) = self.undo_index else {
                return if self.undo_all_ok {
                    ListOutcome::UndoCompleted
                } else {
                    ListOutcome::UndoFailed
                };
            };
            let child = self.children[i].clone();
            let status = child.borrow().status();
            match status {
                // Same re-drive rationale as `step_sequential`'s `Executing`
                // arm: a container only learns its own nested undo
                // progressed by calling `undo()` again while `Undoing`.
                ActionStatus::Completed | ActionStatus::Undoing => {
                    let outcome = child.borrow_mut().undo(&child.clone(), ctx);
                    match outcome {
                        StepOutcome::Ok => self.advance_undo(i),
                        StepOutcome::WaitForChild => return ListOutcome::Blocked,
                        StepOutcome::Err(_) => {
                            self.undo_all_ok = false;
                            self.advance_undo(i);
                        }
                    }
                }
                // NOT_STARTED children are never undone (P4); anything else
                // already reached a terminal undo state.
                _ => self.advance_undo(i),
            }
        }
    }

    fn advance_undo(&mut self, i: usize) {
        self.undo_index = if i == 0 { None } else { Some(i - 1) };
    }
}

// Acknowledgments and timeouts never route through the container tree: the
// handle store hands the dispatcher the exact `ActionRef` it saved in
// `execute`/`undo`, so the dispatcher calls `acknowledge`/`timeout` on that
// leaf directly (see `dispatcher.rs`). A container only finds out a child
// reached a terminal state on its *next* `step()` call.
