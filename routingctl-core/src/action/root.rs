//! Root action (C8): the process-wide singleton holding every top-level
//! action descriptor instantiated for the trigger currently being processed.
//!
//! Unlike an ordinary container (§4.5: "execution is strictly sequential"),
//! the root drives its children in [`ListMode::FanOut`](crate::action::ListMode):
//! one trigger's policy response can yield several independent top-level
//! actions (S3: a new main connection plus a volume change on an unrelated
//! class) that have no ordering dependency on each other — only the
//! dispatcher's "don't consume the next trigger until the root is idle"
//! rule (§4.7 step 1) needs them all to finish before trigger T+1 begins.
//! Ordering *within* one action (a main-connection connect's route hops,
//! say) is still enforced by that action's own `Sequential` `ChildList`.

use crate::action::{ActionCtx, ActionRef, ListMode, ListOutcome};

pub struct RootAction {
    children: crate::action::ChildList,
}

impl RootAction {
    pub fn new() -> Self {
        Self {
            children: crate::action::ChildList::new(ListMode::FanOut, false),
        }
    }

    /// Appends one top-level action descriptor, in the order the policy
    /// engine returned it (§4.7 step 4).
    pub fn append(&mut self, action: ActionRef) {
        self.children.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Drives the current frontier. `Blocked` means at least one top-level
    /// action is still in flight; the dispatcher must not consume another
    /// trigger (§4.7 step 1). `Completed` means every action this root is
    /// holding reached a terminal state.
    pub fn step(&mut self, ctx: &mut ActionCtx) -> ListOutcome {
        self.children.step(ctx)
    }

    /// Resets the root to empty, ready for the next trigger's action list
    /// (§4.7 step 2: "reset status to NOT_STARTED and error to 0, empty the
    /// child list").
    pub fn cleanup(&mut self) {
        self.children = crate::action::ChildList::new(ListMode::FanOut, false);
    }
}

impl Default for RootAction {
    fn default() -> Self {
        Self::new()
    }
}
