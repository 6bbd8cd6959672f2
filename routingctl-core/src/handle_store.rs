//! Handle store (C1): maps an outstanding asynchronous primitive to the leaf
//! action awaiting its acknowledgment.
//!
//! Process-wide in the original (`CAmHandleStore::instance()`); here it is an
//! explicit value owned by the [`Controller`](crate::controller::Controller)
//! context and passed by reference, per the "no hidden global state" design
//! note (§9).

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::action::{Action, LeafHandle};
use crate::ids::{ElementTag, Handle, HandleKind};

pub struct HandleStore {
    next_ticket: u64,
    slots: HashMap<Handle, LeafHandle>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self {
            next_ticket: 1,
            slots: HashMap::new(),
        }
    }

    /// Mints a fresh handle of `kind` and records `leaf` as its owner.
    pub fn save(&mut self, kind: HandleKind, leaf: LeafHandle) -> Handle {
        let handle = Handle {
            kind,
            ticket: self.next_ticket,
        };
        self.next_ticket += 1;
        self.slots.insert(handle, leaf);
        debug!(%handle, "handle saved");
        handle
    }

    /// Clears a slot without notifying (used on timeout, where the leaf
    /// itself drives the transition).
    pub fn clear(&mut self, handle: Handle) {
        if self.slots.remove(&handle).is_some() {
            debug!(%handle, "handle cleared");
        }
    }

    /// Looks up the leaf for `handle` so the dispatcher can hand it the
    /// acknowledgment result, then clears the slot (I4). Absent handles are
    /// logged and ignored (arriving after a timeout already cleared them).
    pub fn take(&mut self, handle: Handle) -> Option<LeafHandle> {
        match self.slots.remove(&handle) {
            Some(leaf) => {
                debug!(%handle, "handle notified");
                Some(leaf)
            }
            None => {
                warn!(%handle, "acknowledgment for unknown handle, ignored");
                None
            }
        }
    }

    /// Looks up the leaf for `handle` without clearing the slot — used on
    /// timeout, where the leaf's own `timeout` handler clears it via
    /// [`clear`](Self::clear) after calling `abort_action` (§4.6).
    pub fn peek(&self, handle: Handle) -> Option<LeafHandle> {
        self.slots.get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every outstanding handle currently tagged as acting on `tag`, most
    /// recently saved last. Used by a deregister hook to find handles to
    /// abort before the element they target disappears from the registry
    /// (§9 Open Question resolution, SPEC_FULL.md).
    pub fn handles_for(&self, tag: ElementTag) -> Vec<Handle> {
        self.slots
            .iter()
            .filter(|(_, leaf)| leaf.borrow().element_tag() == Some(tag))
            .map(|(handle, _)| *handle)
            .collect()
    }
}

impl Default for HandleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
    use crate::ids::{ElementTag, SourceId};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A leaf stub that does nothing but report a fixed `element_tag` —
    /// all `HandleStore` needs from a leaf to exercise `save`/`take`/
    /// `peek`/`handles_for` in isolation, without a registry or a daemon.
    struct StubLeaf(Option<ElementTag>);

    impl crate::action::Action for StubLeaf {
        fn label(&self) -> String {
            "StubLeaf".to_string()
        }
        fn status(&self) -> ActionStatus {
            ActionStatus::Executing
        }
        fn undo_required(&self) -> bool {
            false
        }
        fn set_undo_required(&mut self, _required: bool) {}
        fn execute(&mut self, _self_ref: &ActionRef, _ctx: &mut ActionCtx) -> StepOutcome {
            StepOutcome::WaitForChild
        }
        fn undo(&mut self, _self_ref: &ActionRef, _ctx: &mut ActionCtx) -> StepOutcome {
            StepOutcome::Ok
        }
        fn element_tag(&self) -> Option<ElementTag> {
            self.0
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn stub(tag: Option<ElementTag>) -> LeafHandle {
        Rc::new(RefCell::new(StubLeaf(tag))) as ActionRef
    }

    #[test]
    fn save_then_take_returns_the_same_leaf_and_clears_the_slot() {
        let mut store = HandleStore::new();
        let leaf = stub(None);
        let handle = store.save(HandleKind::Connect, leaf);

        assert!(store.take(handle).is_some());
        assert!(store.is_empty());
        // A handle is single-use: a second acknowledgment for it finds
        // nothing (I4's bijectivity — taken once, gone for good).
        assert!(store.take(handle).is_none());
    }

    #[test]
    fn take_on_an_unknown_handle_returns_none() {
        let mut store = HandleStore::new();
        let unknown = Handle { kind: HandleKind::Connect, ticket: 999 };
        assert!(store.take(unknown).is_none());
    }

    #[test]
    fn peek_does_not_clear_the_slot() {
        let mut store = HandleStore::new();
        let handle = store.save(HandleKind::SetSinkVolume, stub(None));

        assert!(store.peek(handle).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.take(handle).is_some());
    }

    #[test]
    fn handles_for_finds_only_handles_tagged_for_that_element() {
        let mut store = HandleStore::new();
        let source_tag = ElementTag::Source(SourceId(1));
        let other_tag = ElementTag::Source(SourceId(2));

        let h1 = store.save(HandleKind::SetSourceState, stub(Some(source_tag)));
        let _h2 = store.save(HandleKind::SetSourceState, stub(Some(other_tag)));
        let _h3 = store.save(HandleKind::Connect, stub(None));

        assert_eq!(store.handles_for(source_tag), vec![h1]);
    }

    #[test]
    fn successive_saves_mint_distinct_tickets() {
        let mut store = HandleStore::new();
        let h1 = store.save(HandleKind::Connect, stub(None));
        let h2 = store.save(HandleKind::Connect, stub(None));
        assert_ne!(h1, h2);
    }
}
