//! `ClassActionConnect` (§4.5): resolves a `(source, sink)` request against
//! the class's topology, allocates (or reuses) the main connection, and
//! delegates to [`MainConnectionActionConnect`].
//!
//! Grounded on `CAmClassActionConnect.cpp`. The resolve-and-allocate step is
//! synchronous registry work (§4.3), so `resolved()` is populated by the
//! first `execute()` call — before any child leaf has issued a daemon
//! primitive — which is what lets `hook_user_connection_request` return the
//! new id synchronously (§6) even though the connection itself finishes
//! asynchronously.

use crate::action::container::leaf_ref;
use crate::action::container::main_connection_connect::MainConnectionActionConnect;
use crate::action::{Action, ActionCtx, ActionRef, ActionStatus, ChildList, ListMode, StepOutcome};
use crate::error::RoutingError;
use crate::ids::{ClassId, MainConnectionId, SinkId, SourceId};
use crate::resolver::resolve_route;

pub struct ClassActionConnect {
    class_id: ClassId,
    source_id: SourceId,
    sink_id: SinkId,
    resolved: Option<MainConnectionId>,
    /// Set once resolution found a pre-existing connection rather than
    /// building a fresh one (P6: idempotent connect, no primitives issued
    /// beyond whatever `MainConnectionActionConnect` finds already done).
    reused_existing: bool,
    children: ChildList,
    built: bool,
    status: ActionStatus,
    undo_required: bool,
}

impl ClassActionConnect {
    pub fn new(class_id: ClassId, source_id: SourceId, sink_id: SinkId) -> Self {
        Self {
            class_id,
            source_id,
            sink_id,
            resolved: None,
            reused_existing: false,
            children: ChildList::new(ListMode::Sequential, true),
            built: false,
            status: ActionStatus::NotStarted,
            undo_required: true,
        }
    }

    /// The main connection id this action resolved to, available as soon as
    /// the first `execute()` call returns (§6 `hook_user_connection_request`).
    pub fn resolved(&self) -> Option<MainConnectionId> {
        self.resolved
    }

    pub fn reused_existing(&self) -> bool {
        self.reused_existing
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn sink_id(&self) -> SinkId {
        self.sink_id
    }

    fn build(&mut self, ctx: &mut ActionCtx) -> Result<(), RoutingError> {
        if let Some(existing) = ctx
            .registry
            .find_main_connection(self.class_id, self.source_id, self.sink_id)
        {
            self.resolved = Some(existing);
            self.reused_existing = true;
            self.children
                .push(leaf_ref(MainConnectionActionConnect::new(existing)));
            return Ok(());
        }

        let hops = resolve_route(
            ctx.registry,
            ctx.primitives,
            self.source_id,
            self.sink_id,
            self.class_id,
            ctx.registry.non_topology_route_allowed(),
        )?;

        let source_name = ctx
            .registry
            .source(self.source_id)
            .ok_or_else(|| RoutingError::NonExistent(format!("source {}", self.source_id)))?
            .name
            .clone();
        let sink_name = ctx
            .registry
            .sink(self.sink_id)
            .ok_or_else(|| RoutingError::NonExistent(format!("sink {}", self.sink_id)))?
            .name
            .clone();
        let name = format!("{source_name}:{sink_name}");

        let conn_id = ctx.registry.allocate_main_connection(
            name,
            self.source_id,
            self.sink_id,
            self.class_id,
            Vec::new(),
        );
        let route_ids: Vec<_> = hops
            .into_iter()
            .map(|hop| {
                ctx.registry.intern_route_element(
                    hop.source_id,
                    hop.sink_id,
                    hop.domain_id,
                    hop.format,
                    conn_id,
                )
            })
            .collect();
        if let Some(mc) = ctx.registry.main_connection_mut(conn_id) {
            mc.route = route_ids;
        }

        self.resolved = Some(conn_id);
        self.children
            .push(leaf_ref(MainConnectionActionConnect::new(conn_id)));
        Ok(())
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
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "class connect {}->{} failed",
                    self.source_id, self.sink_id
                )))
            }
            Some(ActionStatus::UndoComplete) => {
                self.status = ActionStatus::UndoComplete;
                StepOutcome::Ok
            }
            Some(ActionStatus::UndoFailed) => {
                self.status = ActionStatus::UndoFailed;
                StepOutcome::Err(RoutingError::NotPossible(format!(
                    "undo of class connect {}->{} failed",
                    self.source_id, self.sink_id
                )))
            }
            _ => unreachable!("ChildList::step never returns a non-terminal status here"),
        }
    }
}

impl Action for ClassActionConnect {
    fn label(&self) -> String {
        format!("ClassActionConnect({}->{})", self.source_id, self.sink_id)
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
            if let Err(e) = self.build(ctx) {
                self.status = ActionStatus::Failed;
                return StepOutcome::Err(e);
            }
            self.built = true;
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
