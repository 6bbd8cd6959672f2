//! `RouteActionConnect` (§4.4): connects one route element.
//!
//! Grounded on `CAmRouteActionConnect.cpp`: already-`Connected` is a
//! synchronous no-op; an unavailable endpoint fails without touching the
//! daemon; otherwise `connect` is issued and the hop sits in `Connecting`
//! until acknowledged.

use crate::action::leaf::{impl_action_bookkeeping, LeafState};
use crate::action::{ActionCtx, ActionRef, ActionStatus, StepOutcome};
use crate::error::{RoutingError, RoutingResult};
use crate::ids::{Handle, HandleKind, RouteElementId};
use crate::model::{Availability, ConnectionState};

pub struct RouteActionConnect {
    route_id: RouteElementId,
    handle: Option<Handle>,
    state: LeafState,
}

impl RouteActionConnect {
    pub fn new(route_id: RouteElementId) -> Self {
        Self {
            route_id,
            handle: None,
            state: LeafState::new(),
        }
    }

    fn do_execute(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        let Some(re) = ctx.registry.route_element(self.route_id) else {
            self.state.status = ActionStatus::Failed;
            return StepOutcome::Err(RoutingError::NonExistent(format!(
                "route element {}",
                self.route_id
            )));
        };
        if re.state == ConnectionState::Connected {
            self.state.status = ActionStatus::Completed;
            return StepOutcome::Ok;
        }

        let (source_id, sink_id, format) = (re.source_id, re.sink_id, re.connection_format);
        let source_ok = ctx
            .registry
            .source(source_id)
            .is_some_and(|s| s.availability.availability == Availability::Available);
        let sink_ok = ctx
            .registry
            .sink(sink_id)
            .is_some_and(|s| s.availability.availability == Availability::Available);
        if !source_ok || !sink_ok {
            self.state.status = ActionStatus::Failed;
            return StepOutcome::Err(RoutingError::RouteUnavailable(self.route_id));
        }

        let handle = ctx.handles.save(HandleKind::Connect, self_ref.clone());
        let result = ctx.primitives.connect(handle, source_id, sink_id, format);
        if let Err(e) = result {
            ctx.handles.clear(handle);
            self.state.status = ActionStatus::Failed;
            return StepOutcome::Err(e);
        }

        if let Some(re) = ctx.registry.route_element_mut(self.route_id) {
            re.state = ConnectionState::Connecting;
        }
        self.handle = Some(handle);
        self.state.status = ActionStatus::Executing;
        StepOutcome::WaitForChild
    }

    fn do_undo(&mut self, self_ref: &ActionRef, ctx: &mut ActionCtx) -> StepOutcome {
        if self.handle.is_some() {
            return StepOutcome::WaitForChild;
        }
        let handle = ctx.handles.save(HandleKind::Disconnect, self_ref.clone());
        if let Some(re) = ctx.registry.route_element_mut(self.route_id) {
            re.state = ConnectionState::Disconnecting;
        }
        match ctx.primitives.disconnect(handle, self.route_id) {
            Ok(()) => {
                self.handle = Some(handle);
                self.state.status = ActionStatus::Undoing;
                StepOutcome::WaitForChild
            }
            Err(e) => {
                ctx.handles.clear(handle);
                self.state.status = ActionStatus::UndoFailed;
                StepOutcome::Err(e)
            }
        }
    }

    fn do_acknowledge(&mut self, handle: Handle, result: RoutingResult<()>, ctx: &mut ActionCtx) {
        if self.handle != Some(handle) {
            return;
        }
        self.handle = None;
        let undoing = self.state.status == ActionStatus::Undoing;
        match (undoing, result) {
            (false, Ok(())) => {
                if let Some(re) = ctx.registry.route_element_mut(self.route_id) {
                    re.state = ConnectionState::Connected;
                }
                self.state.status = ActionStatus::Completed;
            }
            (false, Err(_)) => {
                if let Some(re) = ctx.registry.route_element_mut(self.route_id) {
                    re.state = ConnectionState::Disconnected;
                }
                self.state.status = ActionStatus::Failed;
            }
            (true, Ok(())) => {
                if let Some(re) = ctx.registry.route_element_mut(self.route_id) {
                    re.state = ConnectionState::Disconnected;
                }
                self.state.status = ActionStatus::UndoComplete;
            }
            (true, Err(_)) => {
                self.state.status = ActionStatus::UndoFailed;
            }
        }
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

impl_action_bookkeeping!(RouteActionConnect, "RouteActionConnect", |this: &RouteActionConnect| this
    .handle
    .map(|_| crate::ids::ElementTag::RouteElement(this.route_id)));
