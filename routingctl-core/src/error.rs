use thiserror::Error;

use crate::ids::{MainConnectionId, RouteElementId};

/// Error taxonomy for the controller (§7). `WaitForChild` is an internal
/// sentinel, not a surfaced failure — it only ever appears as the `Ok` arm of
/// [`ActionResult`](crate::action::ActionResult), never wrapped in this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("not possible: {0}")]
    NotPossible(String),

    #[error("main connection {0} already exists")]
    AlreadyExists(MainConnectionId),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("unknown element: {0}")]
    NonExistent(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("no route between {source} and {sink}")]
    NoRoute { source: String, sink: String },

    #[error("route element {0} is unavailable")]
    RouteUnavailable(RouteElementId),

    #[error("policy engine declined or returned no actions")]
    Unknown,
}

pub type RoutingResult<T> = Result<T, RoutingError>;
