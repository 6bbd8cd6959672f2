//! Numeric identifiers assigned by the daemon, plus the handle that labels
//! an outstanding asynchronous primitive.
//!
//! All ids are opaque newtypes over `u16`: the daemon hands them out on
//! registration (§3), the controller never constructs one itself except for
//! `RouteElementId(0)`, which means "not yet connected" (no sub-connection
//! assigned).

use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u16);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(DomainId);
id_type!(SourceId);
id_type!(SinkId);
id_type!(GatewayId);
id_type!(ConverterId);
id_type!(CrossfaderId);
id_type!(ClassId);
id_type!(RouteElementId);
id_type!(MainConnectionId);

impl RouteElementId {
    /// Sentinel meaning "no sub-connection assigned yet" (I3: assigned by
    /// the daemon on first `connect`).
    pub const UNASSIGNED: RouteElementId = RouteElementId(0);
}

/// The primitive kind a [`Handle`] is outstanding for. Paired with an
/// element id, `{kind, ticket}` identifies one in-flight daemon call (I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Connect,
    Disconnect,
    SetSourceState,
    SetSinkVolume,
    SetSourceVolume,
    SetSinkSoundProperty,
    SetSourceSoundProperty,
    SetSinkNotificationConfiguration,
    SetSourceNotificationConfiguration,
}

/// A `{kind, ticket}` pair labeling one outstanding asynchronous primitive.
///
/// `ticket` is a monotonically increasing counter minted by the
/// [`HandleStore`](crate::handle_store::HandleStore); it has no meaning to
/// the daemon beyond uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub kind: HandleKind,
    pub ticket: u64,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.ticket)
    }
}

/// Which element a leaf's outstanding handle is acting on, so a deregister
/// hook can find and abort every handle tied to an element about to be
/// destroyed (§9 Open Question: "deregister hook while an action against
/// that element is in flight").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTag {
    Source(SourceId),
    Sink(SinkId),
    RouteElement(RouteElementId),
}
