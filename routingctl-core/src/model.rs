//! Shared value types referenced across the registry and the action tree.
//!
//! These mirror the `am_*` value types the original daemon passes around
//! (`am_SourceState_e`, `am_Availability_s`, …) — kept as small plain enums
//! and structs rather than a deep type hierarchy, per the teacher's model
//! modules (`pmocontrol::model`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainState {
    Unknown,
    Controlled,
    Registering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    On,
    Off,
    Paused,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuteState {
    Muted,
    Unmuted,
    Unknown,
}

/// Route element and main connection share this alphabet (§3, §4.5 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Suspended,
    Disconnecting,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityReason {
    NewMedia,
    SameMedia,
    NoMedia,
    TemperatureSource,
    VoltageSource,
    NoStatusAvailable,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityInfo {
    pub availability: Availability,
    pub reason: AvailabilityReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassType {
    Playback,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptState {
    Off,
    Interrupted,
    Unknown,
}

/// A class-specific source/sink sound property, e.g. `{Bass -> 3}`.
pub type SoundPropertyKind = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundProperties(pub HashMap<SoundPropertyKind, i16>);

impl SoundProperties {
    pub fn get(&self, kind: &str) -> Option<i16> {
        self.0.get(kind).copied()
    }

    pub fn set(&mut self, kind: impl Into<SoundPropertyKind>, value: i16) -> Option<i16> {
        self.0.insert(kind.into(), value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfiguration {
    pub kind: u16,
    pub status: NotificationStatus,
    pub parameter: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Off,
    Periodic,
    Minimum,
    Maximum,
    ChangeOnly,
}

/// Connection-format negotiated for one hop; opaque to the controller beyond
/// equality/ordering (§6 `getConnectionFormatChoice`).
pub type ConnectionFormat = u16;

/// A system-wide toggle such as "non-topology-route-allowed" (§4.3 step 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProperty {
    pub key: String,
    pub value: i32,
}

pub const NON_TOPOLOGY_ROUTE_ALLOWED: &str = "non-topology-route-allowed";

/// Volume range clamp for `hook_user_volume_step` (§9 Open Question: "not
/// enumerated in the source ... recommendation: clamp and report OK"),
/// grounded on the same `.clamp(0, 100)` convention `pmocontrol`'s control
/// point demo applies to relative volume changes.
pub const MIN_VOLUME: i16 = 0;
pub const MAX_VOLUME: i16 = 100;
