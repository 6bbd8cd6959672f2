//! Trigger queue (C6, §4.6) and the trigger payload alphabet (§3 "Trigger").
//!
//! Two lanes, normal and priority; `dequeue` always drains priority first.
//! Unbounded: overflow is explicitly out of the threat model (§4.6) because
//! trigger volume is bounded by the daemon's own hook rate.

use std::collections::VecDeque;

use tracing::debug;

use crate::model::{AvailabilityInfo, ConnectionState, InterruptState, MuteState};

/// One inbound hook or internal event, turned into a typed record by C10
/// before it reaches the queue (§3). Payload shapes follow the hook table in
/// §6 plus the notification-data and update hooks supplemented in
/// SPEC_FULL.md.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    RegisterDomain { name: String },
    DeregisterDomain { name: String },
    RegisterSource { name: String },
    DeregisterSource { name: String },
    RegisterSink { name: String },
    DeregisterSink { name: String },
    RegisterGateway { name: String },
    DeregisterGateway { name: String },
    RegisterConverter { name: String },
    DeregisterConverter { name: String },
    RegisterCrossfader { name: String },
    DeregisterCrossfader { name: String },
    DomainRegistrationComplete { domain_name: String },

    UserConnectionRequest {
        source_name: String,
        sink_name: String,
        class_name: String,
    },
    UserDisconnectRequest {
        connection_name: String,
    },
    UserSinkVolume {
        sink_name: String,
        volume: i16,
    },
    UserSourceVolume {
        source_name: String,
        volume: i16,
    },
    UserSinkMute {
        sink_name: String,
        mute: MuteState,
    },
    UserMainSinkSoundProperty {
        sink_name: String,
        property: (String, i16),
    },
    UserMainSourceSoundProperty {
        source_name: String,
        property: (String, i16),
    },
    UserSystemProperty {
        key: String,
        value: i32,
    },

    AvailabilityChange {
        element_name: String,
        availability: AvailabilityInfo,
    },
    SourceInterruptChange {
        source_name: String,
        state: InterruptState,
    },
    ConnectionStateChange {
        connection_name: String,
        state: ConnectionState,
    },

    /// `hookSinkNotificationDataChanged` / `hookSourceNotificationDataChanged`
    /// (SPEC_FULL.md supplement #3) — streamed notification payload, not a
    /// configuration change.
    NotificationDataChanged {
        element_name: String,
        payload: i16,
    },
}

impl Trigger {
    /// Short tag for logging, matching the `trigger_kind` the policy engine
    /// is invoked with (§4.7 step 4).
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::RegisterDomain { .. } => "REGISTER_DOMAIN",
            Trigger::DeregisterDomain { .. } => "DEREGISTER_DOMAIN",
            Trigger::RegisterSource { .. } => "REGISTER_SOURCE",
            Trigger::DeregisterSource { .. } => "DEREGISTER_SOURCE",
            Trigger::RegisterSink { .. } => "REGISTER_SINK",
            Trigger::DeregisterSink { .. } => "DEREGISTER_SINK",
            Trigger::RegisterGateway { .. } => "REGISTER_GATEWAY",
            Trigger::DeregisterGateway { .. } => "DEREGISTER_GATEWAY",
            Trigger::RegisterConverter { .. } => "REGISTER_CONVERTER",
            Trigger::DeregisterConverter { .. } => "DEREGISTER_CONVERTER",
            Trigger::RegisterCrossfader { .. } => "REGISTER_CROSSFADER",
            Trigger::DeregisterCrossfader { .. } => "DEREGISTER_CROSSFADER",
            Trigger::DomainRegistrationComplete { .. } => "DOMAIN_REG_COMPLETE",
            Trigger::UserConnectionRequest { .. } => "USER_CONNECTION_REQUEST",
            Trigger::UserDisconnectRequest { .. } => "USER_DISCONNECT_REQUEST",
            Trigger::UserSinkVolume { .. } => "USER_SINK_VOLUME",
            Trigger::UserSourceVolume { .. } => "USER_SOURCE_VOLUME",
            Trigger::UserSinkMute { .. } => "USER_SINK_MUTE",
            Trigger::UserMainSinkSoundProperty { .. } => "USER_MAIN_SINK_SOUND_PROPERTY",
            Trigger::UserMainSourceSoundProperty { .. } => "USER_MAIN_SOURCE_SOUND_PROPERTY",
            Trigger::UserSystemProperty { .. } => "USER_SYSTEM_PROPERTY",
            Trigger::AvailabilityChange { .. } => "AVAILABILITY_CHANGE",
            Trigger::SourceInterruptChange { .. } => "SOURCE_INTERRUPT_CHANGE",
            Trigger::ConnectionStateChange { .. } => "CONNECTION_STATE_CHANGE",
            Trigger::NotificationDataChanged { .. } => "NOTIFICATION_DATA",
        }
    }
}

/// Two-lane FIFO of pending triggers (C6). `enqueue_priority` feeds the
/// front lane the dispatcher always drains first (§4.6/§5 ordering
/// guarantee).
#[derive(Debug, Default)]
pub struct TriggerQueue {
    priority: VecDeque<Trigger>,
    normal: VecDeque<Trigger>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, trigger: Trigger) {
        debug!(kind = trigger.kind(), "trigger queued");
        self.normal.push_back(trigger);
    }

    pub fn enqueue_priority(&mut self, trigger: Trigger) {
        debug!(kind = trigger.kind(), "priority trigger queued");
        self.priority.push_back(trigger);
    }

    /// Priority lane first, else the normal lane (§4.6).
    pub fn dequeue(&mut self) -> Option<Trigger> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.normal.is_empty()
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    /// Read-only view for policy introspection, priority lane first (§4.6).
    pub fn snapshot(&self) -> impl Iterator<Item = &Trigger> {
        self.priority.iter().chain(self.normal.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disconnect(name: &str) -> Trigger {
        Trigger::UserDisconnectRequest {
            connection_name: name.to_string(),
        }
    }

    #[test]
    fn fifo_within_a_lane() {
        let mut q = TriggerQueue::new();
        q.enqueue(disconnect("a"));
        q.enqueue(disconnect("b"));
        assert_eq!(q.dequeue(), Some(disconnect("a")));
        assert_eq!(q.dequeue(), Some(disconnect("b")));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn priority_lane_drains_first() {
        let mut q = TriggerQueue::new();
        q.enqueue(disconnect("normal"));
        q.enqueue_priority(disconnect("priority"));
        assert_eq!(q.dequeue(), Some(disconnect("priority")));
        assert_eq!(q.dequeue(), Some(disconnect("normal")));
    }

    #[test]
    fn snapshot_orders_priority_then_normal_without_consuming() {
        let mut q = TriggerQueue::new();
        q.enqueue(disconnect("normal"));
        q.enqueue_priority(disconnect("priority"));
        let seen: Vec<_> = q.snapshot().cloned().collect();
        assert_eq!(seen, vec![disconnect("priority"), disconnect("normal")]);
        assert_eq!(q.len(), 2);
    }
}
