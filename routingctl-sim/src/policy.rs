//! A toy [`PolicyEngine`] (C9) driven by the YAML mixing rules
//! `routingctl-config` loads. User-request triggers translate to action
//! descriptors almost mechanically — the class/source/sink names already
//! named in the trigger are just carried into the descriptor's parameter
//! map. `ConnectionStateChange` is the interesting one: it looks up every
//! configured [`MixingRuleConfig`] whose `when_class`/`when_sink`/
//! `when_state` matches and, for each, emits one leaf action per other
//! already-connected main connection of `target_class` (§8 S3).

use routingctl_config::{MixingAction, MixingRuleConfig};
use routingctl_core::model::ConnectionState;
use routingctl_core::policy::{ActionDescriptor, ActionKind, ParamKey, ParamValue, PolicyEngine};
use routingctl_core::registry::Registry;
use routingctl_core::trigger::Trigger;

pub struct MixingPolicyEngine {
    rules: Vec<MixingRuleConfig>,
}

impl MixingPolicyEngine {
    pub fn new(rules: Vec<MixingRuleConfig>) -> Self {
        Self { rules }
    }

    /// For a connection-state change landing on `connection_name`, find the
    /// class and sink name it fired on so rule matching can proceed — both
    /// are looked up fresh from the registry rather than threaded through
    /// the trigger, since `Trigger::ConnectionStateChange` only carries the
    /// main connection's own name (§3).
    fn class_and_sink_for(&self, registry: &Registry, connection_name: &str) -> Option<(String, String)> {
        let conn = registry.main_connections().find(|mc| mc.name == connection_name)?;
        let class = registry.class(conn.class_id)?;
        let sink = registry.sink(conn.main_sink)?;
        Some((class.name.clone(), sink.name.clone()))
    }

    fn actions_for_rule(
        &self,
        registry: &Registry,
        rule: &MixingRuleConfig,
        firing_connection: &str,
    ) -> Vec<ActionDescriptor> {
        let Some(target_class) = registry.classes().find(|c| c.name == rule.target_class) else {
            return Vec::new();
        };
        target_class
            .main_connections
            .iter()
            .filter_map(|id| registry.main_connection(*id))
            .filter(|mc| mc.name != firing_connection && mc.state == ConnectionState::Connected)
            .filter_map(|mc| {
                let sink_name = registry.sink(mc.main_sink)?.name.clone();
                Some(self.descriptor_for(rule.action, &mc.name, &sink_name))
            })
            .collect()
    }

    fn descriptor_for(&self, action: MixingAction, connection_name: &str, sink_name: &str) -> ActionDescriptor {
        match action {
            MixingAction::Mute => ActionDescriptor::new(ActionKind::SinkMute)
                .with(ParamKey::SinkName, ParamValue::Text(sink_name.to_string()))
                .with(ParamKey::Mute, ParamValue::Bool(true)),
            MixingAction::Unmute => ActionDescriptor::new(ActionKind::SinkMute)
                .with(ParamKey::SinkName, ParamValue::Text(sink_name.to_string()))
                .with(ParamKey::Mute, ParamValue::Bool(false)),
            MixingAction::SetVolume(volume) => ActionDescriptor::new(ActionKind::SinkVolume)
                .with(ParamKey::SinkName, ParamValue::Text(sink_name.to_string()))
                .with(ParamKey::Volume, ParamValue::Int(volume as i32)),
            MixingAction::Suspend => ActionDescriptor::new(ActionKind::MainConnectionSuspend)
                .with(ParamKey::MainConnectionName, ParamValue::Text(connection_name.to_string())),
            MixingAction::Resume => ActionDescriptor::new(ActionKind::MainConnectionConnect)
                .with(ParamKey::MainConnectionName, ParamValue::Text(connection_name.to_string())),
        }
    }
}

impl PolicyEngine for MixingPolicyEngine {
    fn process(&mut self, trigger: &Trigger, registry: &Registry) -> Vec<ActionDescriptor> {
        match trigger {
            Trigger::UserConnectionRequest { source_name, sink_name, class_name } => {
                vec![ActionDescriptor::new(ActionKind::ClassConnect)
                    .with(ParamKey::ClassName, ParamValue::Text(class_name.clone()))
                    .with(ParamKey::SourceName, ParamValue::Text(source_name.clone()))
                    .with(ParamKey::SinkName, ParamValue::Text(sink_name.clone()))]
            }
            Trigger::UserDisconnectRequest { connection_name } => {
                vec![ActionDescriptor::new(ActionKind::MainConnectionDisconnect)
                    .with(ParamKey::MainConnectionName, ParamValue::Text(connection_name.clone()))]
            }
            Trigger::UserSinkVolume { sink_name, volume } => {
                vec![ActionDescriptor::new(ActionKind::SinkVolume)
                    .with(ParamKey::SinkName, ParamValue::Text(sink_name.clone()))
                    .with(ParamKey::Volume, ParamValue::Int(*volume as i32))]
            }
            Trigger::UserSourceVolume { source_name, volume } => {
                vec![ActionDescriptor::new(ActionKind::SourceVolume)
                    .with(ParamKey::SourceName, ParamValue::Text(source_name.clone()))
                    .with(ParamKey::Volume, ParamValue::Int(*volume as i32))]
            }
            Trigger::UserSinkMute { sink_name, mute } => {
                vec![ActionDescriptor::new(ActionKind::SinkMute)
                    .with(ParamKey::SinkName, ParamValue::Text(sink_name.clone()))
                    .with(
                        ParamKey::Mute,
                        ParamValue::Bool(*mute == routingctl_core::model::MuteState::Muted),
                    )]
            }
            Trigger::UserMainSinkSoundProperty { sink_name, property } => {
                vec![ActionDescriptor::new(ActionKind::SinkSoundProperty)
                    .with(ParamKey::SinkName, ParamValue::Text(sink_name.clone()))
                    .with(ParamKey::PropertyKind, ParamValue::Text(property.0.clone()))
                    .with(ParamKey::PropertyValue, ParamValue::Int(property.1 as i32))]
            }
            Trigger::UserMainSourceSoundProperty { source_name, property } => {
                vec![ActionDescriptor::new(ActionKind::SourceSoundProperty)
                    .with(ParamKey::SourceName, ParamValue::Text(source_name.clone()))
                    .with(ParamKey::PropertyKind, ParamValue::Text(property.0.clone()))
                    .with(ParamKey::PropertyValue, ParamValue::Int(property.1 as i32))]
            }
            Trigger::ConnectionStateChange { connection_name, state } => {
                let Some((class_name, sink_name)) = self.class_and_sink_for(registry, connection_name) else {
                    return Vec::new();
                };
                self.rules
                    .iter()
                    .filter(|rule| rule.matches(&class_name, &sink_name, *state))
                    .flat_map(|rule| self.actions_for_rule(registry, rule, connection_name))
                    .collect()
            }
            // User system properties, availability/interrupt changes and raw
            // notification-data streaming have no mixing-rule counterpart in
            // this toy engine (§7 "Unknown": dropped after state
            // consolidation). A real rule engine would subscribe to these.
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use routingctl_core::ids::{ClassId, SinkId, SourceId};
    use routingctl_core::model::ClassType;
    use routingctl_core::registry::{Class, Sink, Source};

    use super::*;

    fn sample_source(id: SourceId, name: &str, class_id: ClassId) -> Source {
        Source {
            id,
            name: name.to_string(),
            domain_id: routingctl_core::ids::DomainId(1),
            class_id,
            availability: routingctl_core::model::AvailabilityInfo {
                availability: routingctl_core::model::Availability::Available,
                reason: routingctl_core::model::AvailabilityReason::Unknown,
            },
            state: routingctl_core::model::SourceState::On,
            interrupt_state: routingctl_core::model::InterruptState::Off,
            volume: 0,
            main_volume: 0,
            sound_properties: Default::default(),
            main_sound_properties: Default::default(),
            notification_configs: Vec::new(),
            persist_volume: false,
            observing_routes: Vec::new(),
        }
    }

    fn sample_sink(id: SinkId, name: &str, class_id: ClassId) -> Sink {
        Sink {
            id,
            name: name.to_string(),
            domain_id: routingctl_core::ids::DomainId(1),
            class_id,
            availability: routingctl_core::model::AvailabilityInfo {
                availability: routingctl_core::model::Availability::Available,
                reason: routingctl_core::model::AvailabilityReason::Unknown,
            },
            mute_state: routingctl_core::model::MuteState::Unmuted,
            volume: 40,
            main_volume: 40,
            sound_properties: Default::default(),
            main_sound_properties: Default::default(),
            notification_configs: Vec::new(),
            persist_volume: false,
        }
    }

    fn sample_class(id: ClassId, name: &str, default_volume: i16) -> Class {
        Class {
            id,
            name: name.to_string(),
            class_type: ClassType::Playback,
            properties: Default::default(),
            topologies: Vec::new(),
            default_volume,
            volume_persistence: false,
            last_volume: Default::default(),
            last_main_connection_volume: Default::default(),
            last_sound_property: Default::default(),
            main_connections: Vec::new(),
        }
    }

    /// Phone class/source/sink plus an Entertainment class with one
    /// connected main connection on `Speaker`, and a second connected
    /// Phone-class main connection (`Phone-to-Earpiece`) — the one a
    /// `ConnectionStateChange` trigger in these tests fires on.
    fn sample_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_source(sample_source(SourceId(1), "Phone", ClassId(1)));
        registry.register_source(sample_source(SourceId(2), "MediaPlayer", ClassId(2)));
        registry.register_sink(sample_sink(SinkId(1), "Earpiece", ClassId(1)));
        registry.register_sink(sample_sink(SinkId(2), "Speaker", ClassId(2)));
        registry.register_class(sample_class(ClassId(1), "Phone", 60));
        registry.register_class(sample_class(ClassId(2), "Entertainment", 80));

        let music = registry.allocate_main_connection(
            "Phone-to-Speaker-Music".into(),
            SourceId(2),
            SinkId(2),
            ClassId(2),
            Vec::new(),
        );
        registry.main_connection_mut(music).unwrap().state = ConnectionState::Connected;

        let call = registry.allocate_main_connection(
            "Phone-to-Earpiece".into(),
            SourceId(1),
            SinkId(1),
            ClassId(1),
            Vec::new(),
        );
        registry.main_connection_mut(call).unwrap().state = ConnectionState::Connected;

        registry
    }

    #[test]
    fn connection_request_becomes_a_class_connect_descriptor() {
        let mut engine = MixingPolicyEngine::new(Vec::new());
        let registry = Registry::new();
        let trigger = Trigger::UserConnectionRequest {
            source_name: "Phone".into(),
            sink_name: "Speaker".into(),
            class_name: "Phone".into(),
        };
        let descriptors = engine.process(&trigger, &registry);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind, Some(ActionKind::ClassConnect));
        assert_eq!(descriptors[0].text(ParamKey::SourceName), Some("Phone"));
    }

    #[test]
    fn connecting_phone_ducks_the_other_connected_entertainment_connection() {
        let rule = MixingRuleConfig {
            when_class: "Phone".into(),
            when_sink: None,
            when_state: ConnectionState::Connected,
            action: MixingAction::SetVolume(20),
            target_class: "Entertainment".into(),
        };
        let mut engine = MixingPolicyEngine::new(vec![rule]);
        let registry = sample_registry();
        let trigger = Trigger::ConnectionStateChange {
            connection_name: "Phone-to-Earpiece".into(),
            state: ConnectionState::Connected,
        };
        let descriptors = engine.process(&trigger, &registry);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind, Some(ActionKind::SinkVolume));
        assert_eq!(descriptors[0].text(ParamKey::SinkName), Some("Speaker"));
        assert_eq!(descriptors[0].int(ParamKey::Volume), Some(20));
    }

    #[test]
    fn a_rule_never_fires_on_its_own_triggering_connection() {
        let rule = MixingRuleConfig {
            when_class: "Entertainment".into(),
            when_sink: None,
            when_state: ConnectionState::Connected,
            action: MixingAction::Mute,
            target_class: "Entertainment".into(),
        };
        let mut engine = MixingPolicyEngine::new(vec![rule]);
        let registry = sample_registry();
        let trigger = Trigger::ConnectionStateChange {
            connection_name: "Phone-to-Speaker-Music".into(),
            state: ConnectionState::Connected,
        };
        assert!(engine.process(&trigger, &registry).is_empty());
    }

    #[test]
    fn an_unmatched_trigger_kind_yields_no_descriptors() {
        let mut engine = MixingPolicyEngine::new(Vec::new());
        let registry = Registry::new();
        let trigger = Trigger::UserSystemProperty { key: "foo".into(), value: 1 };
        assert!(engine.process(&trigger, &registry).is_empty());
    }
}
