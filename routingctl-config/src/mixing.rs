//! Mixing-rule configuration: the Rust-native, YAML-backed stand-in for
//! "the rule-authoring language used by policy configuration" (§1 scope
//! note — named as an external collaborator, not specified in detail).
//!
//! A rule reads "when a main connection of class `when_class` becomes
//! CONNECTED (optionally only on sink `when_sink`), apply `action` to the
//! other already-connected main connections of class `target_class`"
//! (§8 S3's "connecting Phone decreases volume on Entertainment").
//! `routingctl-sim`'s toy policy engine is the only consumer; this crate
//! only owns the shape and the YAML loading.

use routingctl_core::model::ConnectionState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MixingAction {
    /// Mute the target's sink.
    Mute,
    /// Clear a previously applied mute.
    Unmute,
    /// Set the target main connection's volume to an absolute value.
    SetVolume(i16),
    /// Suspend the target main connection.
    Suspend,
    /// Resume (reconnect) a previously suspended target.
    Resume,
}

fn default_when_state() -> ConnectionState {
    ConnectionState::Connected
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixingRuleConfig {
    pub when_class: String,
    #[serde(default)]
    pub when_sink: Option<String>,
    /// Main-connection state that arms this rule. Most rules react to
    /// `Connected` (S3's "connecting Phone ducks Entertainment"); pairing one
    /// with a second rule on `Disconnected` lets a config restore what it
    /// ducked once the triggering class releases.
    #[serde(default = "default_when_state")]
    pub when_state: ConnectionState,
    pub action: MixingAction,
    pub target_class: String,
}

impl MixingRuleConfig {
    /// Whether this rule fires for a `CONNECTION_STATE_CHANGE` trigger
    /// landing on `class_name`/`sink_name` in `state`.
    pub fn matches(&self, class_name: &str, sink_name: &str, state: ConnectionState) -> bool {
        self.when_class == class_name
            && self.when_state == state
            && self
                .when_sink
                .as_deref()
                .is_none_or(|expected| expected == sink_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_class_only_rule() {
        let rule = MixingRuleConfig {
            when_class: "Phone".to_string(),
            when_sink: None,
            when_state: ConnectionState::Connected,
            action: MixingAction::SetVolume(50),
            target_class: "Entertainment".to_string(),
        };
        assert!(rule.matches("Phone", "Earpiece", ConnectionState::Connected));
        assert!(rule.matches("Phone", "AnySink", ConnectionState::Connected));
        assert!(!rule.matches("Navigation", "Earpiece", ConnectionState::Connected));
        assert!(!rule.matches("Phone", "Earpiece", ConnectionState::Disconnected));
    }

    #[test]
    fn matches_class_and_sink_rule() {
        let rule = MixingRuleConfig {
            when_class: "Phone".to_string(),
            when_sink: Some("Earpiece".to_string()),
            when_state: ConnectionState::Connected,
            action: MixingAction::Mute,
            target_class: "Entertainment".to_string(),
        };
        assert!(rule.matches("Phone", "Earpiece", ConnectionState::Connected));
        assert!(!rule.matches("Phone", "Speaker", ConnectionState::Connected));
    }

    #[test]
    fn a_disconnect_paired_rule_restores() {
        let rule = MixingRuleConfig {
            when_class: "Phone".to_string(),
            when_sink: None,
            when_state: ConnectionState::Disconnected,
            action: MixingAction::Resume,
            target_class: "Entertainment".to_string(),
        };
        assert!(rule.matches("Phone", "Earpiece", ConnectionState::Disconnected));
        assert!(!rule.matches("Phone", "Earpiece", ConnectionState::Connected));
    }
}
