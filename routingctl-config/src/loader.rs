//! Loads a [`ControllerConfig`] from a YAML file or string.
//!
//! Grounded on `pmoconfig::Config::load_config`'s read-then-parse shape, but
//! deliberately without its `lazy_static` global singleton: the "no hidden
//! global state" design note (§9) already threads a [`Controller`] context
//! explicitly through the dispatcher, and a second ambient singleton for
//! configuration would undercut that. `load` returns an owned value the
//! caller stores wherever it stores the rest of its controller state.
//!
//! [`Controller`]: routingctl_core::Controller

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::class::ClassConfig;
use crate::error::ConfigError;
use crate::mixing::MixingRuleConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub classes: Vec<ClassConfig>,
    #[serde(default)]
    pub mixing_rules: Vec<MixingRuleConfig>,
}

impl ControllerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: "<in-memory>".to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|source| ConfigError::Yaml {
            path: "<in-memory>".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
classes:
  - name: Entertainment
    type: Playback
    topologies:
      - "src:Media snk:Speaker"
    default_volume: 80
    volume_persistence: true
  - name: Phone
    type: Playback
    topologies:
      - "src:Phone snk:Earpiece"
    default_volume: 60
mixing_rules:
  - when_class: Phone
    action: !SetVolume 50
    target_class: Entertainment
"#;

    #[test]
    fn parses_a_complete_config() {
        let config = ControllerConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.classes.len(), 2);
        assert_eq!(config.classes[0].name, "Entertainment");
        assert_eq!(config.mixing_rules.len(), 1);
        assert_eq!(config.mixing_rules[0].when_class, "Phone");
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = ControllerConfig::from_yaml(SAMPLE).unwrap();
        let yaml = config.to_yaml().unwrap();
        let reparsed = ControllerConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed.classes.len(), config.classes.len());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ControllerConfig::load("/nonexistent/path/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
