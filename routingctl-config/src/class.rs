//! Class configuration (§3 "Entities": classes own topologies and
//! default/persisted volumes).

use std::collections::HashMap;

use routingctl_core::ids::ClassId;
use routingctl_core::model::ClassType;
use routingctl_core::registry::Class;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::topology::parse_topology;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub class_type: ClassType,
    /// Topology expressions in priority order (§4.3: "first-configured
    /// wins" on a resolver tie).
    #[serde(default)]
    pub topologies: Vec<String>,
    #[serde(default)]
    pub default_volume: i16,
    #[serde(default)]
    pub volume_persistence: bool,
    #[serde(default)]
    pub properties: HashMap<String, i32>,
}

impl ClassConfig {
    /// Compiles this configuration into a registry-ready [`Class`] with no
    /// connections and fresh volume history, under the given `id`.
    pub fn into_class(self, id: ClassId) -> Result<Class, ConfigError> {
        let topologies = self
            .topologies
            .iter()
            .map(|expr| parse_topology(expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Class {
            id,
            name: self.name,
            class_type: self.class_type,
            properties: self.properties,
            topologies,
            default_volume: self.default_volume,
            volume_persistence: self.volume_persistence,
            last_volume: HashMap::new(),
            last_main_connection_volume: HashMap::new(),
            last_sound_property: HashMap::new(),
            main_connections: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_topologies_in_order() {
        let config = ClassConfig {
            name: "Entertainment".to_string(),
            class_type: ClassType::Playback,
            topologies: vec!["src:Media snk:Speaker".to_string(), "src:* snk:*".to_string()],
            default_volume: 80,
            volume_persistence: true,
            properties: HashMap::new(),
        };
        let class = config.into_class(ClassId(1)).unwrap();
        assert_eq!(class.topologies.len(), 2);
        assert_eq!(class.default_volume, 80);
        assert!(class.volume_persistence);
    }
}
