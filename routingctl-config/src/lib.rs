//! YAML configuration for `routingctl`: class descriptions, their
//! topologies, and the mixing rules that drive the policy engine shipped in
//! `routingctl-sim`.
//!
//! Grounded on `pmoconfig`'s serde/serde_yaml configuration layer, trimmed
//! to this narrower scope (no device UDNs, no HTTP API, no encryption —
//! this crate only ever describes routing policy) and without its global
//! `lazy_static` singleton; see [`loader`] for why.

pub mod class;
pub mod error;
pub mod loader;
pub mod mixing;
pub mod topology;

pub use class::ClassConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ControllerConfig;
pub use mixing::{MixingAction, MixingRuleConfig};
pub use topology::parse_topology;
