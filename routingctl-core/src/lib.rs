//! Policy-driven audio routing controller core.
//!
//! Mirrors the original's generic controller plugin: a single-threaded
//! dispatcher (§4.7) drives a command-pattern action tree (§4.4/§4.5) built
//! from whatever an external [`policy::PolicyEngine`] returns for each
//! dequeued [`trigger::Trigger`], against a local mirror of the daemon's
//! element graph (`registry`) and a set of daemon-facing
//! [`primitives::RoutingPrimitives`]. [`controller::Controller`] is the one
//! context tying all of it together (§9 "Singletons").
//!
//! This crate only defines the mechanism. `routingctl-config` supplies YAML
//! configuration loading, `routingctl-sim` supplies a fake daemon and a toy
//! policy engine for tests, and `routingctl-app` hosts the whole thing behind
//! the hook surface in §6.

pub mod action;
pub mod controller;
pub mod error;
pub mod handle_store;
pub mod ids;
pub mod model;
pub mod policy;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod trigger;

pub use controller::{Controller, ControllerEvent};
pub use error::{RoutingError, RoutingResult};
pub use policy::{ActionDescriptor, ActionKind, ParamKey, ParamValue, PolicyEngine};
pub use primitives::{RampType, RoutingPrimitives, VolumeRamp};
pub use registry::Registry;
pub use trigger::{Trigger, TriggerQueue};
