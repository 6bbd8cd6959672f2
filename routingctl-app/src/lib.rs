//! Hosts `routingctl-core`'s dispatcher behind the external hook surface
//! (C10, §6): owns the `Controller`, turns every hook into a `Trigger` or a
//! direct registry mutation, and runs the controller lifecycle.
//!
//! `facade` is the synchronous hook API; `mailbox` marshals calls onto it
//! from other tasks/threads (§5); `lifecycle` covers startup/rundown and
//! the two command-client confirmation hooks that sit outside the trigger
//! pipeline.

pub mod facade;
pub mod lifecycle;
pub mod mailbox;

pub use facade::ControllerFacade;
pub use lifecycle::{
    confirm_command_ready, confirm_routing_ready, set_controller_rundown, set_controller_ready,
    startup_controller,
};
pub use mailbox::{ControllerGone, ControllerHandle};
