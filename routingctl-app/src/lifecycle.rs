//! Controller lifecycle hooks (§6): startup, readiness, rundown, and the
//! two command-client confirmation callbacks. These sit outside the
//! trigger/dispatcher pipeline entirely — they describe the process's own
//! state, not an element's.

use tracing::info;

/// `startup_controller` (§6): the hosting process calls this once, before
/// any other hook, to let the controller do whatever one-time setup it
/// needs. Nothing here actually blocks — `routingctl-app`'s real startup
/// work is `ControllerFacade::new` plus `apply_config`, both synchronous —
/// so this exists as the same named seam the original exposes, logged the
/// way `pmocontrol`'s `ControlPoint::start` announces its own startup.
pub fn startup_controller() {
    info!("controller startup");
}

/// `set_controller_ready` (§6): flips the controller from starting up to
/// servicing hooks. Modeled as a log line plus a return value rather than
/// internal state, since nothing in this controller gates hook processing
/// on a readiness flag (§5: the dispatcher is always willing to run).
pub fn set_controller_ready() {
    info!("controller ready");
}

/// `set_controller_rundown` (§6): `signal == 0` means a normal shutdown
/// request, anything else an abnormal one. Returns whether the shutdown
/// was normal, for the hosting binary to decide its own exit code.
pub fn set_controller_rundown(signal: i32) -> bool {
    let normal = signal == 0;
    if normal {
        info!("controller rundown: normal shutdown");
    } else {
        tracing::warn!(signal, "controller rundown: abnormal shutdown");
    }
    normal
}

/// `confirm_command_ready` (§6): acknowledges a command-client's readiness
/// handshake. Command-client IPC is out of scope (§1 Non-goals), so this is
/// a logged stub a real send-interface binding would replace.
pub fn confirm_command_ready(handle: u16, error: i32) {
    info!(handle, error, "command interface ready confirmation");
}

/// `confirm_routing_ready` (§6): the routing-side counterpart of
/// [`confirm_command_ready`].
pub fn confirm_routing_ready(handle: u16, error: i32) {
    info!(handle, error, "routing interface ready confirmation");
}
