//! Marshals every external hook onto the single task that owns the
//! [`ControllerFacade`] (§5: "the logical task... is the only thing
//! permitted to mutate the controller's state"). `ControllerFacade` holds
//! `Rc<RefCell<_>>` internals and is therefore `!Send`; it cannot be shared
//! across threads the way `pmocontrol`'s `ControlPoint` shares its
//! `crossbeam_channel` receiver with a dedicated OS thread. Instead the
//! facade is driven inside a [`tokio::task::LocalSet`], and every caller —
//! potentially on other threads — reaches it through a cloneable, `Send`
//! [`ControllerHandle`] that holds nothing but an `UnboundedSender`.
//!
//! Each command carries a boxed closure over `&mut ControllerFacade` plus a
//! oneshot reply channel; this avoids enumerating every hook twice (once on
//! `ControllerFacade`, once again as a `Command` variant) at the cost of
//! boxing the closure, which is cheap next to the dispatcher work it wraps.

use tokio::sync::{mpsc, oneshot};

use crate::facade::ControllerFacade;

type Job = Box<dyn FnOnce(&mut ControllerFacade) + Send>;

/// One marshaled call: do `job` against the facade, then drop `reply` (the
/// caller may have stopped waiting).
struct Command {
    job: Job,
}

/// `Send`-safe front door to a [`ControllerFacade`] pinned to one
/// `LocalSet` task. Clone freely; every clone shares the same mailbox.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// Runtime error surfaced when the owning task has shut down and the
/// mailbox can no longer be reached.
#[derive(Debug, thiserror::Error)]
#[error("controller task is no longer running")]
pub struct ControllerGone;

impl ControllerHandle {
    /// Runs `f` against the facade on its owning task and returns whatever
    /// `f` returns. The only way callers on other threads touch the facade.
    pub async fn call<T, F>(&self, f: F) -> Result<T, ControllerGone>
    where
        F: FnOnce(&mut ControllerFacade) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |facade| {
            let result = f(facade);
            let _ = reply_tx.send(result);
        });
        self.tx.send(Command { job }).map_err(|_| ControllerGone)?;
        reply_rx.await.map_err(|_| ControllerGone)
    }
}

/// Spawns the facade's owning task onto `local_set` and returns a handle to
/// it. The caller is responsible for running `local_set` (e.g. via
/// `LocalSet::run_until` inside a single-threaded or current-thread
/// runtime) — mirroring how `pmocontrol::ControlPoint::new` hands back a
/// controller object while its worker thread runs independently.
pub fn spawn(local_set: &tokio::task::LocalSet, mut facade: ControllerFacade) -> ControllerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
    local_set.spawn_local(async move {
        while let Some(Command { job }) = rx.recv().await {
            job(&mut facade);
        }
        tracing::debug!("controller mailbox closed, task exiting");
    });
    ControllerHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routingctl_config::ControllerConfig;
    use routingctl_sim::{FakeDaemon, MixingPolicyEngine};
    use std::rc::Rc;

    #[tokio::test]
    async fn marshaled_calls_reach_the_facade() {
        let local = tokio::task::LocalSet::new();
        let daemon = Rc::new(FakeDaemon::new());
        let facade = ControllerFacade::new(
            Box::new(Rc::clone(&daemon)),
            Box::new(MixingPolicyEngine::new(Vec::new())),
        );
        let handle = spawn(&local, facade);

        local
            .run_until(async move {
                let config = ControllerConfig::default();
                let applied = handle.call(move |facade| facade.apply_config(&config)).await;
                assert!(matches!(applied, Ok(Ok(()))));
            })
            .await;
    }
}
