// ABOUTME: Asynchronous start/stop toggling with a pending → confirmed | failed result.
// ABOUTME: Tracks in-flight toggles so a container can only have one at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::events::{LogEvent, PresentationSink};
use crate::runtime::{ContainerOps, ContainerState};
use crate::types::ContainerId;

use super::error::GatewayResultExt;

pub(crate) const TOGGLE_TITLE: &str = "Container State Toggle";

/// Where a toggle stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleState {
    Pending,
    /// The runtime accepted the change; holds the new status.
    Confirmed(ContainerState),
    Failed(String),
}

impl ToggleState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ToggleState::Pending)
    }
}

/// Returned by a toggle that was accepted; observes its progress.
#[derive(Debug)]
pub struct ToggleHandle {
    id: ContainerId,
    rx: watch::Receiver<ToggleState>,
}

impl ToggleHandle {
    pub(crate) fn new(id: ContainerId, rx: watch::Receiver<ToggleState>) -> Self {
        Self { id, rx }
    }

    pub fn container(&self) -> &ContainerId {
        &self.id
    }

    /// Current state without waiting.
    pub fn state(&self) -> ToggleState {
        self.rx.borrow().clone()
    }

    /// Wait for the toggle to finish.
    pub async fn wait(mut self) -> ToggleState {
        loop {
            let current = self.rx.borrow_and_update().clone();
            if !current.is_pending() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                let last = self.rx.borrow().clone();
                return if last.is_pending() {
                    ToggleState::Failed("toggle worker stopped without a result".to_string())
                } else {
                    last
                };
            }
        }
    }
}

/// Containers with a toggle outstanding.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    ids: Arc<Mutex<HashSet<ContainerId>>>,
}

impl InFlight {
    /// Claim `id`, or `None` if a toggle for it is already running.
    pub fn try_claim(&self, id: &ContainerId) -> Option<InFlightGuard> {
        if self.ids.lock().insert(id.clone()) {
            Some(InFlightGuard {
                ids: self.ids.clone(),
                id: id.clone(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.ids.lock().contains(id)
    }
}

/// Releases the claim when dropped, including when the worker panics.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    ids: Arc<Mutex<HashSet<ContainerId>>>,
    id: ContainerId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}

/// Flip a container between running and stopped.
///
/// Reports one success or error log, then exactly one status update: the new
/// state on success, the prior state on failure when it is known.
pub(crate) async fn run_toggle<R: ContainerOps + ?Sized>(
    runtime: &R,
    sink: &dyn PresentationSink,
    id: &ContainerId,
    stop_timeout: Duration,
    last_known: Option<ContainerState>,
) -> ToggleState {
    let info = match runtime.inspect_container(id).await.during("inspect") {
        Ok(info) => info,
        Err(e) => {
            let message = format!("Error toggling container state: {}", e);
            sink.emit_log(LogEvent::error(TOGGLE_TITLE, message.clone()));
            if let Some(prior) = last_known {
                sink.update_status(id, prior);
            }
            return ToggleState::Failed(message);
        }
    };

    let (outcome, target, title, verb) = if info.state.is_running() {
        tracing::debug!(container = %info.name, "stopping");
        (
            runtime.stop_container(id, stop_timeout).await.during("stop"),
            ContainerState::Exited,
            "Container Stopped",
            "Stopped",
        )
    } else {
        tracing::debug!(container = %info.name, "starting");
        (
            runtime.start_container(id).await.during("start"),
            ContainerState::Running,
            "Container Started",
            "Started",
        )
    };

    match outcome {
        Ok(()) => {
            tracing::info!(container = %info.name, state = %target, "toggled");
            sink.emit_log(LogEvent::success(
                title,
                format!("{} container: {}", verb, info.name),
            ));
            sink.update_status(id, target);
            ToggleState::Confirmed(target)
        }
        Err(e) => {
            let message = format!("Error toggling container state: {}", e);
            sink.emit_log(LogEvent::error(TOGGLE_TITLE, message.clone()));
            sink.update_status(id, info.state);
            ToggleState::Failed(message)
        }
    }
}
