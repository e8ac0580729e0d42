use crate::node::{Node, NodeExit};
use crate::token::NodeId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Ring-wide interrupt, observed by the coordinator.
///
/// Cloneable and idempotent: triggering it any number of times, from any
/// task, has the same effect as triggering it once.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!("Global interrupt raised");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// The coordinator's stop token.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// A spawned relay actor as seen by the controller.
pub(crate) struct RelayHandle {
    pub(crate) id: NodeId,
    pub(crate) stop: CancellationToken,
    pub(crate) task: JoinHandle<NodeExit>,
}

/// Owns every relay actor of a ring and tears them down.
///
/// Held by the coordinator. [`RingController::shutdown`] consumes it, so the
/// teardown sequence can only ever run once.
pub struct RingController {
    relays: Vec<RelayHandle>,
    interrupt: Interrupt,
}

impl RingController {
    pub(crate) fn new(relays: Vec<RelayHandle>, interrupt: Interrupt) -> Self {
        Self { relays, interrupt }
    }

    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn relay_ids(&self) -> Vec<NodeId> {
        self.relays.iter().map(|relay| relay.id).collect()
    }

    /// Relays whose task has not finished yet.
    pub fn live_relays(&self) -> usize {
        self.relays
            .iter()
            .filter(|relay| !relay.task.is_finished())
            .count()
    }

    /// Stops every relay, releases the coordinator's endpoints and reaps all relays.
    pub async fn shutdown(self, coordinator: Node) -> ShutdownReport {
        info!(
            coordinator = %coordinator.id(),
            relays = self.relays.len(),
            "Shutting down ring..."
        );

        // Makes any late Ctrl-C a no-op.
        self.interrupt.token.cancel();
        for relay in &self.relays {
            relay.stop.cancel();
        }

        coordinator.release();

        let mut exits = Vec::with_capacity(self.relays.len());
        for relay in self.relays {
            let exit = match relay.task.await {
                Ok(exit) => exit,
                Err(e) => {
                    error!(node = %relay.id, error = %e, "Relay task failed");
                    NodeExit::Aborted(e.to_string())
                }
            };
            exits.push((relay.id, exit));
        }

        let report = ShutdownReport { exits };
        info!(reaped = report.reaped(), clean = report.is_clean(), "Ring shutdown complete.");
        report
    }
}

/// How every relay ended.
#[derive(Debug)]
pub struct ShutdownReport {
    pub exits: Vec<(NodeId, NodeExit)>,
}

impl ShutdownReport {
    pub fn reaped(&self) -> usize {
        self.exits.len()
    }

    /// True when no relay ended with a fault.
    pub fn is_clean(&self) -> bool {
        self.exits.iter().all(|(_, exit)| exit.is_graceful())
    }

    pub fn exit_of(&self, id: NodeId) -> Option<&NodeExit> {
        self.exits
            .iter()
            .find(|(node, _)| *node == id)
            .map(|(_, exit)| exit)
    }
}
