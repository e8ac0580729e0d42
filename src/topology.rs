//! # Ring Topology Builder
//!
//! Builds the directed cycle of `k` nodes:
//!
//! ```text
//!        channel 0         channel 1               channel k-1
//!   [0] ──────────▶ [1] ──────────▶ [2] ··· [k-1] ──────────▶ [0]
//! ```
//!
//! Channel `i` carries traffic from node `i` to node `(i+1) mod k`. Each node
//! receives the write side of its own channel and the read side of its
//! predecessor's, by move. Nothing else crosses into its task, so when a node
//! exits its neighbours see the channel close instead of hanging.
//!
//! Relays `1..k` are spawned onto the current Tokio runtime. Node 0 is returned
//! to the caller inside [`Ring`] and runs on the caller's task.

use crate::console::Console;
use crate::error::RingError;
use crate::lifecycle::shutdown::RelayHandle;
use crate::lifecycle::{Interrupt, RingController, ShutdownReport};
use crate::node::{Node, NodeExit};
use crate::token::{NodeId, WireCodec, DEFAULT_PAYLOAD_CAPACITY};
use crate::transport::{channel, Inbound, Outbound};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Largest supported ring.
pub const K_MAX: usize = 64;

/// Smallest ring with a distinct sender and receiver.
pub const K_MIN: usize = 2;

/// Sizing of a ring, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingConfig {
    /// Number of nodes `k`.
    pub size: usize,
    /// Bytes reserved for the payload in every record, terminator included.
    pub payload_capacity: usize,
}

impl RingConfig {
    /// A validated config with the default payload capacity.
    pub fn new(size: usize) -> Result<Self, RingError> {
        let config = Self {
            size,
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_payload_capacity(mut self, payload_capacity: usize) -> Result<Self, RingError> {
        self.payload_capacity = payload_capacity;
        self.validate()?;
        Ok(self)
    }

    /// Parses the operator's answer to the ring size prompt.
    pub fn parse(input: &str) -> Result<Self, RingError> {
        let trimmed = input.trim();
        let size = trimmed
            .parse::<usize>()
            .map_err(|_| RingError::InvalidSizeInput(trimmed.to_string()))?;
        Self::new(size)
    }

    pub fn validate(&self) -> Result<(), RingError> {
        if !(K_MIN..=K_MAX).contains(&self.size) {
            return Err(RingError::InvalidSize(self.size));
        }
        if self.payload_capacity == 0 {
            return Err(RingError::InvalidPayloadCapacity(self.payload_capacity));
        }
        Ok(())
    }

    pub fn codec(&self) -> WireCodec {
        WireCodec::new(self.payload_capacity).with_ring_size(self.size)
    }
}

/// Wires and starts a ring.
pub struct RingBuilder {
    config: RingConfig,
    console: Arc<dyn Console>,
}

impl RingBuilder {
    pub fn new(config: RingConfig, console: Arc<dyn Console>) -> Self {
        Self { config, console }
    }

    /// Allocates the channels, spawns the relays and returns the coordinator side.
    ///
    /// Must be called from within a Tokio runtime. Any failure aborts the whole
    /// construction; a partially built ring is never returned.
    pub fn build(self) -> Result<Ring, RingError> {
        self.config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| RingError::Spawn(e.to_string()))?;

        let k = self.config.size;
        let codec = self.config.codec();
        let (mut outbounds, mut inbounds): (Vec<Option<Outbound>>, Vec<Option<Inbound>>) = (0..k)
            .map(|index| {
                let (outbound, inbound) = channel(index, codec);
                (Some(outbound), Some(inbound))
            })
            .unzip();

        let mut claim = |id: NodeId| -> Result<(Inbound, Outbound), RingError> {
            let inbound = inbounds[id.previous(k).index()].take();
            let outbound = outbounds[id.index()].take();
            match (inbound, outbound) {
                (Some(inbound), Some(outbound)) => Ok((inbound, outbound)),
                _ => Err(RingError::Wiring(id.index())),
            }
        };

        let interrupt = Interrupt::new();
        let (inbound, outbound) = claim(NodeId::COORDINATOR)?;
        let coordinator = Node::new(
            NodeId::COORDINATOR,
            k,
            inbound,
            outbound,
            self.console.clone(),
            interrupt.token(),
        );

        let mut relays = Vec::with_capacity(k - 1);
        for index in 1..k {
            let id = NodeId(index);
            let (inbound, outbound) = claim(id)?;
            let stop = CancellationToken::new();
            let node = Node::new(id, k, inbound, outbound, self.console.clone(), stop.clone());
            let task = runtime.spawn(node.run().instrument(info_span!("relay")));
            relays.push(RelayHandle { id, stop, task });
        }

        info!(k, record_size = codec.record_size(), "Ring created");
        Ok(Ring {
            config: self.config,
            coordinator,
            controller: RingController::new(relays, interrupt),
        })
    }
}

/// A built ring: the coordinator node plus the controller for its relays.
pub struct Ring {
    config: RingConfig,
    coordinator: Node,
    controller: RingController,
}

impl Ring {
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn controller(&self) -> &RingController {
        &self.controller
    }

    /// Handle for raising the global interrupt from outside the ring.
    pub fn interrupt(&self) -> Interrupt {
        self.controller.interrupt()
    }

    /// Seeds the ring and runs the coordinator until it exits, then shuts the ring down.
    ///
    /// Every exit path, graceful or not, goes through the full shutdown, so
    /// no relay is left running when this returns.
    pub async fn run(self) -> (NodeExit, ShutdownReport) {
        let Ring {
            mut coordinator,
            controller,
            ..
        } = self;
        let exit = coordinator.drive().await;
        let report = controller.shutdown(coordinator).await;
        (exit, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;

    fn console() -> Arc<dyn Console> {
        Arc::new(ScriptedConsole::new(Vec::<String>::new()))
    }

    #[test]
    fn size_must_be_within_bounds() {
        assert!(matches!(RingConfig::new(1), Err(RingError::InvalidSize(1))));
        assert!(matches!(RingConfig::new(65), Err(RingError::InvalidSize(65))));
        assert_eq!(RingConfig::new(2).unwrap().size, 2);
        assert_eq!(RingConfig::new(K_MAX).unwrap().size, K_MAX);
    }

    #[test]
    fn parses_operator_input() {
        assert_eq!(RingConfig::parse(" 4\n").unwrap().size, 4);
        assert!(matches!(
            RingConfig::parse("four"),
            Err(RingError::InvalidSizeInput(input)) if input == "four"
        ));
        assert!(matches!(RingConfig::parse("0"), Err(RingError::InvalidSize(0))));
    }

    #[test]
    fn payload_capacity_must_be_positive() {
        let config = RingConfig::new(3).unwrap();
        assert!(matches!(
            config.with_payload_capacity(0),
            Err(RingError::InvalidPayloadCapacity(0))
        ));
        let codec = config.with_payload_capacity(8).unwrap().codec();
        assert_eq!(codec.payload_capacity(), 8);
        assert_eq!(codec.record_size(), 16);
    }

    #[test]
    fn build_outside_a_runtime_is_fatal() {
        let config = RingConfig::new(3).unwrap();
        let result = RingBuilder::new(config, console()).build();
        assert!(matches!(result, Err(RingError::Spawn(_))));
    }

    #[tokio::test]
    async fn build_rejects_an_invalid_config() {
        let config = RingConfig {
            size: 1,
            payload_capacity: 16,
        };
        let result = RingBuilder::new(config, console()).build();
        assert!(matches!(result, Err(RingError::InvalidSize(1))));
    }

    #[tokio::test]
    async fn build_spawns_one_relay_per_non_coordinator_node() {
        let ring = RingBuilder::new(RingConfig::new(5).unwrap(), console())
            .build()
            .unwrap();

        assert_eq!(ring.config().size, 5);
        assert_eq!(ring.coordinator.id(), NodeId::COORDINATOR);
        assert_eq!(
            ring.controller().relay_ids(),
            vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]
        );
        assert_eq!(ring.coordinator.inbound_channel(), 4);
        assert_eq!(ring.coordinator.outbound_channel(), 0);

        ring.interrupt().trigger();
        let (exit, report) = ring.run().await;
        assert!(matches!(exit, NodeExit::Interrupted));
        assert_eq!(report.reaped(), 4);
    }
}
