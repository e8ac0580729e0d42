//! # Node State Machine
//!
//! Every actor in the ring runs the same loop:
//!
//! ```text
//!   AWAIT_TOKEN ──empty──▶ HANDLE_EMPTY ───┐
//!        ▲     └─routed─▶ HANDLE_ROUTED ──┤
//!        └────────────── send ◀───────────┘
//!   (any state) ── stop / interrupt / transport failure ──▶ STOPPED
//! ```
//!
//! - **Empty token**: relays pass it through untouched. The coordinator asks the
//!   console for a destination and message.
//! - **Token for this node**: hand the payload to the console, clear the token
//!   and pass it on.
//! - **Token for another node**: pass it on unchanged.
//!
//! The only suspension points are the inbound receive and, on the coordinator,
//! the console prompts. Both are raced against the node's stop token.

mod coordinator;

use crate::console::Console;
use crate::error::TransportError;
use crate::token::{NodeId, Token};
use crate::transport::{Inbound, Outbound};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a node does in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Node 0: sources new messages and owns shutdown.
    Coordinator,
    Relay,
}

impl Role {
    pub fn of(id: NodeId) -> Self {
        if id.is_coordinator() {
            Role::Coordinator
        } else {
            Role::Relay
        }
    }
}

/// How a node must treat the token it just received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Idle token; only the coordinator may load it.
    Empty,
    /// Addressed to this node: consume and clear.
    Deliver,
    /// Addressed elsewhere: forward unchanged.
    Forward,
}

/// Why a node's loop ended.
#[derive(Debug)]
pub enum NodeExit {
    /// Local stop observed at the receive point.
    Stopped,
    /// The console asked to quit (or was closed).
    Quit,
    /// Global interrupt observed by the coordinator.
    Interrupted,
    /// The inbound or outbound channel failed.
    Transport(TransportError),
    /// The actor's task panicked or was aborted.
    Aborted(String),
}

impl NodeExit {
    /// Exits that are part of a normal shutdown rather than a fault.
    pub fn is_graceful(&self) -> bool {
        matches!(
            self,
            NodeExit::Stopped
                | NodeExit::Quit
                | NodeExit::Interrupted
                | NodeExit::Transport(TransportError::Closed)
        )
    }
}

/// One actor of the ring and the two endpoints it owns.
pub struct Node {
    id: NodeId,
    ring_size: usize,
    inbound: Inbound,
    outbound: Outbound,
    console: Arc<dyn Console>,
    stop: CancellationToken,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        ring_size: usize,
        inbound: Inbound,
        outbound: Outbound,
        console: Arc<dyn Console>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            id,
            ring_size,
            inbound,
            outbound,
            console,
            stop,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        Role::of(self.id)
    }

    pub(crate) fn inbound_channel(&self) -> usize {
        self.inbound.channel()
    }

    pub(crate) fn outbound_channel(&self) -> usize {
        self.outbound.channel()
    }

    pub fn classify(&self, token: &Token) -> Disposition {
        if token.is_empty() {
            Disposition::Empty
        } else if token.is_for(self.id) {
            Disposition::Deliver
        } else {
            Disposition::Forward
        }
    }

    /// Runs the loop to completion, then releases both endpoints.
    pub async fn run(mut self) -> NodeExit {
        let exit = self.drive().await;
        self.release();
        exit
    }

    /// Runs the loop until a terminal condition, keeping the endpoints open.
    ///
    /// The coordinator seeds the ring with one empty token before its first receive.
    pub(crate) async fn drive(&mut self) -> NodeExit {
        info!(
            node = %self.id,
            role = ?self.role(),
            inbound = self.inbound_channel(),
            outbound = self.outbound_channel(),
            "Node started"
        );

        if self.role() == Role::Coordinator {
            if let Err(e) = self.outbound.send(&Token::empty(self.id)).await {
                warn!(node = %self.id, error = %e, "Failed to seed the ring");
                return NodeExit::Transport(e);
            }
            debug!(node = %self.id, "Seeded empty token");
        }

        loop {
            if let Err(exit) = self.step().await {
                info!(node = %self.id, ?exit, "Node exiting");
                return exit;
            }
        }
    }

    /// One receive, classify, act, send iteration.
    async fn step(&mut self) -> Result<(), NodeExit> {
        let mut token = self
            .inbound
            .recv(&self.stop)
            .await
            .map_err(|e| self.exit_for(e))?;

        match self.classify(&token) {
            Disposition::Empty => match self.role() {
                Role::Coordinator => self.load_empty(&mut token).await?,
                Role::Relay => debug!(node = %self.id, "Received empty token, forwarding"),
            },
            Disposition::Deliver => {
                info!(node = %self.id, origin = %token.origin, payload = %token.payload, "Received message");
                self.console.deliver(self.id, token.origin, &token.payload);
                token.clear(self.id);
                debug!(node = %self.id, "Processed message, returning empty token");
            }
            Disposition::Forward => {
                if let Some(destination) = token.destination {
                    info!(node = %self.id, %destination, "Forwarding message");
                }
            }
        }

        self.outbound
            .send(&token)
            .await
            .map_err(|e| self.exit_for(e))
    }

    fn exit_for(&self, error: TransportError) -> NodeExit {
        match (error, self.role()) {
            (TransportError::Cancelled, Role::Coordinator) => NodeExit::Interrupted,
            (TransportError::Cancelled, Role::Relay) => NodeExit::Stopped,
            (error, _) => {
                warn!(node = %self.id, error = %error, "Transport failure");
                NodeExit::Transport(error)
            }
        }
    }

    /// Drops both endpoints so neighbours observe end-of-stream.
    pub(crate) fn release(self) {
        let Node {
            id,
            inbound,
            outbound,
            ..
        } = self;
        drop(outbound);
        drop(inbound);
        debug!(node = %id, "Released endpoints");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{ConsoleEvent, ScriptedConsole};
    use crate::error::TokenError;
    use crate::token::WireCodec;
    use crate::transport::channel;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    /// A relay wired between two harness-owned channel ends.
    struct Harness {
        to_node: Outbound,
        from_node: Inbound,
        console: Arc<ScriptedConsole>,
        stop: CancellationToken,
        handle: tokio::task::JoinHandle<NodeExit>,
    }

    fn relay(id: usize, ring_size: usize) -> Harness {
        let codec = WireCodec::new(32).with_ring_size(ring_size);
        let (to_node, node_in) = channel(id - 1, codec);
        let (node_out, from_node) = channel(id, codec);
        let console = Arc::new(ScriptedConsole::new(Vec::<String>::new()));
        let stop = CancellationToken::new();
        let node = Node::new(
            NodeId(id),
            ring_size,
            node_in,
            node_out,
            console.clone(),
            stop.clone(),
        );
        Harness {
            to_node,
            from_node,
            console,
            stop,
            handle: tokio::spawn(node.run()),
        }
    }

    impl Harness {
        async fn hop(&mut self, token: Token) -> Token {
            self.to_node.send(&token).await.unwrap();
            self.from_node.recv(&CancellationToken::new()).await.unwrap()
        }
    }

    #[test]
    fn classification_follows_destination() {
        let codec = WireCodec::new(8);
        let (out, inb) = channel(0, codec);
        let node = Node::new(
            NodeId(1),
            3,
            inb,
            out,
            Arc::new(ScriptedConsole::new(Vec::<String>::new())),
            CancellationToken::new(),
        );

        assert_eq!(node.role(), Role::Relay);
        assert_eq!(node.classify(&Token::empty(NodeId(2))), Disposition::Empty);
        assert_eq!(
            node.classify(&Token::addressed(NodeId(1), NodeId(0), "x")),
            Disposition::Deliver
        );
        assert_eq!(
            node.classify(&Token::addressed(NodeId(2), NodeId(0), "x")),
            Disposition::Forward
        );
        assert_eq!(Role::of(NodeId(0)), Role::Coordinator);
    }

    #[tokio::test]
    async fn relay_forwards_foreign_and_empty_tokens_unchanged() {
        let mut h = relay(1, 3);

        let foreign = Token::addressed(NodeId(2), NodeId(0), "ping");
        assert_eq!(h.hop(foreign.clone()).await, foreign);

        // Stale origin/payload on an empty token are carried along untouched.
        let idle = Token {
            destination: None,
            origin: NodeId(2),
            payload: "left over".into(),
        };
        assert_eq!(h.hop(idle.clone()).await, idle);
        assert!(h.console.events().is_empty());
    }

    #[tokio::test]
    async fn relay_consumes_its_own_message() {
        let mut h = relay(2, 3);

        let returned = h.hop(Token::addressed(NodeId(2), NodeId(0), "ping")).await;
        assert_eq!(returned, Token::empty(NodeId(2)));
        assert_eq!(
            h.console.events(),
            vec![ConsoleEvent::Delivered {
                node: NodeId(2),
                origin: NodeId(0),
                payload: "ping".into(),
            }]
        );
    }

    #[tokio::test]
    async fn relay_stops_on_local_stop() {
        let h = relay(1, 2);
        h.stop.cancel();
        assert!(matches!(h.handle.await.unwrap(), NodeExit::Stopped));
    }

    #[tokio::test]
    async fn relay_exits_when_upstream_closes() {
        let h = relay(1, 2);
        drop(h.to_node);

        let exit = h.handle.await.unwrap();
        assert!(matches!(exit, NodeExit::Transport(TransportError::Closed)));
        assert!(exit.is_graceful());
    }

    #[tokio::test]
    async fn relay_exits_when_downstream_closes() {
        let Harness {
            mut to_node,
            from_node,
            handle,
            ..
        } = relay(1, 2);
        drop(from_node);

        to_node.send(&Token::empty(NodeId(0))).await.unwrap();
        assert!(matches!(
            handle.await.unwrap(),
            NodeExit::Transport(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn relay_rejects_a_destination_outside_the_ring() {
        let mut h = relay(1, 3);
        h.to_node
            .send(&Token::addressed(NodeId(7), NodeId(0), "nowhere"))
            .await
            .unwrap();

        let exit = h.handle.await.unwrap();
        assert!(
            matches!(
                exit,
                NodeExit::Transport(TransportError::Codec(TokenError::Destination(7)))
            ),
            "got {exit:?}"
        );
        assert!(!exit.is_graceful());
    }

    /// Relays 1..k wired by hand, with a recording tap on every channel.
    ///
    /// The test body plays node 0: it writes into channel 0 and reads what
    /// comes back on channel k-1.
    struct TappedRing {
        size: usize,
        inject: Outbound,
        returned: Inbound,
        hops: Arc<Mutex<Vec<(usize, Token)>>>,
        stop: CancellationToken,
        tasks: Vec<JoinHandle<()>>,
    }

    async fn tap(
        index: usize,
        mut inbound: Inbound,
        mut outbound: Outbound,
        hops: Arc<Mutex<Vec<(usize, Token)>>>,
        stop: CancellationToken,
    ) {
        while let Ok(token) = inbound.recv(&stop).await {
            hops.lock().unwrap().push((index, token.clone()));
            if outbound.send(&token).await.is_err() {
                break;
            }
        }
    }

    fn tapped_ring(size: usize) -> TappedRing {
        let codec = WireCodec::new(32).with_ring_size(size);
        let console = Arc::new(ScriptedConsole::new(Vec::<String>::new()));
        let hops = Arc::new(Mutex::new(Vec::new()));
        let stop = CancellationToken::new();
        let mut tasks = Vec::new();

        // Node i writes into `writers[i]`; node i+1 reads the tapped copy from `readers[i]`.
        let mut writers = Vec::new();
        let mut readers = Vec::new();
        for index in 0..size {
            let (writer, tap_in) = channel(index, codec);
            let (tap_out, reader) = channel(index, codec);
            tasks.push(tokio::spawn(tap(
                index,
                tap_in,
                tap_out,
                hops.clone(),
                stop.clone(),
            )));
            writers.push(Some(writer));
            readers.push(Some(reader));
        }

        for index in 1..size {
            let node = Node::new(
                NodeId(index),
                size,
                readers[index - 1].take().unwrap(),
                writers[index].take().unwrap(),
                console.clone(),
                stop.clone(),
            );
            tasks.push(tokio::spawn(async move {
                node.run().await;
            }));
        }

        TappedRing {
            size,
            inject: writers[0].take().unwrap(),
            returned: readers[size - 1].take().unwrap(),
            hops,
            stop,
            tasks,
        }
    }

    impl TappedRing {
        /// Sends `token` from node 0 and waits for it to come back around.
        async fn circulate(&mut self, token: &Token) -> Token {
            self.inject.send(token).await.unwrap();
            self.returned.recv(&CancellationToken::new()).await.unwrap()
        }

        fn hops(&self) -> Vec<(usize, Token)> {
            self.hops.lock().unwrap().clone()
        }

        /// Nothing else is travelling: node 0's inbound stays silent.
        async fn assert_idle(&mut self) {
            let extra = tokio::time::timeout(
                Duration::from_millis(20),
                self.returned.recv(&CancellationToken::new()),
            )
            .await;
            assert!(extra.is_err(), "second record in flight: {extra:?}");
        }

        async fn shutdown(self) {
            self.stop.cancel();
            drop(self.inject);
            for task in self.tasks {
                task.await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn message_visits_each_hop_in_ring_order() {
        let mut ring = tapped_ring(4);
        let message = Token::addressed(NodeId(2), NodeId(0), "ping");
        let cleared = Token::empty(NodeId(2));

        let back = ring.circulate(&message).await;

        assert_eq!(back, cleared);
        assert_eq!(
            ring.hops(),
            vec![
                (0, message.clone()),
                (1, message),
                (2, cleared.clone()),
                (3, cleared),
            ]
        );
        ring.assert_idle().await;
        ring.shutdown().await;
    }

    #[tokio::test]
    async fn exactly_one_record_travels_the_ring() {
        let mut ring = tapped_ring(5);
        let size = ring.size;

        let mut rounds = vec![Token::empty(NodeId(0)), Token::empty(NodeId(0))];
        rounds.extend((0..size).map(|d| Token::addressed(NodeId(d), NodeId(0), format!("to {d}"))));

        for (round, token) in rounds.iter().enumerate() {
            let back = ring.circulate(token).await;
            let expected = match token.destination {
                // Node 0 is played by the test, so a message to it comes back loaded.
                Some(d) if d.index() != 0 => Token::empty(d),
                _ => token.clone(),
            };
            assert_eq!(back, expected, "round {round}");
            ring.assert_idle().await;
        }

        // One token means each channel is visited strictly in turn: 0, 1, .., k-1, 0, ..
        let channels: Vec<usize> = ring.hops().into_iter().map(|(index, _)| index).collect();
        assert_eq!(channels.len(), rounds.len() * size);
        for (step, index) in channels.iter().enumerate() {
            assert_eq!(*index, step % size, "hop {step} out of order");
        }

        ring.shutdown().await;
    }
}
