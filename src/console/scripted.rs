//! # Scripted Console
//!
//! A [`Console`] fed from a fixed list of input lines, for driving whole rings
//! in tests.
//!
//! ```ignore
//! let console = Arc::new(ScriptedConsole::new(["2", "ping", "q"]));
//! let ring = RingBuilder::new(RingConfig::new(3)?, console.clone()).build()?;
//! let (exit, report) = ring.run().await;
//!
//! assert_eq!(console.deliveries(), vec![(NodeId(2), NodeId(0), "ping".into())]);
//! ```
//!
//! When the script runs out, reads return `None` (the console is closed),
//! unless [`ScriptedConsole::hold_when_exhausted`] was set. In that case the read
//! blocks forever, like a user who never answers the prompt.

use super::Console;
use crate::token::NodeId;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Everything the ring reported to the console, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    TokenReturned(NodeId),
    Rejected(String),
    Delivered {
        node: NodeId,
        origin: NodeId,
        payload: String,
    },
}

pub struct ScriptedConsole {
    inputs: Mutex<VecDeque<String>>,
    events: Mutex<Vec<ConsoleEvent>>,
    hold: bool,
    exhausted: Notify,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
            events: Mutex::new(Vec::new()),
            hold: false,
            exhausted: Notify::new(),
        }
    }

    /// Block instead of reporting a closed console once the script is used up.
    pub fn hold_when_exhausted(mut self) -> Self {
        self.hold = true;
        self
    }

    /// Resolves once a read found the script empty.
    pub async fn wait_exhausted(&self) {
        self.exhausted.notified().await;
    }

    pub fn events(&self) -> Vec<ConsoleEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(node, origin, payload)` for every consumed message.
    pub fn deliveries(&self) -> Vec<(NodeId, NodeId, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConsoleEvent::Delivered {
                    node,
                    origin,
                    payload,
                } => Some((node, origin, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn rejections(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ConsoleEvent::Rejected(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    /// Number of times the empty token came back to the coordinator.
    pub fn returns(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ConsoleEvent::TokenReturned(_)))
            .count()
    }

    fn record(&self, event: ConsoleEvent) {
        self.events.lock().unwrap().push(event);
    }

    async fn next_input(&self) -> Option<String> {
        let next = self.inputs.lock().unwrap().pop_front();
        match next {
            Some(line) => Some(line),
            None => {
                self.exhausted.notify_one();
                if self.hold {
                    std::future::pending::<()>().await;
                }
                None
            }
        }
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_destination(&self, _ring_size: usize) -> Option<String> {
        self.next_input().await
    }

    async fn read_message(&self) -> Option<String> {
        self.next_input().await
    }

    fn token_returned(&self, node: NodeId) {
        self.record(ConsoleEvent::TokenReturned(node));
    }

    fn invalid_destination(&self, input: &str, _ring_size: usize) {
        self.record(ConsoleEvent::Rejected(input.to_string()));
    }

    fn deliver(&self, node: NodeId, origin: NodeId, payload: &str) {
        self.record(ConsoleEvent::Delivered {
            node,
            origin,
            payload: payload.to_string(),
        });
    }
}
