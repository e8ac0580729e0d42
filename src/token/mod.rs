//! # The Token ("apple")
//!
//! The single record that circulates the ring. An empty token is the ring's
//! mutual-exclusion ticket; a token with a destination carries one message.
//!
//! The in-memory [`Token`] is a plain value. Its fixed-size wire form lives in
//! [`codec`].

pub mod codec;

pub use codec::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in the ring, `0..k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The node that sources new messages.
    pub const COORDINATOR: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }

    /// The right-hand neighbour this node writes to.
    pub fn next(self, ring_size: usize) -> NodeId {
        NodeId((self.0 + 1) % ring_size)
    }

    /// The left-hand neighbour this node reads from.
    pub fn previous(self, ring_size: usize) -> NodeId {
        NodeId((self.0 + ring_size - 1) % ring_size)
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The circulating record.
///
/// `destination == None` means the ring is idle and the coordinator may load
/// a new message. `origin` is the last node that wrote meaningful content:
/// the sender of a live message, or the consumer that cleared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub destination: Option<NodeId>,
    pub origin: NodeId,
    pub payload: String,
}

impl Token {
    /// An idle token last touched by `origin`.
    pub fn empty(origin: NodeId) -> Self {
        Self {
            destination: None,
            origin,
            payload: String::new(),
        }
    }

    /// A live message from `origin` addressed to `destination`.
    pub fn addressed(destination: NodeId, origin: NodeId, payload: impl Into<String>) -> Self {
        Self {
            destination: Some(destination),
            origin,
            payload: payload.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
    }

    /// True when the token carries a message for `node`.
    pub fn is_for(&self, node: NodeId) -> bool {
        self.destination == Some(node)
    }

    /// Releases the token back to idle after `by` consumed it.
    pub fn clear(&mut self, by: NodeId) {
        self.destination = None;
        self.origin = by;
        self.payload.clear();
    }
}
