//! # Console Collaborator
//!
//! The ring never talks to a terminal directly. The coordinator calls a
//! [`Console`] when the token comes back empty, and every node hands consumed
//! messages to it for display.
//!
//! - [`StdioConsole`] prompts on stdout and reads stdin lines.
//! - [`ScriptedConsole`] replays a fixed list of inputs and records what the
//!   ring reported. It's what the tests drive rings with.

pub mod scripted;
pub mod stdio;

pub use scripted::*;
pub use stdio::*;

use crate::error::InvalidDestination;
use crate::token::NodeId;
use async_trait::async_trait;

/// Input sentinels that end the session from the destination prompt.
pub const QUIT_SENTINELS: [&str; 2] = ["q", "Q"];

/// The interactive side of the ring.
///
/// Reads return `None` when the input source is closed.
#[async_trait]
pub trait Console: Send + Sync + 'static {
    /// Asks for the next destination, `0..ring_size` or a quit sentinel.
    async fn read_destination(&self, ring_size: usize) -> Option<String>;

    /// Asks for the message text once a valid destination was given.
    async fn read_message(&self) -> Option<String>;

    /// The empty token is back at `node` and the ring is idle.
    fn token_returned(&self, _node: NodeId) {}

    /// `input` was not a usable destination; the empty token moves on unchanged.
    fn invalid_destination(&self, input: &str, ring_size: usize);

    /// `node` consumed a message sent by `origin`.
    fn deliver(&self, node: NodeId, origin: NodeId, payload: &str);
}

/// What the coordinator does with one destination prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Send(NodeId),
    Quit,
}

/// Interprets a destination line.
///
/// Trailing line endings are ignored. A node id is read the way `strtol`
/// reads a decimal: optional leading whitespace, an optional sign, then
/// digits up to the end of the line. `-0` is node 0; any other negative id,
/// an id outside `0..ring_size` or anything that is not a quit sentinel is
/// rejected.
pub fn parse_request(input: &str, ring_size: usize) -> Result<Request, InvalidDestination> {
    let line = input.trim_end_matches(&['\r', '\n'][..]);
    if QUIT_SENTINELS.contains(&line) {
        return Ok(Request::Quit);
    }

    let invalid = || InvalidDestination {
        input: line.to_string(),
        ring_size,
    };
    let number = line.trim_start_matches(&[' ', '\t', '\n', '\x0b', '\x0c', '\r'][..]);
    let (negative, digits) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match digits.parse::<usize>() {
        Ok(0) => Ok(Request::Send(NodeId::COORDINATOR)),
        Ok(id) if !negative && id < ring_size => Ok(Request::Send(NodeId(id))),
        _ => Err(invalid()),
    }
}
