//! # Apple Ring
//!
//! > **One token, k nodes, one direction.**
//!
//! A unidirectional message ring. Node `i` writes only to node `(i+1) mod k`
//! and reads only from node `(i-1) mod k`. A single token (the "apple")
//! circulates. When it reaches the coordinator empty, the coordinator may load it
//! with a destination and a message. The addressed node consumes the message
//! and sends the token on empty again.
//!
//! ## 🏗️ Design
//!
//! ### One token is the lock
//! The coordinator can only inject when the empty token comes back, so at most
//! one message is ever in flight. No actor shares memory with another, and no
//! lock guards the token: exclusive ownership follows the token around the cycle.
//!
//! ### One task per node
//! Each relay runs in its own Tokio task and owns exactly two endpoints: the read
//! side of its predecessor's channel and the write side of its own. The
//! coordinator (node 0) runs on the caller's task.
//!
//! ### Cooperative shutdown
//! Each relay has a local stop token, checked at its single blocking receive.
//! The coordinator's global interrupt (Ctrl-C, or `q` at the prompt) stops every
//! relay, releases the coordinator's endpoints and reaps every relay task before
//! returning.
//!
//! ## 🗺️ Module Tour
//!
//! - [`token`] - the [`Token`](token::Token) record and its fixed-size wire codec.
//! - [`transport`] - `send_exact` / `recv_exact` over one-way channels.
//! - [`topology`] - [`RingBuilder`](topology::RingBuilder) wires and starts a ring.
//! - [`node`] - the per-node state machine.
//! - [`console`] - the interactive collaborator, with stdio and scripted versions.
//! - [`lifecycle`] - [`RingController`](lifecycle::RingController), interrupts and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! ```ignore
//! let console = Arc::new(ScriptedConsole::new(["2", "ping", "q"]));
//! let ring = RingBuilder::new(RingConfig::new(3)?, console.clone()).build()?;
//! let (exit, report) = ring.run().await;
//! assert_eq!(report.reaped(), 2);
//! ```

pub mod console;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod token;
pub mod topology;
pub mod transport;
