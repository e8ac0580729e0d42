//! Lifecycle management for a running ring.
//!
//! - [`RingController`] - owns the relay actors and performs the
//!   broadcast-then-reap shutdown
//! - [`Interrupt`] - the coordinator's global interrupt, wired to Ctrl-C by the binary
//! - [`setup_tracing`] - initializes structured logging
//!
//! # Shutdown Process
//!
//! 1. The coordinator's loop ends: quit at the console, closed console, global
//!    interrupt or a transport failure.
//! 2. Every relay's local stop is cancelled. Relays blocked at their receive
//!    point return immediately.
//! 3. The coordinator drops its own endpoints so anything still waiting on
//!    them sees end-of-stream.
//! 4. Every relay task is awaited. No actor outlives
//!    [`RingController::shutdown`].

pub mod shutdown;
pub mod tracing;

pub use self::shutdown::*;
pub use self::tracing::*;
