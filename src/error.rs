//! # Ring Errors
//!
//! Error types shared by the ring. Each layer gets its own enum so callers can
//! match on the failure class: fatal setup ([`RingError`]), per-actor transport
//! ([`TransportError`]), malformed wire records ([`TokenError`]) and recoverable
//! console input ([`InvalidDestination`]).

use crate::topology::K_MAX;

/// Fatal errors raised before the ring becomes operational.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("Invalid ring size {0}: expected a value in 2..={max}", max = K_MAX)]
    InvalidSize(usize),

    #[error("Invalid ring size input {0:?}: not a number")]
    InvalidSizeInput(String),

    #[error("Invalid payload capacity {0}: at least one byte is required")]
    InvalidPayloadCapacity(usize),

    #[error("Console closed before the ring size was entered")]
    ConsoleClosed,

    #[error("Failed to spawn relay actor: {0}")]
    Spawn(String),

    #[error("Endpoint for node {0} was already claimed")]
    Wiring(usize),
}

/// Failures of the exact-size transport primitives.
///
/// Any of these terminates only the owning actor's loop.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Peer endpoint closed")]
    Closed,

    #[error("Receive cancelled by local stop")]
    Cancelled,

    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed token record: {0}")]
    Codec(#[from] TokenError),
}

/// Errors produced while encoding or decoding a token record.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Record is {actual} bytes, expected {expected}")]
    Size { expected: usize, actual: usize },

    #[error("Invalid destination field {0}")]
    Destination(i32),

    #[error("Invalid origin field {0}")]
    Origin(i32),

    #[error("Node id {0} does not fit the wire format")]
    IdOverflow(usize),
}

/// A destination entered at the console that is not a node of the ring.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Invalid destination {input:?}: expected a node in 0..{ring_size}")]
pub struct InvalidDestination {
    pub input: String,
    pub ring_size: usize,
}
