//! Fixed-size wire layout for [`Token`].
//!
//! ```text
//! ┌──────────────────┬──────────────┬───────────────────────────────┐
//! │ destination: i32 │ origin: i32  │ payload: [u8; capacity]       │
//! │ (-1 = empty)     │              │ UTF-8, NUL-terminated/padded  │
//! └──────────────────┴──────────────┴───────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The record size is constant for a given
//! ring, so channels carry records back to back without framing.

use super::{NodeId, Token};
use crate::error::TokenError;

/// Wire value of an empty destination.
pub const EMPTY_DESTINATION: i32 = -1;

/// Bytes taken by the two integer fields.
pub const HEADER_SIZE: usize = 8;

/// Payload capacity used when none is configured, including the terminator.
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 1024;

/// Encoder/decoder for one ring's record size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    payload_capacity: usize,
    ring_size: usize,
}

impl WireCodec {
    /// Creates a codec whose payload field is `payload_capacity` bytes.
    ///
    /// One byte is always reserved for the NUL terminator, so the capacity is
    /// raised to at least one. Node ids are unbounded until
    /// [`Self::with_ring_size`] is applied.
    pub fn new(payload_capacity: usize) -> Self {
        Self {
            payload_capacity: payload_capacity.max(1),
            ring_size: usize::MAX,
        }
    }

    /// Rejects decoded node ids outside `0..ring_size`.
    pub fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }

    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    /// Size `S` of every record on the wire.
    pub fn record_size(&self) -> usize {
        HEADER_SIZE + self.payload_capacity
    }

    /// Longest payload, in bytes, that survives encoding.
    pub fn max_text_len(&self) -> usize {
        self.payload_capacity() - 1
    }

    pub fn encode(&self, token: &Token) -> Result<Vec<u8>, TokenError> {
        let mut record = vec![0u8; self.record_size()];
        self.encode_into(token, &mut record)?;
        Ok(record)
    }

    /// Writes `token` into `record`, which must be exactly [`Self::record_size`] bytes.
    ///
    /// Text after an embedded NUL is dropped and the rest is truncated on a
    /// character boundary to fit the payload field.
    pub fn encode_into(&self, token: &Token, record: &mut [u8]) -> Result<(), TokenError> {
        if record.len() != self.record_size() {
            return Err(TokenError::Size {
                expected: self.record_size(),
                actual: record.len(),
            });
        }

        let destination = match token.destination {
            Some(id) => wire_id(id)?,
            None => EMPTY_DESTINATION,
        };
        let origin = wire_id(token.origin)?;
        let text = self.fit_payload(&token.payload);

        record[0..4].copy_from_slice(&destination.to_le_bytes());
        record[4..8].copy_from_slice(&origin.to_le_bytes());
        let payload = &mut record[HEADER_SIZE..];
        payload.fill(0);
        payload[..text.len()].copy_from_slice(text.as_bytes());
        Ok(())
    }

    pub fn decode(&self, record: &[u8]) -> Result<Token, TokenError> {
        if record.len() != self.record_size() {
            return Err(TokenError::Size {
                expected: self.record_size(),
                actual: record.len(),
            });
        }

        let destination = match read_i32(record, 0) {
            EMPTY_DESTINATION => None,
            raw if self.in_ring(raw) => Some(NodeId(raw as usize)),
            raw => return Err(TokenError::Destination(raw)),
        };
        let origin = match read_i32(record, 4) {
            raw if self.in_ring(raw) => NodeId(raw as usize),
            raw => return Err(TokenError::Origin(raw)),
        };

        let payload = &record[HEADER_SIZE..];
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        Ok(Token {
            destination,
            origin,
            payload: String::from_utf8_lossy(&payload[..end]).into_owned(),
        })
    }

    fn in_ring(&self, raw: i32) -> bool {
        raw >= 0 && (raw as usize) < self.ring_size
    }

    /// The prefix of `text` that the payload field can hold.
    pub fn fit_payload<'a>(&self, text: &'a str) -> &'a str {
        let text = match text.find('\0') {
            Some(nul) => &text[..nul],
            None => text,
        };
        let max = self.max_text_len();
        if text.len() <= max {
            return text;
        }
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_CAPACITY)
    }
}

fn wire_id(id: NodeId) -> Result<i32, TokenError> {
    i32::try_from(id.index()).map_err(|_| TokenError::IdOverflow(id.index()))
}

fn read_i32(record: &[u8], at: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&record[at..at + 4]);
    i32::from_le_bytes(bytes)
}
