//! # Transport Primitives
//!
//! Exact-size reliable delivery of token records over a local byte stream.
//!
//! [`send_exact`] and [`recv_exact`] loop over partial I/O and retry
//! interrupted calls. [`recv_exact`] is also the actor's cooperative
//! cancellation point: it races every read against the local stop token and
//! gives up as soon as stop is set.
//!
//! A channel is a [`tokio::io::duplex`] pair used in one direction only. The
//! write side is wrapped in [`Outbound`], the read side in [`Inbound`]. Each
//! side is owned by exactly one actor.

use crate::error::TransportError;
use crate::token::{Token, WireCodec};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Writes all of `record`.
///
/// Fails with [`TransportError::Closed`] when the reading side is gone.
pub async fn send_exact<W>(writer: &mut W, record: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < record.len() {
        match writer.write(&record[written..]).await {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_failure(e)),
        }
    }
    loop {
        match writer.flush().await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_failure(e)),
        }
    }
}

/// Fills all of `record`, unless `stop` fires first.
///
/// A zero-length read means the peer closed its end and is reported as
/// [`TransportError::Closed`]. Stop is level-triggered: once set, the next
/// read attempt returns [`TransportError::Cancelled`] even if data is ready.
pub async fn recv_exact<R>(
    reader: &mut R,
    record: &mut [u8],
    stop: &CancellationToken,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < record.len() {
        if stop.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let read = tokio::select! {
            biased;
            _ = stop.cancelled() => return Err(TransportError::Cancelled),
            read = reader.read(&mut record[filled..]) => read,
        };
        match read {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => {
                filled += n;
                trace!(filled, size = record.len(), "Partial read");
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_failure(e)),
        }
    }
    Ok(())
}

fn io_failure(e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::WriteZero | ErrorKind::UnexpectedEof => {
            TransportError::Closed
        }
        _ => TransportError::Io(e),
    }
}

/// Allocates channel `index`, which carries traffic from node `index` to its successor.
///
/// The stream buffers two records so a send never blocks while only one
/// token circulates.
pub fn channel(index: usize, codec: WireCodec) -> (Outbound, Inbound) {
    let (write_side, read_side) = tokio::io::duplex(codec.record_size() * 2);
    let outbound = Outbound {
        channel: index,
        stream: write_side,
        codec,
    };
    let inbound = Inbound {
        channel: index,
        stream: read_side,
        codec,
        buffer: vec![0u8; codec.record_size()],
    };
    (outbound, inbound)
}

/// Read side of a channel.
#[derive(Debug)]
pub struct Inbound {
    channel: usize,
    stream: DuplexStream,
    codec: WireCodec,
    buffer: Vec<u8>,
}

impl Inbound {
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Blocks until a whole token arrives or `stop` fires.
    pub async fn recv(&mut self, stop: &CancellationToken) -> Result<Token, TransportError> {
        recv_exact(&mut self.stream, &mut self.buffer, stop).await?;
        Ok(self.codec.decode(&self.buffer)?)
    }
}

/// Write side of a channel.
#[derive(Debug)]
pub struct Outbound {
    channel: usize,
    stream: DuplexStream,
    codec: WireCodec,
}

impl Outbound {
    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn codec(&self) -> WireCodec {
        self.codec
    }

    pub async fn send(&mut self, token: &Token) -> Result<(), TransportError> {
        let record = self.codec.encode(token)?;
        send_exact(&mut self.stream, &record).await
    }
}
