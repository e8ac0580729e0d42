//! # Observability & Tracing
//!
//! Every hop of the token is logged with structured fields (`node`,
//! `destination`, `origin`), so a single message can be followed around the
//! ring:
//!
//! ```text
//! INFO Injecting message node=0 destination=2 payload=ping
//! INFO relay: Forwarding message node=1 destination=2
//! INFO relay: Received message node=2 origin=0 payload=ping
//! INFO Token returned empty, ready for new message node=0
//! ```
//!
//! Empty-token pass-through and endpoint release are logged at `debug`;
//! partial reads at `trace`.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=apple_ring::transport=trace cargo run
//! ```
//!
//! Logs go to stderr so the console prompts on stdout stay readable.

/// Installs the global subscriber, filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false) // node ids are in the fields already
        .compact()
        .init();
}
