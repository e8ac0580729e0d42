//! Terminal console on stdin/stdout.

use super::Console;
use crate::error::RingError;
use crate::token::NodeId;
use crate::topology::K_MAX;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Interactive console for the `apple-ring` binary.
///
/// Lines are read by a detached thread and handed over through a channel,
/// so a prompt that is still pending never keeps the process alive at exit.
pub struct StdioConsole {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl StdioConsole {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
            debug!("Stdin closed");
        });
        Self {
            lines: Mutex::new(receiver),
        }
    }

    async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }

    /// Startup prompt for `k`.
    pub async fn read_ring_size(&self) -> Result<String, RingError> {
        prompt(&format!("Enter number of nodes k (2..{K_MAX}): "));
        self.next_line().await.ok_or(RingError::ConsoleClosed)
    }

    pub fn print_banner(&self) {
        println!("=== One Bad Apple ===");
    }

    pub fn print_instructions(&self, ring_size: usize) {
        println!("[Node 0] Ring created with k={ring_size} nodes.");
        println!(
            "[Node 0] When prompted, enter a destination [0..{}] and a message.",
            ring_size - 1
        );
        println!("         Press Ctrl-C (or enter 'q' at the destination prompt) to exit.");
    }
}

impl Default for StdioConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdioConsole {
    async fn read_destination(&self, ring_size: usize) -> Option<String> {
        prompt(&format!(
            "Enter destination node [0..{}] (or 'q' to quit): ",
            ring_size - 1
        ));
        self.next_line().await
    }

    async fn read_message(&self) -> Option<String> {
        prompt("Enter message: ");
        self.next_line().await
    }

    fn token_returned(&self, node: NodeId) {
        println!("[Node {node}] Apple returned empty. Ready for new message.");
    }

    fn invalid_destination(&self, input: &str, _ring_size: usize) {
        println!("Invalid destination '{input}'. Forwarding empty apple.");
    }

    fn deliver(&self, node: NodeId, origin: NodeId, payload: &str) {
        println!("[Node {node}] Received message from node {origin}: \"{payload}\"");
    }
}

fn prompt(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "{text}");
    let _ = stdout.flush();
}
