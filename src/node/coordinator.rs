//! Coordinator handling of the empty token.
//!
//! When the idle token reaches node 0 the coordinator prompts the console. A
//! valid destination loads the token; an invalid one is reported and the empty
//! token goes around again unchanged. Quit, a closed console and the global
//! interrupt all end the loop.

use super::{Node, NodeExit};
use crate::console::{parse_request, Request};
use crate::token::{NodeId, Token};
use std::future::Future;
use tracing::{info, warn};

impl Node {
    /// Fills `token` from the console, or leaves it empty if the input was rejected.
    pub(super) async fn load_empty(&self, token: &mut Token) -> Result<(), NodeExit> {
        info!(node = %self.id, "Token returned empty, ready for new message");
        self.console.token_returned(self.id);

        let Some(input) = self
            .interruptible(self.console.read_destination(self.ring_size))
            .await?
        else {
            info!(node = %self.id, "Console closed");
            return Err(NodeExit::Quit);
        };

        match parse_request(&input, self.ring_size) {
            Ok(Request::Quit) => {
                info!(node = %self.id, "Quit requested");
                Err(NodeExit::Quit)
            }
            Ok(Request::Send(destination)) => {
                let message = self
                    .interruptible(self.console.read_message())
                    .await?
                    .unwrap_or_default();
                *token = self.compose(destination, &message);
                info!(node = %self.id, %destination, payload = %token.payload, "Injecting message");
                Ok(())
            }
            Err(invalid) => {
                warn!(node = %self.id, error = %invalid, "Forwarding empty token");
                self.console.invalid_destination(&invalid.input, self.ring_size);
                Ok(())
            }
        }
    }

    /// A message from this node, cut to what the wire record can carry.
    pub(super) fn compose(&self, destination: NodeId, message: &str) -> Token {
        let text = self.outbound.codec().fit_payload(message);
        Token::addressed(destination, self.id, text)
    }

    /// Awaits a console read unless the interrupt fires first.
    async fn interruptible<F>(&self, read: F) -> Result<F::Output, NodeExit>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => Err(NodeExit::Interrupted),
            output = read => Ok(output),
        }
    }
}
