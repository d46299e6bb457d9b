//! Message transport
//!
//! The engine consumes a transport through two calls: asynchronous `send`
//! and filter-based `subscribe`. Correlation filters live in a shared
//! [`Dispatcher`]; [`MemoryTransport`] wires endpoints together in-process.

pub mod dispatch;
pub mod memory;

pub use dispatch::{Dispatched, Dispatcher, Subscription, SubscriptionHandle};
pub use memory::{MemoryNetwork, MemoryTransport};

use crate::core::Result;
use crate::messaging::Envelope;
use async_trait::async_trait;

/// Correlation filter: one counterparty, one thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageFilter {
    /// DID the messages must come from
    pub counterparty: String,
    /// Thread the messages must belong to
    pub thread_id: String,
}

impl MessageFilter {
    pub fn new(counterparty: &str, thread_id: &str) -> Self {
        Self {
            counterparty: counterparty.to_string(),
            thread_id: thread_id.to_string(),
        }
    }

    /// A message matches when it comes from the counterparty and either
    /// declares this thread or is the message that started it.
    pub fn matches(&self, sender: &str, envelope: &Envelope) -> bool {
        sender == self.counterparty
            && (envelope.thread_id() == Some(self.thread_id.as_str())
                || envelope.id() == self.thread_id)
    }
}

/// An envelope together with the DID it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub sender: String,
    pub envelope: Envelope,
}

/// Asynchronous message transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver an envelope to the counterparty.
    async fn send(&self, their_did: &str, envelope: &Envelope) -> Result<()>;

    /// Register a correlation filter on the inbound stream.
    fn subscribe(&self, filter: MessageFilter) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{MessageBuilder, MessageType};

    #[test]
    fn test_filter_matches_thread() {
        let msg_type = MessageType::new("https://didcomm.org/", "notification", "1.0", "ack");
        let on_thread = MessageBuilder::new(msg_type.clone()).thread("t1").build().unwrap();
        let other_thread = MessageBuilder::new(msg_type.clone()).thread("t2").build().unwrap();
        let unthreaded = MessageBuilder::new(msg_type).build().unwrap();

        let filter = MessageFilter::new("did:alice", "t1");
        assert!(filter.matches("did:alice", &on_thread));
        assert!(!filter.matches("did:bob", &on_thread));
        assert!(!filter.matches("did:alice", &other_thread));
        assert!(!filter.matches("did:alice", &unthreaded));

        let starter = MessageFilter::new("did:alice", unthreaded.id());
        assert!(starter.matches("did:alice", &unthreaded));
    }
}
