//! In-process transport.
//!
//! Endpoints on one [`MemoryNetwork`] reach each other by DID. Envelopes are
//! serialized on send and re-parsed on delivery, so every inbound message goes
//! through the same validation as one read off a socket.

use crate::core::{Error, Result};
use crate::messaging::Envelope;
use crate::transport::dispatch::{Dispatched, Dispatcher, Subscription};
use crate::transport::{InboundMessage, MessageFilter, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A set of endpoints that can reach each other.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    endpoints: Arc<RwLock<HashMap<String, Dispatcher>>>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an endpoint for `did`. Re-attaching replaces the old endpoint.
    pub fn endpoint(&self, did: &str) -> MemoryTransport {
        let dispatcher = Dispatcher::new();
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(did.to_string(), dispatcher.clone());
        MemoryTransport {
            did: did.to_string(),
            network: self.clone(),
            dispatcher,
        }
    }

    fn lookup(&self, did: &str) -> Option<Dispatcher> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(did)
            .cloned()
    }

    /// Detach an endpoint. Sessions elsewhere waiting on it see a transport error.
    pub fn disconnect(&self, did: &str) {
        let remaining: Vec<Dispatcher> = {
            let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
            endpoints.remove(did);
            endpoints.values().cloned().collect()
        };
        for dispatcher in remaining {
            dispatcher.fail(did, &format!("peer {} disconnected", did));
        }
    }

    /// Whether `did` has an endpoint.
    pub fn is_reachable(&self, did: &str) -> bool {
        self.lookup(did).is_some()
    }
}

/// One endpoint of a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryTransport {
    did: String,
    network: MemoryNetwork,
    dispatcher: Dispatcher,
}

impl MemoryTransport {
    /// DID this endpoint sends as.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// The endpoint's dispatch table.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Receive envelopes that no session claimed.
    pub fn listen(&self) -> mpsc::UnboundedReceiver<InboundMessage> {
        self.dispatcher.listen()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, their_did: &str, envelope: &Envelope) -> Result<()> {
        let peer = self
            .network
            .lookup(their_did)
            .ok_or_else(|| Error::Transport(format!("peer {} unreachable", their_did)))?;

        let wire = envelope.to_json();
        match Envelope::from_json(&wire) {
            Ok(inbound) => {
                let outcome = peer.dispatch(&self.did, inbound);
                debug!(from = %self.did, to = their_did, ?outcome, "envelope delivered");
                if outcome == Dispatched::Dropped {
                    debug!(to = their_did, "envelope had no receiver");
                }
            }
            Err(e) => warn!(from = %self.did, to = their_did, error = %e, "inbound envelope rejected"),
        }
        Ok(())
    }

    fn subscribe(&self, filter: MessageFilter) -> Subscription {
        self.dispatcher.register(filter)
    }
}
