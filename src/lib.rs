//! # aries-protocols - Aries protocol engine
//!
//! Runs the issue-credential and present-proof exchanges between two DIDComm
//! agents:
//! - **Messaging**: envelopes, threading and timing decorators, attachments
//! - **Coprotocol**: blocking, deadline-bounded request/reply over a transport
//! - **Aries**: Issuer, Holder, Verifier and Prover state machines
//!
//! Credential and proof computation, wallet storage and ledger reads are
//! delegated to the collaborators in [`agent`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aries_protocols::agent::{AnonCreds, Pairwise};
//! use aries_protocols::aries::{IssueParams, Issuer};
//! use aries_protocols::core::EngineConfig;
//! use aries_protocols::transport::MemoryNetwork;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! async fn issue(anoncreds: Arc<dyn AnonCreds>) -> aries_protocols::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let transport = Arc::new(network.endpoint("did:sov:issuer"));
//!     let pairwise = Pairwise::new("did:sov:issuer", "vk1", "did:sov:holder", "vk2");
//!
//!     let mut issuer = Issuer::new(transport, pairwise, anoncreds, EngineConfig::default());
//!     let values = json!({"attr1": "Value-1", "attr2": "456"});
//!     let params = IssueParams::new("cred-def-id", json!({"id": "cred-def-id"}), values.as_object().cloned().unwrap_or_default());
//!     issuer.issue(params).await
//! }
//! ```

pub mod agent;
pub mod aries;
pub mod coprotocol;
pub mod core;
pub mod messaging;
pub mod transport;

pub use core::error::{Error, Result};
