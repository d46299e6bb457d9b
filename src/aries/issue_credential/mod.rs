//! issue-credential 1.0
//!
//! The issuer offers, receives a request, issues and waits for an ack. The
//! holder answers a received offer, stores the credential and acks it.

pub mod holder;
pub mod issuer;
pub mod messages;

pub use holder::{store_credential, Holder, HolderState};
pub use issuer::{IssueParams, Issuer, IssuerState};
