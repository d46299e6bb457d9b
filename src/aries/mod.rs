//! Aries role machines
//!
//! Provides:
//! - The shared state-machine skeleton that scopes an exchange to a coprotocol
//! - issue-credential 1.0: Issuer and Holder
//! - present-proof 1.0: Verifier and Prover
//! - Acks and problem reports

pub mod ack;
pub mod issue_credential;
pub mod present_proof;
pub mod problem_report;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod testing;

pub use ack::{build_ack, AckStatus};
pub use issue_credential::{Holder, HolderState, IssueParams, Issuer, IssuerState};
pub use present_proof::{ProofRequestParams, Prover, ProverState, Verifier, VerifierState};
pub use problem_report::ProblemReport;
pub use state_machine::{Role, StateMachine};
