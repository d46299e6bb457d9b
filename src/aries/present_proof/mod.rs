//! present-proof 1.0
//!
//! The verifier requests a presentation and checks it. The prover answers a
//! received request with a presentation built from its stored credentials.

pub mod messages;
pub mod prover;
pub mod verifier;

pub use prover::{select_credentials, Prover, ProverState, SelectedCredentials};
pub use verifier::{ProofRequestParams, Verifier, VerifierState};
