//! Credential and proof computation.
//!
//! The engine never computes credentials or proofs itself. An [`AnonCreds`]
//! implementation (libindy, credx, a remote agent) does, and hands back opaque
//! JSON payloads.

use crate::core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Output of `issuer_create_credential`.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuedCredential {
    pub credential: Value,
    pub revoc_id: Option<String>,
    pub revoc_reg_delta: Option<Value>,
}

/// Output of `prover_create_credential_req`.
#[derive(Clone, Debug, PartialEq)]
pub struct CredentialRequest {
    pub request: Value,
    pub metadata: Value,
}

/// Credential/proof collaborator.
#[async_trait]
pub trait AnonCreds: Send + Sync {
    /// Offer for a credential definition.
    async fn issuer_create_credential_offer(&self, cred_def_id: &str) -> Result<Value>;

    /// Issue a credential for an offer, a request, and encoded values.
    async fn issuer_create_credential(
        &self,
        offer: &Value,
        request: &Value,
        values: &Value,
        rev_reg_id: Option<&str>,
    ) -> Result<IssuedCredential>;

    /// Answer an offer with a credential request.
    async fn prover_create_credential_req(
        &self,
        prover_did: &str,
        offer: &Value,
        cred_def: &Value,
        master_secret_id: &str,
    ) -> Result<CredentialRequest>;

    /// Credentials matching each referent of a proof request.
    ///
    /// Shape: `{"attrs": {referent: [{"cred_info": {...}}]}, "predicates": {...}}`.
    async fn prover_search_credentials_for_proof_req(
        &self,
        proof_request: &Value,
        limit_referents: usize,
    ) -> Result<Value>;

    /// Build a presentation.
    async fn prover_create_proof(
        &self,
        proof_request: &Value,
        requested_credentials: &Value,
        master_secret_id: &str,
        schemas: &Value,
        cred_defs: &Value,
        rev_states: &Value,
    ) -> Result<Value>;

    /// Check a presentation against its proof request.
    async fn verifier_verify_proof(
        &self,
        proof_request: &Value,
        proof: &Value,
        schemas: &Value,
        cred_defs: &Value,
        rev_reg_defs: &Value,
        rev_regs: &Value,
    ) -> Result<bool>;
}
