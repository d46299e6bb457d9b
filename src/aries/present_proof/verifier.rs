//! Verifier side of present-proof.

use crate::agent::{fetch_ledger_objects, generate_nonce, AnonCreds, Ledger, Pairwise};
use crate::aries::ack::{self, AckStatus};
use crate::aries::present_proof::messages::{self, PRESENTATION, PROTOCOL, VERSION};
use crate::aries::problem_report::ProblemReport;
use crate::aries::state_machine::{expect_reply, transition, Role, StateMachine};
use crate::core::{EngineConfig, ProblemCode, Result};
use crate::transport::Transport;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

/// Verifier states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifierState {
    Start,
    RequestSent,
    AwaitingPresentation,
    Verified,
    Done,
    /// Terminal failure with its reason code
    Error(String),
}

/// What to ask the prover for.
#[derive(Clone, Debug)]
pub struct ProofRequestParams {
    pub name: String,
    pub version: String,
    /// Generated when not given
    pub nonce: Option<String>,
    pub requested_attributes: Map<String, Value>,
    pub requested_predicates: Map<String, Value>,
    pub comment: Option<String>,
    pub locale: Option<String>,
    /// present-proof protocol version of the request message
    pub proto_version: String,
}

impl ProofRequestParams {
    /// Create a new, empty proof request.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "0.1".to_string(),
            nonce: None,
            requested_attributes: Map::new(),
            requested_predicates: Map::new(),
            comment: None,
            locale: None,
            proto_version: VERSION.to_string(),
        }
    }

    /// Request an attribute, e.g. `{"name": "attr1", "restrictions": {...}}`.
    pub fn with_attribute(mut self, referent: &str, attribute: Value) -> Self {
        self.requested_attributes.insert(referent.to_string(), attribute);
        self
    }

    /// Request a predicate, e.g. `{"name": "attr2", "p_type": ">=", "p_value": 100}`.
    pub fn with_predicate(mut self, referent: &str, predicate: Value) -> Self {
        self.requested_predicates.insert(referent.to_string(), predicate);
        self
    }

    pub fn with_nonce(mut self, nonce: &str) -> Self {
        self.nonce = Some(nonce.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    pub fn with_proto_version(mut self, proto_version: &str) -> Self {
        self.proto_version = proto_version.to_string();
        self
    }

    /// Indy proof request body.
    pub fn proof_request(&self) -> Value {
        json!({
            "nonce": self.nonce.clone().unwrap_or_else(generate_nonce),
            "name": self.name,
            "version": self.version,
            "requested_attributes": self.requested_attributes,
            "requested_predicates": self.requested_predicates,
        })
    }
}

/// Verifier role machine.
pub struct Verifier {
    machine: StateMachine,
    anoncreds: Arc<dyn AnonCreds>,
    ledger: Arc<dyn Ledger>,
    state: VerifierState,
    requested_proof: Option<Value>,
}

impl Verifier {
    /// Create a new verifier talking to `pairwise.their`.
    pub fn new(
        transport: Arc<dyn Transport>,
        pairwise: Pairwise,
        anoncreds: Arc<dyn AnonCreds>,
        ledger: Arc<dyn Ledger>,
        config: EngineConfig,
    ) -> Self {
        Self {
            machine: StateMachine::new(Role::Verifier, PROTOCOL, transport, pairwise, config),
            anoncreds,
            ledger,
            state: VerifierState::Start,
            requested_proof: None,
        }
    }

    pub fn state(&self) -> &VerifierState {
        &self.state
    }

    /// Revealed attributes and predicates of the last verified presentation.
    pub fn requested_proof(&self) -> Option<&Value> {
        self.requested_proof.as_ref()
    }

    /// Request a presentation and verify it.
    ///
    /// `Ok(false)` means the presentation arrived but did not verify.
    pub async fn verify(&mut self, params: ProofRequestParams) -> Result<bool> {
        let doc_uri = self.machine.config().doc_uri.clone();
        let report_failures = self.machine.config().send_problem_reports;
        let ack_type = self.machine.message_type(ack::ACK);
        let anoncreds = &self.anoncreds;
        let ledger = &self.ledger;
        let requested_proof = &mut self.requested_proof;
        let state = &mut self.state;
        transition(Role::Verifier, state, VerifierState::Start);

        let outcome = self
            .machine
            .run(None, move |co| async move {
                let proof_request = params.proof_request();
                let request_msg = messages::request_presentation(
                    &doc_uri,
                    &params.proto_version,
                    &proof_request,
                    params.comment.as_deref(),
                    params.locale.as_deref(),
                )?;
                co.send(&request_msg).await?;
                transition(Role::Verifier, state, VerifierState::RequestSent);

                transition(Role::Verifier, state, VerifierState::AwaitingPresentation);
                let presentation = co.wait(co.time_to_live()).await?;
                expect_reply(
                    &presentation,
                    PROTOCOL,
                    PRESENTATION,
                    ProblemCode::UnexpectedResponse,
                )?;
                let proof = messages::proof_payload(&presentation)?;

                let (schema_ids, cred_def_ids) = messages::proof_identifiers(&proof);
                let objects = fetch_ledger_objects(ledger.as_ref(), schema_ids, cred_def_ids).await?;
                let verified = anoncreds
                    .verifier_verify_proof(
                        &proof_request,
                        &proof,
                        &objects.schemas,
                        &objects.cred_defs,
                        &json!({}),
                        &json!({}),
                    )
                    .await?;
                *requested_proof = proof.get("requested_proof").cloned();
                transition(Role::Verifier, state, VerifierState::Verified);
                info!(verified, thid = %co.thread_id(), "presentation checked");

                if verified {
                    let ack_msg =
                        ack::build_ack(&ack_type, presentation.ack_message_id(), AckStatus::Ok)?;
                    co.send(&ack_msg).await?;
                } else if report_failures {
                    let report = ProblemReport::new(
                        ProblemCode::VerifyError,
                        "Presentation did not verify",
                    )
                    .to_envelope(&ack_type, Some(presentation.ack_message_id()))?;
                    co.send(&report).await?;
                }
                transition(Role::Verifier, state, VerifierState::Done);
                Ok(verified)
            })
            .await;

        if let Err(err) = &outcome {
            transition(
                Role::Verifier,
                &mut self.state,
                VerifierState::Error(err.reason_code().to_string()),
            );
        }
        outcome
    }
}
