//! Prover side of present-proof.

use crate::agent::{fetch_ledger_objects, AnonCreds, Ledger, Pairwise};
use crate::aries::present_proof::messages::{self, PROTOCOL, REQUEST_PRESENTATION};
use crate::aries::state_machine::{transition, Role, StateMachine};
use crate::core::{EngineConfig, Error, ProblemCode, Result};
use crate::messaging::Envelope;
use crate::transport::Transport;
use serde_json::{json, Map, Value};
use std::sync::Arc;

// One credential per referent is enough to build the proof.
const SEARCH_LIMIT: usize = 1;

/// Prover states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProverState {
    Start,
    AwaitingRequest,
    PresentationSent,
    Done,
    /// Terminal failure with its reason code
    Error(String),
}

/// Credentials chosen for a proof request.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedCredentials {
    pub requested_credentials: Value,
    pub schema_ids: Vec<String>,
    pub cred_def_ids: Vec<String>,
}

/// Pick the first matching credential for every requested attribute and predicate.
pub fn select_credentials(proof_request: &Value, search: &Value) -> Result<SelectedCredentials> {
    let mut schema_ids = Vec::new();
    let mut cred_def_ids = Vec::new();
    let mut pick = |group: &str, referent: &str| -> Result<String> {
        let cred_info = search
            .get(group)
            .and_then(|g| g.get(referent))
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|c| c.get("cred_info"))
            .ok_or_else(|| {
                Error::protocol(
                    ProblemCode::RequestProcessingError,
                    format!("No credential matches referent {}", referent),
                )
            })?;
        let referent_id = cred_info
            .get("referent")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::AnonCreds(format!("cred_info for {} has no referent", referent)))?;
        if let Some(id) = cred_info.get("schema_id").and_then(Value::as_str) {
            schema_ids.push(id.to_string());
        }
        if let Some(id) = cred_info.get("cred_def_id").and_then(Value::as_str) {
            cred_def_ids.push(id.to_string());
        }
        Ok(referent_id.to_string())
    };

    let mut requested_attributes = Map::new();
    for referent in referents(proof_request, "requested_attributes") {
        let cred_id = pick("attrs", referent)?;
        requested_attributes.insert(
            referent.to_string(),
            json!({"cred_id": cred_id, "revealed": true}),
        );
    }
    let mut requested_predicates = Map::new();
    for referent in referents(proof_request, "requested_predicates") {
        let cred_id = pick("predicates", referent)?;
        requested_predicates.insert(referent.to_string(), json!({"cred_id": cred_id}));
    }

    Ok(SelectedCredentials {
        requested_credentials: json!({
            "self_attested_attributes": {},
            "requested_attributes": requested_attributes,
            "requested_predicates": requested_predicates,
        }),
        schema_ids,
        cred_def_ids,
    })
}

fn referents<'a>(proof_request: &'a Value, group: &str) -> impl Iterator<Item = &'a str> {
    proof_request
        .get(group)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|g| g.keys().map(String::as_str))
}

/// Prover role machine.
pub struct Prover {
    machine: StateMachine,
    anoncreds: Arc<dyn AnonCreds>,
    ledger: Arc<dyn Ledger>,
    state: ProverState,
}

impl Prover {
    /// Create a new prover talking to `pairwise.their`.
    pub fn new(
        transport: Arc<dyn Transport>,
        pairwise: Pairwise,
        anoncreds: Arc<dyn AnonCreds>,
        ledger: Arc<dyn Ledger>,
        config: EngineConfig,
    ) -> Self {
        Self {
            machine: StateMachine::new(Role::Prover, PROTOCOL, transport, pairwise, config),
            anoncreds,
            ledger,
            state: ProverState::Start,
        }
    }

    pub fn state(&self) -> &ProverState {
        &self.state
    }

    /// Answer a received proof request with a presentation.
    ///
    /// Done once the presentation is sent; the verifier's answer is not awaited.
    pub async fn prove(
        &mut self,
        request: &Envelope,
        master_secret_id: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let doc_uri = self.machine.config().doc_uri.clone();
        let anoncreds = &self.anoncreds;
        let ledger = &self.ledger;
        let state = &mut self.state;
        transition(Role::Prover, state, ProverState::Start);

        let outcome = self
            .machine
            .run(Some(request.effective_thread_id()), move |co| async move {
                transition(Role::Prover, state, ProverState::AwaitingRequest);
                if !request.is(PROTOCOL, REQUEST_PRESENTATION) {
                    return Err(Error::protocol(
                        ProblemCode::RequestProcessingError,
                        format!("Expected request-presentation, got {}", request.msg_type()),
                    ));
                }
                let proof_request = messages::proof_request_payload(request)?;

                let search = anoncreds
                    .prover_search_credentials_for_proof_req(&proof_request, SEARCH_LIMIT)
                    .await?;
                let selected = select_credentials(&proof_request, &search)?;
                let objects = fetch_ledger_objects(
                    ledger.as_ref(),
                    selected.schema_ids.iter().map(String::as_str),
                    selected.cred_def_ids.iter().map(String::as_str),
                )
                .await?;
                let proof = anoncreds
                    .prover_create_proof(
                        &proof_request,
                        &selected.requested_credentials,
                        master_secret_id,
                        &objects.schemas,
                        &objects.cred_defs,
                        &json!({}),
                    )
                    .await?;

                let presentation =
                    messages::presentation(&doc_uri, co.thread_id(), &proof, comment)?;
                co.send(&presentation).await?;
                transition(Role::Prover, state, ProverState::PresentationSent);
                transition(Role::Prover, state, ProverState::Done);
                Ok(())
            })
            .await;

        if let Err(err) = &outcome {
            transition(
                Role::Prover,
                &mut self.state,
                ProverState::Error(err.reason_code().to_string()),
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aries::ack;
    use crate::aries::issue_credential::{Holder, IssueParams, Issuer};
    use crate::aries::present_proof::verifier::{ProofRequestParams, Verifier, VerifierState};
    use crate::aries::testing::{agent, credential_values, test_config, TestAgent};
    use crate::transport::MemoryNetwork;
    use tokio_test::{assert_err, assert_ok};

    const MASTER_SECRET: &str = "master-secret";

    fn search_result() -> Value {
        json!({
            "attrs": {
                "attr1_referent": [
                    {"cred_info": {"referent": "cred-1", "schema_id": "s:1", "cred_def_id": "cd:1"}},
                    {"cred_info": {"referent": "cred-2", "schema_id": "s:1", "cred_def_id": "cd:1"}}
                ]
            },
            "predicates": {
                "predicate1_referent": [
                    {"cred_info": {"referent": "cred-1", "schema_id": "s:1", "cred_def_id": "cd:1"}}
                ]
            }
        })
    }

    fn proof_request() -> Value {
        json!({
            "nonce": "1",
            "name": "Test ProofRequest",
            "version": "0.1",
            "requested_attributes": {"attr1_referent": {"name": "attr1"}},
            "requested_predicates": {
                "predicate1_referent": {"name": "attr2", "p_type": ">=", "p_value": 100}
            }
        })
    }

    #[test]
    fn test_select_credentials() {
        let selected = select_credentials(&proof_request(), &search_result()).unwrap();
        assert_eq!(
            selected.requested_credentials,
            json!({
                "self_attested_attributes": {},
                "requested_attributes": {"attr1_referent": {"cred_id": "cred-1", "revealed": true}},
                "requested_predicates": {"predicate1_referent": {"cred_id": "cred-1"}}
            })
        );
        assert_eq!(selected.schema_ids, vec!["s:1", "s:1"]);
        assert_eq!(selected.cred_def_ids, vec!["cd:1", "cd:1"]);
    }

    #[test]
    fn test_select_without_match() {
        let err = select_credentials(&proof_request(), &json!({"attrs": {}, "predicates": {}}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol { code: ProblemCode::RequestProcessingError, .. }
        ));
    }

    // Issue a credential to `holder`, then run a proof request for attr1 and
    // attr2 >= 100 against it.
    async fn issue_then_verify(attr2: &str) -> (Result<bool>, Result<()>, Verifier, Prover) {
        let network = MemoryNetwork::new();
        let steward = agent(&network, "did:steward");
        let holder_agent = agent(&network, "did:holder");
        let mut holder_inbox = holder_agent.endpoint.listen();

        let mut values = credential_values();
        values.insert("attr2".to_string(), json!(attr2));
        let mut issuer = Issuer::new(
            steward.transport(),
            steward.pairwise_with(&holder_agent),
            steward.anoncreds.clone(),
            test_config(),
        );
        let mut holder = Holder::new(
            holder_agent.transport(),
            holder_agent.pairwise_with(&steward),
            holder_agent.anoncreds.clone(),
            holder_agent.wallet.clone(),
            test_config(),
        );
        let holder_side = async {
            let offer = holder_inbox.recv().await.unwrap().envelope;
            holder.accept(&offer, MASTER_SECRET, None, None).await
        };
        let (issued, accepted) = tokio::join!(
            issuer.issue(IssueParams::new("cd:1", json!({"id": "cd:1"}), values)),
            holder_side
        );
        issued.unwrap();
        accepted.unwrap();

        let mut verifier = Verifier::new(
            steward.transport(),
            steward.pairwise_with(&holder_agent),
            steward.anoncreds.clone(),
            steward.ledger.clone(),
            test_config(),
        );
        let mut prover = prover(&holder_agent, &steward);
        let params = ProofRequestParams::new("Test ProofRequest")
            .with_attribute("attr1_referent", json!({"name": "attr1"}))
            .with_predicate(
                "predicate1_referent",
                json!({"name": "attr2", "p_type": ">=", "p_value": 100}),
            )
            .with_comment("Verification");

        let prover_side = async {
            let request = holder_inbox.recv().await.unwrap().envelope;
            assert_eq!(request.comment(), Some("Verification"));
            let proved = prover.prove(&request, MASTER_SECRET, None).await;
            // the verifier's answer is not part of the prover's session
            let answer = holder_inbox.recv().await.unwrap().envelope;
            (proved, answer)
        };
        let (verified, (proved, answer)) = tokio::join!(verifier.verify(params), prover_side);

        if matches!(verified, Ok(true)) {
            assert!(ack::is_ack(&answer));
        } else {
            assert!(answer.is("present-proof", "problem-report"));
            assert_eq!(answer.str_field("problem-code"), Some("verify_error"));
        }
        (verified, proved, verifier, prover)
    }

    fn prover(agent: &TestAgent, verifier: &TestAgent) -> Prover {
        Prover::new(
            agent.transport(),
            agent.pairwise_with(verifier),
            agent.anoncreds.clone(),
            agent.ledger.clone(),
            test_config(),
        )
    }

    #[tokio::test]
    async fn test_presentation_satisfies_predicate() {
        let (verified, proved, verifier, prover) = issue_then_verify("456").await;

        assert!(assert_ok!(verified));
        assert_ok!(proved);
        assert_eq!(verifier.state(), &VerifierState::Done);
        assert_eq!(prover.state(), &ProverState::Done);

        let requested_proof = verifier.requested_proof().unwrap();
        assert_eq!(
            requested_proof["revealed_attrs"]["attr1_referent"]["raw"],
            "Value-1"
        );
    }

    #[tokio::test]
    async fn test_presentation_fails_predicate() {
        let (verified, proved, verifier, _prover) = issue_then_verify("50").await;

        assert!(!assert_ok!(verified));
        assert_ok!(proved);
        assert_eq!(verifier.state(), &VerifierState::Done);
    }

    #[tokio::test]
    async fn test_no_matching_credential() {
        let network = MemoryNetwork::new();
        let verifier_agent = agent(&network, "did:verifier");
        let prover_agent = agent(&network, "did:prover");
        let mut prover = prover(&prover_agent, &verifier_agent);

        let request = messages::request_presentation(
            "https://didcomm.org/",
            "1.0",
            &proof_request(),
            None,
            None,
        )
        .unwrap();
        let err = assert_err!(prover.prove(&request, MASTER_SECRET, None).await);

        assert_eq!(err.reason_code(), "request_processing_error");
        assert_eq!(
            prover.state(),
            &ProverState::Error("request_processing_error".to_string())
        );
        assert_eq!(prover_agent.endpoint.dispatcher().route_count(), 0);
    }
}
