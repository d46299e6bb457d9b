//! Issuer side of issue-credential.

use crate::agent::{encode_credential_values, AnonCreds, Pairwise};
use crate::aries::ack::{self, AckStatus};
use crate::aries::issue_credential::messages::{self, PROTOCOL, REQUEST_CREDENTIAL};
use crate::aries::state_machine::{expect_reply, transition, Role, StateMachine};
use crate::core::{EngineConfig, Error, ProblemCode, Result};
use crate::transport::Transport;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Issuer states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuerState {
    Start,
    OfferSent,
    AwaitingRequest,
    RequestValidated,
    CredentialSent,
    AwaitingAck,
    Done,
    /// Terminal failure with its reason code
    Error(String),
}

/// What to issue.
#[derive(Clone, Debug, Default)]
pub struct IssueParams {
    /// Raw attribute values; encoded before issuance
    pub values: Map<String, Value>,
    pub cred_def_id: String,
    pub cred_def: Value,
    /// Id the holder should store the credential under
    pub cred_id: Option<String>,
    pub rev_reg_id: Option<String>,
    pub comment: Option<String>,
    pub locale: Option<String>,
    /// Include a `credential_preview` in the offer
    pub preview: bool,
}

impl IssueParams {
    /// Create a new set of issue parameters.
    pub fn new(cred_def_id: &str, cred_def: Value, values: Map<String, Value>) -> Self {
        Self {
            values,
            cred_def_id: cred_def_id.to_string(),
            cred_def,
            preview: true,
            ..Default::default()
        }
    }

    pub fn with_cred_id(mut self, cred_id: &str) -> Self {
        self.cred_id = Some(cred_id.to_string());
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
}

/// Issuer role machine.
pub struct Issuer {
    machine: StateMachine,
    anoncreds: Arc<dyn AnonCreds>,
    state: IssuerState,
}

impl Issuer {
    /// Create a new issuer talking to `pairwise.their`.
    pub fn new(
        transport: Arc<dyn Transport>,
        pairwise: Pairwise,
        anoncreds: Arc<dyn AnonCreds>,
        config: EngineConfig,
    ) -> Self {
        Self {
            machine: StateMachine::new(Role::Issuer, PROTOCOL, transport, pairwise, config),
            anoncreds,
            state: IssuerState::Start,
        }
    }

    pub fn state(&self) -> &IssuerState {
        &self.state
    }

    /// Offer, issue and wait for the holder's ack.
    pub async fn issue(&mut self, params: IssueParams) -> Result<()> {
        let doc_uri = self.machine.config().doc_uri.clone();
        let anoncreds = &self.anoncreds;
        let state = &mut self.state;
        transition(Role::Issuer, state, IssuerState::Start);

        let outcome = self
            .machine
            .run(None, move |co| async move {
                let offer = anoncreds
                    .issuer_create_credential_offer(&params.cred_def_id)
                    .await?;
                let preview = params
                    .preview
                    .then(|| messages::credential_preview(&doc_uri, &params.values));
                let offer_msg = messages::offer_credential(
                    &doc_uri,
                    &offer,
                    &params.cred_def,
                    preview,
                    params.comment.as_deref(),
                    params.locale.as_deref(),
                )?;
                co.send(&offer_msg).await?;
                transition(Role::Issuer, state, IssuerState::OfferSent);

                transition(Role::Issuer, state, IssuerState::AwaitingRequest);
                let request_msg = co.wait(co.time_to_live()).await?;
                expect_reply(
                    &request_msg,
                    PROTOCOL,
                    REQUEST_CREDENTIAL,
                    ProblemCode::UnexpectedResponse,
                )?;
                let cred_request = messages::request_payload(&request_msg).map_err(|e| {
                    Error::protocol(ProblemCode::RequestProcessingError, e.to_string())
                })?;
                transition(Role::Issuer, state, IssuerState::RequestValidated);

                let values = encode_credential_values(&params.values);
                let issued = anoncreds
                    .issuer_create_credential(
                        &offer,
                        &cred_request,
                        &values,
                        params.rev_reg_id.as_deref(),
                    )
                    .await?;
                let issue_msg = messages::issue_credential(
                    &doc_uri,
                    co.thread_id(),
                    &issued.credential,
                    params.cred_id.as_deref(),
                    params.comment.as_deref(),
                    params.locale.as_deref(),
                )?;
                co.send(&issue_msg).await?;
                transition(Role::Issuer, state, IssuerState::CredentialSent);

                transition(Role::Issuer, state, IssuerState::AwaitingAck);
                let ack_msg = co.wait(co.time_to_live()).await?;
                if !ack::is_ack(&ack_msg) {
                    expect_reply(&ack_msg, PROTOCOL, ack::ACK, ProblemCode::UnexpectedResponse)?;
                }
                match ack::ack_status(&ack_msg) {
                    Some(AckStatus::Ok) => {}
                    status => {
                        return Err(Error::protocol(
                            ProblemCode::RequestNotAccepted,
                            format!(
                                "Holder acknowledged with status {}",
                                status.map_or("<missing>", |s| s.as_str())
                            ),
                        ))
                    }
                }
                transition(Role::Issuer, state, IssuerState::Done);
                Ok(())
            })
            .await;

        if let Err(err) = &outcome {
            transition(
                Role::Issuer,
                &mut self.state,
                IssuerState::Error(err.reason_code().to_string()),
            );
        }
        outcome
    }
}
