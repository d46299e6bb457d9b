//! Holder side of issue-credential.

use crate::agent::{AnonCreds, CredentialWallet, Pairwise};
use crate::aries::ack::{self, AckStatus};
use crate::aries::issue_credential::messages::{self, ISSUE_CREDENTIAL, OFFER_CREDENTIAL, PROTOCOL};
use crate::aries::state_machine::{expect_reply, transition, Role, StateMachine};
use crate::core::{EngineConfig, Error, ProblemCode, Result};
use crate::messaging::Envelope;
use crate::transport::Transport;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Holder states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HolderState {
    Start,
    RequestSent,
    AwaitingCredential,
    Stored,
    AckSent,
    Done,
    /// Terminal failure with its reason code
    Error(String),
}

/// Holder role machine.
pub struct Holder {
    machine: StateMachine,
    anoncreds: Arc<dyn AnonCreds>,
    wallet: Arc<dyn CredentialWallet>,
    state: HolderState,
}

impl Holder {
    /// Create a new holder talking to `pairwise.their`.
    pub fn new(
        transport: Arc<dyn Transport>,
        pairwise: Pairwise,
        anoncreds: Arc<dyn AnonCreds>,
        wallet: Arc<dyn CredentialWallet>,
        config: EngineConfig,
    ) -> Self {
        Self {
            machine: StateMachine::new(Role::Holder, PROTOCOL, transport, pairwise, config),
            anoncreds,
            wallet,
            state: HolderState::Start,
        }
    }

    pub fn state(&self) -> &HolderState {
        &self.state
    }

    /// Answer a received offer, store the issued credential and ack it.
    ///
    /// Returns the id the credential was stored under.
    pub async fn accept(
        &mut self,
        offer: &Envelope,
        master_secret_id: &str,
        comment: Option<&str>,
        locale: Option<&str>,
    ) -> Result<String> {
        // Replies use the issuer's prefix, which may be a legacy `did:sov:` one.
        let doc_uri = offer.msg_type().doc_uri.clone();
        let my_did = self.machine.pairwise().me.did.clone();
        let ack_type = messages::message_type(&doc_uri, ack::ACK);
        let anoncreds = &self.anoncreds;
        let wallet = &self.wallet;
        let state = &mut self.state;
        transition(Role::Holder, state, HolderState::Start);

        let outcome = self
            .machine
            .run(Some(offer.effective_thread_id()), move |co| async move {
                if !offer.is(PROTOCOL, OFFER_CREDENTIAL) {
                    return Err(Error::protocol(
                        ProblemCode::RequestProcessingError,
                        format!("Expected offer-credential, got {}", offer.msg_type()),
                    ));
                }
                let cred_offer = messages::offer_payload(offer)?;
                let cred_def = messages::cred_def_payload(offer)?;

                let request = anoncreds
                    .prover_create_credential_req(&my_did, &cred_offer, &cred_def, master_secret_id)
                    .await?;
                let request_msg = messages::request_credential(
                    &doc_uri,
                    co.thread_id(),
                    &request.request,
                    comment,
                    locale,
                )?;
                co.send(&request_msg).await?;
                transition(Role::Holder, state, HolderState::RequestSent);

                transition(Role::Holder, state, HolderState::AwaitingCredential);
                let cred_msg = co.wait(co.time_to_live()).await?;
                expect_reply(
                    &cred_msg,
                    PROTOCOL,
                    ISSUE_CREDENTIAL,
                    ProblemCode::RequestNotAccepted,
                )?;
                let credential = messages::credential_payload(&cred_msg)?;
                let cred_id = store_credential(
                    wallet.as_ref(),
                    messages::proposed_cred_id(&cred_msg),
                    &request.metadata,
                    &credential,
                    &cred_def,
                )
                .await?;
                transition(Role::Holder, state, HolderState::Stored);

                let ack_msg = ack::build_ack(&ack_type, cred_msg.ack_message_id(), AckStatus::Ok)?;
                co.send(&ack_msg).await?;
                transition(Role::Holder, state, HolderState::AckSent);
                transition(Role::Holder, state, HolderState::Done);
                Ok(cred_id)
            })
            .await;

        if let Err(err) = &outcome {
            transition(
                Role::Holder,
                &mut self.state,
                HolderState::Error(err.reason_code().to_string()),
            );
        }
        outcome
    }
}

/// Store a credential, replacing any record already under `cred_id`.
///
/// Storing the same credential twice leaves exactly one record.
pub async fn store_credential(
    wallet: &dyn CredentialWallet,
    cred_id: Option<&str>,
    metadata: &Value,
    credential: &Value,
    cred_def: &Value,
) -> Result<String> {
    if let Some(cred_id) = cred_id {
        if wallet.get_credential(cred_id).await?.is_some() {
            debug!(cred_id, "replacing stored credential");
            wallet.delete_credential(cred_id).await?;
        }
    }
    wallet
        .store_credential(cred_id, metadata, credential, cred_def, None)
        .await
}
