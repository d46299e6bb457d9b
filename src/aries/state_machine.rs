//! Shared skeleton for the role machines.
//!
//! [`StateMachine::run`] scopes one exchange to a coprotocol session: it opens
//! the session, hands it to the role logic, reports a protocol failure to the
//! counterparty and closes the session exactly once on every exit path.

use crate::agent::Pairwise;
use crate::aries::problem_report::ProblemReport;
use crate::coprotocol::Coprotocol;
use crate::core::{EngineConfig, Error, ProblemCode, Result};
use crate::messaging::{Envelope, MessageType};
use crate::transport::Transport;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Protocol role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Issuer,
    Holder,
    Verifier,
    Prover,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Issuer => "issuer",
            Role::Holder => "holder",
            Role::Verifier => "verifier",
            Role::Prover => "prover",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session owner for one side of a pairwise relationship.
pub struct StateMachine {
    role: Role,
    protocol: &'static str,
    transport: Arc<dyn Transport>,
    pairwise: Pairwise,
    config: EngineConfig,
}

impl StateMachine {
    /// Create a new state machine for `role` speaking `protocol`.
    pub fn new(
        role: Role,
        protocol: &'static str,
        transport: Arc<dyn Transport>,
        pairwise: Pairwise,
        config: EngineConfig,
    ) -> Self {
        Self {
            role,
            protocol,
            transport,
            pairwise,
            config,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pairwise(&self) -> &Pairwise {
        &self.pairwise
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Message type of a step of this machine's protocol, version 1.0.
    pub fn message_type(&self, name: &str) -> MessageType {
        MessageType::new(&self.config.doc_uri, self.protocol, "1.0", name)
    }

    /// Run one exchange.
    ///
    /// `thread_id` continues a thread started by the counterparty; `None`
    /// starts a new one. The session is closed when `logic` finishes, whatever
    /// the outcome.
    pub async fn run<T, F, Fut>(&self, thread_id: Option<&str>, logic: F) -> Result<T>
    where
        F: FnOnce(Coprotocol) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let coprotocol = Coprotocol::open(
            self.transport.clone(),
            &self.pairwise.their.did,
            thread_id,
            &self.config,
        );
        info!(
            role = %self.role,
            protocol = self.protocol,
            thid = %coprotocol.thread_id(),
            "exchange started"
        );

        let outcome = logic(coprotocol.clone()).await;

        match &outcome {
            Ok(_) => info!(role = %self.role, thid = %coprotocol.thread_id(), "exchange completed"),
            Err(err) => {
                warn!(
                    role = %self.role,
                    thid = %coprotocol.thread_id(),
                    reason = err.reason_code(),
                    error = %err,
                    "exchange failed"
                );
                if self.config.send_problem_reports {
                    self.report_problem(&coprotocol, err).await;
                }
            }
        }

        coprotocol.close();
        outcome
    }

    // Best effort; a failed report never masks the original error.
    async fn report_problem(&self, coprotocol: &Coprotocol, err: &Error) {
        if err.is_peer_report() {
            return;
        }
        let code = match err.problem_code() {
            Some(
                code @ (ProblemCode::UnexpectedResponse
                | ProblemCode::RequestProcessingError
                | ProblemCode::ResponseProcessingError),
            ) => code.clone(),
            _ => return,
        };
        let report = ProblemReport::new(code, &err.to_string());
        let sent = match report.to_envelope(&self.message_type("problem-report"), None) {
            Ok(envelope) => coprotocol.send(&envelope).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = sent {
            debug!(role = %self.role, error = %e, "problem report not delivered");
        }
    }
}

/// Move a role machine to its next state.
pub(crate) fn transition<S: fmt::Debug>(role: Role, state: &mut S, next: S) {
    debug!(role = %role, from = ?state, to = ?next, "state transition");
    *state = next;
}

/// Check that a reply is the expected protocol step.
///
/// Any other message type fails with `code`. A problem report from the
/// counterparty fails with [`Error::Refused`] carrying the peer's code, so it
/// is never answered with another report.
pub(crate) fn expect_reply(
    reply: &Envelope,
    protocol: &str,
    name: &str,
    code: ProblemCode,
) -> Result<()> {
    if reply.is(protocol, name) {
        return Ok(());
    }
    match ProblemReport::from_envelope(reply) {
        Some(report) => Err(Error::Refused {
            code,
            reported: report.problem_code,
            explain: report.explain,
        }),
        None => Err(Error::protocol(
            code,
            format!("Unexpected @type: {}", reply.msg_type()),
        )),
    }
}
