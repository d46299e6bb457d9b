//! Coprotocol sessions
//!
//! A [`Coprotocol`] binds one exchange to a counterparty and a thread id and
//! turns the transport's subscription stream into blocking, deadline-bounded
//! request/reply calls. `wait` is the only suspension point; it parks the
//! calling task, never other sessions.

use crate::core::{new_id, now, EngineConfig, Error, Result};
use crate::messaging::{Envelope, TimingBlock};
use crate::transport::{MessageFilter, SubscriptionHandle, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

struct Session {
    counterparty: String,
    thread_id: String,
    transport: Arc<dyn Transport>,
    time_to_live: Duration,
    stamp_timing: bool,
    handle: SubscriptionHandle,
    receiver: Mutex<mpsc::UnboundedReceiver<Result<Envelope>>>,
}

/// Handle to an open coprotocol session.
///
/// Clones share the session. The filter is unregistered by [`close`](Self::close)
/// or, at the latest, when the last handle is dropped.
#[derive(Clone)]
pub struct Coprotocol {
    inner: Arc<Session>,
}

impl Coprotocol {
    /// Open a session with `counterparty`. Generates a thread id when none is given.
    pub fn open(
        transport: Arc<dyn Transport>,
        counterparty: &str,
        thread_id: Option<&str>,
        config: &EngineConfig,
    ) -> Self {
        let thread_id = thread_id.map(str::to_string).unwrap_or_else(new_id);
        let (handle, receiver) = transport
            .subscribe(MessageFilter::new(counterparty, &thread_id))
            .into_parts();

        info!(counterparty, thid = %thread_id, "coprotocol opened");

        Self {
            inner: Arc::new(Session {
                counterparty: counterparty.to_string(),
                thread_id,
                transport,
                time_to_live: config.time_to_live(),
                stamp_timing: config.stamp_timing,
                handle,
                receiver: Mutex::new(receiver),
            }),
        }
    }

    pub fn counterparty(&self) -> &str {
        &self.inner.counterparty
    }

    pub fn thread_id(&self) -> &str {
        &self.inner.thread_id
    }

    /// Default deadline for [`exchange`](Self::exchange).
    pub fn time_to_live(&self) -> Duration {
        self.inner.time_to_live
    }

    pub fn is_closed(&self) -> bool {
        self.inner.handle.is_released()
    }

    /// Send an envelope to the counterparty.
    ///
    /// Envelopes without a thread are put on this session's thread. Returns the
    /// envelope as it went out.
    pub async fn send(&self, envelope: &Envelope) -> Result<Envelope> {
        if self.is_closed() {
            return Err(Error::Transport("coprotocol session closed".to_string()));
        }

        let mut outbound = match envelope.thread_id() {
            Some(_) => envelope.clone(),
            None => envelope.with_thread_id(&self.inner.thread_id)?,
        };
        if self.inner.stamp_timing && outbound.timing().is_none() {
            let out_time = now();
            let ttl = chrono::Duration::from_std(self.inner.time_to_live)
                .map_err(|e| Error::Internal(format!("time-to-live out of range: {}", e)))?;
            outbound = outbound.with_timing(TimingBlock {
                out_time: Some(out_time),
                expires_time: Some(out_time + ttl),
                ..Default::default()
            })?;
        }

        debug!(
            to = %self.inner.counterparty,
            thid = %self.inner.thread_id,
            msg_type = %outbound.msg_type(),
            "coprotocol send"
        );
        self.inner
            .transport
            .send(&self.inner.counterparty, &outbound)
            .await?;
        Ok(outbound)
    }

    /// Wait for the next correlated envelope.
    pub async fn wait(&self, timeout: Duration) -> Result<Envelope> {
        if self.is_closed() {
            return Err(Error::Transport("coprotocol session closed".to_string()));
        }

        let mut receiver = self.inner.receiver.lock().await;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Err(_) => {
                debug!(thid = %self.inner.thread_id, ?timeout, "coprotocol wait timed out");
                Err(Error::Timeout(timeout))
            }
            Ok(Some(Ok(envelope))) => {
                debug!(
                    thid = %self.inner.thread_id,
                    msg_type = %envelope.msg_type(),
                    "coprotocol received"
                );
                Ok(envelope)
            }
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(Error::Transport("subscription closed".to_string())),
        }
    }

    /// Send, then wait for the reply within the session time-to-live.
    pub async fn exchange(&self, envelope: &Envelope) -> Result<Envelope> {
        self.send(envelope).await?;
        self.wait(self.inner.time_to_live).await
    }

    /// Release the session. Idempotent; returns true on the first call.
    pub fn close(&self) -> bool {
        let released = self.inner.handle.release();
        if released {
            info!(
                counterparty = %self.inner.counterparty,
                thid = %self.inner.thread_id,
                "coprotocol closed"
            );
        }
        released
    }
}

impl std::fmt::Debug for Coprotocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coprotocol")
            .field("counterparty", &self.inner.counterparty)
            .field("thread_id", &self.inner.thread_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
