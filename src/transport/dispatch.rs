//! Inbound dispatch table.
//!
//! One table per endpoint. Sessions register a [`MessageFilter`]; every
//! inbound envelope goes to the first matching route. Unmatched envelopes are
//! handed to the endpoint listener, if any, and otherwise dropped.

use crate::core::{Error, Result};
use crate::messaging::Envelope;
use crate::transport::{InboundMessage, MessageFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// What happened to an inbound envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Delivered to a session
    Matched,
    /// No session matched; handed to the endpoint listener
    Forwarded,
    /// No session matched and nobody is listening
    Dropped,
}

struct Route {
    id: u64,
    filter: MessageFilter,
    sender: mpsc::UnboundedSender<Result<Envelope>>,
}

#[derive(Default)]
struct DispatchTable {
    next_id: u64,
    routes: Vec<Route>,
    listener: Option<mpsc::UnboundedSender<InboundMessage>>,
}

/// Shared, mutex-guarded dispatch table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    table: Arc<Mutex<DispatchTable>>,
}

impl Dispatcher {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DispatchTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a filter and get the receiving end.
    pub fn register(&self, filter: MessageFilter) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut table = self.lock();
        table.next_id += 1;
        let id = table.next_id;
        table.routes.push(Route {
            id,
            filter: filter.clone(),
            sender,
        });
        debug!(route = id, counterparty = %filter.counterparty, thid = %filter.thread_id, "route registered");

        Subscription {
            handle: SubscriptionHandle {
                route_id: id,
                filter,
                dispatcher: self.clone(),
                released: AtomicBool::new(false),
            },
            receiver,
        }
    }

    fn unregister(&self, route_id: u64) -> bool {
        let mut table = self.lock();
        let before = table.routes.len();
        table.routes.retain(|route| route.id != route_id);
        let removed = table.routes.len() != before;
        if removed {
            debug!(route = route_id, "route released");
        }
        removed
    }

    /// Deliver an inbound envelope from `sender`.
    pub fn dispatch(&self, sender: &str, envelope: Envelope) -> Dispatched {
        let mut table = self.lock();
        let mut envelope = envelope;

        while let Some(index) = table
            .routes
            .iter()
            .position(|route| route.filter.matches(sender, &envelope))
        {
            match table.routes[index].sender.send(Ok(envelope)) {
                Ok(()) => {
                    trace!(route = table.routes[index].id, "envelope matched");
                    return Dispatched::Matched;
                }
                Err(mpsc::error::SendError(returned)) => {
                    // Receiver is gone; drop the stale route and keep looking.
                    let stale = table.routes.remove(index);
                    debug!(route = stale.id, "stale route removed");
                    match returned {
                        Ok(returned) => envelope = returned,
                        Err(_) => return Dispatched::Dropped,
                    }
                }
            }
        }

        let listener = match table.listener.as_ref() {
            Some(listener) => listener,
            None => {
                warn!(sender, id = envelope.id(), msg_type = %envelope.msg_type(), "unmatched envelope dropped");
                return Dispatched::Dropped;
            }
        };
        let inbound = InboundMessage {
            sender: sender.to_string(),
            envelope,
        };
        if listener.send(inbound).is_err() {
            table.listener = None;
            warn!(sender, "listener closed, unmatched envelope dropped");
            return Dispatched::Dropped;
        }
        Dispatched::Forwarded
    }

    /// Report a delivery failure to every session bound to `counterparty`.
    ///
    /// Returns how many sessions were notified.
    pub fn fail(&self, counterparty: &str, reason: &str) -> usize {
        let table = self.lock();
        table
            .routes
            .iter()
            .filter(|route| route.filter.counterparty == counterparty)
            .filter(|route| route.sender.send(Err(Error::Transport(reason.to_string()))).is_ok())
            .count()
    }

    /// Receive envelopes no session matched. Replaces any previous listener.
    pub fn listen(&self) -> mpsc::UnboundedReceiver<InboundMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().listener = Some(sender);
        receiver
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.lock().routes.len()
    }
}

/// Registration half of a subscription. Dropping it unregisters the route.
pub struct SubscriptionHandle {
    route_id: u64,
    filter: MessageFilter,
    dispatcher: Dispatcher,
    released: AtomicBool,
}

impl SubscriptionHandle {
    /// Filter this route was registered with.
    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Unregister the route. Idempotent; returns true on the first call.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.dispatcher.unregister(self.route_id);
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// A registered filter and the stream of envelopes it matched.
pub struct Subscription {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<Result<Envelope>>,
}

impl Subscription {
    pub fn filter(&self) -> &MessageFilter {
        self.handle.filter()
    }

    /// Next matched envelope or delivery failure. None once released.
    pub async fn recv(&mut self) -> Option<Result<Envelope>> {
        self.receiver.recv().await
    }

    /// Split into the registration and the receiving end.
    pub fn into_parts(
        self,
    ) -> (
        SubscriptionHandle,
        mpsc::UnboundedReceiver<Result<Envelope>>,
    ) {
        (self.handle, self.receiver)
    }
}
