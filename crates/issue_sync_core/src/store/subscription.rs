//! Cancellable snapshot streams fanned out by a store.
//!
//! # Invariants
//! - Each subscriber owns one unbounded channel; events arrive in publish
//!   order.
//! - After `unsubscribe` (or drop) no further event is observable on that
//!   subscription, including events buffered before the call.
//! - A termination (`Closed`) is sent at most once per subscription, and the
//!   subscription is removed from the hub in the same step.

use crate::store::Snapshot;
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub type SubscriptionId = u64;

/// One item of a subscription stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// Full collection state; supersedes every earlier snapshot.
    Snapshot(Arc<Snapshot>),
    /// Stream ended by the store. Nothing follows.
    Closed { reason: String },
}

#[derive(Default)]
struct HubState {
    next_id: SubscriptionId,
    subscribers: BTreeMap<SubscriptionId, UnboundedSender<SubscriptionEvent>>,
}

/// Registry of live subscriptions for one store.
#[derive(Default)]
pub struct SubscriptionHub {
    state: Mutex<HubState>,
}

impl SubscriptionHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a subscriber and queues `initial` as its first event.
    pub fn register(self: &Arc<Self>, initial: Arc<Snapshot>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        // Receiver is alive, so the initial send cannot fail.
        let _ = sender.send(SubscriptionEvent::Snapshot(initial));

        let mut state = self.lock_state();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(id, sender);
        debug!(
            "event=subscription_open module=store status=ok subscription_id={} subscribers={}",
            id,
            state.subscribers.len()
        );

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(self),
            active: true,
        }
    }

    /// Sends `snapshot` to every live subscriber and returns how many got it.
    ///
    /// Subscribers whose receiving side is gone are pruned.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        let mut state = self.lock_state();
        state.subscribers.retain(|_, sender| {
            sender
                .send(SubscriptionEvent::Snapshot(Arc::clone(&snapshot)))
                .is_ok()
        });
        state.subscribers.len()
    }

    /// Ends every live subscription with one `Closed` event.
    pub fn terminate_all(&self, reason: &str) -> usize {
        let mut state = self.lock_state();
        let subscribers = std::mem::take(&mut state.subscribers);
        let mut notified = 0;
        for sender in subscribers.into_values() {
            let event = SubscriptionEvent::Closed {
                reason: reason.to_string(),
            };
            if sender.send(event).is_ok() {
                notified += 1;
            }
        }
        notified
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_state().subscribers.len()
    }

    fn remove(&self, id: SubscriptionId) {
        let mut state = self.lock_state();
        if state.subscribers.remove(&id).is_some() {
            debug!(
                "event=subscription_close module=store status=ok subscription_id={} subscribers={}",
                id,
                state.subscribers.len()
            );
        }
    }

    // Hub state is a plain map; a panic elsewhere cannot leave it half-written.
    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of a store subscription, doubling as its unsubscribe token.
pub struct Subscription {
    id: SubscriptionId,
    receiver: UnboundedReceiver<SubscriptionEvent>,
    hub: Weak<SubscriptionHub>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// `false` once unsubscribed or after the stream delivered `Closed`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the subscription is inactive or the store side is
    /// gone without a `Closed` event.
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        if !self.active {
            return None;
        }
        let event = self.receiver.recv().await;
        self.track(event)
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<SubscriptionEvent> {
        if !self.active {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => self.track(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.track(None),
        }
    }

    /// Stops delivery and discards anything still buffered.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }

    fn track(&mut self, event: Option<SubscriptionEvent>) -> Option<SubscriptionEvent> {
        match &event {
            Some(SubscriptionEvent::Snapshot(_)) => {}
            Some(SubscriptionEvent::Closed { .. }) | None => self.active = false,
        }
        event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
