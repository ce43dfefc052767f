//! Live, filtered view over a store subscription.
//!
//! # Responsibility
//! - Keep the latest snapshot delivered by the store.
//! - Re-derive the projection whenever the snapshot or the filter changes and
//!   publish it to watchers.
//!
//! # Invariants
//! - Every published `Projection` is computed from exactly one
//!   (snapshot, filter) pair, recorded in `revision` and `filter`.
//! - Projection order is snapshot order.
//! - A snapshot with a lower revision than the current one is ignored.
//! - Subscription termination is reported once; after `unsubscribe` nothing
//!   is applied or reported.

use crate::model::filter::{IssueFilter, PriorityFilter, StatusFilter};
use crate::model::issue::Issue;
use crate::store::{Snapshot, Subscription, SubscriptionEvent};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

const STREAM_ENDED_REASON: &str = "subscription stream ended";

/// Filtered, ordered view of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Revision of the snapshot this projection was derived from.
    pub revision: u64,
    /// Filter this projection was derived with.
    pub filter: IssueFilter,
    /// Matching issues, newest `created_at` first.
    pub issues: Vec<Issue>,
    /// Size of the unfiltered snapshot.
    pub total: usize,
}

impl Projection {
    pub fn derive(snapshot: &Snapshot, filter: IssueFilter) -> Self {
        Self {
            revision: snapshot.revision,
            filter,
            issues: filter.apply(&snapshot.issues),
            total: snapshot.issues.len(),
        }
    }
}

/// Outcome of consuming subscription events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Projection after applying the newest delivered snapshot.
    Refreshed(Arc<Projection>),
    /// The stream ended; the view keeps its last state and stays static.
    Terminated { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Termination {
    Live,
    Pending(String),
    Reported,
}

/// Owns a store subscription and the projection derived from it.
pub struct LiveViewController {
    subscription: Option<Subscription>,
    snapshot: Arc<Snapshot>,
    filter: IssueFilter,
    termination: Termination,
    published: watch::Sender<Arc<Projection>>,
}

impl LiveViewController {
    /// Wraps a fresh subscription with the `All/All` filter.
    pub fn new(subscription: Subscription) -> Self {
        Self::with_filter(subscription, IssueFilter::default())
    }

    /// Wraps a fresh subscription and applies its initial snapshot right away.
    pub fn with_filter(subscription: Subscription, filter: IssueFilter) -> Self {
        let snapshot = Arc::new(Snapshot::default());
        let (published, _) = watch::channel(Arc::new(Projection::derive(&snapshot, filter)));
        let mut controller = Self {
            subscription: Some(subscription),
            snapshot,
            filter,
            termination: Termination::Live,
            published,
        };

        let first = controller
            .subscription
            .as_mut()
            .and_then(Subscription::try_recv);
        match first {
            Some(SubscriptionEvent::Snapshot(snapshot)) => {
                controller.apply_snapshot(snapshot);
            }
            Some(SubscriptionEvent::Closed { reason }) => {
                controller.subscription = None;
                controller.termination = Termination::Pending(reason);
            }
            None => {}
        }
        controller
    }

    /// Latest published projection.
    pub fn projection(&self) -> Arc<Projection> {
        self.published.borrow().clone()
    }

    /// Receiver that always holds the latest projection.
    pub fn watch(&self) -> watch::Receiver<Arc<Projection>> {
        self.published.subscribe()
    }

    /// Current unfiltered snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn filter(&self) -> IssueFilter {
        self.filter
    }

    /// `true` while snapshots can still arrive.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Replaces the whole filter and republishes.
    pub fn set_filter(&mut self, filter: IssueFilter) -> Arc<Projection> {
        self.filter = filter;
        self.publish()
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) -> Arc<Projection> {
        self.set_filter(IssueFilter {
            status,
            ..self.filter
        })
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) -> Arc<Projection> {
        self.set_filter(IssueFilter {
            priority,
            ..self.filter
        })
    }

    /// Waits for the next subscription event and applies it.
    ///
    /// Returns `None` once the view is no longer live and any termination has
    /// already been reported.
    pub async fn next_update(&mut self) -> Option<ViewUpdate> {
        if let Some(update) = self.take_pending_termination() {
            return Some(update);
        }
        let event = self.subscription.as_mut()?.recv().await;
        match event {
            Some(SubscriptionEvent::Snapshot(snapshot)) => {
                Some(ViewUpdate::Refreshed(self.apply_snapshot(snapshot)))
            }
            Some(SubscriptionEvent::Closed { reason }) => Some(self.terminate(reason)),
            None if self.subscription.is_some() => {
                Some(self.terminate(STREAM_ENDED_REASON.to_string()))
            }
            None => None,
        }
    }

    /// Applies everything already buffered without waiting.
    ///
    /// Bursts are coalesced: only the newest buffered snapshot is applied.
    /// Returns `None` when nothing was buffered.
    pub fn sync_pending(&mut self) -> Option<ViewUpdate> {
        if let Some(update) = self.take_pending_termination() {
            return Some(update);
        }

        let mut latest = None;
        let mut coalesced = 0usize;
        let mut ended = None;
        while let Some(subscription) = self.subscription.as_mut() {
            match subscription.try_recv() {
                Some(SubscriptionEvent::Snapshot(snapshot)) => {
                    if latest.replace(snapshot).is_some() {
                        coalesced += 1;
                    }
                }
                Some(SubscriptionEvent::Closed { reason }) => {
                    ended = Some(reason);
                    break;
                }
                None if !subscription.is_active() => {
                    ended = Some(STREAM_ENDED_REASON.to_string());
                    break;
                }
                None => break,
            }
        }

        if coalesced > 0 {
            debug!("event=view_sync module=view status=coalesced skipped={coalesced}");
        }
        let refreshed = latest.map(|snapshot| self.apply_snapshot(snapshot));
        match ended {
            Some(reason) => Some(self.terminate(reason)),
            None => refreshed.map(ViewUpdate::Refreshed),
        }
    }

    /// Stops delivery for good. Not reported as a termination.
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!(
                "event=view_unsubscribe module=view status=ok subscription_id={} revision={}",
                subscription.id(),
                self.snapshot.revision
            );
        }
        if let Termination::Pending(_) = self.termination {
            self.termination = Termination::Reported;
        }
    }

    fn apply_snapshot(&mut self, snapshot: Arc<Snapshot>) -> Arc<Projection> {
        if snapshot.revision < self.snapshot.revision {
            debug!(
                "event=view_snapshot module=view status=stale revision={} current_revision={}",
                snapshot.revision, self.snapshot.revision
            );
            return self.projection();
        }
        self.snapshot = snapshot;
        self.publish()
    }

    fn publish(&mut self) -> Arc<Projection> {
        let projection = Arc::new(Projection::derive(&self.snapshot, self.filter));
        self.published.send_replace(Arc::clone(&projection));
        projection
    }

    fn terminate(&mut self, reason: String) -> ViewUpdate {
        self.subscription = None;
        self.termination = Termination::Reported;
        warn!(
            "event=view_terminated module=view status=error revision={} reason={}",
            self.snapshot.revision, reason
        );
        ViewUpdate::Terminated { reason }
    }

    fn take_pending_termination(&mut self) -> Option<ViewUpdate> {
        match std::mem::replace(&mut self.termination, Termination::Live) {
            Termination::Pending(reason) => Some(self.terminate(reason)),
            other => {
                self.termination = other;
                None
            }
        }
    }
}
