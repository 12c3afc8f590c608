use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use crate::domain::order::Order;
use crate::store::{SnapshotFeed, StoreDocument};

// ============================================================================
// Change-Feed Notifier
// ============================================================================
//
// The subscription feed delivers the full order collection on every
// mutation, with no per-document diff. The notifier diffs consecutive
// snapshots to announce newly appeared orders exactly once, and shapes
// each snapshot into the list the dashboard renders.
//
// The already-notified id set is kept as a union with bounded eviction:
// an id is dropped once it has been absent from `window` consecutive
// snapshots. Replacing the set wholesale each cycle would re-alert for
// ids that straddle overlapping snapshots; never evicting would grow the
// set without bound.
//
// ============================================================================

/// Shaped output of one snapshot: the decoded orders sorted for display
/// (ascending by status code) and, when new orders appeared, their count.
#[derive(Debug)]
pub struct FeedUpdate {
    pub orders: Vec<Order>,
    pub new_orders: Option<usize>,
}

pub struct ChangeFeedNotifier {
    previous_ids: HashSet<String>,
    /// Notified id → snapshot sequence at which it was last seen.
    notified: HashMap<String, u64>,
    seq: u64,
    window: u64,
    primed: bool,
}

impl Default for ChangeFeedNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeedNotifier {
    pub const DEFAULT_WINDOW: u64 = 8;

    pub fn new() -> Self {
        Self::with_window(Self::DEFAULT_WINDOW)
    }

    /// `window` is the number of consecutive snapshots an id may be
    /// absent before its notified mark is evicted.
    pub fn with_window(window: u64) -> Self {
        Self {
            previous_ids: HashSet::new(),
            notified: HashMap::new(),
            seq: 0,
            window,
            primed: false,
        }
    }

    /// Fold one snapshot into the notifier state. The first snapshot only
    /// establishes the baseline; pre-existing orders are not announced.
    pub fn observe(&mut self, docs: &[StoreDocument]) -> FeedUpdate {
        self.seq += 1;

        let current_ids: HashSet<String> = docs.iter().map(|d| d.id.clone()).collect();

        let fresh: Vec<&String> = if self.primed {
            current_ids
                .iter()
                .filter(|id| !self.previous_ids.contains(*id))
                .filter(|id| !self.notified.contains_key(*id))
                .collect()
        } else {
            Vec::new()
        };

        let new_orders = if fresh.is_empty() {
            None
        } else {
            tracing::info!(count = fresh.len(), "new orders arrived");
            Some(fresh.len())
        };

        let seq = self.seq;
        for id in fresh {
            self.notified.insert(id.clone(), seq);
        }
        for (id, last_seen) in self.notified.iter_mut() {
            if current_ids.contains(id) {
                *last_seen = seq;
            }
        }
        let window = self.window;
        self.notified.retain(|_, last_seen| seq - *last_seen <= window);

        self.previous_ids = current_ids;
        self.primed = true;

        let mut orders = Vec::with_capacity(docs.len());
        for doc in docs {
            match Order::from_document(doc) {
                Ok(order) => orders.push(order),
                Err(err) => tracing::warn!(order_id = %doc.id, error = %err, "skipping undecodable order in feed"),
            }
        }
        orders.sort_by_key(|o| o.status.code());

        FeedUpdate { orders, new_orders }
    }

    /// Pump a subscription feed until the store goes away, forwarding each
    /// shaped update to the consumer channel.
    pub async fn drive(mut self, mut feed: SnapshotFeed, updates: mpsc::UnboundedSender<FeedUpdate>) {
        while let Some(snapshot) = feed.recv().await {
            if updates.send(self.observe(&snapshot)).is_err() {
                break;
            }
        }
        tracing::debug!("change feed closed");
    }
}
