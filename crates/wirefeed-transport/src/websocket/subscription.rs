//! Lock-free subscription registry using `scc::HashMap`.
//!
//! The registry is the source of truth for what the server should be streaming.
//! It survives automatic reconnects and is replayed in first-subscription order
//! every time the link opens.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{SubscriptionParams, Topic};

struct SubscriptionEntry {
    seq: u64,
    params: SubscriptionParams,
}

/// Set of active subscriptions keyed by topic.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: scc::HashMap<Topic, SubscriptionEntry>,
    next_seq: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription.
    ///
    /// Returns `true` if the topic is new or its params changed, i.e. the
    /// server needs to hear about it. Re-subscribing keeps the original order.
    pub fn insert(&self, topic: Topic, params: SubscriptionParams) -> bool {
        let changed = self.subscriptions.update_sync(&topic, |_, entry| {
            if entry.params == params {
                false
            } else {
                entry.params = params.clone();
                true
            }
        });
        if let Some(changed) = changed {
            return changed;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .insert_sync(topic, SubscriptionEntry { seq, params })
            .is_ok()
    }

    /// Forget a topic. Returns `true` if it was subscribed.
    pub fn remove(&self, topic: &Topic) -> bool {
        self.subscriptions.remove_sync(topic).is_some()
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.subscriptions.get_sync(topic).is_some()
    }

    /// Every subscription in first-subscription order.
    pub fn entries(&self) -> Vec<(Topic, SubscriptionParams)> {
        let mut entries = Vec::with_capacity(self.subscriptions.len());
        self.subscriptions.retain_sync(|topic, entry| {
            entries.push((entry.seq, topic.clone(), entry.params.clone()));
            true
        });
        entries.sort_unstable_by_key(|(seq, ..)| *seq);
        entries
            .into_iter()
            .map(|(_, topic, params)| (topic, params))
            .collect()
    }

    /// Subscribed topics in first-subscription order.
    pub fn topics(&self) -> Vec<Topic> {
        self.entries().into_iter().map(|(topic, _)| topic).collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&self) {
        self.subscriptions.clear_sync();
    }
}
