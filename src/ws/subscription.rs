#![expect(
    clippy::module_name_repetitions,
    reason = "Subscription types deliberately include the module name for clarity"
)]

use std::time::Instant;

use indexmap::IndexMap;
use serde_json::Value;

/// One desired-active channel.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    /// Channel or stream name, e.g. `btcusdt@trade`
    pub channel: String,
    /// Feed-specific subscription parameters
    pub params: Option<Value>,
    /// When the subscription was first requested
    pub created_at: Instant,
}

impl SubscriptionEntry {
    #[must_use]
    pub fn new<C: Into<String>>(channel: C, params: Option<Value>) -> Self {
        Self {
            channel: channel.into(),
            params,
            created_at: Instant::now(),
        }
    }
}

/// Channels the consumer wants active, independent of connectivity.
///
/// Entries keep insertion order so replays after a reconnect are issued in the
/// order the consumer subscribed.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: IndexMap<String, SubscriptionEntry>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry`. Returns `false` if its channel was already active.
    pub fn insert(&mut self, entry: SubscriptionEntry) -> bool {
        if self.entries.contains_key(&entry.channel) {
            return false;
        }
        self.entries.insert(entry.channel.clone(), entry);
        true
    }

    /// Forget `channel`. Returns `false` if it was not active.
    pub fn remove(&mut self, channel: &str) -> bool {
        self.entries.shift_remove(channel).is_some()
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.entries.contains_key(channel)
    }

    #[must_use]
    pub fn get(&self, channel: &str) -> Option<&SubscriptionEntry> {
        self.entries.get(channel)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active entries in subscription order.
    #[must_use]
    pub fn entries(&self) -> Vec<&SubscriptionEntry> {
        self.entries.values().collect()
    }

    /// Active channel names in subscription order.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
