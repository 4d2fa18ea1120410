//! Bounded, priority-ordered holding area for outbound messages.
//!
//! Messages are held in one FIFO band per [`Priority`] and flushed `High`, then
//! `Normal`, then `Low`. The queue never grows past its capacity: a full queue
//! evicts the oldest entry of the lowest band present, but only for an incoming
//! message of strictly higher priority. Anything else is dropped.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::types::{Payload, Priority};

/// Why a message sits in the queue.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Sent by a consumer through `send`
    Application,
    /// Subscription command produced by the registry for `channel`
    Subscription { channel: String },
}

impl Origin {
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscription { .. })
    }
}

/// A message waiting for connectivity.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub payload: Payload,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
    pub origin: Origin,
}

impl QueuedMessage {
    #[must_use]
    pub fn new(payload: Payload, priority: Priority) -> Self {
        Self::with_origin(payload, priority, Origin::Application)
    }

    #[must_use]
    pub fn with_origin(payload: Payload, priority: Priority, origin: Origin) -> Self {
        Self {
            payload,
            priority,
            enqueued_at: Utc::now(),
            origin,
        }
    }
}

/// What happened to a message offered to the queue.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Stored without displacing anything
    Queued,
    /// Stored after evicting the returned lower-priority message
    Evicted(QueuedMessage),
    /// Not stored; the returned message is the one that was offered
    Dropped(QueuedMessage),
}

#[derive(Debug, Clone)]
pub struct MessageQueue {
    /// Indexed by [`band`]: high, normal, low.
    bands: [VecDeque<QueuedMessage>; 3],
    capacity: usize,
}

const fn band(priority: Priority) -> usize {
    match priority {
        Priority::High => 0,
        Priority::Normal => 1,
        Priority::Low => 2,
    }
}

const BANDS_LOW_TO_HIGH: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

impl MessageQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bands: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.iter().map(VecDeque::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.iter().all(VecDeque::is_empty)
    }

    /// Lowest priority that currently has at least one entry.
    #[must_use]
    pub fn lowest_priority(&self) -> Option<Priority> {
        BANDS_LOW_TO_HIGH
            .into_iter()
            .find(|p| !self.bands[band(*p)].is_empty())
    }

    /// Append a message to the back of its priority band.
    pub fn enqueue(&mut self, message: QueuedMessage) -> EnqueueOutcome {
        self.admit(message, false)
    }

    /// Put a message back at the front of its priority band, e.g. after a failed flush.
    pub fn requeue(&mut self, message: QueuedMessage) -> EnqueueOutcome {
        self.admit(message, true)
    }

    fn admit(&mut self, message: QueuedMessage, front: bool) -> EnqueueOutcome {
        let mut evicted = None;

        if self.len() >= self.capacity {
            match self.lowest_priority() {
                Some(lowest) if message.priority > lowest => {
                    evicted = self.bands[band(lowest)].pop_front();
                }
                _ => return EnqueueOutcome::Dropped(message),
            }
        }

        let target = &mut self.bands[band(message.priority)];
        if front {
            target.push_front(message);
        } else {
            target.push_back(message);
        }

        evicted.map_or(EnqueueOutcome::Queued, EnqueueOutcome::Evicted)
    }

    /// Remove and return the next message in flush order.
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.bands.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Consume messages in priority-then-FIFO order.
    ///
    /// Entries not yet yielded when the iterator is dropped stay queued.
    pub fn drain(&mut self) -> impl Iterator<Item = QueuedMessage> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    /// Keep only the messages for which `keep` returns `true`.
    pub fn retain<F: FnMut(&QueuedMessage) -> bool>(&mut self, mut keep: F) {
        for entries in &mut self.bands {
            entries.retain(|message| keep(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str, priority: Priority) -> QueuedMessage {
        QueuedMessage::new(Payload::from(text), priority)
    }

    fn texts(queue: &mut MessageQueue) -> Vec<String> {
        queue
            .drain()
            .map(|m| m.payload.as_text().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn drains_by_priority_then_fifo() {
        let mut queue = MessageQueue::new(10);
        queue.enqueue(message("low-1", Priority::Low));
        queue.enqueue(message("normal-1", Priority::Normal));
        queue.enqueue(message("high-1", Priority::High));
        queue.enqueue(message("low-2", Priority::Low));
        queue.enqueue(message("high-2", Priority::High));
        queue.enqueue(message("normal-2", Priority::Normal));

        assert_eq!(
            texts(&mut queue),
            ["high-1", "high-2", "normal-1", "normal-2", "low-1", "low-2"]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_evicts_lowest_for_higher_priority() {
        let mut queue = MessageQueue::new(2);
        assert_eq!(
            queue.enqueue(message("low-1", Priority::Low)),
            EnqueueOutcome::Queued
        );
        assert_eq!(
            queue.enqueue(message("low-2", Priority::Low)),
            EnqueueOutcome::Queued
        );

        let evicted = match queue.enqueue(message("normal", Priority::Normal)) {
            EnqueueOutcome::Evicted(evicted) => evicted,
            other => panic!("expected an eviction, got {other:?}"),
        };
        assert_eq!(evicted.payload.as_text(), Some("low-1"));
        assert_eq!(queue.len(), 2);

        let outcome = queue.enqueue(message("low-3", Priority::Low));
        assert!(
            matches!(outcome, EnqueueOutcome::Dropped(ref m) if m.payload.as_text() == Some("low-3")),
            "low message must be dropped when only low or higher is present"
        );

        assert_eq!(texts(&mut queue), ["normal", "low-2"]);
    }

    #[test]
    fn equal_priority_never_evicts_a_peer() {
        let mut queue = MessageQueue::new(2);
        queue.enqueue(message("high-1", Priority::High));
        queue.enqueue(message("high-2", Priority::High));

        let outcome = queue.enqueue(message("high-3", Priority::High));
        assert!(
            matches!(outcome, EnqueueOutcome::Dropped(_)),
            "same priority must be dropped"
        );
        assert_eq!(texts(&mut queue), ["high-1", "high-2"]);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut queue = MessageQueue::new(5);
        let priorities = [Priority::Low, Priority::High, Priority::Normal];

        for i in 0..100 {
            queue.enqueue(message(&i.to_string(), priorities[i % 3]));
            assert!(queue.len() <= queue.capacity(), "queue grew past capacity");
        }

        let drained: Vec<Priority> = queue.drain().map(|m| m.priority).collect();
        let mut sorted = drained.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(drained, sorted, "drain must be in descending priority");
    }

    #[test]
    fn requeue_goes_to_front_of_band() {
        let mut queue = MessageQueue::new(4);
        queue.enqueue(message("normal-1", Priority::Normal));
        queue.enqueue(message("normal-2", Priority::Normal));
        queue.enqueue(message("high", Priority::High));

        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();
        assert_eq!(second.payload.as_text(), Some("normal-1"));

        queue.requeue(second);
        queue.requeue(first);

        assert_eq!(texts(&mut queue), ["high", "normal-1", "normal-2"]);
    }

    #[test]
    fn dropped_drain_iterator_keeps_remaining_entries() {
        let mut queue = MessageQueue::new(4);
        queue.enqueue(message("a", Priority::Normal));
        queue.enqueue(message("b", Priority::Normal));

        let first = queue.drain().next().unwrap();
        assert_eq!(first.payload.as_text(), Some("a"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn retain_removes_subscription_commands() {
        let mut queue = MessageQueue::new(4);
        queue.enqueue(message("app", Priority::Normal));
        queue.enqueue(QueuedMessage::with_origin(
            Payload::from("sub"),
            Priority::High,
            Origin::Subscription {
                channel: "BTC-trade".to_owned(),
            },
        ));

        queue.retain(|m| !m.origin.is_subscription());

        assert_eq!(texts(&mut queue), ["app"]);
    }
}
