//! Per-partition commit bookkeeping.
//!
//! Workers complete messages out of order, so a partition can only be
//! committed up to its lowest offset still in flight. Committing past it would
//! lose that message if the process stopped before it finished.

use std::collections::{BTreeSet, HashMap};

use crate::consumer::messages::CommitOffset;

#[derive(Debug, Default)]
struct PartitionState {
    in_flight: BTreeSet<i64>,
    highest_seen: Option<i64>,
    committed: Option<i64>,
}

impl PartitionState {
    /// The next offset to consume, given what is still in flight.
    fn commit_point(&self) -> Option<i64> {
        match self.in_flight.first() {
            Some(lowest) => Some(*lowest),
            None => self.highest_seen.map(|offset| offset + 1),
        }
    }
}

/// Tracks dispatched and acknowledged offsets per topic partition.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    partitions: HashMap<(String, i32), PartitionState>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message as dispatched and not yet acknowledged.
    pub fn track(&mut self, topic: &str, partition: i32, offset: i64) {
        let state = self
            .partitions
            .entry((topic.to_string(), partition))
            .or_default();
        state.in_flight.insert(offset);
        state.highest_seen = Some(state.highest_seen.map_or(offset, |seen| seen.max(offset)));
    }

    /// Mark a message as finished.
    ///
    /// Returns the partition's new commit position if it moved forward.
    pub fn acknowledge(&mut self, topic: &str, partition: i32, offset: i64) -> Option<CommitOffset> {
        let state = self.partitions.get_mut(&(topic.to_string(), partition))?;
        if !state.in_flight.remove(&offset) {
            return None;
        }

        let point = state.commit_point()?;
        if state.committed.is_some_and(|committed| point <= committed) {
            return None;
        }
        state.committed = Some(point);

        Some(CommitOffset {
            topic: topic.to_string(),
            partition,
            offset: point,
        })
    }

    /// The last commit position of every partition, for the final commit on
    /// shutdown.
    pub fn committed_offsets(&self) -> Vec<CommitOffset> {
        let mut offsets: Vec<CommitOffset> = self
            .partitions
            .iter()
            .filter_map(|((topic, partition), state)| {
                state.committed.map(|offset| CommitOffset {
                    topic: topic.clone(),
                    partition: *partition,
                    offset,
                })
            })
            .collect();
        offsets.sort_by(|a, b| (&a.topic, a.partition).cmp(&(&b.topic, b.partition)));
        offsets
    }

    /// Number of messages dispatched but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.partitions.values().map(|s| s.in_flight.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOPIC: &str = "content-changes";

    fn commit(partition: i32, offset: i64) -> Option<CommitOffset> {
        Some(CommitOffset {
            topic: TOPIC.to_string(),
            partition,
            offset,
        })
    }

    #[test]
    fn test_in_order_acknowledgments_advance() {
        let mut tracker = OffsetTracker::new();
        tracker.track(TOPIC, 0, 10);
        tracker.track(TOPIC, 0, 11);

        assert_eq!(tracker.acknowledge(TOPIC, 0, 10), commit(0, 11));
        assert_eq!(tracker.acknowledge(TOPIC, 0, 11), commit(0, 12));
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_out_of_order_acknowledgment_holds_back_commit() {
        let mut tracker = OffsetTracker::new();
        for offset in 5..=7 {
            tracker.track(TOPIC, 0, offset);
        }

        // 6 and 7 finish first; 5 is still being processed.
        assert_eq!(tracker.acknowledge(TOPIC, 0, 7), None);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 6), None);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 5), commit(0, 8));
    }

    #[test]
    fn test_partial_progress() {
        let mut tracker = OffsetTracker::new();
        for offset in 0..4 {
            tracker.track(TOPIC, 0, offset);
        }

        assert_eq!(tracker.acknowledge(TOPIC, 0, 0), commit(0, 1));
        assert_eq!(tracker.acknowledge(TOPIC, 0, 2), None);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 1), commit(0, 3));
        assert_eq!(tracker.in_flight(), 1);
    }

    #[test]
    fn test_partitions_are_independent() {
        let mut tracker = OffsetTracker::new();
        tracker.track(TOPIC, 0, 3);
        tracker.track(TOPIC, 1, 9);

        assert_eq!(tracker.acknowledge(TOPIC, 1, 9), commit(1, 10));
        assert_eq!(tracker.acknowledge(TOPIC, 0, 3), commit(0, 4));
        assert_eq!(
            tracker.committed_offsets(),
            vec![commit(0, 4).unwrap(), commit(1, 10).unwrap()]
        );
    }

    #[test]
    fn test_unknown_or_repeated_acknowledgment_is_ignored() {
        let mut tracker = OffsetTracker::new();
        assert_eq!(tracker.acknowledge(TOPIC, 0, 1), None);

        tracker.track(TOPIC, 0, 1);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 1), commit(0, 2));
        assert_eq!(tracker.acknowledge(TOPIC, 0, 1), None);
    }

    #[test]
    fn test_commit_never_moves_backwards() {
        let mut tracker = OffsetTracker::new();
        tracker.track(TOPIC, 0, 20);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 20), commit(0, 21));

        // A redelivered older message after a rebalance.
        tracker.track(TOPIC, 0, 15);
        assert_eq!(tracker.acknowledge(TOPIC, 0, 15), None);
        assert_eq!(tracker.committed_offsets(), vec![commit(0, 21).unwrap()]);
    }
}
