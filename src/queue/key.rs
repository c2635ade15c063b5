use std::cmp::Ordering;

/// Position of a record in a [`TaskQueue`](super::TaskQueue).
///
/// Keys sort by deadline first and by insertion sequence second. Regular
/// insertions draw increasing sequence numbers, so records sharing a deadline
/// come out in the order they went in. Front-of-queue insertions (deadline
/// `0`) draw decreasing negative sequence numbers, so the latest one always
/// sits at the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct QueueKey {
    /// Deadline in milliseconds.
    pub(crate) when: u64,

    /// Tie-breaker among equal deadlines.
    pub(crate) seq: i64,
}

impl QueueKey {
    /// Smallest key whose deadline is strictly later than `when`.
    ///
    /// Splitting a queue at this key separates overdue records from future
    /// ones.
    pub(crate) fn after(when: u64) -> Self {
        Self {
            when: when.saturating_add(1),
            seq: i64::MIN,
        }
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.when
            .cmp(&other.when)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hands out sequence numbers for new keys.
#[derive(Debug)]
pub(crate) struct KeySequence {
    /// Next sequence for regular insertions.
    back: i64,

    /// Next sequence for front-of-queue insertions.
    front: i64,
}

impl KeySequence {
    pub(crate) fn new() -> Self {
        Self { back: 0, front: -1 }
    }

    /// Returns the key for a record due at `when`.
    pub(crate) fn key_for(&mut self, when: u64) -> QueueKey {
        let seq = if when == 0 {
            let seq = self.front;
            self.front -= 1;
            seq
        } else {
            let seq = self.back;
            self.back += 1;
            seq
        };

        QueueKey { when, seq }
    }
}
