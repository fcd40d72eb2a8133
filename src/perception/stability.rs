//! Label stabilization
//!
//! Per-frame classifications are noisy: a chair flickers to "bench" for a
//! frame, an empty view briefly reports a person. Announcing every flicker
//! would be unbearable, so the loop pushes each tick's primary label into a
//! bounded history and only a label holding a configurable majority of that
//! history is considered stable.

use std::collections::VecDeque;

/// Sentinel label meaning "no stable object"
pub const NOTHING: &str = "nothing";

/// Insertion-ordered label history with fixed capacity
///
/// Oldest entries are evicted when full. Length never exceeds capacity.
#[derive(Debug, Clone)]
pub struct LabelHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl LabelHistory {
    /// Create an empty history holding at most `capacity` labels
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a label, evicting the oldest entry if full
    pub fn push(&mut self, label: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(label.into());
    }

    /// Number of labels currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate labels oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Majority-vote filter over a [`LabelHistory`]
#[derive(Debug, Clone, Copy)]
pub struct StabilityFilter {
    /// Fraction of the history a label must occupy to be stable
    ratio: f32,
}

impl StabilityFilter {
    /// Create a filter with the given majority ratio (typically 0.4-0.5)
    #[must_use]
    pub const fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    /// Compute the stable label for a history
    ///
    /// Returns the label with the highest count if that count reaches
    /// `ratio * len`, otherwise [`NOTHING`]. Ties go to the label that
    /// first reached the winning count in insertion order, so the result
    /// is deterministic.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stable_label(&self, history: &LabelHistory) -> String {
        if history.is_empty() {
            return NOTHING.to_string();
        }

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for label in history.iter() {
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label, 1)),
            }
        }

        // First-encountered wins on ties: strictly-greater comparison over
        // an insertion-ordered scan.
        let (majority_label, majority_count) = counts
            .iter()
            .fold(("", 0usize), |best, &(label, count)| {
                if count > best.1 { (label, count) } else { best }
            });

        let threshold = self.ratio * history.len() as f32;
        if (majority_count as f32) < threshold {
            NOTHING.to_string()
        } else {
            majority_label.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(labels: &[&str], capacity: usize) -> LabelHistory {
        let mut h = LabelHistory::new(capacity);
        for l in labels {
            h.push(*l);
        }
        h
    }

    #[test]
    fn test_capacity_bound() {
        let mut h = LabelHistory::new(3);
        for l in ["a", "b", "c", "d", "e"] {
            h.push(l);
            assert!(h.len() <= 3);
        }
        let remaining: Vec<&str> = h.iter().collect();
        assert_eq!(remaining, vec!["c", "d", "e"]);
    }

    #[test]
    fn test_majority_reached() {
        // majority_count = 3, threshold = 0.4 * 5 = 2.0 -> "dog"
        let h = history_of(&["dog", "dog", "dog", "cat", "nothing"], 5);
        let filter = StabilityFilter::new(0.4);
        assert_eq!(filter.stable_label(&h), "dog");
    }

    #[test]
    fn test_majority_not_reached() {
        let h = history_of(&["a", "b", "c", "d", "e"], 5);
        let filter = StabilityFilter::new(0.4);
        assert_eq!(filter.stable_label(&h), NOTHING);
    }

    #[test]
    fn test_empty_history() {
        let filter = StabilityFilter::new(0.45);
        assert_eq!(filter.stable_label(&LabelHistory::new(7)), NOTHING);
    }

    #[test]
    fn test_nothing_can_win() {
        // The sentinel participates in the vote like any label
        let h = history_of(&["nothing", "nothing", "nothing", "dog"], 7);
        let filter = StabilityFilter::new(0.5);
        assert_eq!(filter.stable_label(&h), NOTHING);
    }

    #[test]
    fn test_tie_breaks_to_first_encountered() {
        let h = history_of(&["cat", "dog", "cat", "dog"], 7);
        let filter = StabilityFilter::new(0.4);
        // Both have count 2; "cat" was seen first in the scan
        assert_eq!(filter.stable_label(&h), "cat");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // count 2, len 4, ratio 0.5 -> threshold 2.0; 2 >= 2.0 passes
        let h = history_of(&["dog", "dog", "cat", "bird"], 7);
        let filter = StabilityFilter::new(0.5);
        assert_eq!(filter.stable_label(&h), "dog");
    }

    #[test]
    fn test_single_entry() {
        let h = history_of(&["person"], 7);
        let filter = StabilityFilter::new(0.45);
        assert_eq!(filter.stable_label(&h), "person");
    }
}
