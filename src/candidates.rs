use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Append-only set of every candidate seen during one run.
///
/// Batches are applied under a single lock acquisition, so scans whose
/// completions interleave never observe a half-applied batch.
#[derive(Debug, Default)]
pub struct CandidateStore {
    candidates: Mutex<BTreeSet<String>>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts every candidate of `batch` and reports whether any of them
    /// was new.
    pub fn insert<I>(&self, batch: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut candidates = self.candidates.lock();
        let mut changed = false;
        for candidate in batch {
            let candidate = candidate.into();
            if changed {
                candidates.insert(candidate);
            } else if !candidates.contains(&candidate) {
                candidates.insert(candidate);
                changed = true;
            }
        }
        changed
    }

    /// The current set in sorted order.
    pub fn snapshot(&self) -> Vec<String> {
        self.candidates.lock().iter().cloned().collect()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.candidates.lock().contains(candidate)
    }

    pub fn len(&self) -> usize {
        self.candidates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::CandidateStore;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn repeated_candidate_does_not_mask_new_one() {
        let store = CandidateStore::new();
        assert!(store.insert(["flex", "p-4"]));
        assert!(store.insert(["flex", "m-2"]));
        assert_eq!(store.snapshot(), vec!["flex", "m-2", "p-4"]);
    }

    #[test]
    fn known_or_empty_batches_are_not_changes() {
        let store = CandidateStore::new();
        assert!(!store.insert(Vec::<String>::new()));
        assert!(store.insert(["underline"]));
        assert!(!store.insert(["underline", "underline"]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn inserts_whole_batch_after_first_novel_candidate() {
        let store = CandidateStore::new();
        assert!(store.insert(["a", "b", "c"]));
        assert!(store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
    }

    fn batches() -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec(prop::collection::vec("[a-z]{1,3}", 0..6), 0..12)
    }

    proptest! {
        #[test]
        fn set_only_grows(batches in batches()) {
            let store = CandidateStore::new();
            let mut previous = BTreeSet::new();
            for batch in batches {
                let changed = store.insert(batch.iter().cloned());
                let current: BTreeSet<String> = store.snapshot().into_iter().collect();
                prop_assert!(current.is_superset(&previous));
                let novel = batch.iter().any(|candidate| !previous.contains(candidate));
                prop_assert_eq!(changed, novel);
                previous = current;
            }
        }

        #[test]
        fn insertion_order_does_not_matter(batches in batches()) {
            let forward = CandidateStore::new();
            let backward = CandidateStore::new();
            for batch in &batches {
                forward.insert(batch.iter().cloned());
            }
            for batch in batches.iter().rev() {
                backward.insert(batch.iter().rev().cloned());
            }
            prop_assert_eq!(forward.snapshot(), backward.snapshot());
        }
    }
}
