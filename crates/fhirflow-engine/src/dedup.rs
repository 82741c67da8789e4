//! Identifier deduplication for import batches.
//!
//! Two distinct policies, applied in order:
//!
//! 1. Intra-batch: when the same id appears more than once in a batch, the
//!    last occurrence in submission order wins; earlier occurrences are
//!    discarded silently (Last-Write-Wins).
//! 2. Inter-batch: a surviving record whose id already exists in storage is
//!    rejected as a duplicate — storage is never overwritten.
//!
//! The asymmetry is deliberate and load-bearing: LWW inside a batch,
//! skip-if-exists across batches.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// The per-record outcome of dedup resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// The record survives and may be stored.
    Keep,
    /// A later record in the same batch carries the same id; discarded
    /// silently, not reported as an error.
    SupersededInBatch,
    /// The id already exists in storage; rejected with a distinct reason.
    DuplicateInStorage,
}

/// Resolves identifier collisions for one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// Decides the outcome for each candidate id, in submission order.
    ///
    /// `existing` is the snapshot of stored ids taken atomically at the
    /// start of resolution; cross-request races are the storage layer's
    /// concern.
    pub fn resolve(candidate_ids: &[&str], existing: &HashSet<String>) -> Vec<DedupDecision> {
        let mut last_position: HashMap<&str, usize> = HashMap::new();
        for (position, id) in candidate_ids.iter().enumerate() {
            last_position.insert(id, position);
        }

        let decisions: Vec<DedupDecision> = candidate_ids
            .iter()
            .enumerate()
            .map(|(position, id)| {
                if last_position[id] != position {
                    DedupDecision::SupersededInBatch
                } else if existing.contains(*id) {
                    DedupDecision::DuplicateInStorage
                } else {
                    DedupDecision::Keep
                }
            })
            .collect();

        let superseded = decisions
            .iter()
            .filter(|d| **d == DedupDecision::SupersededInBatch)
            .count();
        if superseded > 0 {
            debug!(superseded, "resolved intra-batch duplicates via last-write-wins");
        }

        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_existing() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_unique_ids_all_kept() {
        let decisions = Deduplicator::resolve(&["a", "b", "c"], &no_existing());
        assert_eq!(decisions, vec![DedupDecision::Keep; 3]);
    }

    #[test]
    fn test_last_occurrence_wins_within_batch() {
        let decisions = Deduplicator::resolve(&["a", "b", "a"], &no_existing());
        assert_eq!(
            decisions,
            vec![
                DedupDecision::SupersededInBatch,
                DedupDecision::Keep,
                DedupDecision::Keep,
            ]
        );
    }

    #[test]
    fn test_three_occurrences_keep_only_last() {
        let decisions = Deduplicator::resolve(&["x", "x", "x"], &no_existing());
        assert_eq!(
            decisions,
            vec![
                DedupDecision::SupersededInBatch,
                DedupDecision::SupersededInBatch,
                DedupDecision::Keep,
            ]
        );
    }

    #[test]
    fn test_existing_id_rejected_regardless_of_content() {
        let existing: HashSet<String> = ["a".to_string()].into();
        let decisions = Deduplicator::resolve(&["a", "b"], &existing);
        assert_eq!(
            decisions,
            vec![DedupDecision::DuplicateInStorage, DedupDecision::Keep]
        );
    }

    #[test]
    fn test_lww_applies_before_storage_check() {
        // both occurrences collide with storage; only the survivor is
        // reported as a storage duplicate
        let existing: HashSet<String> = ["a".to_string()].into();
        let decisions = Deduplicator::resolve(&["a", "a"], &existing);
        assert_eq!(
            decisions,
            vec![
                DedupDecision::SupersededInBatch,
                DedupDecision::DuplicateInStorage,
            ]
        );
    }

    #[test]
    fn test_empty_batch() {
        let decisions = Deduplicator::resolve(&[], &no_existing());
        assert!(decisions.is_empty());
    }
}
