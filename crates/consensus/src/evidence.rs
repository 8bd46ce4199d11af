//! Evidence pools for validator votes and timeouts.
//!
//! Votes are keyed by the 32-byte vote signature payload digest, so all
//! votes for the same `(view, block_hash)` target land in one bucket and
//! can be aggregated directly. Timeouts are keyed by view. Both pools keep
//! one message per signer per bucket; the uniqueness rules across buckets
//! (one vote OR one timeout per signer per view) are enforced by the
//! `has_voted` / `has_timed_out` queries the event loop runs before
//! recording.
//!
//! Pools are volatile: view advancement evicts every bucket more than one
//! view behind. The bucket for the previous view is kept because a proposer
//! may still be aggregating a QC for it.

use fasthotstuff_types::{Hash, TimeoutMessage, VoteMessage};
use std::collections::HashMap;

/// Votes for a single `(view, block_hash)` target.
#[derive(Debug, Clone)]
pub(crate) struct VoteBucket {
    /// The view all votes in this bucket are for. Stored alongside the
    /// digest key so eviction can inspect it.
    pub(crate) view: u64,

    /// Votes by signer public-key string.
    pub(crate) votes: HashMap<String, VoteMessage>,
}

/// All votes currently held, bucketed by vote payload digest.
#[derive(Debug, Clone, Default)]
pub(crate) struct VotePool {
    buckets: HashMap<Hash, VoteBucket>,
}

impl VotePool {
    /// Record a vote under its payload digest. Overwrites nothing: the
    /// event loop's uniqueness checks run first.
    pub(crate) fn record(&mut self, payload: Hash, signer: String, vote: VoteMessage) {
        self.buckets
            .entry(payload)
            .or_insert_with(|| VoteBucket {
                view: vote.view,
                votes: HashMap::new(),
            })
            .votes
            .insert(signer, vote);
    }

    /// Whether `signer` has any vote recorded at `view`, for any block hash.
    pub(crate) fn has_voted(&self, signer: &str, view: u64) -> bool {
        self.buckets
            .values()
            .any(|bucket| bucket.view == view && bucket.votes.contains_key(signer))
    }

    /// The votes collected for one payload digest.
    pub(crate) fn votes_for(&self, payload: &Hash) -> Option<&HashMap<String, VoteMessage>> {
        self.buckets.get(payload).map(|bucket| &bucket.votes)
    }

    /// Drop every bucket more than one view behind `current_view`.
    pub(crate) fn evict_stale(&mut self, current_view: u64) {
        let horizon = current_view.saturating_sub(1);
        self.buckets.retain(|_, bucket| bucket.view >= horizon);
    }

    /// Number of live buckets.
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Test hook: insert a bucket wholesale, bypassing the gating checks.
    #[cfg(test)]
    pub(crate) fn insert_bucket(&mut self, payload: Hash, view: u64, votes: Vec<(String, VoteMessage)>) {
        self.buckets.insert(
            payload,
            VoteBucket {
                view,
                votes: votes.into_iter().collect(),
            },
        );
    }
}

/// All timeouts currently held, bucketed by timed-out view.
#[derive(Debug, Clone, Default)]
pub(crate) struct TimeoutPool {
    buckets: HashMap<u64, HashMap<String, TimeoutMessage>>,
}

impl TimeoutPool {
    /// Record a timeout under its view.
    pub(crate) fn record(&mut self, signer: String, timeout: TimeoutMessage) {
        self.buckets
            .entry(timeout.view)
            .or_default()
            .insert(signer, timeout);
    }

    /// Whether `signer` has a timeout recorded at `view`.
    pub(crate) fn has_timed_out(&self, signer: &str, view: u64) -> bool {
        self.buckets
            .get(&view)
            .is_some_and(|bucket| bucket.contains_key(signer))
    }

    /// The timeouts collected for one view.
    pub(crate) fn timeouts_for(&self, view: u64) -> Option<&HashMap<String, TimeoutMessage>> {
        self.buckets.get(&view)
    }

    /// Drop every bucket more than one view behind `current_view`.
    pub(crate) fn evict_stale(&mut self, current_view: u64) {
        let horizon = current_view.saturating_sub(1);
        self.buckets.retain(|&view, _| view >= horizon);
    }

    /// Number of live buckets.
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Test hook: insert a bucket wholesale, bypassing the gating checks.
    #[cfg(test)]
    pub(crate) fn insert_bucket(&mut self, view: u64, timeouts: Vec<(String, TimeoutMessage)>) {
        self.buckets.insert(view, timeouts.into_iter().collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fasthotstuff_types::{
        bls_keypair_from_seed, vote_signature_payload, vote_signing_message,
        timeout_signing_message, zero_bls_signature, AggregatedSignature, QuorumCertificate,
        SignerBitfield,
    };

    fn make_vote(view: u64, tag: &[u8], signer_seed: u8) -> (Hash, String, VoteMessage) {
        let block_hash = Hash::from_bytes(tag);
        let keypair = bls_keypair_from_seed(&[signer_seed; 32]);
        let vote = VoteMessage {
            view,
            block_hash,
            public_key: keypair.public_key(),
            signature: keypair.sign_v1(&vote_signing_message(view, &block_hash)),
        };
        let signer = fasthotstuff_types::public_key_string(&vote.public_key);
        (vote_signature_payload(view, &block_hash), signer, vote)
    }

    fn make_timeout(view: u64, signer_seed: u8) -> (String, TimeoutMessage) {
        let keypair = bls_keypair_from_seed(&[signer_seed; 32]);
        let mut signers = SignerBitfield::new(1);
        signers.set(0);
        let high_qc = QuorumCertificate {
            view: view.saturating_sub(1).max(1),
            block_hash: Hash::from_bytes(b"high"),
            aggregated_signature: AggregatedSignature {
                signers,
                signature: zero_bls_signature(),
            },
        };
        let timeout = TimeoutMessage {
            view,
            public_key: keypair.public_key(),
            signature: keypair.sign_v1(&timeout_signing_message(view, high_qc.view)),
            high_qc,
        };
        let signer = fasthotstuff_types::public_key_string(&timeout.public_key);
        (signer, timeout)
    }

    #[test]
    fn test_vote_pool_groups_by_payload() {
        let mut pool = VotePool::default();

        let (payload_a, signer_a, vote_a) = make_vote(4, b"block-a", 1);
        let (payload_a2, signer_b, vote_b) = make_vote(4, b"block-a", 2);
        let (payload_c, signer_c, vote_c) = make_vote(4, b"block-c", 3);
        assert_eq!(payload_a, payload_a2);

        pool.record(payload_a, signer_a, vote_a);
        pool.record(payload_a2, signer_b, vote_b);
        pool.record(payload_c, signer_c, vote_c);

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.votes_for(&payload_a).unwrap().len(), 2);
        assert_eq!(pool.votes_for(&payload_c).unwrap().len(), 1);
    }

    #[test]
    fn test_vote_uniqueness_is_per_view_not_per_block() {
        let mut pool = VotePool::default();
        let (payload, signer, vote) = make_vote(4, b"block-a", 1);
        pool.record(payload, signer.clone(), vote);

        // Same signer, same view, different block hash - still counts as voted.
        assert!(pool.has_voted(&signer, 4));
        assert!(!pool.has_voted(&signer, 5));

        let other = fasthotstuff_types::public_key_string(
            &bls_keypair_from_seed(&[9u8; 32]).public_key(),
        );
        assert!(!pool.has_voted(&other, 4));
    }

    #[test]
    fn test_vote_eviction_keeps_previous_view() {
        let mut pool = VotePool::default();
        for view in 1..=5u64 {
            let (payload, signer, vote) = make_vote(view, &view.to_le_bytes(), view as u8);
            pool.record(payload, signer, vote);
        }
        assert_eq!(pool.len(), 5);

        // Advancing to view 4 keeps views 3, 4, 5.
        pool.evict_stale(4);
        assert_eq!(pool.len(), 3);

        // Advancing to view 5 keeps views 4, 5.
        pool.evict_stale(5);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_timeout_pool_record_and_query() {
        let mut pool = TimeoutPool::default();
        let (signer, timeout) = make_timeout(4, 1);
        pool.record(signer.clone(), timeout);

        assert!(pool.has_timed_out(&signer, 4));
        assert!(!pool.has_timed_out(&signer, 5));
        assert_eq!(pool.timeouts_for(4).unwrap().len(), 1);
        assert!(pool.timeouts_for(3).is_none());
    }

    #[test]
    fn test_timeout_eviction_keeps_previous_view() {
        let mut pool = TimeoutPool::default();
        for view in 1..=5u64 {
            let (signer, timeout) = make_timeout(view, view as u8);
            pool.record(signer, timeout);
        }
        assert_eq!(pool.len(), 5);

        pool.evict_stale(4);
        assert_eq!(pool.len(), 3);

        pool.evict_stale(5);
        assert_eq!(pool.len(), 2);
    }
}
