//! Quorum certificate construction from pooled evidence.
//!
//! Runs on every block-construction tick. Phase A scans the safe blocks for
//! a vote super-majority; phase B (only when A yields nothing) scans the
//! timeouts of the just-finished view for a timeout super-majority. Both
//! phases aggregate partial signatures in bitfield index order so the
//! signer bitfield, the aggregated signature, and (for timeouts) the
//! per-signer view vector stay aligned.

use crate::committee::CommitteeBlock;
use crate::evidence::{TimeoutPool, VotePool};
use crate::validation::{is_super_majority_stake, is_valid_super_majority_qc};
use fasthotstuff_types::{
    aggregate_signatures, vote_signature_payload, AggregateQuorumCertificate, AggregatedSignature,
    Bls12381G2Signature, Hash, QuorumCertificate, SignerBitfield,
};
use tracing::{debug, warn};

/// A vote QC ready to hand to the block producer.
#[derive(Debug, Clone)]
pub(crate) struct VoteQcCandidate {
    /// Hash of the certified block (the block the next proposal extends).
    pub(crate) block_hash: Hash,
    /// Height of the certified block.
    pub(crate) block_height: u64,
    /// The constructed QC.
    pub(crate) qc: QuorumCertificate,
}

/// A timeout aggregate QC ready to hand to the block producer.
#[derive(Debug, Clone)]
pub(crate) struct TimeoutQcCandidate {
    /// Hash of the block certified by the winning high QC.
    pub(crate) block_hash: Hash,
    /// Height of that block.
    pub(crate) block_height: u64,
    /// The constructed aggregate QC.
    pub(crate) aggregate_qc: AggregateQuorumCertificate,
}

/// Aggregate partials collected in bitfield index order.
fn build_aggregated_signature(
    committee_size: usize,
    signers: &[(usize, Bls12381G2Signature)],
) -> Option<AggregatedSignature> {
    let mut bitfield = SignerBitfield::new(committee_size);
    let mut partials = Vec::with_capacity(signers.len());
    for (index, signature) in signers {
        bitfield.set(*index);
        partials.push(signature.clone());
    }

    let signature = match aggregate_signatures(&partials) {
        Some(signature) => signature,
        None => {
            warn!(signer_count = signers.len(), "signature aggregation failed");
            return None;
        }
    };

    Some(AggregatedSignature {
        signers: bitfield,
        signature,
    })
}

/// Phase A: look for a safe block whose votes carry a super-majority of its
/// committee's stake, and build the QC.
///
/// When several safe blocks qualify, the one proposed in the highest view
/// wins; equal views fall back to ascending block-hash order. At most one
/// candidate is returned per tick.
pub(crate) fn try_construct_vote_qc(
    safe_blocks: &[CommitteeBlock],
    votes: &VotePool,
) -> Option<VoteQcCandidate> {
    let mut best: Option<(&CommitteeBlock, Vec<(usize, Bls12381G2Signature)>)> = None;

    for candidate in safe_blocks {
        let payload = vote_signature_payload(candidate.block.view, &candidate.block.block_hash);
        let Some(bucket) = votes.votes_for(&payload) else {
            continue;
        };

        // Only committee members count toward the super-majority; votes
        // from other signers were never admitted to the tip pool but the
        // safe block's own committee may differ from the tip's.
        let mut signers: Vec<(usize, Bls12381G2Signature)> = bucket
            .iter()
            .filter_map(|(signer, vote)| {
                candidate
                    .signer_index(signer)
                    .map(|index| (index, vote.signature.clone()))
            })
            .collect();

        let stake: u64 = signers
            .iter()
            .map(|(index, _)| candidate.stake_at(*index))
            .sum();
        if !is_super_majority_stake(stake, candidate.validator_set.total_stake()) {
            continue;
        }

        signers.sort_by_key(|(index, _)| *index);

        let replace = match &best {
            None => true,
            Some((current, _)) => {
                candidate.block.view > current.block.view
                    || (candidate.block.view == current.block.view
                        && candidate.block.block_hash < current.block.block_hash)
            }
        };
        if replace {
            best = Some((candidate, signers));
        }
    }

    let (block, signers) = best?;
    let aggregated_signature = build_aggregated_signature(block.validator_set.len(), &signers)?;

    debug!(
        view = block.block.view,
        block_hash = %block.block.block_hash,
        signer_count = signers.len(),
        "constructed vote QC"
    );

    Some(VoteQcCandidate {
        block_hash: block.block.block_hash,
        block_height: block.block.height,
        qc: QuorumCertificate {
            view: block.block.view,
            block_hash: block.block.block_hash,
            aggregated_signature,
        },
    })
}

/// Phase B: look for a timeout super-majority at `timed_out_view` and build
/// the aggregate QC.
///
/// Stake is measured against the current tip's committee. The winning high
/// QC is the highest-view QC any signer reported (ties go to the lowest
/// signer index); it must certify a block present in the safe-block set and
/// must itself hold up as a super-majority QC under that block's committee.
pub(crate) fn try_construct_timeout_qc(
    tip: &CommitteeBlock,
    safe_blocks: &[CommitteeBlock],
    timeouts: &TimeoutPool,
    timed_out_view: u64,
) -> Option<TimeoutQcCandidate> {
    let bucket = timeouts.timeouts_for(timed_out_view)?;

    let mut signers: Vec<(usize, &fasthotstuff_types::TimeoutMessage)> = bucket
        .iter()
        .filter_map(|(signer, timeout)| tip.signer_index(signer).map(|index| (index, timeout)))
        .collect();
    signers.sort_by_key(|(index, _)| *index);

    let stake: u64 = signers.iter().map(|(index, _)| tip.stake_at(*index)).sum();
    if !is_super_majority_stake(stake, tip.validator_set.total_stake()) {
        return None;
    }

    // Highest reported high QC wins; the ascending index order makes the
    // lowest signer index the tie-break.
    let mut high_qc: &QuorumCertificate = &signers[0].1.high_qc;
    for (_, timeout) in &signers[1..] {
        if timeout.high_qc.view > high_qc.view {
            high_qc = &timeout.high_qc;
        }
    }

    // The next proposal extends the block the high QC certifies; it has to
    // be one we can still vote on.
    let Some(extended) = safe_blocks
        .iter()
        .find(|safe| safe.block.block_hash == high_qc.block_hash)
    else {
        debug!(
            timed_out_view,
            high_qc_view = high_qc.view,
            high_qc_block = %high_qc.block_hash,
            "high QC references a block outside the safe set; skipping timeout QC"
        );
        return None;
    };

    if !is_valid_super_majority_qc(high_qc, &extended.validator_set) {
        warn!(
            timed_out_view,
            high_qc_view = high_qc.view,
            "timeout super-majority reached but the winning high QC is invalid"
        );
        return None;
    }

    let high_qc_views: Vec<u64> = signers
        .iter()
        .map(|(_, timeout)| timeout.high_qc.view)
        .collect();
    let partials: Vec<(usize, Bls12381G2Signature)> = signers
        .iter()
        .map(|(index, timeout)| (*index, timeout.signature.clone()))
        .collect();
    let aggregated_signature =
        build_aggregated_signature(tip.validator_set.len(), &partials)?;

    debug!(
        timed_out_view,
        high_qc_view = high_qc.view,
        signer_count = signers.len(),
        "constructed timeout aggregate QC"
    );

    Some(TimeoutQcCandidate {
        block_hash: high_qc.block_hash,
        block_height: extended.block.height,
        aggregate_qc: AggregateQuorumCertificate {
            view: timed_out_view,
            high_qc: high_qc.clone(),
            high_qc_views,
            aggregated_signature,
        },
    })
}
