//! Well-formedness checks and quorum certificate validation.
//!
//! Every function here is total: malformed input of any kind yields `false`
//! rather than an error or a panic, so callers can gate on these checks
//! without handling failure cases.

use fasthotstuff_types::{
    timeout_signing_message, verify_aggregate_multi_payload, verify_aggregate_single_payload,
    vote_signing_message, AggregateQuorumCertificate, Block, Bls12381G1PublicKey,
    QuorumCertificate, TimeoutMessage, ValidatorSet, VoteMessage,
};
use tracing::trace;

/// Whether a block carries everything the event loop needs: a positive view
/// and height, a real hash, and a structurally sound justifying QC.
pub fn is_properly_formed_block(block: &Block) -> bool {
    block.view > 0
        && block.height > 0
        && !block.block_hash.is_zero()
        && is_properly_formed_qc(&block.qc)
}

/// Structural QC check: certifies a real block in a real view, with at
/// least one signer. Cryptographic validity is a separate question
/// answered by [`is_valid_super_majority_qc`].
pub fn is_properly_formed_qc(qc: &QuorumCertificate) -> bool {
    qc.view > 0 && !qc.block_hash.is_zero() && !qc.aggregated_signature.signers.is_empty()
}

/// Whether a validator set is non-empty and every member has positive stake.
pub fn is_properly_formed_validator_set(validator_set: &ValidatorSet) -> bool {
    !validator_set.is_empty()
        && validator_set
            .validators
            .iter()
            .all(|v| v.stake_amount > 0 && v.public_key.0 != [0u8; 48])
}

/// Structural vote check: positive view, real block hash, and non-zero key
/// and signature bytes (the encoded form of "field present").
pub fn is_properly_formed_vote(vote: &VoteMessage) -> bool {
    vote.view > 0
        && !vote.block_hash.is_zero()
        && vote.public_key.0 != [0u8; 48]
        && vote.signature.0 != [0u8; 96]
}

/// Structural timeout check; the embedded high QC must itself be properly
/// formed.
pub fn is_properly_formed_timeout(timeout: &TimeoutMessage) -> bool {
    timeout.view > 0
        && is_properly_formed_qc(&timeout.high_qc)
        && timeout.public_key.0 != [0u8; 48]
        && timeout.signature.0 != [0u8; 96]
}

/// Whether `subset_stake` is a super-majority of `total_stake`: strictly
/// more than two thirds, i.e. `3·subset ≥ 2·total + 1`.
///
/// The products are computed in `u128`, so the comparison is exact for the
/// whole `u64` input domain. Zero total stake and subsets exceeding the
/// total are rejected.
pub fn is_super_majority_stake(subset_stake: u64, total_stake: u64) -> bool {
    if total_stake == 0 || subset_stake > total_stake {
        return false;
    }
    3 * subset_stake as u128 >= 2 * total_stake as u128 + 1
}

/// Resolve an aggregated signature's signer bitfield against a validator
/// set.
///
/// Returns the selected public keys (in bitfield order) and their combined
/// stake, or `None` when the bitfield is empty or selects an out-of-range
/// index.
fn select_signers(
    qc_signers: &fasthotstuff_types::SignerBitfield,
    validator_set: &ValidatorSet,
) -> Option<(Vec<Bls12381G1PublicKey>, u64)> {
    if qc_signers.is_empty() {
        return None;
    }

    let mut public_keys = Vec::with_capacity(qc_signers.count());
    let mut stake: u64 = 0;
    for index in qc_signers.set_indices() {
        let validator = validator_set.get_by_index(index)?;
        public_keys.push(validator.public_key);
        stake = stake.checked_add(validator.stake_amount)?;
    }
    Some((public_keys, stake))
}

/// Whether `qc` is a cryptographically valid quorum certificate carrying a
/// super-majority of `validator_set`'s stake.
pub fn is_valid_super_majority_qc(qc: &QuorumCertificate, validator_set: &ValidatorSet) -> bool {
    if !is_properly_formed_qc(qc) || !is_properly_formed_validator_set(validator_set) {
        return false;
    }

    let Some((public_keys, stake)) = select_signers(&qc.aggregated_signature.signers, validator_set)
    else {
        return false;
    };

    if !is_super_majority_stake(stake, validator_set.total_stake()) {
        trace!(view = qc.view, stake, "QC signers lack super-majority stake");
        return false;
    }

    let message = vote_signing_message(qc.view, &qc.block_hash);
    verify_aggregate_single_payload(&public_keys, &qc.aggregated_signature.signature, &message)
}

/// Whether `agg_qc` is a cryptographically valid aggregate (timeout) quorum
/// certificate carrying a super-majority of `validator_set`'s stake.
///
/// Beyond the signature itself, the embedded high QC must be a valid
/// super-majority QC under the same validator set, and the highest reported
/// high-QC view must match the high QC's view.
pub fn is_valid_super_majority_aggregate_qc(
    agg_qc: &AggregateQuorumCertificate,
    validator_set: &ValidatorSet,
) -> bool {
    if agg_qc.view == 0 || !is_properly_formed_validator_set(validator_set) {
        return false;
    }

    let signers = &agg_qc.aggregated_signature.signers;
    if agg_qc.high_qc_views.len() != signers.count() {
        return false;
    }

    let Some((public_keys, stake)) = select_signers(signers, validator_set) else {
        return false;
    };

    if !is_super_majority_stake(stake, validator_set.total_stake()) {
        trace!(
            view = agg_qc.view,
            stake,
            "aggregate QC signers lack super-majority stake"
        );
        return false;
    }

    // Signer i (in bitfield order) signed the timeout payload embedding its
    // own reported high-QC view.
    let payloads: Vec<Vec<u8>> = agg_qc
        .high_qc_views
        .iter()
        .map(|&high_qc_view| timeout_signing_message(agg_qc.view, high_qc_view))
        .collect();

    if !verify_aggregate_multi_payload(
        &public_keys,
        &agg_qc.aggregated_signature.signature,
        &payloads,
    ) {
        return false;
    }

    // The carried high QC must be the best one any signer reported, and it
    // must hold up on its own.
    let max_reported = agg_qc.high_qc_views.iter().copied().max();
    if max_reported != Some(agg_qc.high_qc.view) {
        return false;
    }

    is_valid_super_majority_qc(&agg_qc.high_qc, validator_set)
}
