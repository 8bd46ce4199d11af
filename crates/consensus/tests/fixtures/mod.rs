//! Shared fixtures for the event loop integration tests.
//!
//! Keys are derived from fixed seeds so every run exercises the same
//! committee; blocks and certificates are signed for real so the full
//! verification path runs end to end.

use fasthotstuff_types::{
    aggregate_signatures, bls_keypair_from_seed, timeout_signing_message, vote_signing_message,
    AggregatedSignature, Block, BlockWithValidators, Bls12381G1PrivateKey, Hash,
    QuorumCertificate, SignerBitfield, TimeoutMessage, Validator, ValidatorSet, VoteMessage,
};

/// Deterministic BLS keypairs, one per committee seat.
pub fn keypairs(count: usize) -> Vec<Bls12381G1PrivateKey> {
    (0..count)
        .map(|i| bls_keypair_from_seed(&[i as u8 + 1; 32]))
        .collect()
}

/// A committee over `keys` with the given stakes, in seat order.
pub fn validator_set(keys: &[Bls12381G1PrivateKey], stakes: &[u64]) -> ValidatorSet {
    ValidatorSet::new(
        keys.iter()
            .zip(stakes)
            .map(|(keypair, &stake_amount)| Validator {
                public_key: keypair.public_key(),
                stake_amount,
            })
            .collect(),
    )
}

/// A QC for `(view, block_hash)` signed by the listed committee seats.
pub fn signed_qc(
    view: u64,
    block_hash: Hash,
    keys: &[Bls12381G1PrivateKey],
    signer_indices: &[usize],
) -> QuorumCertificate {
    let message = vote_signing_message(view, &block_hash);
    let partials: Vec<_> = signer_indices
        .iter()
        .map(|&i| keys[i].sign_v1(&message))
        .collect();
    let mut signers = SignerBitfield::empty();
    for &i in signer_indices {
        signers.set(i);
    }
    QuorumCertificate {
        view,
        block_hash,
        aggregated_signature: AggregatedSignature {
            signers,
            signature: aggregate_signatures(&partials).unwrap(),
        },
    }
}

/// A block bound to its committee.
pub fn block_with_validators(
    tag: &[u8],
    view: u64,
    height: u64,
    qc: QuorumCertificate,
    set: &ValidatorSet,
) -> BlockWithValidators {
    BlockWithValidators {
        block: Block {
            block_hash: Hash::from_bytes(tag),
            view,
            height,
            qc,
        },
        validator_set: set.clone(),
    }
}

/// A correctly signed vote from committee seat `index`.
pub fn vote_message(
    keys: &[Bls12381G1PrivateKey],
    index: usize,
    view: u64,
    block_hash: Hash,
) -> VoteMessage {
    VoteMessage {
        view,
        block_hash,
        public_key: keys[index].public_key(),
        signature: keys[index].sign_v1(&vote_signing_message(view, &block_hash)),
    }
}

/// A correctly signed timeout from committee seat `index`.
pub fn timeout_message(
    keys: &[Bls12381G1PrivateKey],
    index: usize,
    view: u64,
    high_qc: QuorumCertificate,
) -> TimeoutMessage {
    TimeoutMessage {
        view,
        public_key: keys[index].public_key(),
        signature: keys[index].sign_v1(&timeout_signing_message(view, high_qc.view)),
        high_qc,
    }
}
