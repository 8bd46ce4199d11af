//! Validator vote and timeout messages.

use crate::{Bls12381G1PublicKey, Bls12381G2Signature, Hash, QuorumCertificate};
use sbor::prelude::*;

/// A validator's vote for a block in a view.
///
/// The signature covers the vote signing message for
/// `(view, block_hash)`.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct VoteMessage {
    /// The view the voted-for block was proposed in.
    pub view: u64,

    /// Hash of the voted-for block.
    pub block_hash: Hash,

    /// The voter's BLS public key.
    pub public_key: Bls12381G1PublicKey,

    /// BLS partial signature over the vote payload.
    pub signature: Bls12381G2Signature,
}

/// A validator's declaration that a view has timed out.
///
/// The signature covers the timeout signing message for
/// `(view, high_qc.view)`, binding the signer to the highest QC it had
/// observed when it gave up on the view.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct TimeoutMessage {
    /// The view the validator is timing out.
    pub view: u64,

    /// The highest QC the validator has seen.
    pub high_qc: QuorumCertificate,

    /// The timing-out validator's BLS public key.
    pub public_key: Bls12381G1PublicKey,

    /// BLS partial signature over the timeout payload.
    pub signature: Bls12381G2Signature,
}
