//! Block descriptors consumed by the consensus event loop.

use crate::{Hash, QuorumCertificate, ValidatorSet};
use sbor::prelude::*;

/// A block as seen by the event loop.
///
/// The loop never constructs blocks; it receives them, fully formed, from
/// the block producer. A properly formed block has a positive view and
/// height, a non-zero hash, and carries the QC that justified its proposal.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Block {
    /// Globally unique block identifier.
    pub block_hash: Hash,

    /// The view this block was proposed in.
    pub view: u64,

    /// Height of the block, monotonically increasing along any chain.
    pub height: u64,

    /// The quorum certificate this block extends from.
    pub qc: QuorumCertificate,
}

/// A block paired with the committee allowed to vote on it.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct BlockWithValidators {
    /// The block.
    pub block: Block,

    /// The active validator set for this block.
    pub validator_set: ValidatorSet,
}
