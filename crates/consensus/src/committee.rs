//! Validated safe blocks with their committees.

use crate::error::ConsensusError;
use crate::validation::{is_properly_formed_block, is_properly_formed_validator_set};
use fasthotstuff_types::{Block, BlockWithValidators, ValidatorSet};
use std::collections::HashMap;

/// A safe block bound to the committee allowed to vote on it, with the
/// signer lookup derived once at admission.
///
/// The lookup maps public-key string form to bitfield index, turning every
/// per-message signer resolution into an O(1) probe. The whole structure is
/// read-only after construction.
#[derive(Debug, Clone)]
pub(crate) struct CommitteeBlock {
    pub(crate) block: Block,
    pub(crate) validator_set: ValidatorSet,
    pub(crate) lookup: HashMap<String, usize>,
}

impl CommitteeBlock {
    /// Validate an incoming `(block, validator set)` pair and derive the
    /// signer lookup.
    pub(crate) fn try_from_input(input: BlockWithValidators) -> Result<Self, ConsensusError> {
        if !is_properly_formed_block(&input.block) {
            return Err(ConsensusError::InvalidBlock);
        }
        if !is_properly_formed_validator_set(&input.validator_set) {
            return Err(ConsensusError::InvalidValidatorSet);
        }

        let lookup = input.validator_set.build_lookup();
        Ok(Self {
            block: input.block,
            validator_set: input.validator_set,
            lookup,
        })
    }

    /// Validate a full safe-block list.
    pub(crate) fn try_from_inputs(
        inputs: Vec<BlockWithValidators>,
    ) -> Result<Vec<Self>, ConsensusError> {
        inputs.into_iter().map(Self::try_from_input).collect()
    }

    /// Bitfield index of a signer in this block's committee, if present.
    pub(crate) fn signer_index(&self, signer: &str) -> Option<usize> {
        self.lookup.get(signer).copied()
    }

    /// Stake of the validator at `index`. Zero for out-of-range indices.
    pub(crate) fn stake_at(&self, index: usize) -> u64 {
        self.validator_set
            .get_by_index(index)
            .map(|v| v.stake_amount)
            .unwrap_or(0)
    }
}
