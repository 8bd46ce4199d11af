//! Validator set types.

use crate::{public_key_string, Bls12381G1PublicKey};
use sbor::prelude::*;
use std::collections::HashMap;

/// A consensus validator: a BLS voting key with its stake.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Validator {
    /// Public key for vote and timeout signature verification.
    pub public_key: Bls12381G1PublicKey,

    /// Stake backing this validator's votes. Must be positive in any
    /// properly formed validator set.
    pub stake_amount: u64,
}

/// An ordered set of validators.
///
/// The position of a validator defines its bit index in aggregated-signature
/// signer bitfields, so the order given at construction is preserved; the
/// set is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Default)]
pub struct ValidatorSet {
    /// The validators, in bitfield index order.
    pub validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Create a new validator set, preserving the given order.
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    /// Get the number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Get total stake across all validators.
    pub fn total_stake(&self) -> u64 {
        self.validators.iter().map(|v| v.stake_amount).sum()
    }

    /// Get validator at a specific bitfield index.
    pub fn get_by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Get all public keys, in bitfield index order.
    pub fn public_keys(&self) -> Vec<Bls12381G1PublicKey> {
        self.validators.iter().map(|v| v.public_key).collect()
    }

    /// Build the signer lookup: public-key string form → bitfield index.
    ///
    /// Later duplicates of the same key are ignored so the first index wins,
    /// keeping the lookup consistent with signature bitfield positions.
    pub fn build_lookup(&self) -> HashMap<String, usize> {
        let mut lookup = HashMap::with_capacity(self.validators.len());
        for (index, validator) in self.validators.iter().enumerate() {
            lookup
                .entry(public_key_string(&validator.public_key))
                .or_insert(index);
        }
        lookup
    }
}
