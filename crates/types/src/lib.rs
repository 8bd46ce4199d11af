//! Foundational value types for Fast-HotStuff consensus.
//!
//! This crate provides the types consumed by the consensus event loop:
//!
//! - **Primitives**: Blake3 [`Hash`], BLS keys and signatures, the signer
//!   bitfield
//! - **Signing payloads**: deterministic vote/timeout payload derivation
//!   with opcode domain separation
//! - **Consensus descriptors**: [`Block`], [`ValidatorSet`],
//!   [`QuorumCertificate`], [`AggregateQuorumCertificate`], the vote and
//!   timeout messages
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crate. Concrete wire representations live in the networking layer; the
//! types here are the tagged records the event loop operates on.

mod block;
mod crypto;
mod hash;
mod message;
mod quorum_certificate;
mod signer_bitfield;
mod signing;
mod validator;

// Re-export crypto types and helpers
pub use crypto::{
    // Helper functions
    aggregate_signatures,
    bls_keypair_from_seed,
    generate_bls_keypair,
    public_key_string,
    verify_aggregate_multi_payload,
    verify_aggregate_single_payload,
    verify_bls12381_v1,
    zero_bls_signature,
    // Vendor types
    Bls12381G1PrivateKey,
    Bls12381G1PublicKey,
    Bls12381G2Signature,
};
pub use hash::{Hash, HexError};
pub use signer_bitfield::SignerBitfield;
pub use signing::{
    timeout_signature_payload, timeout_signing_message, vote_signature_payload,
    vote_signing_message, OPCODE_VALIDATOR_TIMEOUT, OPCODE_VALIDATOR_VOTE,
};

pub use block::{Block, BlockWithValidators};
pub use message::{TimeoutMessage, VoteMessage};
pub use quorum_certificate::{AggregateQuorumCertificate, AggregatedSignature, QuorumCertificate};
pub use validator::{Validator, ValidatorSet};
