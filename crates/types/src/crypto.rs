//! BLS12-381 signature primitives.
//!
//! This module re-exports the BLS types from `radix_common::crypto` and
//! provides the aggregation and verification helpers the consensus layer
//! treats as a black box:
//!
//! - `aggregate_signatures()` - combine partial signatures into one
//! - `verify_aggregate_single_payload()` - all signers signed the same bytes
//! - `verify_aggregate_multi_payload()` - signer i signed payload i
//! - `generate_bls_keypair()` / `bls_keypair_from_seed()` - key generation

// Re-export vendor crypto types
pub use radix_common::crypto::{
    Bls12381G1PrivateKey, Bls12381G1PublicKey, Bls12381G2Signature,
};

// Re-export the single-key verification function
pub use radix_common::crypto::verify_bls12381_v1;

// The BLS ciphersuite constant; the DST for every signature in this crate.
use radix_common::crypto::BLS12381_CIPHERSITE_V1;

/// Generate a new random BLS12-381 keypair.
///
/// Uses a random 32-byte seed with blst's key_gen for proper key derivation.
pub fn generate_bls_keypair() -> Bls12381G1PrivateKey {
    let mut ikm = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut ikm);
    bls_keypair_from_seed(&ikm)
}

/// Generate a BLS12-381 keypair from a seed (deterministic, for testing).
///
/// Uses blst's key_gen which hashes the full seed to derive a valid BLS
/// scalar, so arbitrary seed bytes always map to a usable key.
pub fn bls_keypair_from_seed(seed: &[u8; 32]) -> Bls12381G1PrivateKey {
    let blst_sk = blst::min_pk::SecretKey::key_gen(seed, &[]).expect("key_gen should not fail");

    // blst secret key is a 32-byte scalar in big-endian format
    let sk_bytes = blst_sk.to_bytes();
    Bls12381G1PrivateKey::from_bytes(&sk_bytes).expect("valid BLS scalar bytes")
}

/// Create a zero/placeholder BLS signature for testing.
pub fn zero_bls_signature() -> Bls12381G2Signature {
    Bls12381G2Signature([0u8; 96])
}

/// Hex string form of a BLS public key.
///
/// This is the canonical signer key used by the evidence pools and
/// validator lookup maps.
pub fn public_key_string(public_key: &Bls12381G1PublicKey) -> String {
    hex::encode(public_key.0)
}

/// Aggregate partial BLS signatures into a single signature.
///
/// Supports partials over the same payload or over distinct payloads.
/// Returns `None` when the input is empty or any signature fails to decode.
pub fn aggregate_signatures(signatures: &[Bls12381G2Signature]) -> Option<Bls12381G2Signature> {
    if signatures.is_empty() {
        return None;
    }
    Bls12381G2Signature::aggregate(signatures, true).ok()
}

/// Verify an aggregated signature where all signers signed the SAME payload.
///
/// Aggregates the public keys and performs a single pairing check, the fast
/// path for quorum certificates where every validator signed the same
/// `(view, block_hash)` digest.
///
/// Returns `true` only if the signature is the aggregate of one partial per
/// public key over `payload`.
pub fn verify_aggregate_single_payload(
    public_keys: &[Bls12381G1PublicKey],
    signature: &Bls12381G2Signature,
    payload: &[u8],
) -> bool {
    if public_keys.is_empty() {
        return false;
    }

    let agg_pk = match Bls12381G1PublicKey::aggregate(public_keys, true) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    verify_bls12381_v1(payload, &agg_pk, signature)
}

/// Verify an aggregated signature where signer i signed payload i.
///
/// This is the timeout-certificate path: each validator signs a payload
/// that embeds its own high-QC view, and the partials are aggregated into
/// one signature. Drops down to blst's `aggregate_verify` since the
/// radix-common surface only covers the single-message case.
///
/// Returns `true` only if the signature is the aggregate of one partial per
/// (public key, payload) pair, in order.
pub fn verify_aggregate_multi_payload(
    public_keys: &[Bls12381G1PublicKey],
    signature: &Bls12381G2Signature,
    payloads: &[Vec<u8>],
) -> bool {
    if public_keys.len() != payloads.len() || public_keys.is_empty() {
        return false;
    }

    let sig = match blst::min_pk::Signature::from_bytes(&signature.0) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let mut bls_pks = Vec::with_capacity(public_keys.len());
    for pk in public_keys {
        match blst::min_pk::PublicKey::from_bytes(&pk.0) {
            Ok(p) => bls_pks.push(p),
            Err(_) => return false,
        }
    }
    let pk_refs: Vec<&blst::min_pk::PublicKey> = bls_pks.iter().collect();
    let msg_refs: Vec<&[u8]> = payloads.iter().map(|p| p.as_slice()).collect();

    let result = sig.aggregate_verify(
        true, // sigs_groupcheck - verify the signature is in the group
        &msg_refs,
        BLS12381_CIPHERSITE_V1, // DST must match sign_v1/verify_bls12381_v1
        &pk_refs,
        true, // pks_validate
    );

    result == blst::BLST_ERROR::BLST_SUCCESS
}
