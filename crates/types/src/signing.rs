//! Domain-separated signing payloads for votes and timeouts.
//!
//! Validators sign exactly two kinds of payloads: a vote payload binding
//! `(view, block_hash)` and a timeout payload binding `(view, high_qc_view)`.
//! Both are 32-byte Blake3 digests over the little-endian field encoding.
//!
//! Before the digest reaches the BLS primitive, a single-byte opcode is
//! prepended (`0x00` vote, `0x01` timeout) so a signature produced in one
//! context can never be replayed in the other. The `*_signing_message`
//! builders are the only code paths that touch the opcode bytes; everything
//! that signs or verifies goes through them.

use crate::Hash;

/// Opcode prefix for validator vote signatures.
pub const OPCODE_VALIDATOR_VOTE: u8 = 0x00;

/// Opcode prefix for validator timeout signatures.
pub const OPCODE_VALIDATOR_TIMEOUT: u8 = 0x01;

/// The 32-byte digest a validator commits to when voting for a block.
///
/// This digest doubles as the evidence-pool key for votes: all votes for
/// the same `(view, block_hash)` target share it and can be aggregated
/// directly.
pub fn vote_signature_payload(view: u64, block_hash: &Hash) -> Hash {
    Hash::from_parts(&[&view.to_le_bytes(), block_hash.as_bytes()])
}

/// The 32-byte digest a validator commits to when timing out a view.
///
/// Embeds the view of the highest QC the validator has observed, so an
/// aggregate timeout certificate verifies each signer against its own
/// reported high-QC view.
pub fn timeout_signature_payload(view: u64, high_qc_view: u64) -> Hash {
    Hash::from_parts(&[&view.to_le_bytes(), &high_qc_view.to_le_bytes()])
}

/// The exact bytes passed to the BLS primitive for a vote.
pub fn vote_signing_message(view: u64, block_hash: &Hash) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + Hash::BYTES);
    message.push(OPCODE_VALIDATOR_VOTE);
    message.extend_from_slice(vote_signature_payload(view, block_hash).as_bytes());
    message
}

/// The exact bytes passed to the BLS primitive for a timeout.
pub fn timeout_signing_message(view: u64, high_qc_view: u64) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + Hash::BYTES);
    message.push(OPCODE_VALIDATOR_TIMEOUT);
    message.extend_from_slice(timeout_signature_payload(view, high_qc_view).as_bytes());
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_payload_deterministic() {
        let block_hash = Hash::from_bytes(b"block");
        assert_eq!(
            vote_signature_payload(7, &block_hash),
            vote_signature_payload(7, &block_hash)
        );
    }

    #[test]
    fn test_vote_payload_binds_both_fields() {
        let block_hash = Hash::from_bytes(b"block");
        let other_hash = Hash::from_bytes(b"other");

        assert_ne!(
            vote_signature_payload(7, &block_hash),
            vote_signature_payload(8, &block_hash)
        );
        assert_ne!(
            vote_signature_payload(7, &block_hash),
            vote_signature_payload(7, &other_hash)
        );
    }

    #[test]
    fn test_timeout_payload_binds_both_views() {
        assert_ne!(
            timeout_signature_payload(4, 1),
            timeout_signature_payload(4, 2)
        );
        assert_ne!(
            timeout_signature_payload(4, 1),
            timeout_signature_payload(5, 1)
        );
    }

    #[test]
    fn test_signing_messages_carry_opcode() {
        let block_hash = Hash::from_bytes(b"block");

        let vote = vote_signing_message(4, &block_hash);
        assert_eq!(vote.len(), 33);
        assert_eq!(vote[0], OPCODE_VALIDATOR_VOTE);
        assert_eq!(&vote[1..], vote_signature_payload(4, &block_hash).as_bytes());

        let timeout = timeout_signing_message(4, 2);
        assert_eq!(timeout.len(), 33);
        assert_eq!(timeout[0], OPCODE_VALIDATOR_TIMEOUT);
        assert_eq!(
            &timeout[1..],
            timeout_signature_payload(4, 2).as_bytes()
        );
    }

    #[test]
    fn test_opcodes_separate_domains() {
        // A vote and a timeout over coincidentally equal digests must still
        // produce different signing messages.
        let vote = vote_signing_message(4, &Hash::from_bytes(b"x"));
        let timeout = timeout_signing_message(4, 2);
        assert_ne!(vote[0], timeout[0]);
    }
}
