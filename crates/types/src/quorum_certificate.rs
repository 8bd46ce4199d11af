//! Quorum certificates for Fast-HotStuff consensus.

use crate::{Bls12381G2Signature, Hash, SignerBitfield};
use sbor::prelude::*;

/// An aggregated BLS signature together with the bitfield naming its signers.
///
/// Bit `i` of `signers` selects the validator at position `i` of whichever
/// validator set the certificate is interpreted against.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AggregatedSignature {
    /// Bitfield indicating which validators contributed partials.
    pub signers: SignerBitfield,

    /// Aggregated BLS signature from all signers.
    pub signature: Bls12381G2Signature,
}

/// A quorum certificate proving that validators holding a super-majority of
/// stake voted for a block.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct QuorumCertificate {
    /// The view the certified block was proposed in.
    pub view: u64,

    /// Hash of the block this QC certifies.
    pub block_hash: Hash,

    /// Aggregated vote signatures over the vote payload for
    /// `(view, block_hash)`.
    pub aggregated_signature: AggregatedSignature,
}

impl QuorumCertificate {
    /// Get the number of signers.
    pub fn signer_count(&self) -> usize {
        self.aggregated_signature.signers.count()
    }
}

/// An aggregate quorum certificate proving that validators holding a
/// super-majority of stake timed out a view.
///
/// Unlike a plain QC, the signers did not sign a common payload: signer `i`
/// (in bitfield order) signed the timeout payload embedding its own
/// `high_qc_views[i]`. The certificate carries the single highest QC seen
/// across all signers, which the next proposer extends.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AggregateQuorumCertificate {
    /// The view that timed out.
    pub view: u64,

    /// The highest QC observed by any signer.
    pub high_qc: QuorumCertificate,

    /// Per-signer reported high-QC views, in bitfield index order. Always
    /// the same length as the signer count.
    pub high_qc_views: Vec<u64>,

    /// Aggregated timeout signatures over the per-signer payloads.
    pub aggregated_signature: AggregatedSignature,
}

impl AggregateQuorumCertificate {
    /// Get the number of signers.
    pub fn signer_count(&self) -> usize {
        self.aggregated_signature.signers.count()
    }
}
