//! Events emitted to the block producer.

use fasthotstuff_types::{AggregateQuorumCertificate, Hash, QuorumCertificate};

/// An event emitted by the consensus event loop.
///
/// Events flow out over a FIFO channel with the loop as the single producer
/// and the block producer as the single consumer. The loop only ever
/// signals; the consumer performs the actual proposal, vote broadcast, or
/// view change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastHotStuffEvent {
    /// A new tip was accepted; the consumer can cast its vote for it.
    Vote {
        /// The view the tip block was proposed in.
        view: u64,
        /// Hash of the tip block.
        tip_block_hash: Hash,
        /// Height of the tip block.
        tip_block_height: u64,
    },

    /// The current view timed out; the consumer decides whether to
    /// broadcast its own timeout and advance the view.
    Timeout {
        /// The view that timed out.
        view: u64,
        /// Hash of the tip block at timeout.
        tip_block_hash: Hash,
    },

    /// Votes with a super-majority of stake were collected for a safe
    /// block; the consumer can propose the next block justified by `qc`.
    ConstructVoteQC {
        /// The view the next block would be proposed in.
        view: u64,
        /// Hash of the block the QC certifies (the block to extend).
        tip_block_hash: Hash,
        /// Height of the certified block.
        tip_block_height: u64,
        /// The constructed quorum certificate.
        qc: QuorumCertificate,
    },

    /// Timeouts with a super-majority of stake were collected for the
    /// previous view; the consumer can propose a block justified by
    /// `aggregate_qc`, extending the block its high QC certifies.
    ConstructTimeoutQC {
        /// The view the next block would be proposed in.
        view: u64,
        /// Hash of the block certified by the aggregate QC's high QC.
        tip_block_hash: Hash,
        /// Height of that block.
        tip_block_height: u64,
        /// The constructed aggregate (timeout) quorum certificate.
        aggregate_qc: AggregateQuorumCertificate,
    },
}

impl FastHotStuffEvent {
    /// The view carried by the event.
    pub fn view(&self) -> u64 {
        match self {
            Self::Vote { view, .. }
            | Self::Timeout { view, .. }
            | Self::ConstructVoteQC { view, .. }
            | Self::ConstructTimeoutQC { view, .. } => *view,
        }
    }

    /// The tip block hash carried by the event.
    pub fn tip_block_hash(&self) -> Hash {
        match self {
            Self::Vote { tip_block_hash, .. }
            | Self::Timeout { tip_block_hash, .. }
            | Self::ConstructVoteQC { tip_block_hash, .. }
            | Self::ConstructTimeoutQC { tip_block_hash, .. } => *tip_block_hash,
        }
    }
}
