//! Error surface of the consensus event loop.

use thiserror::Error;

/// Errors returned by the event loop's public operations.
///
/// All of these are protocol-level and recovered by the caller; the loop
/// never panics on them and never terminates itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Operation requires the event loop to be initialized first.
    #[error("Event loop is not initialized")]
    NotInitialized,

    /// Operation requires the event loop to be running.
    #[error("Event loop is not running")]
    NotRunning,

    /// Operation is not allowed while the event loop is running.
    #[error("Event loop is already running")]
    AlreadyRunning,

    /// A configured interval was zero.
    #[error("Interval must be greater than zero")]
    InvalidInterval,

    /// A tip or safe block was malformed.
    #[error("Malformed block")]
    InvalidBlock,

    /// A validator set was empty or carried a zero-stake validator.
    #[error("Malformed validator set")]
    InvalidValidatorSet,

    /// A vote message was missing fields or structurally invalid.
    #[error("Malformed vote message")]
    MalformedVote,

    /// A timeout message was missing fields or structurally invalid.
    #[error("Malformed timeout message")]
    MalformedTimeout,

    /// BLS signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The message's view is behind the loop's current view.
    #[error("Message has a stale view {view}; current view is {current_view}")]
    StaleView {
        /// The view carried by the rejected message.
        view: u64,
        /// The loop's current view at rejection time.
        current_view: u64,
    },

    /// The signer has already voted for this view.
    #[error("Validator {signer} has already voted for view {view}")]
    AlreadyVotedForView {
        /// Public key string of the signer.
        signer: String,
        /// The view in question.
        view: u64,
    },

    /// The signer has already timed out for this view.
    #[error("Validator {signer} has already timed out for view {view}")]
    AlreadyTimedOutForView {
        /// Public key string of the signer.
        signer: String,
        /// The view in question.
        view: u64,
    },

    /// The signer is not a member of the tip's validator set.
    #[error("Validator {signer} is not in the tip validator set")]
    UnknownValidator {
        /// Public key string of the signer.
        signer: String,
    },
}
