//! The Fast-HotStuff consensus event loop.
//!
//! [`FastHotStuffEventLoop`] is the state-holding coordinator between the
//! block producer and the validator network. It owns the chain tip, the
//! safe-block set, the current view, the two timers, and the evidence
//! pools, and emits [`FastHotStuffEvent`]s over a FIFO channel when the
//! producer should act.
//!
//! # Concurrency
//!
//! All mutable state lives behind one coarse mutex. Public operations lock
//! it for their full duration; timer firings run on worker threads that
//! re-acquire the same lock and re-check both the loop status and the view
//! they were armed for, so firings that lost a race with `stop()` or a
//! view change degrade to no-ops.

use crate::aggregation::{try_construct_timeout_qc, try_construct_vote_qc};
use crate::committee::CommitteeBlock;
use crate::error::ConsensusError;
use crate::event::FastHotStuffEvent;
use crate::evidence::{TimeoutPool, VotePool};
use crate::scheduled_task::ScheduledTask;
use crate::validation::{is_properly_formed_timeout, is_properly_formed_vote};
use crossbeam::channel::{unbounded, Receiver, Sender};
use fasthotstuff_types::{
    public_key_string, timeout_signing_message, verify_bls12381_v1, vote_signature_payload,
    vote_signing_message, BlockWithValidators, TimeoutMessage, VoteMessage,
};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Cap on the timeout back-off exponent: the timeout timer never waits
/// longer than `timeout_base_duration << MAX_TIMEOUT_BACKOFF_EXPONENT`.
pub const MAX_TIMEOUT_BACKOFF_EXPONENT: u32 = 16;

/// Lifecycle status of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLoopStatus {
    /// Constructed but not yet bound to a chain tip.
    NotInitialized,
    /// Bound to a tip and ready to start; timers idle.
    Initialized,
    /// Timers armed, accepting votes and timeouts.
    Running,
}

/// The consensus event loop.
///
/// The loop is a value: tests instantiate many. Dropping it cancels both
/// timers.
pub struct FastHotStuffEventLoop {
    state: Arc<Mutex<EventLoopState>>,
    events_rx: Receiver<FastHotStuffEvent>,
}

struct EventLoopState {
    status: EventLoopStatus,

    // Configuration fixed at init time.
    block_construction_interval: Duration,
    timeout_base_duration: Duration,

    // Chain position.
    current_view: u64,
    tip: Option<CommitteeBlock>,
    safe_blocks: Vec<CommitteeBlock>,

    // Volatile evidence.
    votes_seen: VotePool,
    timeouts_seen: TimeoutPool,

    // Timers.
    next_block_construction_task: ScheduledTask<u64>,
    next_timeout_task: ScheduledTask<u64>,

    // Outbound events; the receiver half lives on the loop handle.
    events_tx: Sender<FastHotStuffEvent>,
}

/// Acquire the state lock, shrugging off poisoning: the protected state is
/// only written through the operations below, none of which unwind midway.
fn lock_state(state: &Mutex<EventLoopState>) -> MutexGuard<'_, EventLoopState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FastHotStuffEventLoop {
    /// Create a detached event loop in the `NotInitialized` state.
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        let state = EventLoopState {
            status: EventLoopStatus::NotInitialized,
            block_construction_interval: Duration::ZERO,
            timeout_base_duration: Duration::ZERO,
            current_view: 0,
            tip: None,
            safe_blocks: Vec::new(),
            votes_seen: VotePool::default(),
            timeouts_seen: TimeoutPool::default(),
            next_block_construction_task: ScheduledTask::new(),
            next_timeout_task: ScheduledTask::new(),
            events_tx,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events_rx,
        }
    }

    /// The outbound event stream. FIFO; never drops events.
    pub fn events(&self) -> &Receiver<FastHotStuffEvent> {
        &self.events_rx
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EventLoopStatus {
        lock_state(&self.state).status
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.status() == EventLoopStatus::Running
    }

    /// The loop's current view.
    pub fn current_view(&self) -> u64 {
        lock_state(&self.state).current_view
    }

    /// Bind the loop to a chain position.
    ///
    /// Stores the tip and safe blocks, derives the signer lookups, resets
    /// the evidence pools, and sets the current view to one past the tip's.
    /// Timers stay idle until [`start`](Self::start). Allowed from
    /// `NotInitialized` and `Initialized` (re-init), not while running.
    pub fn init(
        &self,
        block_construction_interval: Duration,
        timeout_base_duration: Duration,
        tip: BlockWithValidators,
        safe_blocks: Vec<BlockWithValidators>,
    ) -> Result<(), ConsensusError> {
        let mut state = lock_state(&self.state);
        if state.status == EventLoopStatus::Running {
            return Err(ConsensusError::AlreadyRunning);
        }
        if block_construction_interval.is_zero() || timeout_base_duration.is_zero() {
            return Err(ConsensusError::InvalidInterval);
        }

        let tip = CommitteeBlock::try_from_input(tip)?;
        let safe_blocks = CommitteeBlock::try_from_inputs(safe_blocks)?;

        state.current_view = tip.block.view + 1;
        state.block_construction_interval = block_construction_interval;
        state.timeout_base_duration = timeout_base_duration;
        state.tip = Some(tip);
        state.safe_blocks = safe_blocks;
        state.votes_seen = VotePool::default();
        state.timeouts_seen = TimeoutPool::default();
        state.status = EventLoopStatus::Initialized;

        info!(
            current_view = state.current_view,
            safe_blocks = state.safe_blocks.len(),
            "event loop initialized"
        );
        Ok(())
    }

    /// Arm both timers and transition to `Running`.
    pub fn start(&self) -> Result<(), ConsensusError> {
        let mut state = lock_state(&self.state);
        match state.status {
            EventLoopStatus::NotInitialized => Err(ConsensusError::NotInitialized),
            EventLoopStatus::Running => Err(ConsensusError::AlreadyRunning),
            EventLoopStatus::Initialized => {
                state.status = EventLoopStatus::Running;
                state.reset_scheduled_tasks(&Arc::downgrade(&self.state));
                info!(current_view = state.current_view, "event loop started");
                Ok(())
            }
        }
    }

    /// Cancel both timers and return to `Initialized`.
    ///
    /// Safe to call repeatedly and from any state; only a running loop
    /// changes state. In-flight timer firings observe the status change
    /// under the lock and become no-ops.
    pub fn stop(&self) {
        let mut state = lock_state(&self.state);
        if state.status != EventLoopStatus::Running {
            return;
        }
        state.next_block_construction_task.cancel();
        state.next_timeout_task.cancel();
        state.status = EventLoopStatus::Initialized;
        info!(current_view = state.current_view, "event loop stopped");
    }

    /// Accept a new chain tip.
    ///
    /// Replaces the tip and safe-block set, advances the current view to at
    /// least one past the new tip's, evicts stale evidence, re-arms both
    /// timers (the timeout back-off resets here), and emits a
    /// [`FastHotStuffEvent::Vote`] signaling the consumer to vote on the
    /// new tip.
    pub fn process_tip_block(
        &self,
        tip: BlockWithValidators,
        safe_blocks: Vec<BlockWithValidators>,
    ) -> Result<(), ConsensusError> {
        let mut state = lock_state(&self.state);
        if state.status != EventLoopStatus::Running {
            return Err(ConsensusError::NotRunning);
        }

        let tip = CommitteeBlock::try_from_input(tip)?;
        let safe_blocks = CommitteeBlock::try_from_inputs(safe_blocks)?;

        let vote_event = FastHotStuffEvent::Vote {
            view: tip.block.view,
            tip_block_hash: tip.block.block_hash,
            tip_block_height: tip.block.height,
        };

        state.current_view = state.current_view.max(tip.block.view + 1);
        debug!(
            current_view = state.current_view,
            tip_view = tip.block.view,
            tip_hash = %tip.block.block_hash,
            "accepted new tip block"
        );
        state.tip = Some(tip);
        state.safe_blocks = safe_blocks;
        state.evict_stale_evidence();
        state.reset_scheduled_tasks(&Arc::downgrade(&self.state));

        state.emit(vote_event);
        Ok(())
    }

    /// Advance to the next view after a timeout, returning the new view.
    ///
    /// Evicts stale evidence and re-arms both timers; each consecutive
    /// advance without an intervening tip doubles the timeout duration.
    pub fn advance_view(&self) -> Result<u64, ConsensusError> {
        let mut state = lock_state(&self.state);
        if state.status != EventLoopStatus::Running {
            return Err(ConsensusError::NotRunning);
        }

        state.current_view += 1;
        state.evict_stale_evidence();
        state.reset_scheduled_tasks(&Arc::downgrade(&self.state));

        debug!(current_view = state.current_view, "advanced view");
        Ok(state.current_view)
    }

    /// Ingest a validator's vote.
    ///
    /// The vote must be well formed, from a member of the tip committee,
    /// correctly signed, no older than the current view, and the signer's
    /// first vote or timeout for its view.
    pub fn process_validator_vote(&self, vote: VoteMessage) -> Result<(), ConsensusError> {
        let mut state = lock_state(&self.state);
        if state.status != EventLoopStatus::Running {
            return Err(ConsensusError::NotRunning);
        }
        if !is_properly_formed_vote(&vote) {
            return Err(ConsensusError::MalformedVote);
        }

        let signer = public_key_string(&vote.public_key);
        let tip = state.tip.as_ref().ok_or(ConsensusError::NotInitialized)?;
        if tip.signer_index(&signer).is_none() {
            return Err(ConsensusError::UnknownValidator { signer });
        }

        let message = vote_signing_message(vote.view, &vote.block_hash);
        if !verify_bls12381_v1(&message, &vote.public_key, &vote.signature) {
            return Err(ConsensusError::InvalidSignature);
        }

        if vote.view < state.current_view {
            return Err(ConsensusError::StaleView {
                view: vote.view,
                current_view: state.current_view,
            });
        }

        if state.votes_seen.has_voted(&signer, vote.view) {
            return Err(ConsensusError::AlreadyVotedForView {
                signer,
                view: vote.view,
            });
        }
        if state.timeouts_seen.has_timed_out(&signer, vote.view) {
            return Err(ConsensusError::AlreadyTimedOutForView {
                signer,
                view: vote.view,
            });
        }

        trace!(view = vote.view, block_hash = %vote.block_hash, signer = %signer, "recorded vote");
        let payload = vote_signature_payload(vote.view, &vote.block_hash);
        state.votes_seen.record(payload, signer, vote);
        Ok(())
    }

    /// Ingest a validator's timeout.
    ///
    /// Mirrors [`process_validator_vote`](Self::process_validator_vote):
    /// well formed (including the embedded high QC), known signer, valid
    /// signature over the timeout payload, fresh view, and no prior vote or
    /// timeout from the signer for that view.
    pub fn process_validator_timeout(
        &self,
        timeout: TimeoutMessage,
    ) -> Result<(), ConsensusError> {
        let mut state = lock_state(&self.state);
        if state.status != EventLoopStatus::Running {
            return Err(ConsensusError::NotRunning);
        }
        if !is_properly_formed_timeout(&timeout) {
            return Err(ConsensusError::MalformedTimeout);
        }

        let signer = public_key_string(&timeout.public_key);
        let tip = state.tip.as_ref().ok_or(ConsensusError::NotInitialized)?;
        if tip.signer_index(&signer).is_none() {
            return Err(ConsensusError::UnknownValidator { signer });
        }

        let message = timeout_signing_message(timeout.view, timeout.high_qc.view);
        if !verify_bls12381_v1(&message, &timeout.public_key, &timeout.signature) {
            return Err(ConsensusError::InvalidSignature);
        }

        if timeout.view < state.current_view {
            return Err(ConsensusError::StaleView {
                view: timeout.view,
                current_view: state.current_view,
            });
        }

        if state.votes_seen.has_voted(&signer, timeout.view) {
            return Err(ConsensusError::AlreadyVotedForView {
                signer,
                view: timeout.view,
            });
        }
        if state.timeouts_seen.has_timed_out(&signer, timeout.view) {
            return Err(ConsensusError::AlreadyTimedOutForView {
                signer,
                view: timeout.view,
            });
        }

        trace!(
            view = timeout.view,
            high_qc_view = timeout.high_qc.view,
            signer = %signer,
            "recorded timeout"
        );
        state.timeouts_seen.record(signer, timeout);
        Ok(())
    }
}

impl Default for FastHotStuffEventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopState {
    /// Send an event to the consumer. A dropped receiver is not an error
    /// for the loop; the send result is only logged.
    fn emit(&self, event: FastHotStuffEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("event receiver dropped; discarding event");
        }
    }

    fn evict_stale_evidence(&mut self) {
        self.votes_seen.evict_stale(self.current_view);
        self.timeouts_seen.evict_stale(self.current_view);
    }

    /// The timeout duration under exponential back-off.
    ///
    /// The exponent is the number of views elapsed past the one the tip
    /// would naturally be followed by, i.e. the number of consecutive
    /// `advance_view` calls since the last accepted tip. Capped at
    /// [`MAX_TIMEOUT_BACKOFF_EXPONENT`]; saturates rather than overflows.
    fn timeout_backoff_duration(&self) -> Duration {
        let tip_view = self.tip.as_ref().map(|t| t.block.view).unwrap_or(0);
        let exponent = self
            .current_view
            .saturating_sub(tip_view + 1)
            .min(MAX_TIMEOUT_BACKOFF_EXPONENT as u64) as u32;
        self.timeout_base_duration.saturating_mul(1u32 << exponent)
    }

    /// Re-arm both timers for the current view.
    fn reset_scheduled_tasks(&mut self, weak: &Weak<Mutex<EventLoopState>>) {
        let armed_view = self.current_view;

        let construction_weak = weak.clone();
        self.next_block_construction_task.schedule(
            self.block_construction_interval,
            armed_view,
            move |view| on_block_construction_interval(construction_weak, view),
        );

        let timeout_weak = weak.clone();
        let timeout_duration = self.timeout_backoff_duration();
        self.next_timeout_task
            .schedule(timeout_duration, armed_view, move |view| {
                on_timeout_elapsed(timeout_weak, view)
            });
    }

    /// One QC construction attempt: a vote QC if any safe block has a vote
    /// super-majority, otherwise a timeout QC for the just-finished view.
    /// Emits at most one event.
    fn attempt_qc_construction(&self) {
        let Some(tip) = self.tip.as_ref() else {
            return;
        };

        if let Some(candidate) = try_construct_vote_qc(&self.safe_blocks, &self.votes_seen) {
            self.emit(FastHotStuffEvent::ConstructVoteQC {
                view: self.current_view,
                tip_block_hash: candidate.block_hash,
                tip_block_height: candidate.block_height,
                qc: candidate.qc,
            });
            return;
        }

        let Some(timed_out_view) = self.current_view.checked_sub(1) else {
            return;
        };
        if let Some(candidate) = try_construct_timeout_qc(
            tip,
            &self.safe_blocks,
            &self.timeouts_seen,
            timed_out_view,
        ) {
            self.emit(FastHotStuffEvent::ConstructTimeoutQC {
                view: self.current_view,
                tip_block_hash: candidate.block_hash,
                tip_block_height: candidate.block_height,
                aggregate_qc: candidate.aggregate_qc,
            });
        }
    }
}

/// Block-construction timer callback.
///
/// Attempts QC construction, then re-arms itself at the same interval so
/// attempts continue while the loop runs. Stale firings (loop stopped,
/// dropped, or moved to another view) are no-ops.
fn on_block_construction_interval(weak: Weak<Mutex<EventLoopState>>, armed_view: u64) {
    let Some(state_arc) = weak.upgrade() else {
        return;
    };
    let mut state = lock_state(&state_arc);
    if state.status != EventLoopStatus::Running || state.current_view != armed_view {
        trace!(armed_view, "skipping stale block construction firing");
        return;
    }

    state.attempt_qc_construction();

    let interval = state.block_construction_interval;
    let rearm_weak = Arc::downgrade(&state_arc);
    state
        .next_block_construction_task
        .schedule(interval, armed_view, move |view| {
            on_block_construction_interval(rearm_weak, view)
        });
}

/// Timeout timer callback.
///
/// Emits a [`FastHotStuffEvent::Timeout`] for the current view and stays
/// unscheduled; the consumer reacts by broadcasting its own timeout and
/// advancing the view, which re-arms the timer with a doubled duration.
fn on_timeout_elapsed(weak: Weak<Mutex<EventLoopState>>, armed_view: u64) {
    let Some(state_arc) = weak.upgrade() else {
        return;
    };
    let state = lock_state(&state_arc);
    if state.status != EventLoopStatus::Running || state.current_view != armed_view {
        trace!(armed_view, "skipping stale timeout firing");
        return;
    }
    let Some(tip) = state.tip.as_ref() else {
        return;
    };

    warn!(view = state.current_view, "view timed out");
    state.emit(FastHotStuffEvent::Timeout {
        view: state.current_view,
        tip_block_hash: tip.block.block_hash,
    });
}
