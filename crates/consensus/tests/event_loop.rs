//! End-to-end event loop scenarios over the public API.
//!
//! Each test drives a real committee with seeded BLS keys through init,
//! start, evidence ingestion, and view changes, and asserts on the events
//! that come out of the channel.

mod fixtures;

use fasthotstuff_consensus::{
    is_valid_super_majority_aggregate_qc, is_valid_super_majority_qc, FastHotStuffEvent,
    FastHotStuffEventLoop,
};
use fasthotstuff_types::{vote_signing_message, Hash};
use fixtures::*;
use std::time::{Duration, Instant};

const MICROSECOND: Duration = Duration::from_micros(1);
const ONE_HOUR: Duration = Duration::from_secs(3600);

/// Receive events until `matches` accepts one, or fail after the deadline.
fn recv_matching(
    event_loop: &FastHotStuffEventLoop,
    deadline: Duration,
    matches: impl Fn(&FastHotStuffEvent) -> bool,
) -> FastHotStuffEvent {
    let start = Instant::now();
    loop {
        let remaining = deadline
            .checked_sub(start.elapsed())
            .expect("no matching event before deadline");
        let event = event_loop
            .events()
            .recv_timeout(remaining)
            .expect("no matching event before deadline");
        if matches(&event) {
            return event;
        }
    }
}

/// Assert no event satisfying `matches` arrives within `window`.
fn assert_no_matching(
    event_loop: &FastHotStuffEventLoop,
    window: Duration,
    matches: impl Fn(&FastHotStuffEvent) -> bool,
) {
    let start = Instant::now();
    while let Some(remaining) = window.checked_sub(start.elapsed()) {
        match event_loop.events().recv_timeout(remaining) {
            Ok(event) => assert!(!matches(&event), "unexpected event: {event:?}"),
            Err(_) => return,
        }
    }
}

#[test]
fn vote_qc_emitted_once_majority_stake_votes() {
    let keys = keypairs(2);
    let set = validator_set(&keys, &[70, 30]);

    // A one-block chain: the next proposal (B1) extends the tip (B0).
    let genesis_qc = signed_qc(1, Hash::from_bytes(b"genesis"), &keys, &[0, 1]);
    let b0 = block_with_validators(b"block-0", 1, 1, genesis_qc, &set);
    let qc_b0 = signed_qc(1, b0.block.block_hash, &keys, &[0, 1]);
    let b1 = block_with_validators(b"block-1", 2, 2, qc_b0, &set);

    let event_loop = FastHotStuffEventLoop::new();
    event_loop
        .init(MICROSECOND, ONE_HOUR, b0.clone(), vec![b0, b1.clone()])
        .unwrap();
    event_loop.start().unwrap();

    // Validator 0 holds 70 of 100 stake; its vote alone is a super-majority.
    event_loop
        .process_validator_vote(vote_message(&keys, 0, 2, b1.block.block_hash))
        .unwrap();

    // Accept B1 as the new tip; the vote for it stays pooled (previous view)
    // and the loop keeps signaling QC construction for the new view.
    event_loop
        .process_tip_block(b1.clone(), vec![b1.clone()])
        .unwrap();

    let event = recv_matching(&event_loop, Duration::from_secs(1), |event| {
        matches!(event, FastHotStuffEvent::ConstructVoteQC { view: 3, .. })
    });
    event_loop.stop();

    let FastHotStuffEvent::ConstructVoteQC {
        view,
        tip_block_hash,
        tip_block_height,
        qc,
    } = event
    else {
        unreachable!();
    };

    assert_eq!(view, 3);
    assert_eq!(tip_block_hash, b1.block.block_hash);
    assert_eq!(tip_block_height, b1.block.height);
    assert_eq!(qc.view, 2);
    assert_eq!(qc.block_hash, b1.block.block_hash);

    // Validator 0 is the only signer, and the aggregate of its single
    // partial is the partial itself.
    let signer_indices: Vec<usize> = qc.aggregated_signature.signers.set_indices().collect();
    assert_eq!(signer_indices, vec![0]);
    assert_eq!(
        qc.aggregated_signature.signature,
        keys[0].sign_v1(&vote_signing_message(2, &b1.block.block_hash))
    );

    // The emitted certificate holds up under the committee it names.
    assert!(is_valid_super_majority_qc(&qc, &b1.validator_set));
}

#[test]
fn no_vote_qc_without_majority_stake() {
    let keys = keypairs(2);
    let set = validator_set(&keys, &[70, 30]);

    let genesis_qc = signed_qc(1, Hash::from_bytes(b"genesis"), &keys, &[0, 1]);
    let b0 = block_with_validators(b"block-0", 1, 1, genesis_qc, &set);
    let qc_b0 = signed_qc(1, b0.block.block_hash, &keys, &[0, 1]);
    let b1 = block_with_validators(b"block-1", 2, 2, qc_b0, &set);

    let event_loop = FastHotStuffEventLoop::new();
    event_loop
        .init(MICROSECOND, ONE_HOUR, b0.clone(), vec![b0, b1.clone()])
        .unwrap();
    event_loop.start().unwrap();

    // Validator 1 holds only 30 of 100 stake.
    event_loop
        .process_validator_vote(vote_message(&keys, 1, 2, b1.block.block_hash))
        .unwrap();

    assert_no_matching(&event_loop, Duration::from_millis(150), |event| {
        matches!(
            event,
            FastHotStuffEvent::ConstructVoteQC { .. } | FastHotStuffEvent::ConstructTimeoutQC { .. }
        )
    });

    event_loop.stop();
}

#[test]
fn timeout_qc_emitted_once_majority_stake_times_out() {
    let keys = keypairs(2);
    let set = validator_set(&keys, &[70, 30]);

    // B1 at view 2 extends genesis; B2 at view 3 carries the QC for B1.
    let genesis_qc = signed_qc(1, Hash::from_bytes(b"genesis"), &keys, &[0, 1]);
    let b1 = block_with_validators(b"block-1", 2, 1, genesis_qc, &set);
    let qc_b1 = signed_qc(2, b1.block.block_hash, &keys, &[0, 1]);
    let b2 = block_with_validators(b"block-2", 3, 2, qc_b1, &set);

    let event_loop = FastHotStuffEventLoop::new();
    event_loop
        .init(
            MICROSECOND,
            ONE_HOUR,
            b2.clone(),
            vec![b1.clone(), b2.clone()],
        )
        .unwrap();
    event_loop.start().unwrap();
    assert_eq!(event_loop.current_view(), 4);

    // Both validators give up on view 4. Validator 0 reports the QC inside
    // B1 (view 1); validator 1 reports the newer QC inside B2 (view 2).
    event_loop
        .process_validator_timeout(timeout_message(&keys, 0, 4, b1.block.qc.clone()))
        .unwrap();
    event_loop
        .process_validator_timeout(timeout_message(&keys, 1, 4, b2.block.qc.clone()))
        .unwrap();

    // The view change makes view 4 the just-finished view.
    assert_eq!(event_loop.advance_view().unwrap(), 5);

    let event = recv_matching(&event_loop, Duration::from_secs(1), |event| {
        matches!(event, FastHotStuffEvent::ConstructTimeoutQC { .. })
    });
    event_loop.stop();

    let FastHotStuffEvent::ConstructTimeoutQC {
        view,
        tip_block_hash,
        tip_block_height,
        aggregate_qc,
    } = event
    else {
        unreachable!();
    };

    // The winning high QC is validator 1's, which certifies B1, so the next
    // proposal extends B1.
    assert_eq!(view, 5);
    assert_eq!(tip_block_hash, b1.block.block_hash);
    assert_eq!(tip_block_height, b1.block.height);
    assert_eq!(aggregate_qc.view, 4);
    assert_eq!(aggregate_qc.high_qc, b2.block.qc);
    assert_eq!(aggregate_qc.high_qc_views, vec![1, 2]);

    let signer_indices: Vec<usize> = aggregate_qc
        .aggregated_signature
        .signers
        .set_indices()
        .collect();
    assert_eq!(signer_indices, vec![0, 1]);

    // The emitted certificate holds up under the tip committee.
    assert!(is_valid_super_majority_aggregate_qc(&aggregate_qc, &set));
}

#[test]
fn tip_rotation_emits_vote_signal_and_keeps_constructing() {
    let keys = keypairs(2);
    let set = validator_set(&keys, &[70, 30]);

    let genesis_qc = signed_qc(1, Hash::from_bytes(b"genesis"), &keys, &[0, 1]);
    let b0 = block_with_validators(b"block-0", 1, 1, genesis_qc, &set);
    let qc_b0 = signed_qc(1, b0.block.block_hash, &keys, &[0, 1]);
    let b1 = block_with_validators(b"block-1", 2, 2, qc_b0, &set);

    let event_loop = FastHotStuffEventLoop::new();
    event_loop
        .init(ONE_HOUR, ONE_HOUR, b0.clone(), vec![b0.clone(), b1.clone()])
        .unwrap();
    event_loop.start().unwrap();

    event_loop
        .process_tip_block(b1.clone(), vec![b1.clone()])
        .unwrap();

    // The first thing out of the channel is the vote signal for B1.
    let event = event_loop
        .events()
        .recv_timeout(Duration::from_secs(1))
        .unwrap();
    assert_eq!(
        event,
        FastHotStuffEvent::Vote {
            view: 2,
            tip_block_hash: b1.block.block_hash,
            tip_block_height: 2,
        }
    );

    event_loop.stop();
}
