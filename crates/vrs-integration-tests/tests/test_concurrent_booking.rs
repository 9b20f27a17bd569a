//! # Concurrent Booking Races
//!
//! Many threads contend for one vehicle. Per-vehicle serialization must
//! leave exactly one winner and never two overlapping accepted
//! reservations.

mod common;

use std::sync::Barrier;
use std::thread;

use common::Engine;
use vrs_engine::{BookingError, PendingPolicy};
use vrs_state::{Decision, ReservationStatus, VehicleStatus};

const CONTENDERS: usize = 8;

#[test]
fn overlapping_creates_admit_one_under_block_policy() {
    let engine = Engine::new(PendingPolicy::Block);
    let (vehicle, _) = engine.vehicle();
    let clients: Vec<_> = (0..CONTENDERS).map(|_| engine.client()).collect();
    let barrier = Barrier::new(CONTENDERS);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = clients
            .iter()
            .enumerate()
            .map(|(i, client)| {
                let (engine, vehicle, barrier) = (&engine, &vehicle, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    // Every window overlaps [10, 14).
                    engine.reserve(client, vehicle, 10 + (i as i64 % 3), 14 + (i as i64 % 2))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, BookingError::Conflict(_)), "got {err:?}");
        }
    }
    assert_eq!(engine.store.len(), 1);
}

#[test]
fn competing_acceptances_admit_one() {
    let engine = Engine::new(PendingPolicy::Provisional);
    let (vehicle, agent) = engine.vehicle();
    let pending: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let client = engine.client();
            engine
                .reserve(&client, &vehicle, 20 + i as i64, 30 + i as i64)
                .unwrap()
        })
        .collect();
    let barrier = Barrier::new(CONTENDERS);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = pending
            .iter()
            .map(|r| {
                let (engine, agent, barrier) = (&engine, &agent, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    engine.manager.decide(agent, r.id, Decision::Accepted, None)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, BookingError::Conflict(_)), "got {err:?}");
        }
    }

    let stored: Vec<_> = pending.iter().map(|r| engine.stored(r)).collect();
    let accepted = stored
        .iter()
        .filter(|r| r.status == ReservationStatus::Accepted)
        .count();
    assert_eq!(accepted, 1);
    assert!(stored
        .iter()
        .all(|r| matches!(r.status, ReservationStatus::Accepted | ReservationStatus::Pending)));
    assert_eq!(engine.vehicle_status(&vehicle), VehicleStatus::Reserved);
}

#[test]
fn accept_and_decline_race_has_one_outcome() {
    for _ in 0..16 {
        let engine = Engine::new(PendingPolicy::Block);
        let (vehicle, agent) = engine.vehicle();
        let client = engine.client();
        let r = engine.reserve(&client, &vehicle, 5, 7).unwrap();
        let barrier = Barrier::new(2);

        let (accept, decline) = thread::scope(|s| {
            let accept = s.spawn(|| {
                barrier.wait();
                engine.manager.decide(&agent, r.id, Decision::Accepted, None)
            });
            let decline = s.spawn(|| {
                barrier.wait();
                engine.manager.decide(&agent, r.id, Decision::Declined, None)
            });
            (accept.join().unwrap(), decline.join().unwrap())
        });

        assert!(accept.is_ok() != decline.is_ok(), "{accept:?} / {decline:?}");
        let loser = accept.as_ref().err().or(decline.as_ref().err());
        assert!(matches!(loser, Some(BookingError::FailedPrecondition(_))));

        let stored = engine.stored(&r);
        assert_eq!(stored.transition_log.len(), 1);
        let expected_vehicle = if stored.status == ReservationStatus::Accepted {
            VehicleStatus::Reserved
        } else {
            VehicleStatus::Available
        };
        assert_eq!(engine.vehicle_status(&vehicle), expected_vehicle);
    }
}

#[test]
fn cancel_and_accept_race_has_one_outcome() {
    for _ in 0..16 {
        let engine = Engine::new(PendingPolicy::Block);
        let (vehicle, agent) = engine.vehicle();
        let client = engine.client();
        let r = engine.reserve(&client, &vehicle, 5, 7).unwrap();
        let barrier = Barrier::new(2);

        let (accept, cancel) = thread::scope(|s| {
            let accept = s.spawn(|| {
                barrier.wait();
                engine.manager.decide(&agent, r.id, Decision::Accepted, None)
            });
            let cancel = s.spawn(|| {
                barrier.wait();
                engine.manager.cancel(&client, r.id)
            });
            (accept.join().unwrap(), cancel.join().unwrap())
        });

        assert!(accept.is_ok() != cancel.is_ok(), "{accept:?} / {cancel:?}");
        let stored = engine.stored(&r);
        assert!(stored.is_terminal());
        assert_eq!(stored.transition_log.len(), 1);
    }
}
