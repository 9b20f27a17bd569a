//! # Property Tests for Booking Invariants
//!
//! Random operation sequences against a small fleet. After every step:
//!
//! - no two accepted reservations on one vehicle overlap;
//! - under the blocking policy, no two holding reservations overlap;
//! - a reservation that reached a terminal state never changes again;
//! - the transition log records exactly the status changes made.

mod common;

use std::collections::HashMap;

use proptest::prelude::*;

use common::{day, Engine};
use vrs_core::ReservationId;
use vrs_engine::{AmendRequest, CapabilityContext, PendingPolicy};
use vrs_state::{Decision, Reservation, ReservationStatus, Vehicle};

const CLIENTS: usize = 3;
const VEHICLES: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    Create { client: usize, vehicle: usize, start: i64, len: i64 },
    Accept(usize),
    Decline(usize),
    Cancel(usize),
    Amend { pick: usize, start: i64, len: i64 },
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..CLIENTS, 0..VEHICLES, 0..20i64, 1..6i64).prop_map(|(client, vehicle, start, len)| {
            Op::Create { client, vehicle, start, len }
        }),
        3 => (0..64usize).prop_map(Op::Accept),
        1 => (0..64usize).prop_map(Op::Decline),
        1 => (0..64usize).prop_map(Op::Cancel),
        2 => (0..64usize, 0..20i64, 1..6i64).prop_map(|(pick, start, len)| Op::Amend { pick, start, len }),
        1 => (0..VEHICLES).prop_map(Op::Release),
    ]
}

struct World {
    engine: Engine,
    clients: Vec<CapabilityContext>,
    vehicles: Vec<(Vehicle, CapabilityContext)>,
    created: Vec<Reservation>,
    terminal: HashMap<ReservationId, ReservationStatus>,
}

impl World {
    fn new(policy: PendingPolicy) -> Self {
        let engine = Engine::new(policy);
        let clients = (0..CLIENTS).map(|_| engine.client()).collect();
        let vehicles = (0..VEHICLES).map(|_| engine.vehicle()).collect();
        Self {
            engine,
            clients,
            vehicles,
            created: Vec::new(),
            terminal: HashMap::new(),
        }
    }

    fn pick(&self, index: usize) -> Option<Reservation> {
        if self.created.is_empty() {
            return None;
        }
        Some(self.created[index % self.created.len()].clone())
    }

    fn client_of(&self, r: &Reservation) -> CapabilityContext {
        self.clients
            .iter()
            .find(|c| c.user_id == r.client_id)
            .cloned()
            .unwrap()
    }

    fn agent_of(&self, r: &Reservation) -> CapabilityContext {
        self.vehicles
            .iter()
            .find(|(v, _)| v.id == r.vehicle_id)
            .map(|(_, ctx)| ctx.clone())
            .unwrap()
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Create { client, vehicle, start, len } => {
                let (v, _) = &self.vehicles[vehicle];
                if let Ok(r) = self.engine.reserve(&self.clients[client], v, start, start + len) {
                    self.created.push(r);
                }
            }
            Op::Accept(i) => {
                if let Some(r) = self.pick(i) {
                    let _ = self.engine.manager.decide(&self.agent_of(&r), r.id, Decision::Accepted, None);
                }
            }
            Op::Decline(i) => {
                if let Some(r) = self.pick(i) {
                    let _ = self.engine.manager.decide(&self.agent_of(&r), r.id, Decision::Declined, None);
                }
            }
            Op::Cancel(i) => {
                if let Some(r) = self.pick(i) {
                    let _ = self.engine.manager.cancel(&self.client_of(&r), r.id);
                }
            }
            Op::Amend { pick, start, len } => {
                if let Some(r) = self.pick(pick) {
                    let request = AmendRequest {
                        start_date: Some(day(start)),
                        end_date: Some(day(start + len)),
                        ..AmendRequest::default()
                    };
                    let _ = self.engine.manager.amend(&self.client_of(&r), r.id, request);
                }
            }
            Op::Release(vehicle) => {
                let (v, agent) = &self.vehicles[vehicle];
                let _ = self.engine.manager.release_vehicle(agent, v.id);
            }
        }
    }

    fn check(&mut self, policy: PendingPolicy) -> Result<(), TestCaseError> {
        let current: Vec<Reservation> = self
            .created
            .iter()
            .map(|r| self.engine.stored(r))
            .collect();

        for r in &current {
            if let Some(status) = self.terminal.get(&r.id) {
                prop_assert_eq!(*status, r.status, "terminal reservation {} changed", r.id);
            } else if r.is_terminal() {
                self.terminal.insert(r.id, r.status);
            }
            let expected_log = usize::from(r.status != ReservationStatus::Pending);
            prop_assert_eq!(r.transition_log.len(), expected_log);
        }

        for (i, a) in current.iter().enumerate() {
            for b in &current[i + 1..] {
                if a.vehicle_id != b.vehicle_id || !a.period.overlaps(&b.period) {
                    continue;
                }
                prop_assert!(
                    !(a.status == ReservationStatus::Accepted && b.status == ReservationStatus::Accepted),
                    "accepted {} and {} overlap",
                    a.id,
                    b.id
                );
                if policy == PendingPolicy::Block {
                    prop_assert!(
                        !(a.status.holds_interval() && b.status.holds_interval()),
                        "holding {} and {} overlap",
                        a.id,
                        b.id
                    );
                }
            }
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn random_histories_preserve_invariants(
        provisional in any::<bool>(),
        ops in prop::collection::vec(op(), 1..48),
    ) {
        let policy = if provisional { PendingPolicy::Provisional } else { PendingPolicy::Block };
        let mut world = World::new(policy);
        for op in ops {
            world.apply(op);
            world.check(policy)?;
        }
    }
}
