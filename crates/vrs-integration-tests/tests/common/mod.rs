//! Shared fixtures: an in-memory engine pinned to a fixed day, plus helpers
//! to seed accounts and vehicles.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use vrs_core::{FixedClock, OfficeId, Timestamp, UserId};
use vrs_engine::{
    AccountDirectory, BookingError, CapabilityContext, Collaborators, FleetManager,
    InMemoryAccountDirectory, InMemoryReservationStore, InMemoryVehicleDirectory, NewReservation,
    PendingPolicy, ReservationManager, SessionSigner, SignatureCheck, TokenResolver,
    VehicleDirectory,
};
use vrs_state::{Account, Reservation, ReservationDetails, Role, Vehicle, VehicleStatus};

pub const SECRET: &str = "integration-secret";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

/// `today() + offset` days.
pub fn day(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

pub struct Engine {
    pub manager: ReservationManager,
    pub fleet: FleetManager,
    pub vehicles: Arc<InMemoryVehicleDirectory>,
    pub accounts: Arc<InMemoryAccountDirectory>,
    pub store: Arc<InMemoryReservationStore>,
}

impl Engine {
    pub fn new(policy: PendingPolicy) -> Self {
        let vehicles = Arc::new(InMemoryVehicleDirectory::new());
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let store = Arc::new(InMemoryReservationStore::new());
        let clock = Arc::new(FixedClock::on_day(today()));
        let identity = Arc::new(TokenResolver::new(
            SignatureCheck::Verify(SessionSigner::new(SECRET)),
            vehicles.clone(),
            clock.clone(),
        ));
        let manager = ReservationManager::new(
            Collaborators {
                vehicles: vehicles.clone(),
                accounts: accounts.clone(),
                reservations: store.clone(),
                identity,
                clock: clock.clone(),
            },
            policy,
        );
        let fleet = FleetManager::new(vehicles.clone(), accounts.clone(), manager.locks(), clock);
        Self {
            manager,
            fleet,
            vehicles,
            accounts,
            store,
        }
    }

    pub fn account(&self, role: Role, office: Option<OfficeId>) -> Account {
        let account = Account::new(
            role,
            format!("{} user", role.as_str()),
            format!("{}@example.com", UserId::new()),
            office,
            Timestamp::now(),
        )
        .unwrap();
        self.accounts.put_account(account.clone()).unwrap();
        account
    }

    pub fn client(&self) -> CapabilityContext {
        CapabilityContext::client(self.account(Role::Client, None).id)
    }

    pub fn admin(&self) -> CapabilityContext {
        CapabilityContext::admin(self.account(Role::Admin, None).id)
    }

    /// A vehicle and the context of the agent managing it.
    pub fn vehicle(&self) -> (Vehicle, CapabilityContext) {
        let office = OfficeId::new();
        let agent = self.account(Role::Agent, Some(office));
        let vehicle = Vehicle::new(office, agent.id, "Skoda", "Octavia", 2025, 6500, Timestamp::now());
        self.vehicles.put_vehicle(vehicle.clone()).unwrap();
        let ctx = CapabilityContext::agent(agent.id, [vehicle.id]);
        (vehicle, ctx)
    }

    pub fn reserve(
        &self,
        ctx: &CapabilityContext,
        vehicle: &Vehicle,
        start: i64,
        end: i64,
    ) -> Result<Reservation, BookingError> {
        self.manager.create(
            ctx,
            NewReservation {
                vehicle_id: vehicle.id,
                start_date: day(start),
                end_date: day(end),
                details: ReservationDetails::default(),
            },
        )
    }

    pub fn free(&self, vehicle: &Vehicle, start: i64, end: i64) -> bool {
        let anyone = CapabilityContext::client(UserId::new());
        self.manager
            .check_availability(&anyone, vehicle.id, day(start), day(end))
            .unwrap()
    }

    pub fn vehicle_status(&self, vehicle: &Vehicle) -> VehicleStatus {
        self.vehicles.get_vehicle(vehicle.id).unwrap().unwrap().status
    }

    pub fn stored(&self, reservation: &Reservation) -> Reservation {
        self.manager
            .get(&CapabilityContext::admin(UserId::new()), reservation.id)
            .unwrap()
    }
}
