//! # Fleet and Account Administration
//!
//! The directory-owned side of vehicles and accounts: registration,
//! metadata updates, and the non-reservation status changes
//! (`AVAILABLE` ↔ `MAINTENANCE` / `OUT_OF_SERVICE`). `RESERVED` is never
//! set here.
//!
//! Vehicle updates take the same per-vehicle lock as the reservation
//! manager, so a status change cannot slip between an acceptance's
//! availability check and its write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vrs_core::{Clock, OfficeId, UserId, VehicleId};
use vrs_state::{Account, Role, Vehicle, VehicleStatus, VehicleUpdate};

use crate::capability::{can_manage_vehicle, CapabilityContext};
use crate::directory::{AccountDirectory, VehicleDirectory};
use crate::error::BookingError;
use crate::lifecycle::VehicleChange;
use crate::lock::VehicleLocks;

/// Request to register a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVehicle {
    /// Owning office.
    pub office_id: OfficeId,
    /// Managing agent. Defaults to the caller when an agent registers.
    pub agent_id: Option<UserId>,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Daily rate in minor currency units.
    pub price_per_day: i64,
}

/// Request to register an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Role the account acts under.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Office, for agents.
    pub office_id: Option<OfficeId>,
}

/// Vehicle and account administration.
#[derive(Debug, Clone)]
pub struct FleetManager {
    vehicles: Arc<dyn VehicleDirectory>,
    accounts: Arc<dyn AccountDirectory>,
    locks: Arc<VehicleLocks>,
    clock: Arc<dyn Clock>,
}

impl FleetManager {
    /// Build the manager. Pass the reservation manager's lock table.
    pub fn new(
        vehicles: Arc<dyn VehicleDirectory>,
        accounts: Arc<dyn AccountDirectory>,
        locks: Arc<VehicleLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            vehicles,
            accounts,
            locks,
            clock,
        }
    }

    // -- Vehicles -------------------------------------------------------------

    /// Register a vehicle in the `AVAILABLE` state.
    ///
    /// Agents register for their own office and become the managing agent.
    /// Admins must name an existing agent account.
    pub fn register_vehicle(
        &self,
        ctx: &CapabilityContext,
        request: NewVehicle,
    ) -> Result<Vehicle, BookingError> {
        if request.brand.trim().is_empty() || request.model.trim().is_empty() {
            return Err(BookingError::InvalidArgument(
                "brand and model must not be empty".into(),
            ));
        }
        if request.price_per_day < 0 {
            return Err(BookingError::InvalidArgument(
                "price_per_day must not be negative".into(),
            ));
        }

        let agent_id = match ctx.role {
            Role::Client => {
                return Err(BookingError::Forbidden(
                    "clients cannot register vehicles".into(),
                ))
            }
            Role::Agent => {
                let agent_id = request.agent_id.unwrap_or(ctx.user_id);
                if agent_id != ctx.user_id {
                    return Err(BookingError::Forbidden(
                        "agents register vehicles for themselves only".into(),
                    ));
                }
                let account = self.account(ctx.user_id)?;
                if account.office_id != Some(request.office_id) {
                    return Err(BookingError::Forbidden(format!(
                        "agent {} does not work for office {}",
                        ctx.user_id, request.office_id
                    )));
                }
                agent_id
            }
            Role::Admin => {
                let agent_id = request.agent_id.ok_or_else(|| {
                    BookingError::InvalidArgument("agent_id is required".into())
                })?;
                let account = self.account(agent_id)?;
                if account.role != Role::Agent {
                    return Err(BookingError::InvalidArgument(format!(
                        "account {agent_id} is not an agent"
                    )));
                }
                agent_id
            }
        };

        let mut vehicle = Vehicle::new(
            request.office_id,
            agent_id,
            request.brand,
            request.model,
            request.year,
            request.price_per_day,
            self.clock.now(),
        );
        vehicle.description = request.description;
        self.vehicles.put_vehicle(vehicle.clone())?;
        tracing::info!(
            vehicle_id = %vehicle.id,
            office_id = %vehicle.office_id,
            agent_id = %vehicle.agent_id,
            actor = %ctx.user_id,
            "vehicle registered"
        );
        Ok(vehicle)
    }

    /// Update a vehicle's metadata or directory-owned status.
    ///
    /// Setting `RESERVED` is rejected, and a reserved vehicle's status can
    /// only change through release.
    pub fn update_vehicle(
        &self,
        ctx: &CapabilityContext,
        id: VehicleId,
        update: VehicleUpdate,
    ) -> Result<Vehicle, BookingError> {
        self.update_vehicle_tracked(ctx, id, update)
            .map(|change| change.after)
    }

    /// [`update_vehicle`](Self::update_vehicle), returning the change so a
    /// failed write-through can be undone with
    /// [`ReservationManager::revert_vehicle`](crate::ReservationManager::revert_vehicle).
    pub fn update_vehicle_tracked(
        &self,
        ctx: &CapabilityContext,
        id: VehicleId,
        update: VehicleUpdate,
    ) -> Result<VehicleChange, BookingError> {
        let vehicle = self.vehicle(id)?;
        if !can_manage_vehicle(ctx, &vehicle) {
            return Err(BookingError::Forbidden(format!(
                "caller does not manage vehicle {id}"
            )));
        }
        if let Some(status) = update.status {
            if !status.is_directory_settable() {
                return Err(BookingError::InvalidArgument(format!(
                    "status {status} is set only by reservation acceptance"
                )));
            }
        }
        if update.brand.as_deref().is_some_and(|b| b.trim().is_empty())
            || update.model.as_deref().is_some_and(|m| m.trim().is_empty())
        {
            return Err(BookingError::InvalidArgument(
                "brand and model must not be empty".into(),
            ));
        }
        if update.price_per_day.is_some_and(|p| p < 0) {
            return Err(BookingError::InvalidArgument(
                "price_per_day must not be negative".into(),
            ));
        }

        self.locks.with_lock(id, || {
            let before = self.vehicle(id)?;
            if let Some(status) = update.status {
                if before.status == VehicleStatus::Reserved && status != VehicleStatus::Reserved {
                    return Err(BookingError::FailedPrecondition(format!(
                        "vehicle {id} is RESERVED; release it first"
                    )));
                }
            }
            let mut after = before.clone();
            after.apply(update, self.clock.now());
            self.vehicles.put_vehicle(after.clone())?;
            tracing::info!(
                vehicle_id = %id,
                from = %before.status,
                to = %after.status,
                actor = %ctx.user_id,
                "vehicle updated"
            );
            Ok(VehicleChange { before, after })
        })
    }

    /// Undo a registration whose write-through failed. The vehicle is
    /// removed only while it is still exactly as registered.
    pub fn revert_vehicle_registration(&self, vehicle: &Vehicle) -> Result<(), BookingError> {
        self.locks.with_lock(vehicle.id, || {
            let current = self.vehicle(vehicle.id)?;
            if current != *vehicle {
                return Err(BookingError::FailedPrecondition(format!(
                    "vehicle {} changed since registration",
                    vehicle.id
                )));
            }
            self.vehicles.remove_vehicle(vehicle.id)?;
            tracing::warn!(vehicle_id = %vehicle.id, "vehicle registration reverted");
            Ok(())
        })
    }

    /// Fetch one vehicle.
    pub fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, BookingError> {
        self.vehicle(id)
    }

    /// List vehicles, optionally restricted to one office.
    pub fn list_vehicles(&self, office_id: Option<OfficeId>) -> Result<Vec<Vehicle>, BookingError> {
        match office_id {
            Some(office) => self.vehicles.list_by_office(office),
            None => self.vehicles.list_vehicles(),
        }
    }

    // -- Accounts -------------------------------------------------------------

    /// Register an account. Admins only.
    pub fn register_account(
        &self,
        ctx: &CapabilityContext,
        request: NewAccount,
    ) -> Result<Account, BookingError> {
        ctx.require_admin()?;
        if request.role == Role::Agent && request.office_id.is_none() {
            return Err(BookingError::InvalidArgument(
                "agents must belong to an office".into(),
            ));
        }
        let account = Account::new(
            request.role,
            request.name,
            request.email,
            request.office_id,
            self.clock.now(),
        )?;
        self.accounts.put_account(account.clone())?;
        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            actor = %ctx.user_id,
            "account registered"
        );
        Ok(account)
    }

    /// Undo an account registration whose write-through failed.
    pub fn revert_account_registration(&self, account: &Account) -> Result<(), BookingError> {
        if self.accounts.remove_account(account.id)?.is_none() {
            return Err(BookingError::not_found("account", account.id));
        }
        tracing::warn!(account_id = %account.id, "account registration reverted");
        Ok(())
    }

    /// Fetch one account. The account holder or an admin.
    pub fn get_account(&self, ctx: &CapabilityContext, id: UserId) -> Result<Account, BookingError> {
        if ctx.user_id != id && !ctx.is_admin() {
            return Err(BookingError::Forbidden(format!(
                "caller may not view account {id}"
            )));
        }
        self.account(id)
    }

    /// Every account. Admins only.
    pub fn list_accounts(&self, ctx: &CapabilityContext) -> Result<Vec<Account>, BookingError> {
        ctx.require_admin()?;
        self.accounts.list_accounts()
    }

    fn vehicle(&self, id: VehicleId) -> Result<Vehicle, BookingError> {
        self.vehicles
            .get_vehicle(id)?
            .ok_or_else(|| BookingError::not_found("vehicle", id))
    }

    fn account(&self, id: UserId) -> Result<Account, BookingError> {
        self.accounts
            .get_account(id)?
            .ok_or_else(|| BookingError::not_found("account", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryAccountDirectory, InMemoryVehicleDirectory};
    use vrs_core::SystemClock;

    struct Fixture {
        fleet: FleetManager,
        admin: CapabilityContext,
        office: OfficeId,
    }

    fn fixture() -> Fixture {
        let fleet = FleetManager::new(
            Arc::new(InMemoryVehicleDirectory::new()),
            Arc::new(InMemoryAccountDirectory::new()),
            Arc::new(VehicleLocks::new()),
            Arc::new(SystemClock),
        );
        Fixture {
            fleet,
            admin: CapabilityContext::admin(UserId::new()),
            office: OfficeId::new(),
        }
    }

    fn new_vehicle(office: OfficeId, agent: Option<UserId>) -> NewVehicle {
        NewVehicle {
            office_id: office,
            agent_id: agent,
            brand: "Ford".into(),
            model: "Focus".into(),
            year: 2022,
            description: String::new(),
            price_per_day: 3900,
        }
    }

    fn register_agent(f: &Fixture) -> CapabilityContext {
        let account = f
            .fleet
            .register_account(
                &f.admin,
                NewAccount {
                    role: Role::Agent,
                    name: "Agent".into(),
                    email: "agent@example.com".into(),
                    office_id: Some(f.office),
                },
            )
            .unwrap();
        CapabilityContext::agent(account.id, [])
    }

    #[test]
    fn agent_registers_for_own_office() {
        let f = fixture();
        let agent = register_agent(&f);
        let v = f
            .fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        assert_eq!(v.agent_id, agent.user_id);
        assert_eq!(v.status, VehicleStatus::Available);

        let err = f
            .fleet
            .register_vehicle(&agent, new_vehicle(OfficeId::new(), None))
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    #[test]
    fn admin_must_name_an_agent() {
        let f = fixture();
        let err = f
            .fleet
            .register_vehicle(&f.admin, new_vehicle(f.office, None))
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidArgument(_)));
        let err = f
            .fleet
            .register_vehicle(&f.admin, new_vehicle(f.office, Some(UserId::new())))
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
        let agent = register_agent(&f);
        assert!(f
            .fleet
            .register_vehicle(&f.admin, new_vehicle(f.office, Some(agent.user_id)))
            .is_ok());
    }

    #[test]
    fn clients_cannot_register() {
        let f = fixture();
        let err = f
            .fleet
            .register_vehicle(&CapabilityContext::client(UserId::new()), new_vehicle(f.office, None))
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    #[test]
    fn reserved_cannot_be_set_directly() {
        let f = fixture();
        let agent = register_agent(&f);
        let v = f
            .fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        let owner = CapabilityContext::agent(agent.user_id, [v.id]);
        let err = f
            .fleet
            .update_vehicle(
                &owner,
                v.id,
                VehicleUpdate {
                    status: Some(VehicleStatus::Reserved),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidArgument(_)));

        let updated = f
            .fleet
            .update_vehicle(
                &owner,
                v.id,
                VehicleUpdate {
                    status: Some(VehicleStatus::Maintenance),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Maintenance);
    }

    #[test]
    fn update_requires_ownership() {
        let f = fixture();
        let agent = register_agent(&f);
        let v = f
            .fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        let err = f
            .fleet
            .update_vehicle(
                &CapabilityContext::agent(UserId::new(), []),
                v.id,
                VehicleUpdate::default(),
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    #[test]
    fn registrations_can_be_reverted_while_unchanged() {
        let f = fixture();
        let agent = register_agent(&f);
        let v = f
            .fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        f.fleet.revert_vehicle_registration(&v).unwrap();
        assert!(matches!(
            f.fleet.get_vehicle(v.id).unwrap_err(),
            BookingError::NotFound { .. }
        ));

        let v = f
            .fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        let owner = CapabilityContext::agent(agent.user_id, [v.id]);
        let change = f
            .fleet
            .update_vehicle_tracked(
                &owner,
                v.id,
                VehicleUpdate {
                    price_per_day: Some(4100),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(change.before, v);
        assert_eq!(change.after.price_per_day, 4100);
        assert!(matches!(
            f.fleet.revert_vehicle_registration(&v).unwrap_err(),
            BookingError::FailedPrecondition(_)
        ));

        let account = f.fleet.get_account(&f.admin, agent.user_id).unwrap();
        f.fleet.revert_account_registration(&account).unwrap();
        assert!(f.fleet.list_accounts(&f.admin).unwrap().is_empty());
    }

    #[test]
    fn list_filters_by_office() {
        let f = fixture();
        let agent = register_agent(&f);
        f.fleet
            .register_vehicle(&agent, new_vehicle(f.office, None))
            .unwrap();
        assert_eq!(f.fleet.list_vehicles(Some(f.office)).unwrap().len(), 1);
        assert_eq!(f.fleet.list_vehicles(Some(OfficeId::new())).unwrap().len(), 0);
        assert_eq!(f.fleet.list_vehicles(None).unwrap().len(), 1);
    }

    #[test]
    fn account_access() {
        let f = fixture();
        let agent = register_agent(&f);
        assert!(f.fleet.get_account(&agent, agent.user_id).is_ok());
        assert!(matches!(
            f.fleet
                .get_account(&CapabilityContext::client(UserId::new()), agent.user_id)
                .unwrap_err(),
            BookingError::Forbidden(_)
        ));
        assert!(matches!(
            f.fleet.list_accounts(&agent).unwrap_err(),
            BookingError::Forbidden(_)
        ));
        assert_eq!(f.fleet.list_accounts(&f.admin).unwrap().len(), 1);
    }

    #[test]
    fn agent_account_requires_office() {
        let f = fixture();
        let err = f
            .fleet
            .register_account(
                &f.admin,
                NewAccount {
                    role: Role::Agent,
                    name: "A".into(),
                    email: "a@example.com".into(),
                    office_id: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidArgument(_)));
    }
}
