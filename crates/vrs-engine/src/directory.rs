//! # Directories
//!
//! Record-store collaborators the engine reads through: vehicles and
//! accounts. Both are plain CRUD; the only rule enforced here is that a
//! status change addresses an existing vehicle.

use vrs_core::{OfficeId, Timestamp, UserId, VehicleId};
use vrs_state::{Account, Vehicle, VehicleStatus};

use crate::error::BookingError;
use crate::store::Store;

// -- Vehicle Directory --------------------------------------------------------

/// Read/write store of vehicles.
pub trait VehicleDirectory: Send + Sync + std::fmt::Debug {
    /// Fetch one vehicle.
    fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, BookingError>;

    /// Set a vehicle's status, returning the updated record.
    fn set_vehicle_status(
        &self,
        id: VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle, BookingError>;

    /// Insert or replace a vehicle.
    fn put_vehicle(&self, vehicle: Vehicle) -> Result<(), BookingError>;

    /// Delete a vehicle, returning it if it existed. Only used to undo a
    /// registration whose write-through failed.
    fn remove_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, BookingError>;

    /// Every vehicle.
    fn list_vehicles(&self) -> Result<Vec<Vehicle>, BookingError>;

    /// Vehicles managed by one agent.
    fn list_by_agent(&self, agent_id: UserId) -> Result<Vec<Vehicle>, BookingError> {
        Ok(self
            .list_vehicles()?
            .into_iter()
            .filter(|v| v.agent_id == agent_id)
            .collect())
    }

    /// Vehicles held by one office.
    fn list_by_office(&self, office_id: OfficeId) -> Result<Vec<Vehicle>, BookingError> {
        Ok(self
            .list_vehicles()?
            .into_iter()
            .filter(|v| v.office_id == office_id)
            .collect())
    }
}

/// [`VehicleDirectory`] backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryVehicleDirectory {
    vehicles: Store<VehicleId, Vehicle>,
}

impl InMemoryVehicleDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VehicleDirectory for InMemoryVehicleDirectory {
    fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, BookingError> {
        Ok(self.vehicles.get(&id))
    }

    fn set_vehicle_status(
        &self,
        id: VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle, BookingError> {
        self.vehicles
            .try_update(&id, |v| {
                v.status = status;
                v.updated_at = Timestamp::now();
                Ok(v.clone())
            })
            .unwrap_or_else(|| Err(BookingError::not_found("vehicle", id)))
    }

    fn put_vehicle(&self, vehicle: Vehicle) -> Result<(), BookingError> {
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    fn remove_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, BookingError> {
        Ok(self.vehicles.remove(&id))
    }

    fn list_vehicles(&self) -> Result<Vec<Vehicle>, BookingError> {
        let mut all = self.vehicles.list();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}

// -- Account Directory --------------------------------------------------------

/// Read/write store of accounts.
pub trait AccountDirectory: Send + Sync + std::fmt::Debug {
    /// Fetch one account.
    fn get_account(&self, id: UserId) -> Result<Option<Account>, BookingError>;

    /// Insert or replace an account.
    fn put_account(&self, account: Account) -> Result<(), BookingError>;

    /// Delete an account, returning it if it existed. Only used to undo a
    /// registration whose write-through failed.
    fn remove_account(&self, id: UserId) -> Result<Option<Account>, BookingError>;

    /// Every account.
    fn list_accounts(&self) -> Result<Vec<Account>, BookingError>;
}

/// [`AccountDirectory`] backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountDirectory {
    accounts: Store<UserId, Account>,
}

impl InMemoryAccountDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn get_account(&self, id: UserId) -> Result<Option<Account>, BookingError> {
        Ok(self.accounts.get(&id))
    }

    fn put_account(&self, account: Account) -> Result<(), BookingError> {
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn remove_account(&self, id: UserId) -> Result<Option<Account>, BookingError> {
        Ok(self.accounts.remove(&id))
    }

    fn list_accounts(&self) -> Result<Vec<Account>, BookingError> {
        let mut all = self.accounts.list();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(agent: UserId, office: OfficeId) -> Vehicle {
        Vehicle::new(office, agent, "Renault", "Clio", 2022, 2800, Timestamp::now())
    }

    #[test]
    fn set_status_on_missing_vehicle_is_not_found() {
        let dir = InMemoryVehicleDirectory::new();
        let err = dir
            .set_vehicle_status(VehicleId::new(), VehicleStatus::Reserved)
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { kind: "vehicle", .. }));
    }

    #[test]
    fn set_status_returns_updated_record() {
        let dir = InMemoryVehicleDirectory::new();
        let v = vehicle(UserId::new(), OfficeId::new());
        dir.put_vehicle(v.clone()).unwrap();
        let updated = dir
            .set_vehicle_status(v.id, VehicleStatus::Reserved)
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Reserved);
        assert_eq!(
            dir.get_vehicle(v.id).unwrap().unwrap().status,
            VehicleStatus::Reserved
        );
    }

    #[test]
    fn list_by_agent_and_office() {
        let dir = InMemoryVehicleDirectory::new();
        let agent = UserId::new();
        let office = OfficeId::new();
        dir.put_vehicle(vehicle(agent, office)).unwrap();
        dir.put_vehicle(vehicle(agent, OfficeId::new())).unwrap();
        dir.put_vehicle(vehicle(UserId::new(), office)).unwrap();
        assert_eq!(dir.list_by_agent(agent).unwrap().len(), 2);
        assert_eq!(dir.list_by_office(office).unwrap().len(), 2);
        assert_eq!(dir.list_vehicles().unwrap().len(), 3);
    }

    #[test]
    fn accounts_roundtrip() {
        let dir = InMemoryAccountDirectory::new();
        let account = Account::new(
            vrs_state::Role::Client,
            "Dana",
            "dana@example.com",
            None,
            Timestamp::now(),
        )
        .unwrap();
        dir.put_account(account.clone()).unwrap();
        assert_eq!(dir.get_account(account.id).unwrap(), Some(account.clone()));
        assert_eq!(dir.list_accounts().unwrap().len(), 1);
        assert!(dir.get_account(UserId::new()).unwrap().is_none());

        assert_eq!(dir.remove_account(account.id).unwrap(), Some(account));
        assert!(dir.list_accounts().unwrap().is_empty());
    }

    #[test]
    fn remove_vehicle_returns_record() {
        let dir = InMemoryVehicleDirectory::new();
        let v = vehicle(UserId::new(), OfficeId::new());
        dir.put_vehicle(v.clone()).unwrap();
        assert_eq!(dir.remove_vehicle(v.id).unwrap(), Some(v.clone()));
        assert_eq!(dir.remove_vehicle(v.id).unwrap(), None);
    }
}
