//! # Record Stores
//!
//! [`Store`] is the thread-safe map every in-memory collaborator is built
//! on. [`ReservationStore`] is the persistence seam the reservation manager
//! writes through; it is the only writer.
//!
//! All locks are `parking_lot` and are never held across an `.await`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use vrs_core::{ReservationId, UserId, VehicleId};
use vrs_state::Reservation;

use crate::error::BookingError;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// `parking_lot::RwLock` is non-poisonable: a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert a record only if the key is vacant. Returns whether it was inserted.
    pub fn insert_new(&self, id: K, value: T) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&id) {
            return false;
        }
        guard.insert(id, value);
        true
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List the records matching a predicate.
    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock, so the check and the
    /// write cannot be separated by another writer. Returns `None` if the
    /// record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record, returning it if it existed.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Atomically check and remove a record.
    ///
    /// The record is removed only if the closure returns `Ok`. Returns
    /// `None` if the record doesn't exist.
    pub fn try_remove<E>(
        &self,
        id: &K,
        f: impl FnOnce(&T) -> Result<(), E>,
    ) -> Option<Result<T, E>> {
        let mut guard = self.data.write();
        match f(guard.get(id)?) {
            Ok(()) => guard.remove(id).map(Ok),
            Err(e) => Some(Err(e)),
        }
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Reservation Store --------------------------------------------------------

/// Persistence of reservation records.
///
/// Implementations return fully materialized values; reading a field never
/// triggers further I/O.
pub trait ReservationStore: Send + Sync + std::fmt::Debug {
    /// Fetch one reservation.
    fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError>;

    /// Every reservation on a vehicle, in any status.
    fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Reservation>, BookingError>;

    /// Every reservation requested by a client.
    fn list_by_client(&self, client_id: UserId) -> Result<Vec<Reservation>, BookingError>;

    /// Every reservation.
    fn list_all(&self) -> Result<Vec<Reservation>, BookingError>;

    /// Insert a new reservation. Fails if the id is already present.
    fn insert(&self, reservation: Reservation) -> Result<(), BookingError>;

    /// Replace a reservation, provided the stored record is still at
    /// `expected_version`.
    ///
    /// A version mismatch means another writer got there first and is
    /// reported as [`BookingError::FailedPrecondition`]. The replacement
    /// must carry a higher version than the record it replaces.
    fn update(&self, reservation: Reservation, expected_version: u64) -> Result<(), BookingError>;

    /// Delete a reservation still at `expected_version`. Undoes a create
    /// whose write-through failed; reservations are otherwise never deleted.
    fn remove(&self, id: ReservationId, expected_version: u64) -> Result<(), BookingError>;
}

/// [`ReservationStore`] backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationStore {
    records: Store<ReservationId, Reservation>,
}

impl InMemoryReservationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn by_creation(mut rows: Vec<Reservation>) -> Vec<Reservation> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    rows
}

impl ReservationStore for InMemoryReservationStore {
    fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError> {
        Ok(self.records.get(&id))
    }

    fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Reservation>, BookingError> {
        Ok(by_creation(
            self.records.filter(|r| r.vehicle_id == vehicle_id),
        ))
    }

    fn list_by_client(&self, client_id: UserId) -> Result<Vec<Reservation>, BookingError> {
        Ok(by_creation(self.records.filter(|r| r.client_id == client_id)))
    }

    fn list_all(&self) -> Result<Vec<Reservation>, BookingError> {
        Ok(by_creation(self.records.list()))
    }

    fn insert(&self, reservation: Reservation) -> Result<(), BookingError> {
        let id = reservation.id;
        if !self.records.insert_new(id, reservation) {
            return Err(BookingError::Storage(format!(
                "reservation {id} already exists"
            )));
        }
        Ok(())
    }

    fn update(&self, reservation: Reservation, expected_version: u64) -> Result<(), BookingError> {
        let id = reservation.id;
        if reservation.version <= expected_version {
            return Err(BookingError::Storage(format!(
                "reservation {id} write at version {} does not advance {expected_version}",
                reservation.version
            )));
        }
        self.records
            .try_update(&id, |current| {
                check_version(current, expected_version)?;
                *current = reservation;
                Ok(())
            })
            .unwrap_or_else(|| Err(BookingError::not_found("reservation", id)))
    }

    fn remove(&self, id: ReservationId, expected_version: u64) -> Result<(), BookingError> {
        self.records
            .try_remove(&id, |current| check_version(current, expected_version))
            .unwrap_or_else(|| Err(BookingError::not_found("reservation", id)))
            .map(|_| ())
    }
}

fn check_version(current: &Reservation, expected: u64) -> Result<(), BookingError> {
    if current.version == expected {
        return Ok(());
    }
    Err(BookingError::FailedPrecondition(format!(
        "reservation {} was modified concurrently (version {}, expected {expected}); retry",
        current.id, current.version
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vrs_core::{DateRange, Timestamp};
    use vrs_state::{ReservationAmendment, ReservationDetails, ReservationStatus};

    fn reservation(vehicle: VehicleId, client: UserId) -> Reservation {
        let period = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
        )
        .unwrap();
        Reservation::pending(
            client,
            vehicle,
            UserId::new(),
            period,
            ReservationDetails::default(),
            Timestamp::now(),
        )
    }

    #[test]
    fn generic_store_basics() {
        let store: Store<u32, String> = Store::new();
        assert!(store.is_empty());
        store.insert(1, "one".into());
        assert_eq!(store.get(&1).as_deref(), Some("one"));
        assert!(store.contains(&1));
        assert_eq!(store.len(), 1);
        let res: Option<Result<(), ()>> = store.try_update(&1, |v| {
            v.push('!');
            Ok(())
        });
        assert!(matches!(res, Some(Ok(()))));
        assert_eq!(store.get(&1).as_deref(), Some("one!"));
        assert!(store.try_update::<(), ()>(&2, |_| Ok(())).is_none());
    }

    #[test]
    fn clones_share_data() {
        let store: Store<u32, u32> = Store::new();
        let other = store.clone();
        store.insert(7, 49);
        assert_eq!(other.get(&7), Some(49));
    }

    #[test]
    fn list_by_vehicle_and_client_filter() {
        let store = InMemoryReservationStore::new();
        let vehicle = VehicleId::new();
        let client = UserId::new();
        store.insert(reservation(vehicle, client)).unwrap();
        store.insert(reservation(vehicle, UserId::new())).unwrap();
        store.insert(reservation(VehicleId::new(), client)).unwrap();

        assert_eq!(store.list_by_vehicle(vehicle).unwrap().len(), 2);
        assert_eq!(store.list_by_client(client).unwrap().len(), 2);
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn duplicate_insert_fails() {
        let store = InMemoryReservationStore::new();
        let r = reservation(VehicleId::new(), UserId::new());
        store.insert(r.clone()).unwrap();
        assert!(matches!(store.insert(r), Err(BookingError::Storage(_))));
    }

    #[test]
    fn update_checks_expected_version() {
        let store = InMemoryReservationStore::new();
        let r = reservation(VehicleId::new(), UserId::new());
        store.insert(r.clone()).unwrap();

        let mut cancelled = r.clone();
        cancelled.cancel(r.client_id, Timestamp::now()).unwrap();
        store.update(cancelled.clone(), r.version).unwrap();

        let mut accepted = r.clone();
        accepted.accept(r.agent_id, Timestamp::now()).unwrap();
        let err = store.update(accepted, r.version).unwrap_err();
        assert!(matches!(err, BookingError::FailedPrecondition(_)));
        assert_eq!(
            store.get(r.id).unwrap().unwrap().status,
            ReservationStatus::Cancelled
        );
    }

    #[test]
    fn stale_details_write_cannot_restore_old_dates() {
        let store = InMemoryReservationStore::new();
        let r = reservation(VehicleId::new(), UserId::new());
        store.insert(r.clone()).unwrap();

        let later = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 7, 20).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 25).unwrap(),
        )
        .unwrap();
        let mut moved = r.clone();
        moved
            .amend(
                ReservationAmendment {
                    period: Some(later),
                    ..Default::default()
                },
                Timestamp::now(),
            )
            .unwrap();
        store.update(moved, r.version).unwrap();

        // Same status as the stored record, but read before the move.
        let mut stale = r.clone();
        stale
            .amend(
                ReservationAmendment {
                    notes: Some("child seat".into()),
                    ..Default::default()
                },
                Timestamp::now(),
            )
            .unwrap();
        let err = store.update(stale, r.version).unwrap_err();
        assert!(matches!(err, BookingError::FailedPrecondition(_)));
        assert_eq!(store.get(r.id).unwrap().unwrap().period, later);
    }

    #[test]
    fn update_must_advance_version() {
        let store = InMemoryReservationStore::new();
        let r = reservation(VehicleId::new(), UserId::new());
        store.insert(r.clone()).unwrap();
        assert!(matches!(
            store.update(r.clone(), r.version),
            Err(BookingError::Storage(_))
        ));
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = InMemoryReservationStore::new();
        let mut r = reservation(VehicleId::new(), UserId::new());
        r.cancel(r.client_id, Timestamp::now()).unwrap();
        let err = store.update(r, 0).unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
    }

    #[test]
    fn remove_checks_version() {
        let store = InMemoryReservationStore::new();
        let r = reservation(VehicleId::new(), UserId::new());
        store.insert(r.clone()).unwrap();
        assert!(matches!(
            store.remove(r.id, r.version + 1),
            Err(BookingError::FailedPrecondition(_))
        ));
        store.remove(r.id, r.version).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.remove(r.id, r.version),
            Err(BookingError::NotFound { .. })
        ));
    }
}
