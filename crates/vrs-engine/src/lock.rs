//! # Per-Vehicle Serialization
//!
//! Every operation that can change which reservations hold a vehicle's
//! calendar (create, accept, amend with new dates, release) runs inside
//! [`VehicleLocks::with_lock`] for that vehicle. Operations on different
//! vehicles take different mutexes and never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use vrs_core::VehicleId;

/// Lazily populated table of one mutex per vehicle.
#[derive(Debug, Default)]
pub struct VehicleLocks {
    locks: DashMap<VehicleId, Arc<Mutex<()>>>,
}

impl VehicleLocks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the vehicle's mutex.
    ///
    /// The table shard is released before the mutex is taken, so a long
    /// critical section on one vehicle does not stall lookups for others.
    pub fn with_lock<R>(&self, vehicle_id: VehicleId, f: impl FnOnce() -> R) -> R {
        let mutex = self.locks.entry(vehicle_id).or_default().value().clone();
        let _guard = mutex.lock();
        f()
    }

    /// Number of vehicles that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no vehicle has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_vehicle_is_serialized() {
        let locks = VehicleLocks::new();
        let vehicle = VehicleId::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks.with_lock(vehicle, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn different_vehicles_do_not_block() {
        let locks = VehicleLocks::new();
        let a = VehicleId::new();
        let b = VehicleId::new();
        let nested = locks.with_lock(a, || locks.with_lock(b, || 42));
        assert_eq!(nested, 42);
        assert_eq!(locks.len(), 2);
    }
}
