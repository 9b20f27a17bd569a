//! # Vehicle Reviews
//!
//! Clients rate vehicles they have rented. A client may review a vehicle
//! only while holding an `ACCEPTED` reservation on it; any number of
//! reviews per rental is allowed. Reviews are never edited.

use std::sync::Arc;

use vrs_core::{Clock, ReviewId, UserId, VehicleId};
use vrs_state::{ReservationStatus, Review, ReviewText, Role};

use crate::capability::CapabilityContext;
use crate::directory::{AccountDirectory, VehicleDirectory};
use crate::error::BookingError;
use crate::store::{ReservationStore, Store};

// -- Review Store -------------------------------------------------------------

/// Persistence of review records.
pub trait ReviewStore: Send + Sync + std::fmt::Debug {
    /// Fetch one review.
    fn get(&self, id: ReviewId) -> Result<Option<Review>, BookingError>;

    /// Insert a new review. Fails if the id is already present.
    fn insert(&self, review: Review) -> Result<(), BookingError>;

    /// Delete a review, returning it if it existed. Only used to undo a
    /// submission whose write-through failed.
    fn remove(&self, id: ReviewId) -> Result<Option<Review>, BookingError>;

    /// Reviews written by one client, oldest first.
    fn list_by_client(&self, client_id: UserId) -> Result<Vec<Review>, BookingError>;

    /// Reviews of one vehicle, oldest first.
    fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Review>, BookingError>;
}

/// [`ReviewStore`] backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewStore {
    records: Store<ReviewId, Review>,
}

impl InMemoryReviewStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reviews.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn by_creation(mut rows: Vec<Review>) -> Vec<Review> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    rows
}

impl ReviewStore for InMemoryReviewStore {
    fn get(&self, id: ReviewId) -> Result<Option<Review>, BookingError> {
        Ok(self.records.get(&id))
    }

    fn insert(&self, review: Review) -> Result<(), BookingError> {
        let id = review.id;
        if self.records.insert_new(id, review) {
            Ok(())
        } else {
            Err(BookingError::Storage(format!("review {id} already exists")))
        }
    }

    fn remove(&self, id: ReviewId) -> Result<Option<Review>, BookingError> {
        Ok(self.records.remove(&id))
    }

    fn list_by_client(&self, client_id: UserId) -> Result<Vec<Review>, BookingError> {
        Ok(by_creation(self.records.filter(|r| r.client_id == client_id)))
    }

    fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Review>, BookingError> {
        Ok(by_creation(self.records.filter(|r| r.vehicle_id == vehicle_id)))
    }
}

// -- Review Manager -----------------------------------------------------------

/// Accepts and lists reviews.
#[derive(Debug, Clone)]
pub struct ReviewManager {
    reviews: Arc<dyn ReviewStore>,
    reservations: Arc<dyn ReservationStore>,
    vehicles: Arc<dyn VehicleDirectory>,
    accounts: Arc<dyn AccountDirectory>,
    clock: Arc<dyn Clock>,
}

impl ReviewManager {
    /// Build the manager over the stores the reservation manager uses.
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        reservations: Arc<dyn ReservationStore>,
        vehicles: Arc<dyn VehicleDirectory>,
        accounts: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reviews,
            reservations,
            vehicles,
            accounts,
            clock,
        }
    }

    /// Submit a review of `vehicle_id`. Clients only, and only for a
    /// vehicle they hold an accepted reservation on.
    pub fn submit(
        &self,
        ctx: &CapabilityContext,
        vehicle_id: VehicleId,
        rating: i64,
        text: ReviewText,
    ) -> Result<Review, BookingError> {
        if ctx.role != Role::Client {
            return Err(BookingError::Forbidden(
                "only clients may review vehicles".into(),
            ));
        }
        let review = Review::new(ctx.user_id, vehicle_id, rating, text, self.clock.now())?;

        self.accounts
            .get_account(ctx.user_id)?
            .ok_or_else(|| BookingError::not_found("account", ctx.user_id))?;
        self.vehicles
            .get_vehicle(vehicle_id)?
            .ok_or_else(|| BookingError::not_found("vehicle", vehicle_id))?;

        let rented = self
            .reservations
            .list_by_client(ctx.user_id)?
            .iter()
            .any(|r| r.vehicle_id == vehicle_id && r.status == ReservationStatus::Accepted);
        if !rented {
            return Err(BookingError::Forbidden(format!(
                "client {} has no accepted reservation on vehicle {vehicle_id}",
                ctx.user_id
            )));
        }

        self.reviews.insert(review.clone())?;
        tracing::info!(
            review_id = %review.id,
            vehicle_id = %vehicle_id,
            client_id = %ctx.user_id,
            rating = review.rating,
            "review submitted"
        );
        Ok(review)
    }

    /// A client's reviews. The client themself or an admin.
    pub fn list_by_client(
        &self,
        ctx: &CapabilityContext,
        client_id: UserId,
    ) -> Result<Vec<Review>, BookingError> {
        if ctx.user_id != client_id && !ctx.is_admin() {
            return Err(BookingError::Forbidden(format!(
                "caller may not list reviews of {client_id}"
            )));
        }
        self.reviews.list_by_client(client_id)
    }

    /// A vehicle's reviews. Any authenticated caller.
    pub fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Review>, BookingError> {
        self.vehicles
            .get_vehicle(vehicle_id)?
            .ok_or_else(|| BookingError::not_found("vehicle", vehicle_id))?;
        self.reviews.list_by_vehicle(vehicle_id)
    }

    /// Undo a submission whose write-through failed.
    pub fn revert(&self, review: &Review) -> Result<(), BookingError> {
        match self.reviews.remove(review.id)? {
            Some(_) => {
                tracing::warn!(review_id = %review.id, "review submission reverted");
                Ok(())
            }
            None => Err(BookingError::not_found("review", review.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryAccountDirectory, InMemoryVehicleDirectory};
    use crate::store::InMemoryReservationStore;
    use chrono::NaiveDate;
    use vrs_core::{DateRange, FixedClock, OfficeId, Timestamp};
    use vrs_state::{Account, Reservation, ReservationDetails, Vehicle};

    struct Harness {
        reviews: ReviewManager,
        store: Arc<InMemoryReviewStore>,
        reservations: Arc<InMemoryReservationStore>,
        vehicles: Arc<InMemoryVehicleDirectory>,
        accounts: Arc<InMemoryAccountDirectory>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryReviewStore::new());
        let reservations = Arc::new(InMemoryReservationStore::new());
        let vehicles = Arc::new(InMemoryVehicleDirectory::new());
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let clock = Arc::new(FixedClock::on_day(
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        ));
        Harness {
            reviews: ReviewManager::new(
                store.clone(),
                reservations.clone(),
                vehicles.clone(),
                accounts.clone(),
                clock,
            ),
            store,
            reservations,
            vehicles,
            accounts,
        }
    }

    impl Harness {
        fn client(&self) -> CapabilityContext {
            let account =
                Account::new(Role::Client, "Rui", "rui@example.com", None, Timestamp::now())
                    .unwrap();
            let id = account.id;
            self.accounts.put_account(account).unwrap();
            CapabilityContext::client(id)
        }

        fn vehicle(&self) -> Vehicle {
            let v = Vehicle::new(
                OfficeId::new(),
                UserId::new(),
                "Skoda",
                "Octavia",
                2023,
                4100,
                Timestamp::now(),
            );
            self.vehicles.put_vehicle(v.clone()).unwrap();
            v
        }

        fn rental(&self, client: &CapabilityContext, v: &Vehicle, accept: bool) -> Reservation {
            let period = DateRange::parse("2026-04-01", "2026-04-05").unwrap();
            let mut r = Reservation::pending(
                client.user_id,
                v.id,
                v.agent_id,
                period,
                ReservationDetails::default(),
                Timestamp::now(),
            );
            if accept {
                r.accept(v.agent_id, Timestamp::now()).unwrap();
            }
            self.reservations.insert(r.clone()).unwrap();
            r
        }
    }

    fn text(comment: &str) -> ReviewText {
        ReviewText {
            comment: Some(comment.into()),
            ..ReviewText::default()
        }
    }

    #[test]
    fn client_with_accepted_rental_can_review() {
        let h = harness();
        let client = h.client();
        let v = h.vehicle();
        h.rental(&client, &v, true);

        let review = h.reviews.submit(&client, v.id, 5, text("Spotless")).unwrap();
        assert_eq!(review.client_id, client.user_id);
        assert_eq!(review.vehicle_id, v.id);
        assert_eq!(h.store.get(review.id).unwrap(), Some(review.clone()));
        assert_eq!(h.reviews.list_by_client(&client, client.user_id).unwrap(), vec![review.clone()]);
        assert_eq!(h.reviews.list_by_vehicle(v.id).unwrap(), vec![review]);
    }

    #[test]
    fn review_without_accepted_rental_is_forbidden() {
        let h = harness();
        let client = h.client();
        let v = h.vehicle();
        let other = h.vehicle();

        assert!(matches!(
            h.reviews.submit(&client, v.id, 4, ReviewText::default()).unwrap_err(),
            BookingError::Forbidden(_)
        ));

        // A pending request is not a rental.
        h.rental(&client, &v, false);
        assert!(matches!(
            h.reviews.submit(&client, v.id, 4, ReviewText::default()).unwrap_err(),
            BookingError::Forbidden(_)
        ));

        // Neither is an accepted rental of a different vehicle.
        h.rental(&client, &other, true);
        assert!(matches!(
            h.reviews.submit(&client, v.id, 4, ReviewText::default()).unwrap_err(),
            BookingError::Forbidden(_)
        ));
        assert!(h.store.is_empty());
    }

    #[test]
    fn only_clients_review() {
        let h = harness();
        let v = h.vehicle();
        let agent = CapabilityContext::agent(v.agent_id, [v.id]);
        let admin = CapabilityContext::admin(UserId::new());
        for ctx in [agent, admin] {
            assert!(matches!(
                h.reviews.submit(&ctx, v.id, 3, ReviewText::default()).unwrap_err(),
                BookingError::Forbidden(_)
            ));
        }
    }

    #[test]
    fn rating_off_the_scale_is_invalid() {
        let h = harness();
        let client = h.client();
        let v = h.vehicle();
        h.rental(&client, &v, true);
        for bad in [0, 6] {
            assert!(matches!(
                h.reviews.submit(&client, v.id, bad, ReviewText::default()).unwrap_err(),
                BookingError::InvalidArgument(_)
            ));
        }
    }

    #[test]
    fn unknown_vehicle_or_account_is_not_found() {
        let h = harness();
        let client = h.client();
        assert!(matches!(
            h.reviews.submit(&client, VehicleId::new(), 3, ReviewText::default()).unwrap_err(),
            BookingError::NotFound { .. }
        ));
        let v = h.vehicle();
        let stranger = CapabilityContext::client(UserId::new());
        assert!(matches!(
            h.reviews.submit(&stranger, v.id, 3, ReviewText::default()).unwrap_err(),
            BookingError::NotFound { .. }
        ));
        assert!(matches!(
            h.reviews.list_by_vehicle(VehicleId::new()).unwrap_err(),
            BookingError::NotFound { .. }
        ));
    }

    #[test]
    fn client_reviews_are_private_to_client_and_admin() {
        let h = harness();
        let client = h.client();
        let other = h.client();
        assert!(matches!(
            h.reviews.list_by_client(&other, client.user_id).unwrap_err(),
            BookingError::Forbidden(_)
        ));
        let admin = CapabilityContext::admin(UserId::new());
        assert!(h.reviews.list_by_client(&admin, client.user_id).unwrap().is_empty());
    }

    #[test]
    fn revert_removes_submission() {
        let h = harness();
        let client = h.client();
        let v = h.vehicle();
        h.rental(&client, &v, true);
        let review = h.reviews.submit(&client, v.id, 2, ReviewText::default()).unwrap();

        h.reviews.revert(&review).unwrap();
        assert!(h.store.is_empty());
        assert!(matches!(
            h.reviews.revert(&review).unwrap_err(),
            BookingError::NotFound { .. }
        ));
    }

    #[test]
    fn duplicate_insert_is_storage_error() {
        let store = InMemoryReviewStore::new();
        let review = Review::new(
            UserId::new(),
            VehicleId::new(),
            4,
            ReviewText::default(),
            Timestamp::now(),
        )
        .unwrap();
        store.insert(review.clone()).unwrap();
        assert!(matches!(
            store.insert(review).unwrap_err(),
            BookingError::Storage(_)
        ));
    }
}
