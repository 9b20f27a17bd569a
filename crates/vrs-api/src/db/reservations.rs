//! Reservation persistence operations.
//!
//! Status is stored as its wire name; transition rules are enforced by the
//! engine, not in SQL. Writes carry the record's `version` and never
//! replace a row with a higher one, so write-throughs that reach Postgres
//! out of order cannot bring back an older state.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use vrs_core::{DateRange, ReservationId, Timestamp, UserId, VehicleId};
use vrs_state::{Reservation, ReservationDetails, ReservationStatus, TransitionRecord, Vehicle};

use super::corrupt;

const UPSERT: &str = "INSERT INTO reservations
         (id, client_id, vehicle_id, agent_id, start_date, end_date, status, approved_by,
          approval_date, rejection_reason, pickup_location, dropoff_location, notes,
          transition_log, created_at, updated_at, version)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
     ON CONFLICT (id) DO UPDATE SET
         start_date = EXCLUDED.start_date,
         end_date = EXCLUDED.end_date,
         status = EXCLUDED.status,
         approved_by = EXCLUDED.approved_by,
         approval_date = EXCLUDED.approval_date,
         rejection_reason = EXCLUDED.rejection_reason,
         pickup_location = EXCLUDED.pickup_location,
         dropoff_location = EXCLUDED.dropoff_location,
         notes = EXCLUDED.notes,
         transition_log = EXCLUDED.transition_log,
         updated_at = EXCLUDED.updated_at,
         version = EXCLUDED.version
     WHERE reservations.version < EXCLUDED.version";

async fn upsert_with<'e, E>(executor: E, reservation: &Reservation) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let transition_log = serde_json::to_value(&reservation.transition_log).map_err(|e| {
        sqlx::Error::Protocol(format!("failed to serialize reservation transition_log: {e}"))
    })?;
    let version = i64::try_from(reservation.version).map_err(|_| {
        sqlx::Error::Protocol(format!("reservation {} version out of range", reservation.id))
    })?;

    sqlx::query(UPSERT)
        .bind(*reservation.id.as_uuid())
        .bind(*reservation.client_id.as_uuid())
        .bind(*reservation.vehicle_id.as_uuid())
        .bind(*reservation.agent_id.as_uuid())
        .bind(reservation.period.start())
        .bind(reservation.period.end())
        .bind(reservation.status.as_str())
        .bind(reservation.approved_by.map(|u| *u.as_uuid()))
        .bind(reservation.approval_date.map(|t| *t.as_datetime()))
        .bind(reservation.rejection_reason.as_deref())
        .bind(reservation.details.pickup_location.as_deref())
        .bind(reservation.details.dropoff_location.as_deref())
        .bind(reservation.details.notes.as_deref())
        .bind(transition_log)
        .bind(*reservation.created_at.as_datetime())
        .bind(*reservation.updated_at.as_datetime())
        .bind(version)
        .execute(executor)
        .await?;

    Ok(())
}

/// Persist a reservation and, when the vehicle changed with it, the
/// vehicle, in one transaction.
pub async fn record(
    pool: &PgPool,
    reservation: &Reservation,
    vehicle: Option<&Vehicle>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    upsert_with(&mut *tx, reservation).await?;
    if let Some(vehicle) = vehicle {
        super::vehicles::upsert_with(&mut *tx, vehicle).await?;
    }
    tx.commit().await
}

/// Load every reservation, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Reservation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReservationRow>(
        "SELECT id, client_id, vehicle_id, agent_id, start_date, end_date, status, approved_by,
                approval_date, rejection_reason, pickup_location, dropoff_location, notes,
                transition_log, created_at, updated_at, version
         FROM reservations ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ReservationRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    client_id: Uuid,
    vehicle_id: Uuid,
    agent_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    approved_by: Option<Uuid>,
    approval_date: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    pickup_location: Option<String>,
    dropoff_location: Option<String>,
    notes: Option<String>,
    transition_log: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl ReservationRow {
    fn into_record(self) -> Result<Reservation, sqlx::Error> {
        let status = ReservationStatus::parse(&self.status)
            .map_err(|e| corrupt("reservations", self.id, e))?;
        let period = DateRange::new(self.start_date, self.end_date)
            .map_err(|e| corrupt("reservations", self.id, e))?;
        let transition_log: Vec<TransitionRecord> = serde_json::from_value(self.transition_log)
            .map_err(|e| corrupt("reservations", self.id, e))?;
        let version = u64::try_from(self.version)
            .map_err(|_| corrupt("reservations", self.id, "negative version"))?;

        Ok(Reservation {
            id: ReservationId::from_uuid(self.id),
            client_id: UserId::from_uuid(self.client_id),
            vehicle_id: VehicleId::from_uuid(self.vehicle_id),
            agent_id: UserId::from_uuid(self.agent_id),
            period,
            status,
            approved_by: self.approved_by.map(UserId::from_uuid),
            approval_date: self.approval_date.map(Timestamp::from_datetime),
            rejection_reason: self.rejection_reason,
            details: ReservationDetails {
                pickup_location: self.pickup_location,
                dropoff_location: self.dropoff_location,
                notes: self.notes,
            },
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
            transition_log,
            version,
        })
    }
}
