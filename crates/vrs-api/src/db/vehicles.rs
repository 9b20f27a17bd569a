//! Vehicle persistence operations.
//!
//! A row is only replaced by a record modified at the same time or later.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use vrs_core::{OfficeId, Timestamp, UserId, VehicleId};
use vrs_state::{Vehicle, VehicleStatus};

use super::corrupt;

const UPSERT: &str = "INSERT INTO vehicles
         (id, office_id, agent_id, status, brand, model, year, description, price_per_day, created_at, updated_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
     ON CONFLICT (id) DO UPDATE SET
         office_id = EXCLUDED.office_id,
         agent_id = EXCLUDED.agent_id,
         status = EXCLUDED.status,
         brand = EXCLUDED.brand,
         model = EXCLUDED.model,
         year = EXCLUDED.year,
         description = EXCLUDED.description,
         price_per_day = EXCLUDED.price_per_day,
         updated_at = EXCLUDED.updated_at
     WHERE vehicles.updated_at <= EXCLUDED.updated_at";

/// Insert or replace a vehicle unless the stored row is newer.
pub async fn upsert(pool: &PgPool, vehicle: &Vehicle) -> Result<(), sqlx::Error> {
    upsert_with(pool, vehicle).await
}

/// Insert or replace a vehicle on any executor (pool or open transaction).
pub(crate) async fn upsert_with<'e, E>(executor: E, vehicle: &Vehicle) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(UPSERT)
        .bind(*vehicle.id.as_uuid())
        .bind(*vehicle.office_id.as_uuid())
        .bind(*vehicle.agent_id.as_uuid())
        .bind(vehicle.status.as_str())
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(i32::from(vehicle.year))
        .bind(&vehicle.description)
        .bind(vehicle.price_per_day)
        .bind(*vehicle.created_at.as_datetime())
        .bind(*vehicle.updated_at.as_datetime())
        .execute(executor)
        .await?;

    Ok(())
}

/// Load every vehicle, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Vehicle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VehicleRow>(
        "SELECT id, office_id, agent_id, status, brand, model, year, description,
                price_per_day, created_at, updated_at
         FROM vehicles ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(VehicleRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    office_id: Uuid,
    agent_id: Uuid,
    status: String,
    brand: String,
    model: String,
    year: i32,
    description: String,
    price_per_day: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VehicleRow {
    fn into_record(self) -> Result<Vehicle, sqlx::Error> {
        let status =
            VehicleStatus::parse(&self.status).map_err(|e| corrupt("vehicles", self.id, e))?;
        let year = u16::try_from(self.year)
            .map_err(|_| corrupt("vehicles", self.id, format!("year {} out of range", self.year)))?;
        Ok(Vehicle {
            id: VehicleId::from_uuid(self.id),
            office_id: OfficeId::from_uuid(self.office_id),
            agent_id: UserId::from_uuid(self.agent_id),
            status,
            brand: self.brand,
            model: self.model,
            year,
            description: self.description,
            price_per_day: self.price_per_day,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_never_replaces_a_newer_row() {
        assert!(UPSERT
            .trim_end()
            .ends_with("WHERE vehicles.updated_at <= EXCLUDED.updated_at"));
    }
}
