//! Account persistence operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vrs_core::{OfficeId, Timestamp, UserId};
use vrs_state::{Account, Role};

use super::corrupt;

/// Insert or replace an account.
pub async fn upsert(pool: &PgPool, account: &Account) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO accounts (id, role, name, email, office_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (id) DO UPDATE SET
             role = EXCLUDED.role,
             name = EXCLUDED.name,
             email = EXCLUDED.email,
             office_id = EXCLUDED.office_id",
    )
    .bind(*account.id.as_uuid())
    .bind(account.role.as_str())
    .bind(&account.name)
    .bind(&account.email)
    .bind(account.office_id.map(|o| *o.as_uuid()))
    .bind(*account.created_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every account, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, role, name, email, office_id, created_at
         FROM accounts ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(AccountRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    role: String,
    name: String,
    email: String,
    office_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_record(self) -> Result<Account, sqlx::Error> {
        let role = Role::parse(&self.role).map_err(|e| corrupt("accounts", self.id, e))?;
        Ok(Account {
            id: UserId::from_uuid(self.id),
            role,
            name: self.name,
            email: self.email,
            office_id: self.office_id.map(OfficeId::from_uuid),
            created_at: Timestamp::from_datetime(self.created_at),
        })
    }
}
