//! Review persistence operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vrs_core::{ReviewId, Timestamp, UserId, VehicleId};
use vrs_state::{Review, ReviewText, MAX_RATING, MIN_RATING};

use super::corrupt;

/// Insert a new review. Reviews are never updated.
pub async fn insert(pool: &PgPool, review: &Review) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reviews (id, client_id, vehicle_id, rating, comment, pros, cons, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(*review.id.as_uuid())
    .bind(*review.client_id.as_uuid())
    .bind(*review.vehicle_id.as_uuid())
    .bind(i16::from(review.rating))
    .bind(&review.text.comment)
    .bind(&review.text.pros)
    .bind(&review.text.cons)
    .bind(*review.created_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every review, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Review>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, client_id, vehicle_id, rating, comment, pros, cons, created_at
         FROM reviews ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ReviewRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    client_id: Uuid,
    vehicle_id: Uuid,
    rating: i16,
    comment: Option<String>,
    pros: Option<String>,
    cons: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_record(self) -> Result<Review, sqlx::Error> {
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| corrupt("reviews", self.id, format!("rating {}", self.rating)))?;
        Ok(Review {
            id: ReviewId::from_uuid(self.id),
            client_id: UserId::from_uuid(self.client_id),
            vehicle_id: VehicleId::from_uuid(self.vehicle_id),
            rating,
            text: ReviewText {
                comment: self.comment,
                pros: self.pros,
                cons: self.cons,
            },
            created_at: Timestamp::from_datetime(self.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rating: i16) -> ReviewRow {
        ReviewRow {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            rating,
            comment: Some("Smooth pickup".into()),
            pros: None,
            cons: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_maps_to_record() {
        let review = row(4).into_record().unwrap();
        assert_eq!(review.rating, 4);
        assert_eq!(review.text.comment.as_deref(), Some("Smooth pickup"));
    }

    #[test]
    fn rating_off_the_scale_is_corrupt() {
        for bad in [0, 6, -3] {
            assert!(matches!(row(bad).into_record(), Err(sqlx::Error::Decode(_))));
        }
    }
}
