//! # Vehicle Reviews
//!
//! A client's rating of a vehicle. Reviews are written once and never
//! edited; whether the client may review the vehicle at all is the
//! engine's call.

use serde::{Deserialize, Serialize};

use vrs_core::{ReviewId, Timestamp, UserId, ValidationError, VehicleId};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// What a client writes about a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewText {
    /// Overall impression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// What went well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pros: Option<String>,
    /// What did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons: Option<String>,
}

/// A rating left by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Unique review identifier.
    pub id: ReviewId,
    /// Author.
    pub client_id: UserId,
    /// Reviewed vehicle.
    pub vehicle_id: VehicleId,
    /// Rating from [`MIN_RATING`] to [`MAX_RATING`].
    pub rating: u8,
    /// Free text.
    #[serde(flatten)]
    pub text: ReviewText,
    /// When the review was submitted.
    pub created_at: Timestamp,
}

impl Review {
    /// Build a review, rejecting a rating outside the scale. Blank text
    /// fields are dropped.
    pub fn new(
        client_id: UserId,
        vehicle_id: VehicleId,
        rating: i64,
        text: ReviewText,
        at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or(ValidationError::OutOfRange {
                field: "rating",
                value: rating,
                min: i64::from(MIN_RATING),
                max: i64::from(MAX_RATING),
            })?;
        Ok(Self {
            id: ReviewId::new(),
            client_id,
            vehicle_id,
            rating,
            text: ReviewText {
                comment: non_blank(text.comment),
                pros: non_blank(text.pros),
                cons: non_blank(text.cons),
            },
            created_at: at,
        })
    }
}

fn non_blank(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}
