//! # Vehicle Search
//!
//! Filters over the fleet for clients looking for a car. Only `AVAILABLE`
//! vehicles are ever returned; a date window further drops vehicles with a
//! pending or accepted reservation overlapping it (see
//! [`ReservationManager::search_vehicles`](crate::ReservationManager::search_vehicles)).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vrs_core::DateRange;
use vrs_state::{Vehicle, VehicleStatus};

use crate::error::BookingError;

/// Search filters. Every field is optional; an empty search lists every
/// available vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSearch {
    /// First day of the wanted window. Requires `end_date`.
    pub start_date: Option<NaiveDate>,
    /// Exclusive last day of the wanted window. Requires `start_date`.
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the brand.
    pub brand: Option<String>,
    /// Case-insensitive substring of the model.
    pub model: Option<String>,
    /// Lowest daily rate, inclusive, in minor units.
    pub min_price: Option<i64>,
    /// Highest daily rate, inclusive, in minor units.
    pub max_price: Option<i64>,
}

impl VehicleSearch {
    /// The date window, if one was given.
    ///
    /// Half a window, an inverted window, or an inverted price range is
    /// an invalid search.
    pub fn window(&self) -> Result<Option<DateRange>, BookingError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(BookingError::InvalidArgument(format!(
                    "min_price {min} is above max_price {max}"
                )));
            }
        }
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end)?)),
            _ => Err(BookingError::InvalidArgument(
                "start_date and end_date must be given together".into(),
            )),
        }
    }

    /// Whether a vehicle passes the status, text and price filters. The
    /// date window is checked against reservations separately.
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        vehicle.status == VehicleStatus::Available
            && contains_ignoring_case(&vehicle.brand, self.brand.as_deref())
            && contains_ignoring_case(&vehicle.model, self.model.as_deref())
            && self.min_price.map_or(true, |min| vehicle.price_per_day >= min)
            && self.max_price.map_or(true, |max| vehicle.price_per_day <= max)
    }
}

fn contains_ignoring_case(field: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => field.to_lowercase().contains(&needle.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrs_core::{OfficeId, Timestamp, UserId};

    fn car(brand: &str, model: &str, price: i64) -> Vehicle {
        Vehicle::new(
            OfficeId::new(),
            UserId::new(),
            brand,
            model,
            2024,
            price,
            Timestamp::now(),
        )
    }

    #[test]
    fn empty_search_matches_available_only() {
        let search = VehicleSearch::default();
        let mut v = car("Fiat", "Panda", 2500);
        assert!(search.matches(&v));
        for status in [
            VehicleStatus::Reserved,
            VehicleStatus::Maintenance,
            VehicleStatus::OutOfService,
        ] {
            v.status = status;
            assert!(!search.matches(&v), "{status} matched");
        }
    }

    #[test]
    fn brand_and_model_match_substrings_ignoring_case() {
        let v = car("Volkswagen", "Golf Variant", 4000);
        let search = |brand: Option<&str>, model: Option<&str>| VehicleSearch {
            brand: brand.map(Into::into),
            model: model.map(Into::into),
            ..VehicleSearch::default()
        };
        assert!(search(Some("volks"), None).matches(&v));
        assert!(search(None, Some("VARIANT")).matches(&v));
        assert!(search(Some("  "), None).matches(&v));
        assert!(!search(Some("Audi"), Some("golf")).matches(&v));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let v = car("Kia", "Ceed", 3000);
        let within = VehicleSearch {
            min_price: Some(3000),
            max_price: Some(3000),
            ..VehicleSearch::default()
        };
        assert!(within.matches(&v));
        let above = VehicleSearch {
            min_price: Some(3001),
            ..VehicleSearch::default()
        };
        assert!(!above.matches(&v));
    }

    #[test]
    fn window_needs_both_ends_in_order() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 9, d).unwrap();
        let half = VehicleSearch {
            start_date: Some(day(1)),
            ..VehicleSearch::default()
        };
        assert!(matches!(half.window(), Err(BookingError::InvalidArgument(_))));

        let inverted = VehicleSearch {
            start_date: Some(day(5)),
            end_date: Some(day(5)),
            ..VehicleSearch::default()
        };
        assert!(matches!(inverted.window(), Err(BookingError::InvalidArgument(_))));

        let ok = VehicleSearch {
            start_date: Some(day(1)),
            end_date: Some(day(4)),
            ..VehicleSearch::default()
        };
        assert_eq!(ok.window().unwrap().map(|w| w.days()), Some(3));
        assert_eq!(VehicleSearch::default().window().unwrap(), None);
    }

    #[test]
    fn inverted_price_range_is_invalid() {
        let search = VehicleSearch {
            min_price: Some(5000),
            max_price: Some(1000),
            ..VehicleSearch::default()
        };
        assert!(matches!(search.window(), Err(BookingError::InvalidArgument(_))));
    }
}
