// src/routes/mod.rs

use std::str::FromStr;

use crate::error::{ApiError, ApiResult};
use crate::models::UnknownVariant;

pub mod availability;
pub mod guests;
pub mod health;
pub mod housekeeping;
pub mod invoices;
pub mod payments;
pub mod portal;
pub mod receivables;
pub mod reports;
pub mod reservations;
pub mod room_types;
pub mod rooms;

// Parses a status/enum string from a request into its typed form.
pub fn parse_text<T>(raw: &str) -> ApiResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.parse().map_err(|e: UnknownVariant| ApiError::validation(e.to_string()))
}

// Default page of 50, capped at 500.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 500), offset.unwrap_or(0).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HousekeepingStatus;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(page(None, None), (50, 0));
        assert_eq!(page(Some(0), Some(-5)), (1, 0));
        assert_eq!(page(Some(10_000), Some(20)), (500, 20));
    }

    #[test]
    fn unknown_status_text_is_a_validation_error() {
        assert_eq!(parse_text::<HousekeepingStatus>("done").unwrap(), HousekeepingStatus::Done);
        let err = parse_text::<HousekeepingStatus>("SWEPT").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
