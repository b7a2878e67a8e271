// src/pricing/mod.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ReservationStatus, RoomWithType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("check_out_date must be after check_in_date")]
    InvalidDateRange,

    #[error("at least one adult is required")]
    NoGuests,

    #[error("party of {party} exceeds room occupancy of {max}")]
    OverOccupancy { party: i32, max: i32 },

    #[error("guest counts cannot be negative")]
    NegativeGuests,

    #[error("a party cannot exceed {max} guests")]
    PartyTooLarge { max: i32 },
}

/// Largest party a single request may ask for.
pub const MAX_PARTY_SIZE: i32 = 100;

/// A requested stay. `check_out` is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    #[serde(default)]
    pub room_type_id: Option<i64>,
    #[serde(default)]
    pub floor: Option<i32>,
}

impl StayRequest {
    pub fn party_size(&self) -> i32 {
        self.adults.saturating_add(self.children)
    }
}

/// An existing reservation reduced to what the overlap test needs.
#[derive(Debug, Clone, Copy)]
pub struct BookedSpan {
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StayQuote {
    pub nights: i64,
    pub nightly_rate: Decimal,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableRoom {
    pub room_id: i64,
    pub number: String,
    pub floor: i32,
    pub room_type_id: i64,
    pub room_type_name: String,
    pub max_occupancy: i32,
    #[serde(flatten)]
    pub quote: StayQuote,
}

/// Rejects malformed requests before any lookup happens.
pub fn validate(req: &StayRequest) -> Result<(), PricingError> {
    if req.check_out <= req.check_in {
        return Err(PricingError::InvalidDateRange);
    }
    if req.adults < 0 || req.children < 0 {
        return Err(PricingError::NegativeGuests);
    }
    if req.adults == 0 {
        return Err(PricingError::NoGuests);
    }
    match req.adults.checked_add(req.children) {
        Some(party) if party <= MAX_PARTY_SIZE => Ok(()),
        _ => Err(PricingError::PartyTooLarge { max: MAX_PARTY_SIZE }),
    }
}

/// Number of nights in `[check_in, check_out)`; at least one.
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, PricingError> {
    let n = (check_out - check_in).num_days();
    if n < 1 {
        return Err(PricingError::InvalidDateRange);
    }
    Ok(n)
}

/// Half-open interval overlap: `[a_in, a_out)` intersects `[b_in, b_out)`.
pub fn overlaps(a_in: NaiveDate, a_out: NaiveDate, b_in: NaiveDate, b_out: NaiveDate) -> bool {
    a_in < b_out && a_out > b_in
}

/// True when `span` keeps its room from being sold for `[check_in, check_out)`.
pub fn blocks(span: &BookedSpan, check_in: NaiveDate, check_out: NaiveDate) -> bool {
    span.status.is_active() && overlaps(span.check_in, span.check_out, check_in, check_out)
}

pub fn quote(
    nightly_rate: Decimal,
    currency: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<StayQuote, PricingError> {
    let n = nights(check_in, check_out)?;
    Ok(StayQuote {
        nights: n,
        nightly_rate,
        total: nightly_rate * Decimal::from(n),
        currency: currency.to_string(),
    })
}

/// Checks that `room` can host the party; used by the booking path.
pub fn check_occupancy(room: &RoomWithType, req: &StayRequest) -> Result<(), PricingError> {
    if req.party_size() > room.max_occupancy {
        return Err(PricingError::OverOccupancy { party: req.party_size(), max: room.max_occupancy });
    }
    Ok(())
}

/// Rooms that fit the party and filters and have no blocking reservation
/// for the requested interval, each priced for the stay.
pub fn find_available(
    rooms: &[RoomWithType],
    booked: &[BookedSpan],
    req: &StayRequest,
) -> Result<Vec<AvailableRoom>, PricingError> {
    validate(req)?;

    let mut out = Vec::new();
    for room in rooms {
        if req.party_size() > room.max_occupancy {
            continue;
        }
        if req.room_type_id.is_some_and(|t| t != room.room_type_id) {
            continue;
        }
        if req.floor.is_some_and(|f| f != room.floor) {
            continue;
        }
        let taken = booked
            .iter()
            .any(|b| b.room_id == room.room_id && blocks(b, req.check_in, req.check_out));
        if taken {
            continue;
        }

        out.push(AvailableRoom {
            room_id: room.room_id,
            number: room.number.clone(),
            floor: room.floor,
            room_type_id: room.room_type_id,
            room_type_name: room.room_type_name.clone(),
            max_occupancy: room.max_occupancy,
            quote: quote(room.base_rate, &room.currency, req.check_in, req.check_out)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn room(id: i64, type_id: i64, floor: i32, max: i32, rate: i64) -> RoomWithType {
        RoomWithType {
            room_id: id,
            number: format!("{floor}{id:02}"),
            floor,
            status: "AVAILABLE".into(),
            room_type_id: type_id,
            room_type_name: format!("type-{type_id}"),
            max_occupancy: max,
            base_rate: Decimal::from(rate),
            currency: "MXN".into(),
        }
    }

    fn span(room_id: i64, from: &str, to: &str, status: ReservationStatus) -> BookedSpan {
        BookedSpan { room_id, check_in: d(from), check_out: d(to), status }
    }

    fn stay(from: &str, to: &str, adults: i32, children: i32) -> StayRequest {
        StayRequest {
            check_in: d(from),
            check_out: d(to),
            adults,
            children,
            room_type_id: None,
            floor: None,
        }
    }

    #[test]
    fn three_night_stay_is_priced_from_base_rate() {
        let q = quote(Decimal::from(80), "USD", d("2024-06-01"), d("2024-06-04")).unwrap();
        assert_eq!(q.nights, 3);
        assert_eq!(q.total, Decimal::from(240));
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert_eq!(validate(&stay("2024-06-04", "2024-06-04", 1, 0)), Err(PricingError::InvalidDateRange));
        assert_eq!(validate(&stay("2024-06-05", "2024-06-04", 1, 0)), Err(PricingError::InvalidDateRange));
        assert_eq!(validate(&stay("2024-06-01", "2024-06-04", 0, 2)), Err(PricingError::NoGuests));
        assert!(nights(d("2024-06-01"), d("2024-06-01")).is_err());
    }

    #[test]
    fn back_to_back_stays_do_not_overlap() {
        assert!(!overlaps(d("2024-06-01"), d("2024-06-04"), d("2024-06-04"), d("2024-06-06")));
        assert!(!overlaps(d("2024-06-04"), d("2024-06-06"), d("2024-06-01"), d("2024-06-04")));
        assert!(overlaps(d("2024-06-01"), d("2024-06-04"), d("2024-06-03"), d("2024-06-05")));
        assert!(overlaps(d("2024-06-01"), d("2024-06-10"), d("2024-06-03"), d("2024-06-05")));
    }

    #[test]
    fn only_confirmed_and_checked_in_reservations_block() {
        let rooms = vec![room(1, 1, 1, 2, 80), room(2, 1, 1, 2, 80), room(3, 1, 1, 2, 80), room(4, 1, 1, 2, 80)];
        let booked = vec![
            span(1, "2024-06-02", "2024-06-03", ReservationStatus::Confirmed),
            span(2, "2024-06-01", "2024-06-05", ReservationStatus::CheckedIn),
            span(3, "2024-06-01", "2024-06-05", ReservationStatus::Cancelled),
            span(4, "2024-06-01", "2024-06-05", ReservationStatus::CheckedOut),
        ];
        let found = find_available(&rooms, &booked, &stay("2024-06-01", "2024-06-04", 2, 0)).unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(found.iter().all(|r| r.quote.total == Decimal::from(240)));
    }

    #[test]
    fn never_returns_a_double_booked_room() {
        let rooms: Vec<RoomWithType> = (1..=6).map(|i| room(i, 1, 1, 4, 100)).collect();
        let booked: Vec<BookedSpan> = (1..=6)
            .map(|i| {
                let start = d("2024-06-01") + chrono::Duration::days(i);
                BookedSpan {
                    room_id: i,
                    check_in: start,
                    check_out: start + chrono::Duration::days(2),
                    status: ReservationStatus::Confirmed,
                }
            })
            .collect();
        let req = stay("2024-06-03", "2024-06-05", 1, 0);
        for r in find_available(&rooms, &booked, &req).unwrap() {
            assert!(!booked
                .iter()
                .any(|b| b.room_id == r.room_id && blocks(b, req.check_in, req.check_out)));
        }
    }

    #[test]
    fn occupancy_and_filters_narrow_the_result() {
        let rooms = vec![room(1, 1, 1, 2, 80), room(2, 2, 2, 4, 150), room(3, 2, 3, 4, 150)];
        let mut req = stay("2024-06-01", "2024-06-02", 2, 1);
        let ids: Vec<i64> = find_available(&rooms, &[], &req).unwrap().iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![2, 3]);

        req.floor = Some(3);
        let ids: Vec<i64> = find_available(&rooms, &[], &req).unwrap().iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![3]);

        req.floor = None;
        req.room_type_id = Some(1);
        assert!(find_available(&rooms, &[], &req).unwrap().is_empty());
    }

    #[test]
    fn empty_room_set_is_not_an_error() {
        let found = find_available(&[], &[], &stay("2024-06-01", "2024-06-02", 1, 0)).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn occupancy_check_reports_party_and_limit() {
        let r = room(1, 1, 1, 2, 80);
        let err = check_occupancy(&r, &stay("2024-06-01", "2024-06-02", 2, 1)).unwrap_err();
        assert_eq!(err, PricingError::OverOccupancy { party: 3, max: 2 });
    }

    #[test]
    fn overflowing_party_is_rejected_not_wrapped() {
        let req = stay("2024-06-01", "2024-06-02", i32::MAX, 1);
        assert_eq!(validate(&req), Err(PricingError::PartyTooLarge { max: MAX_PARTY_SIZE }));
        assert!(find_available(&[room(1, 1, 1, 2, 80)], &[], &req).is_err());
        assert!(check_occupancy(&room(1, 1, 1, 2, 80), &req).is_err());
        assert_eq!(req.party_size(), i32::MAX);
    }

    #[test]
    fn party_at_the_limit_is_accepted() {
        assert_eq!(validate(&stay("2024-06-01", "2024-06-02", MAX_PARTY_SIZE - 1, 1)), Ok(()));
        assert!(validate(&stay("2024-06-01", "2024-06-02", MAX_PARTY_SIZE, 1)).is_err());
    }

    #[test]
    fn stay_ending_on_check_in_day_does_not_block() {
        let departing = span(1, "2024-05-28", "2024-06-01", ReservationStatus::CheckedIn);
        let arriving = span(1, "2024-06-04", "2024-06-08", ReservationStatus::Confirmed);
        assert!(!blocks(&departing, d("2024-06-01"), d("2024-06-04")));
        assert!(!blocks(&arriving, d("2024-06-01"), d("2024-06-04")));
        assert!(blocks(&departing, d("2024-05-31"), d("2024-06-02")));

        let found = find_available(
            &[room(1, 1, 1, 2, 80)],
            &[departing, arriving],
            &stay("2024-06-01", "2024-06-04", 2, 0),
        )
        .unwrap();
        assert_eq!(found.len(), 1);
    }
}
