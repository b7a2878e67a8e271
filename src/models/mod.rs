// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ───────────────────────────────────────
// Status enums (stored as TEXT)
// ───────────────────────────────────────

/// Declares a status enum stored as upper-case TEXT, with `as_str` and `FromStr`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: stringify!($name), value: s.to_string() }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

text_enum!(RoomStatus {
    Available => "AVAILABLE",
    Occupied => "OCCUPIED",
    Cleaning => "CLEANING",
    Maintenance => "MAINTENANCE",
    OutOfOrder => "OUT_OF_ORDER",
});

text_enum!(ReservationStatus {
    Confirmed => "CONFIRMED",
    CheckedIn => "CHECKED_IN",
    CheckedOut => "CHECKED_OUT",
    Cancelled => "CANCELLED",
    NoShow => "NO_SHOW",
});

impl ReservationStatus {
    /// Statuses that hold the room for their stay interval.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Confirmed | ReservationStatus::CheckedIn)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// CONFIRMED → CHECKED_IN | CANCELLED | NO_SHOW, CHECKED_IN → CHECKED_OUT.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Confirmed, CheckedIn) | (Confirmed, Cancelled) | (Confirmed, NoShow) | (CheckedIn, CheckedOut)
        )
    }
}

text_enum!(StayPaymentStatus {
    Pending => "PENDING",
    Partial => "PARTIAL",
    Paid => "PAID",
    Refunded => "REFUNDED",
});

text_enum!(InvoiceStatus {
    Pending => "PENDING",
    Sent => "SENT",
    Paid => "PAID",
    Overdue => "OVERDUE",
    Cancelled => "CANCELLED",
});

text_enum!(InvoicePaymentStatus {
    Unpaid => "UNPAID",
    Partial => "PARTIAL",
    Paid => "PAID",
    Overpaid => "OVERPAID",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Refunded => "REFUNDED",
});

text_enum!(PaymentMethod {
    Cash => "CASH",
    Card => "CARD",
    Transfer => "TRANSFER",
    Other => "OTHER",
});

text_enum!(HousekeepingStatus {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Done => "DONE",
});

// ───────────────────────────────────────
// Rooms
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomType {
    pub room_type_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub max_occupancy: i32,
    pub base_rate: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub room_id: i64,
    pub number: String,
    pub room_type_id: i64,
    pub floor: i32,
    pub status: String, // RoomStatus
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Room joined with the type columns availability and pricing need.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomWithType {
    pub room_id: i64,
    pub number: String,
    pub floor: i32,
    pub status: String,
    pub room_type_id: i64,
    pub room_type_name: String,
    pub max_occupancy: i32,
    pub base_rate: Decimal,
    pub currency: String,
}

// ───────────────────────────────────────
// Guests & reservations
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guest {
    pub guest_id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub is_vip: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub reservation_id: i64,
    pub confirmation_code: Uuid,
    pub guest_id: i64,
    pub room_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate, // exclusive
    pub adults: i32,
    pub children: i32,
    pub status: String,         // ReservationStatus
    pub payment_status: String, // StayPaymentStatus
    pub nights: i32,
    pub room_rate: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Billing
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub guest_id: Option<i64>,
    pub company_name: Option<String>,
    pub reservation_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub discount_amount: Decimal,
    pub iva_rate: Decimal,
    pub municipal_rate: Decimal,
    pub service_rate: Decimal,
    pub subtotal: Decimal,
    pub taxable_base: Decimal,
    pub iva_amount: Decimal,
    pub municipal_amount: Decimal,
    pub service_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,         // InvoiceStatus
    pub payment_status: String, // InvoicePaymentStatus
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceLine {
    pub invoice_line_id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_taxable: bool,
    pub line_total: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: i64,
    pub invoice_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub method: String, // PaymentMethod
    pub status: String, // PaymentStatus
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Housekeeping
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HousekeepingTask {
    pub task_id: i64,
    pub room_id: i64,
    pub reservation_id: Option<i64>,
    pub task_type: String,
    pub status: String, // HousekeepingStatus
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips_through_from_str() {
        assert_eq!("checked_in".parse::<ReservationStatus>().unwrap(), ReservationStatus::CheckedIn);
        assert_eq!(RoomStatus::OutOfOrder.as_str(), "OUT_OF_ORDER");
        assert!("LOST".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn reservation_status_machine() {
        use ReservationStatus::*;
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(CheckedIn.can_transition_to(CheckedOut));
        assert!(!CheckedIn.can_transition_to(Cancelled));
        assert!(!CheckedOut.can_transition_to(CheckedIn));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(Confirmed.is_active() && CheckedIn.is_active());
        assert!(NoShow.is_terminal());
    }

    #[test]
    fn serde_uses_stored_text() {
        let json = serde_json::to_string(&InvoiceStatus::Overdue).unwrap();
        assert_eq!(json, "\"OVERDUE\"");
        let parsed: HousekeepingStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(parsed, HousekeepingStatus::InProgress);
    }
}
