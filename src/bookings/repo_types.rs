use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use super::range::DateRange;

/// Reservation state. Transitions only `Confirmed -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// Booking record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub start_date: Date,
    pub end_date: Date,
    pub total_price: Decimal,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

/// Booking joined with the vehicle's headline fields, as shown in booking history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingWithVehicle {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
}

/// A validated, priced reservation ready for the atomic insert.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub vehicle_id: i64,
    pub range: DateRange,
    pub total_price: Decimal,
}
