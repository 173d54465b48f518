use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

/// Request body for `POST /bookings`. Every field is optional on the wire so that
/// absence is reported as a validation error naming the field.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_price: Option<Decimal>,
}

/// Query string for `GET /vehicles/:id/availability`.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub vehicle_id: i64,
    pub start_date: Date,
    pub end_date: Date,
    pub available: bool,
    pub days: i64,
    pub total_price: Decimal,
}

/// Query string for the admin listing.
#[derive(Debug, Deserialize)]
pub struct BookingFilter {
    pub user_id: Option<i64>,
}
