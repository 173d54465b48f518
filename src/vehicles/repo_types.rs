use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Vehicle record with availability derived from today's active bookings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: Option<String>,
    pub seats: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub price_per_day: Decimal,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub available_today: bool,
}

/// Validated input for an administrative insert.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_per_day: Decimal,
    pub category: Option<String>,
    pub seats: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
}
