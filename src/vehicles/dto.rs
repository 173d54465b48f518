use rust_decimal::Decimal;
use serde::Deserialize;

use super::repo_types::NewVehicle;
use crate::bookings::services::MAX_TOTAL_PRICE;
use crate::error::{AppError, AppResult};

/// Request body for `POST /vehicles`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_per_day: Option<Decimal>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub seats: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

fn text(field: &'static str, value: Option<String>) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing(field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<CreateVehicleRequest> for NewVehicle {
    type Error = AppError;

    fn try_from(req: CreateVehicleRequest) -> AppResult<Self> {
        let make = text("make", req.make)?;
        let model = text("model", req.model)?;
        let year = req.year.ok_or_else(|| AppError::missing("year"))?;
        let price_per_day = req
            .price_per_day
            .ok_or_else(|| AppError::missing("price_per_day"))?;

        if !(1886..=2100).contains(&year) {
            return Err(AppError::validation("year", "out of range"));
        }
        if price_per_day <= Decimal::ZERO {
            return Err(AppError::validation("price_per_day", "must be positive"));
        }
        if price_per_day > MAX_TOTAL_PRICE {
            return Err(AppError::validation("price_per_day", "too large"));
        }
        if req.seats.is_some_and(|s| s <= 0) {
            return Err(AppError::validation("seats", "must be positive"));
        }

        Ok(NewVehicle {
            make,
            model,
            year,
            price_per_day: price_per_day.round_dp(2),
            category: optional_text(req.category),
            seats: req.seats,
            fuel_type: optional_text(req.fuel_type),
            transmission: optional_text(req.transmission),
            image_url: optional_text(req.image_url),
            description: optional_text(req.description),
            features: req
                .features
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        })
    }
}
