use axum::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

use super::range::DateRange;
use super::repo;
use super::repo_types::{Booking, BookingWithVehicle, NewBooking};
use crate::error::{AppError, AppResult};

/// Shared reservation collection.
///
/// `insert_if_free` is the only operation with cross-request ordering requirements:
/// the overlap check and the insert must behave as one atomic unit per vehicle.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn daily_rate(&self, vehicle_id: i64) -> AppResult<Option<Decimal>>;

    /// Inserts a `CONFIRMED` booking unless an active booking on the same vehicle
    /// overlaps its range. Fails with `Conflict` (nothing written) or `NotFound`.
    async fn insert_if_free(&self, new: NewBooking) -> AppResult<Booking>;

    async fn is_free(&self, vehicle_id: i64, range: DateRange) -> AppResult<bool>;

    async fn cancel(&self, booking_id: i64, user_id: i64) -> AppResult<Option<Booking>>;

    async fn find_for_user(
        &self,
        booking_id: i64,
        user_id: i64,
    ) -> AppResult<Option<BookingWithVehicle>>;

    async fn list(&self, user_id: Option<i64>) -> AppResult<Vec<BookingWithVehicle>>;
}

#[derive(Clone)]
pub struct PgBookingStore {
    db: PgPool,
}

impl PgBookingStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn daily_rate(&self, vehicle_id: i64) -> AppResult<Option<Decimal>> {
        Ok(repo::daily_rate(&self.db, vehicle_id).await?)
    }

    async fn insert_if_free(&self, new: NewBooking) -> AppResult<Booking> {
        let mut tx = self.db.begin().await?;

        if !repo::lock_vehicle_tx(&mut tx, new.vehicle_id).await? {
            return Err(AppError::NotFound("vehicle not found".into()));
        }

        if let Some(existing) = repo::find_conflict(&mut *tx, new.vehicle_id, &new.range).await? {
            debug!(vehicle_id = new.vehicle_id, existing, "booking overlaps existing reservation");
            return Err(AppError::vehicle_unavailable());
        }

        let booking = repo::insert_booking_tx(&mut tx, &new)
            .await
            .map_err(AppError::from_booking_insert)?;
        tx.commit().await.map_err(AppError::from_booking_insert)?;
        Ok(booking)
    }

    async fn is_free(&self, vehicle_id: i64, range: DateRange) -> AppResult<bool> {
        Ok(repo::find_conflict(&self.db, vehicle_id, &range)
            .await?
            .is_none())
    }

    async fn cancel(&self, booking_id: i64, user_id: i64) -> AppResult<Option<Booking>> {
        Ok(repo::cancel(&self.db, booking_id, user_id).await?)
    }

    async fn find_for_user(
        &self,
        booking_id: i64,
        user_id: i64,
    ) -> AppResult<Option<BookingWithVehicle>> {
        Ok(repo::find_for_user(&self.db, booking_id, user_id).await?)
    }

    async fn list(&self, user_id: Option<i64>) -> AppResult<Vec<BookingWithVehicle>> {
        Ok(repo::list(&self.db, user_id).await?)
    }
}
