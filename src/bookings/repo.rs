use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, Transaction};

use super::range::DateRange;
use super::repo_types::{Booking, BookingStatus, BookingWithVehicle, NewBooking};

const BOOKING_COLUMNS: &str =
    "b.id, b.user_id, b.vehicle_id, b.start_date, b.end_date, b.total_price, b.status, b.created_at";

/// Daily rate of a vehicle, `None` if it does not exist.
pub async fn daily_rate(db: &PgPool, vehicle_id: i64) -> Result<Option<Decimal>, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>("SELECT price_per_day FROM vehicles WHERE id = $1")
        .bind(vehicle_id)
        .fetch_optional(db)
        .await
}

/// Takes a row lock on the vehicle for the rest of the transaction.
/// Concurrent creations for the same vehicle queue here.
pub async fn lock_vehicle_tx(
    tx: &mut Transaction<'_, Postgres>,
    vehicle_id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_scalar::<_, i64>("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
        .bind(vehicle_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Id of any non-cancelled booking on the vehicle whose inclusive range intersects `range`.
pub async fn find_conflict<'c, E>(
    executor: E,
    vehicle_id: i64,
    range: &DateRange,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
          FROM bookings
         WHERE vehicle_id = $1
           AND status <> 'CANCELLED'
           AND start_date <= $3
           AND end_date >= $2
         LIMIT 1
        "#,
    )
    .bind(vehicle_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_optional(executor)
    .await
}

pub async fn insert_booking_tx(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewBooking,
) -> Result<Booking, sqlx::Error> {
    sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (user_id, vehicle_id, start_date, end_date, total_price, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, vehicle_id, start_date, end_date, total_price, status, created_at
        "#,
    )
    .bind(new.user_id)
    .bind(new.vehicle_id)
    .bind(new.range.start)
    .bind(new.range.end)
    .bind(new.total_price)
    .bind(BookingStatus::Confirmed)
    .fetch_one(&mut **tx)
    .await
}

/// Compare-and-set cancellation. `None` when the booking is missing, not owned by
/// `user_id`, or already cancelled.
pub async fn cancel(
    db: &PgPool,
    booking_id: i64,
    user_id: i64,
) -> Result<Option<Booking>, sqlx::Error> {
    sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
           SET status = 'CANCELLED'
         WHERE id = $1 AND user_id = $2 AND status <> 'CANCELLED'
        RETURNING id, user_id, vehicle_id, start_date, end_date, total_price, status, created_at
        "#,
    )
    .bind(booking_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn find_for_user(
    db: &PgPool,
    booking_id: i64,
    user_id: i64,
) -> Result<Option<BookingWithVehicle>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {BOOKING_COLUMNS},
               v.make AS vehicle_make, v.model AS vehicle_model, v.year AS vehicle_year
          FROM bookings b
          LEFT JOIN vehicles v ON v.id = b.vehicle_id
         WHERE b.id = $1 AND b.user_id = $2
        "#
    );
    sqlx::query_as::<_, BookingWithVehicle>(&sql)
        .bind(booking_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

/// Newest first; all users when `user_id` is `None`.
pub async fn list(
    db: &PgPool,
    user_id: Option<i64>,
) -> Result<Vec<BookingWithVehicle>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {BOOKING_COLUMNS},
               v.make AS vehicle_make, v.model AS vehicle_model, v.year AS vehicle_year
          FROM bookings b
          LEFT JOIN vehicles v ON v.id = b.vehicle_id
         WHERE ($1::BIGINT IS NULL OR b.user_id = $1)
         ORDER BY b.created_at DESC, b.id DESC
        "#
    );
    sqlx::query_as::<_, BookingWithVehicle>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
}
