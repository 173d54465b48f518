use anyhow::Context;
use sqlx::PgPool;

use super::repo_types::{NewVehicle, Vehicle};

const VEHICLE_SELECT: &str = r#"
    SELECT v.id, v.make, v.model, v.year, v.category, v.seats, v.fuel_type, v.transmission,
           v.price_per_day, v.image_url, v.description, v.features, v.created_at,
           NOT EXISTS (
               SELECT 1
                 FROM bookings b
                WHERE b.vehicle_id = v.id
                  AND b.status <> 'CANCELLED'
                  AND b.start_date <= CURRENT_DATE
                  AND b.end_date >= CURRENT_DATE
           ) AS available_today
      FROM vehicles v
"#;

/// Whole catalog in id order.
pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Vehicle>> {
    let rows = sqlx::query_as::<_, Vehicle>(&format!("{VEHICLE_SELECT} ORDER BY v.id ASC"))
        .fetch_all(db)
        .await
        .context("list vehicles")?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: i64) -> anyhow::Result<Option<Vehicle>> {
    let row = sqlx::query_as::<_, Vehicle>(&format!("{VEHICLE_SELECT} WHERE v.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .with_context(|| format!("find vehicle {id}"))?;
    Ok(row)
}

pub async fn insert(db: &PgPool, new: &NewVehicle) -> anyhow::Result<Vehicle> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO vehicles (make, model, year, price_per_day, category, seats, fuel_type,
                              transmission, image_url, description, features)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        "#,
    )
    .bind(&new.make)
    .bind(&new.model)
    .bind(new.year)
    .bind(new.price_per_day)
    .bind(&new.category)
    .bind(new.seats)
    .bind(&new.fuel_type)
    .bind(&new.transmission)
    .bind(&new.image_url)
    .bind(&new.description)
    .bind(&new.features)
    .fetch_one(db)
    .await
    .context("insert vehicle")?;

    find(db, id)
        .await?
        .context("vehicle missing right after insert")
}
