use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database, keyed naturally by `(phone, country_code)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub country_code: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>, // Argon2 hash of the pending code
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
