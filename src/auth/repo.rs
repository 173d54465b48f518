use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

const USER_COLUMNS: &str = "id, phone, country_code, name, otp_hash, otp_expires_at, created_at";

impl User {
    pub async fn find_by_phone(
        db: &PgPool,
        phone: &str,
        country_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1 AND country_code = $2"
        ))
        .bind(phone)
        .bind(country_code)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Stores a pending code, creating the user on first contact.
    pub async fn upsert_pending_code(
        db: &PgPool,
        phone: &str,
        country_code: &str,
        otp_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (phone, country_code, otp_hash, otp_expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone, country_code)
            DO UPDATE SET otp_hash = EXCLUDED.otp_hash, otp_expires_at = EXCLUDED.otp_expires_at
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(phone)
        .bind(country_code)
        .bind(otp_hash)
        .bind(expires_at)
        .fetch_one(db)
        .await
    }

    /// Clears the pending code only if it is still the one that was verified.
    /// `None` means another request consumed or replaced it first.
    pub async fn consume_code(
        db: &PgPool,
        id: i64,
        otp_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET otp_hash = NULL, otp_expires_at = NULL
             WHERE id = $1 AND otp_hash = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(otp_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn set_name(
        db: &PgPool,
        id: i64,
        name: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(db)
        .await
    }
}
