use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::User;

/// Request body for `POST /auth/otp/request`.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub phone: Option<String>,
    pub country_code: Option<String>,
}

/// Request body for `POST /auth/otp/verify`.
#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub phone: Option<String>,
    pub country_code: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OtpIssuedResponse {
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Present only when the demo delivery channel is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_hint: Option<String>,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Request body for `PATCH /me`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

/// Response returned after OTP verification or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub phone: String,
    pub country_code: String,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            phone: u.phone,
            country_code: u.country_code,
            name: u.name,
            created_at: u.created_at,
        }
    }
}
