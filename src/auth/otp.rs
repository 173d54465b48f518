use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, Rng};
use regex::Regex;
use time::OffsetDateTime;
use tracing::error;

use super::repo_types::User;
use crate::error::AppError;

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
    static ref COUNTRY_CODE_RE: Regex = Regex::new(r"^\+?\d{1,4}$").unwrap();
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Accepts `91` or `+91`; always returns the `+` form so both address the same user.
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !COUNTRY_CODE_RE.is_match(raw) {
        return None;
    }
    Some(format!("+{}", raw.trim_start_matches('+')))
}

/// Uniform 4-digit code.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

pub fn hash_code(code: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_code(code: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(code.as_bytes(), &parsed)
        .is_ok())
}

/// Checks a submitted code against the user's pending one.
/// No pending code is `NotFound`; then mismatch, then expiry.
pub fn check_pending_code(user: &User, code: &str, now: OffsetDateTime) -> Result<(), AppError> {
    let (Some(hash), Some(expires_at)) = (user.otp_hash.as_deref(), user.otp_expires_at) else {
        return Err(AppError::NotFound(
            "no pending code, request a new one".into(),
        ));
    };
    if !verify_code(code.trim(), hash)? {
        return Err(AppError::Auth("invalid code".into()));
    }
    if now > expires_at {
        return Err(AppError::Auth("code expired".into()));
    }
    Ok(())
}
