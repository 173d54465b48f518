use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, OtpIssuedResponse, OtpRequest, OtpVerifyRequest, PublicUser,
            RefreshRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        otp::{
            check_pending_code, generate_code, hash_code, is_valid_phone, normalize_country_code,
        },
        repo_types::User,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/otp/request", post(request_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

fn required(field: &'static str, value: Option<String>) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing(field))
}

fn identity(phone: Option<String>, country_code: Option<String>) -> AppResult<(String, String)> {
    let phone = required("phone", phone)?;
    let country_code = required("country_code", country_code)?;
    if !is_valid_phone(&phone) {
        return Err(AppError::validation("phone", "phone must be exactly 10 digits"));
    }
    let country_code = normalize_country_code(&country_code)
        .ok_or_else(|| AppError::validation("country_code", "invalid country code"))?;
    Ok((phone, country_code))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::from(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::from(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token: Some(refresh_token),
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn request_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<OtpRequest>,
) -> AppResult<Json<OtpIssuedResponse>> {
    let (phone, country_code) = identity(payload.phone, payload.country_code)?;

    let code = generate_code();
    let hash = hash_code(&code)?;
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(state.config.otp.ttl_minutes);

    let user = User::upsert_pending_code(&state.db, &phone, &country_code, &hash, expires_at).await?;

    state
        .otp_sender
        .send(&country_code, &phone, &code)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = user.id, "otp delivery failed");
            AppError::from(e)
        })?;

    info!(user_id = user.id, "otp requested");
    Ok(Json(OtpIssuedResponse {
        message: "OTP sent successfully",
        expires_at,
        otp_hint: state.config.otp.expose_code.then_some(code),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<OtpVerifyRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (phone, country_code) = identity(payload.phone, payload.country_code)?;
    let code = required("otp", payload.otp)?;

    let user = User::find_by_phone(&state.db, &phone, &country_code)
        .await?
        .ok_or_else(|| {
            warn!(%country_code, %phone, "otp verify for unknown user");
            AppError::NotFound("user not found, request a code first".into())
        })?;

    if let Err(e) = check_pending_code(&user, &code, OffsetDateTime::now_utc()) {
        warn!(user_id = user.id, error = %e, "otp verification failed");
        return Err(e);
    }

    // The hash was present, otherwise check_pending_code would have failed.
    let hash = user.otp_hash.as_deref().unwrap_or_default();
    let user = User::consume_code(&state.db, user.id, hash)
        .await?
        .ok_or_else(|| AppError::NotFound("no pending code, request a new one".into()))?;

    info!(user_id = user.id, "user verified");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = required("refresh_token", payload.refresh_token)?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&token)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth("user not found".into()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        error!(user_id, "user not found");
        AppError::Auth("user not found".into())
    })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if name.is_some_and(|n| n.chars().count() > 100) {
        return Err(AppError::validation("name", "name too long"));
    }
    let user = User::set_name(&state.db, user_id, name)
        .await?
        .ok_or_else(|| AppError::Auth("user not found".into()))?;
    Ok(Json(user.into()))
}
