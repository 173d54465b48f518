use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BookingFilter, CreateBookingRequest},
    repo_types::{Booking, BookingWithVehicle},
    services,
};
use crate::{
    auth::extractors::{AdminKey, AuthUser},
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", patch(cancel_booking))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/bookings", get(admin_list_bookings))
}

#[instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<BookingWithVehicle>>> {
    Ok(Json(state.bookings.list(Some(user_id)).await?))
}

#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<BookingWithVehicle>> {
    state
        .bookings
        .find_for_user(id, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("booking not found".into()))
}

/// POST /bookings. The user comes from the session, never from the body.
#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Booking>)> {
    let booking = services::create_booking(state.bookings.as_ref(), user_id, &payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/bookings/{}", booking.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(booking)))
}

#[instrument(skip(state))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Booking>> {
    Ok(Json(
        services::cancel_booking(state.bookings.as_ref(), user_id, id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn admin_list_bookings(
    State(state): State<AppState>,
    _admin: AdminKey,
    AppQuery(filter): AppQuery<BookingFilter>,
) -> AppResult<Json<Vec<BookingWithVehicle>>> {
    Ok(Json(state.bookings.list(filter.user_id).await?))
}
