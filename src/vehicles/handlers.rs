use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{dto::CreateVehicleRequest, repo, repo_types::{NewVehicle, Vehicle}};
use crate::{
    auth::extractors::AdminKey,
    bookings::{
        dto::{AvailabilityQuery, AvailabilityResponse},
        services::check_availability,
    },
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/vehicles/:id/availability", get(get_availability))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/vehicles", axum::routing::post(create_vehicle))
}

#[instrument(skip(state))]
pub async fn list_vehicles(State(state): State<AppState>) -> AppResult<Json<Vec<Vehicle>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_vehicle(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Vehicle>> {
    repo::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("vehicle not found".into()))
}

#[instrument(skip(state))]
pub async fn get_availability(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    Ok(Json(check_availability(state.bookings.as_ref(), id, &query).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_vehicle(
    State(state): State<AppState>,
    _admin: AdminKey,
    AppJson(payload): AppJson<CreateVehicleRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Vehicle>)> {
    let new = NewVehicle::try_from(payload)?;
    let vehicle = repo::insert(&state.db, &new).await?;
    info!(vehicle_id = vehicle.id, make = %vehicle.make, model = %vehicle.model, "vehicle created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/vehicles/{}", vehicle.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(vehicle)))
}
