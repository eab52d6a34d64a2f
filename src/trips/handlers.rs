use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateTripRequest, MessageResponse, TripEnvelope, UpdateTripRequest},
    repo_types::Trip,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn trip_routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route(
            "/trips/:id",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Trip with id {id} not found"))
}

/// Ids that cannot name a trip are reported like absent ones.
fn trip_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found(raw))
}

#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Trip>>> {
    let trips = state.trips.list_by_user(auth.id).await?;
    Ok(Json(trips))
}

#[instrument(skip(state, payload))]
pub async fn create_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<CreateTripRequest>,
) -> AppResult<(StatusCode, Json<TripEnvelope>)> {
    let valid = payload.validate()?;
    let itinerary = state.itinerary.draft(&valid.params()).await;
    let trip = state.trips.create(auth.id, valid.into_fields(itinerary)).await?;

    info!(trip_id = %trip.id, user_id = %auth.id, "trip created");
    Ok((
        StatusCode::CREATED,
        Json(TripEnvelope {
            message: format!("Success create a trip: {}", trip.title),
            trip,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Trip>> {
    let trip = state
        .trips
        .find_owned(trip_id(&id)?, auth.id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(trip))
}

#[instrument(skip(state, payload))]
pub async fn update_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateTripRequest>,
) -> AppResult<Json<TripEnvelope>> {
    let trip_id = trip_id(&id)?;
    let current = state
        .trips
        .find_owned(trip_id, auth.id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    let fields = payload.apply(&current)?;
    let trip = state
        .trips
        .update_owned(trip_id, auth.id, fields)
        .await?
        .ok_or_else(|| not_found(&id))?;

    info!(trip_id = %trip.id, status = %trip.status, "trip updated");
    Ok(Json(TripEnvelope {
        message: "Success update trip".into(),
        trip,
    }))
}

#[instrument(skip(state))]
pub async fn delete_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !state.trips.delete_owned(trip_id(&id)?, auth.id).await? {
        return Err(not_found(&id));
    }
    info!(trip_id = %id, "trip deleted");
    Ok(Json(MessageResponse {
        message: "Delete trip success".into(),
    }))
}
