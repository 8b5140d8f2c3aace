use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    analytics::{self, Granularity},
    auth::CurrentUser,
    error::AppError,
    models::trip::TripRequest,
    routes::{ApiJson, ApiPath},
    services::registration,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/impactgraphday", get(impact_graph_day))
        .route("/impactgraphmonth", get(impact_graph_month))
        .route("/aggregation", get(aggregation))
        .route("/impact", get(total_impact))
        .route(
            "/:trip_id",
            get(get_trip).put(replace_trip).delete(delete_trip),
        )
}

// The window is recomputed on every request, so it slides with the clock.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(super) async fn list_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(user.id).await?;
    Ok(Json(json!({ "trips": trips })))
}

pub(super) async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<TripRequest>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let trip = registration::register_trip(&state, user.id, &req, today()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "trip registered", "trip": trip })),
    )
        .into_response())
}

async fn get_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trip = state.trips.get_owned(trip_id, user.id).await?;
    Ok(Json(json!({ "trip": trip })))
}

async fn replace_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
    ApiJson(req): ApiJson<TripRequest>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trip = registration::replace_trip(&state, user.id, trip_id, &req, today()).await?;
    Ok(Json(json!({ "trip": trip })))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    state.trips.get_owned(trip_id, user.id).await?;
    state.trips.delete(trip_id).await?;
    info!(trip_id, user_id = user.id, "trip deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn impact_graph(
    state: &AppState,
    current: &CurrentUser,
    granularity: Granularity,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(user.id).await?;
    let points = analytics::cumulative_series(&trips, granularity, today());
    Ok(Json(json!({ "points": points })))
}

async fn impact_graph_day(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    impact_graph(&state, &current, Granularity::Daily).await
}

async fn impact_graph_month(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    impact_graph(&state, &current, Granularity::Monthly).await
}

async fn aggregation(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(user.id).await?;
    let by_mode = analytics::aggregate_by_mode(&trips, &state.modes).await?;
    Ok(Json(json!({ "trips": by_mode })))
}

async fn total_impact(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(user.id).await?;
    Ok(Json(json!({ "total_impact": analytics::total_impact(&trips) })))
}
