use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::{error::AppError, routes::ApiPath, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modes))
        .route("/:mode_id", get(get_mode))
}

pub(super) async fn list_modes(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let modes = state.modes.list().await?;
    Ok(Json(json!({ "modes": modes })))
}

async fn get_mode(
    State(state): State<AppState>,
    ApiPath(mode_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let mode = state.modes.get(mode_id).await?;
    Ok(Json(json!({ "mode": mode })))
}
