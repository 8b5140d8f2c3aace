use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(profile))
}

#[derive(Serialize)]
struct Profile {
    id: i64,
    uuid: String,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Profile>, AppError> {
    let user = current.require_user()?;
    let user = auth::find_user(&state, user.id).await?;
    Ok(Json(Profile {
        id: user.id,
        uuid: user.uuid,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
        last_login_at: user.last_login_at,
    }))
}
