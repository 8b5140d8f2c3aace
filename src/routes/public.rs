use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    routes::ApiJson,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/login/cookie", post(login_cookie))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let user = auth::register_user(&state, &req.username, &req.email, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "user_id": user.id })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(alias = "email")]
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::authenticate_user(&state, &req.identifier, &req.password).await?;
    let token = auth::create_session(&state, user.id).await?;
    info!(user_id = user.id, "login");
    Ok(Json(json!({ "token": token })))
}

async fn login_cookie(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let user = auth::authenticate_user(&state, &req.identifier, &req.password).await?;
    let token = auth::create_session(&state, user.id).await?;
    info!(user_id = user.id, "login with cookie");
    Ok((auth::apply_session_cookie(jar, &token), Redirect::to("/")))
}

async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), AppError> {
    current.require_user()?;
    let token = auth::bearer_token(&headers)
        .or_else(|| jar.get(auth::SESSION_COOKIE).map(|c| c.value().to_string()));
    if let Some(token) = token {
        auth::destroy_session(&state, &token).await?;
    }
    Ok((auth::clear_session_cookie(jar), StatusCode::NO_CONTENT))
}
