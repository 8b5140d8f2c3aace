use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{session::Session, user::User},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "carbon_session";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A bearer header wins over the cookie.
        let token = match bearer_token(&parts.headers) {
            Some(token) => Some(token),
            None => {
                let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
                    Ok(jar) => jar,
                    Err(never) => match never {},
                };
                jar.get(SESSION_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            }
        };

        match token {
            Some(token) => Ok(Self(resolve_session(state, &token).await?)),
            None => Ok(Self(None)),
        }
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| anyhow!("failed to encode password salt: {err}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::InvalidInput("email is empty".into()));
    }
    if !email.contains('@') {
        return Err(AppError::InvalidInput("email is not valid".into()));
    }
    if username.is_empty() {
        return Err(AppError::InvalidInput("username is empty".into()));
    }
    if password.is_empty() {
        return Err(AppError::InvalidInput("password is empty".into()));
    }

    let email_taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if email_taken.is_some() {
        return Err(AppError::Conflict("email already exists".into()));
    }
    let username_taken: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&state.db)
            .await?;
    if username_taken.is_some() {
        return Err(AppError::Conflict("username already exists".into()));
    }

    let password_hash = hash_password(password)?;
    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (uuid, username, email, password_hash, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           RETURNING id, uuid, username, email, password_hash, created_at, updated_at, last_login_at"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(&email)
    .bind(password_hash)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user.into())
}

/// Checks credentials. `identifier` may be the email address or the username.
pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(AppError::InvalidInput("email is empty".into()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, uuid, username, email, password_hash, created_at, updated_at, last_login_at
           FROM users WHERE email = ?1 OR username = ?2"#,
    )
    .bind(identifier.to_lowercase())
    .bind(identifier)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = user.id, "rejected login with wrong password");
        return Err(AppError::Unauthorized);
    }

    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(user.into())
}

pub async fn find_user(state: &AppState, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"SELECT id, uuid, username, email, password_hash, created_at, updated_at, last_login_at
           FROM users WHERE id = ?1"#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("user not found".into()))
}

pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    sqlx::query(
        r#"INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at)
           VALUES (?1, ?2, ?3, ?3, ?4)"#,
    )
    .bind(token_digest(&token))
    .bind(user_id)
    .bind(now)
    .bind(now + state.config.session_ttl)
    .execute(&state.db)
    .await?;
    Ok(token)
}

pub async fn destroy_session(state: &AppState, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(token_digest(token))
        .execute(&state.db)
        .await?;
    Ok(())
}

/// The user behind a token, or `None` for unknown and expired sessions.
pub async fn resolve_session(
    state: &AppState,
    token: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let digest = token_digest(token);
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, created_at, last_seen_at, expires_at FROM sessions WHERE id = ?1",
    )
    .bind(&digest)
    .fetch_optional(&state.db)
    .await?;
    let Some(session) = session else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.is_expired(now) {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(&digest)
            .execute(&state.db)
            .await?;
        return Ok(None);
    }

    sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(&digest)
        .execute(&state.db)
        .await?;

    match find_user(state, session.user_id).await {
        Ok(user) => Ok(Some(user.into())),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn apply_session_cookie(jar: PrivateCookieJar, token: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
