//! Login and logout handlers
//!
//! Sessions are opaque tokens stored in the `sessions` table and carried in
//! the `session_token` cookie.

use axum::{
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap,
    },
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::{ApiError, ApiJson, AppState};
use crate::auth::{generate_token, hash_password, verify_password};
use crate::data::User;

pub const SESSION_COOKIE: &str = "session_token";

/// Session lifetime in seconds (24 hours)
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub message: String,
}

/// `POST /api/login`
///
/// Creates the user on first login when the password matches the configured
/// login password.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password required"));
    }

    let existing = state.store.user_by_username(&req.username).await.map_err(|e| {
        error!(error = %e, "failed to look up user");
        ApiError::internal("failed to look up user")
    })?;

    let (user, message) = match existing {
        Some(user) => {
            if !check_password(&req.password, &user.password_hash).await? {
                warn!(username = %req.username, "login failed - invalid password");
                return Err(ApiError::unauthorized("invalid credentials"));
            }
            (user, "logged in successfully")
        }
        None if req.password == state.config.login_password => {
            let user = create_user(&state, &req.username, &req.password).await?;
            info!(username = %user.username, "created user on first login");
            (user, "User created and logged in")
        }
        None => {
            warn!(username = %req.username, "login failed - user not found");
            return Err(ApiError::unauthorized("invalid credentials"));
        }
    };

    let token = start_session(&state, &user).await?;
    info!(username = %user.username, "user logged in");

    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&token))]),
        Json(LoginResponse {
            token,
            username: user.username,
            message: message.to_string(),
        }),
    ))
}

/// `POST /api/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.store.delete_session(&token).await {
            error!(error = %e, "failed to delete session");
        }
    }

    (
        AppendHeaders([(SET_COOKIE, expired_session_cookie())]),
        Json(json!({ "message": "logged out successfully" })),
    )
}

/// Reads the session token from the request's `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_TTL_SECS}; HttpOnly; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

async fn check_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            ApiError::internal("failed to verify password")
        })
}

async fn create_user(state: &AppState, username: &str, password: &str) -> Result<User, ApiError> {
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| e.to_string())
        .and_then(|hashed| hashed.map_err(|e| e.to_string()))
        .map_err(|e| {
            error!(error = %e, "failed to hash password");
            ApiError::internal("failed to create user")
        })?;

    state
        .store
        .create_user(username, &password_hash)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create user");
            ApiError::internal("failed to create user")
        })
}

async fn start_session(state: &AppState, user: &User) -> Result<String, ApiError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::seconds(SESSION_TTL_SECS);
    state
        .store
        .create_session(user.id, &token, expires_at)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create session");
            ApiError::internal("failed to create session")
        })?;
    Ok(token)
}
