//! Account endpoints: register, login, logout, and the current-user view,
//! plus the session-token extractors shared by the protected routes.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation;
use crate::auth::password;
use crate::config::BootstrapDoctor;
use crate::db::{DbPool, LoginRequest, LoginResponse, RegisterRequest, User, UserResponse};
use crate::AppState;

/// Session token cookie name
pub const SESSION_COOKIE: &str = "triagr_session";

/// Extract the raw token from the Authorization header or, failing that,
/// from the session cookie
fn token_from(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if auth_header.starts_with("Bearer ") {
            return Some(auth_header[7..].to_string());
        }
    }

    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Opaque session token carried by the request. Extraction fails with 401
/// when neither transport carries one; whether the token is still live is
/// decided by the session store, never here.
pub struct SessionToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("Not authenticated"))?;

        token_from(&parts.headers, &jar)
            .map(SessionToken)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Authenticated caller, resolved to the public user view.
pub struct CurrentUser(pub UserResponse);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        let user = state.auth.current_user(&token).await?;
        Ok(CurrentUser(user))
    }
}

/// Validate a RegisterRequest
fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validation::validate_username(&req.username) {
        errors.add("username", e);
    }
    if let Err(e) = validation::validate_display_name(&req.display_name) {
        errors.add("display_name", e);
    }
    if let Err(e) = validation::validate_password(&req.password) {
        errors.add("password", e);
    }

    errors.finish()
}

/// Create a patient account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_register_request(&request)?;

    let user = state
        .auth
        .register(
            &request.username,
            request.display_name.trim(),
            &request.password,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Verify credentials, issue a session, and set the session cookie
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (issued, user) = state
        .auth
        .login(&request.username, &request.password)
        .await?;

    // Cookie lifetime mirrors the session TTL
    let cookie = Cookie::build((SESSION_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(state.auth.sessions().ttl_hours()))
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: issued.token,
            user,
        }),
    ))
}

/// Revoke the session, if any, and clear the cookie. Idempotent.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(token) = token_from(&headers, &jar) {
        state.auth.logout(&token).await?;
    }

    // The removal cookie must carry the same path the login cookie was set
    // with, or browsers keep the original alive
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    Ok((jar.remove(removal), StatusCode::NO_CONTENT))
}

/// Public view of the authenticated user
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user)
}

/// Create the configured doctor account at startup when its username does
/// not exist yet. Never overwrites an existing user.
pub async fn ensure_bootstrap_doctor(
    db: &DbPool,
    bootstrap: &BootstrapDoctor,
) -> anyhow::Result<()> {
    if User::find_by_username(db, &bootstrap.username)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let password_hash = password::hash_password(&bootstrap.password)?;
    User::create(
        db,
        &bootstrap.username,
        &bootstrap.display_name,
        &password_hash,
        true,
    )
    .await?;

    info!("Created bootstrap doctor account {}", bootstrap.username);
    Ok(())
}
