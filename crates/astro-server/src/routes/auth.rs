use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use astro_core::AppError;
use astro_core::security::{dummy_hash, hash_password, verify_password};
use astro_core::user::{NewUser, PasswordChange, UserPatch, UserRecord};

use crate::auth::CurrentUser;
use crate::dto::{ErrorResponse, TokenResponse, UserResponse};
use crate::error::ApiError;
use crate::extract::{LoginForm, ValidatedJson};
use crate::state::AppState;

const BAD_LOGIN: &str = "Incorrect username or password";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(login))
        .route("/auth/me", get(me).put(update_me))
        .route("/auth/me/change-password", post(change_password))
}

/// Hashing and verification run on the blocking pool.
async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Generic(format!("Password hashing task failed: {e}")))?
}

async fn verify_blocking(password: String, hashed: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(|e| AppError::Generic(format!("Password check task failed: {e}")))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = NewUser,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Username or email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(registration): ValidatedJson<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    let hashed = hash_blocking(registration.password.clone()).await?;
    let record = UserRecord::from_registration(registration, hashed);
    let user = state.db.user_repo().create(&record).await?;
    tracing::info!("Registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/auth/token",
    request_body(
        content = astro_core::user::Credentials,
        content_type = "application/x-www-form-urlencoded",
        description = "Username (or email) and password, as a form or JSON"
    ),
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 401, description = "Bad credentials or inactive account", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    LoginForm(credentials): LoginForm,
) -> Result<Json<TokenResponse>, ApiError> {
    let repo = state.db.user_repo();
    let Some(user) = repo.find_for_login(&credentials.username).await? else {
        verify_blocking(credentials.password, dummy_hash().to_owned()).await?;
        tracing::warn!("Login attempt for unknown account");
        return Err(AppError::Unauthorized(BAD_LOGIN.into()).into());
    };

    if !verify_blocking(credentials.password, user.hashed_password.clone()).await? {
        tracing::warn!("Wrong password for user {}", user.username);
        return Err(AppError::Unauthorized(BAD_LOGIN.into()).into());
    }
    if !user.is_active {
        tracing::warn!("Login attempt for inactive user {}", user.username);
        return Err(AppError::Unauthorized(BAD_LOGIN.into()).into());
    }

    let token = state.tokens.issue(&user)?;
    repo.touch_last_login(user.id).await?;
    tracing::info!("User {} logged in", user.username);

    Ok(Json(TokenResponse {
        access_token: token.access_token,
        token_type: "bearer",
        expires_in: token.expires_in,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Inactive account", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

#[utoipa::path(
    put,
    path = "/auth/me",
    request_body = UserPatch,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Email already registered", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(patch): ValidatedJson<UserPatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.db.user_repo().update_profile(user.id, &patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    post,
    path = "/auth/me/change-password",
    request_body = PasswordChange,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Unauthorized or wrong old password", body = ErrorResponse),
        (status = 422, description = "New password too weak", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(change): ValidatedJson<PasswordChange>,
) -> Result<StatusCode, ApiError> {
    if !verify_blocking(change.old_password, user.hashed_password.clone()).await? {
        tracing::warn!("Wrong old password from user {}", user.username);
        return Err(AppError::Unauthorized("Incorrect password".into()).into());
    }

    let hashed = hash_blocking(change.new_password).await?;
    state.db.user_repo().set_password(user.id, &hashed).await?;
    tracing::info!("User {} changed their password", user.username);
    Ok(StatusCode::NO_CONTENT)
}
