use std::sync::Arc;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use astro_core::AppError;
use astro_core::security::INVALID_CREDENTIALS;
use astro_core::user::User;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Resolves the bearer token of a request to an active account.
///
/// Missing, invalid or expired tokens and tokens whose account is gone are
/// all `Unauthorized`; an existing but disabled account is `Forbidden`.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let Some(token) = bearer_token(headers) else {
        tracing::warn!("Request without bearer token");
        return Err(AppError::Unauthorized("Not authenticated".into()).into());
    };

    let claims = state.tokens.verify(token)?;

    let user = match state.db.user_repo().get_by_id(claims.uid).await? {
        Some(user) if user.username == claims.sub => user,
        _ => {
            tracing::warn!("Token subject {} no longer resolves to an account", claims.sub);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()).into());
        }
    };

    if !user.is_active {
        tracing::warn!("Inactive user {} presented a token", user.username);
        return Err(AppError::Forbidden("Inactive user".into()).into());
    }

    Ok(user)
}

/// The authenticated account behind the request.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await.map(Self)
    }
}

/// Middleware for the catalog routers. With write protection on, anything but
/// a read needs a bearer token, and deletes need a superuser.
pub async fn guard_writes(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if !state.protect_writes || matches!(method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }

    let user = match authenticate(&state, request.headers()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    if method == Method::DELETE && !user.is_superuser {
        tracing::warn!("User {} attempted a delete without superuser rights", user.username);
        return ApiError(AppError::Forbidden("Superuser privileges required".into())).into_response();
    }

    next.run(request).await
}
