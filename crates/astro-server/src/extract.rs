//! Request extractors that turn every malformed input into a 422 in the
//! standard error shape, and run payload validation before the handler.

use axum::extract::{Form, FromRequest, FromRequestParts, Json, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use astro_core::user::Credentials;
use astro_core::{AppError, Validate};

use crate::error::ApiError;

fn malformed(location: &str, detail: String) -> ApiError {
    ApiError(AppError::invalid(location, detail))
}

/// JSON body that deserialized and passed [`Validate`].
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| malformed("body", e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string deserialized into `T`; range checks happen in the DTO.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| malformed("query", e.body_text()))?;
        Ok(Self(value))
    }
}

/// Numeric `{id}` path segment.
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| malformed("id", e.body_text()))?;
        Ok(Self(id))
    }
}

/// Login credentials, accepted as an HTML form or as JSON.
pub struct LoginForm(pub Credentials);

impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let credentials = if is_form {
            let Form(credentials) = Form::<Credentials>::from_request(req, state)
                .await
                .map_err(|e| malformed("body", e.body_text()))?;
            credentials
        } else {
            let Json(credentials) = Json::<Credentials>::from_request(req, state)
                .await
                .map_err(|e| malformed("body", e.body_text()))?;
            credentials
        };
        credentials.validate()?;
        Ok(Self(credentials))
    }
}
