use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use astro_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<astro_core::ValidationErrors> for ApiError {
    fn from(errors: astro_core::ValidationErrors) -> Self {
        Self(AppError::ValidationError(errors))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::ValidationError(_) | AppError::SerializationError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, detail, errors) = match self.0 {
            AppError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors.fields().to_vec()),
            ),
            AppError::SerializationError(e) => ("validation_error", e.to_string(), None),
            AppError::Conflict(msg) => ("conflict", msg, None),
            AppError::NotFound(msg) => ("not_found", msg, None),
            AppError::Unauthorized(msg) => ("unauthorized", msg, None),
            AppError::Forbidden(msg) => ("forbidden", msg, None),
            other => {
                tracing::error!("Request failed: {other}");
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            detail,
            errors,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
