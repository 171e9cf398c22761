use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use astro_core::astronomer::{AstronomerPatch, NewAstronomer};
use astro_core::stats::{AstronomerObservations, AstronomerStatistics};
use astro_core::{AppError, Fetch};

use crate::dto::{AstronomerListQuery, AstronomerResponse, ErrorResponse, PageQuery};
use crate::error::ApiError;
use crate::extract::{IdPath, QueryParams, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/astronomers", post(create_astronomer).get(list_astronomers))
        .route("/astronomers/statistics", get(astronomer_statistics))
        .route(
            "/astronomers/{id}",
            get(get_astronomer)
                .put(update_astronomer)
                .delete(delete_astronomer),
        )
        .route("/astronomers/{id}/observations", get(astronomer_observations))
}

fn not_found(id: i64) -> ApiError {
    ApiError(AppError::NotFound(format!("Astronomer {id} not found")))
}

#[utoipa::path(
    post,
    path = "/astronomers",
    request_body = NewAstronomer,
    responses(
        (status = 201, description = "Astronomer created", body = AstronomerResponse),
        (status = 400, description = "Same first and last name already exists", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn create_astronomer(
    State(state): State<Arc<AppState>>,
    ValidatedJson(astronomer): ValidatedJson<NewAstronomer>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.db.astronomer_repo().create(&astronomer).await?;
    tracing::info!(
        "Created astronomer {} ({})",
        created.astronomer.full_name(),
        created.astronomer.id
    );
    Ok((StatusCode::CREATED, Json(AstronomerResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/astronomers",
    params(AstronomerListQuery),
    responses(
        (status = 200, description = "Matching astronomers", body = [AstronomerResponse]),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn list_astronomers(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<AstronomerListQuery>,
) -> Result<Json<Vec<AstronomerResponse>>, ApiError> {
    let (filter, sort, page) = query.into_parts()?;
    let astronomers = state
        .db
        .astronomer_repo()
        .list(&filter, sort.as_ref(), page, Fetch::WithRelated)
        .await?;
    Ok(Json(astronomers.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/astronomers/statistics",
    responses((status = 200, description = "Astronomer statistics", body = AstronomerStatistics)),
    tag = "astronomers"
)]
pub async fn astronomer_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AstronomerStatistics>, ApiError> {
    Ok(Json(state.db.astronomer_repo().statistics().await?))
}

#[utoipa::path(
    get,
    path = "/astronomers/{id}",
    params(("id" = i64, Path, description = "Astronomer id")),
    responses(
        (status = 200, description = "Astronomer with observed bodies", body = AstronomerResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn get_astronomer(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<AstronomerResponse>, ApiError> {
    let astronomer = state
        .db
        .astronomer_repo()
        .get(id, Fetch::WithRelated)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(astronomer.into()))
}

#[utoipa::path(
    put,
    path = "/astronomers/{id}",
    params(("id" = i64, Path, description = "Astronomer id")),
    request_body = AstronomerPatch,
    responses(
        (status = 200, description = "Updated astronomer", body = AstronomerResponse),
        (status = 400, description = "Same first and last name already exists", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn update_astronomer(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ValidatedJson(patch): ValidatedJson<AstronomerPatch>,
) -> Result<Json<AstronomerResponse>, ApiError> {
    let updated = state.db.astronomer_repo().update(id, &patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/astronomers/{id}",
    params(("id" = i64, Path, description = "Astronomer id")),
    responses(
        (status = 204, description = "Deleted along with their observations"),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn delete_astronomer(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    if !state.db.astronomer_repo().delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!("Deleted astronomer {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/astronomers/{id}/observations",
    params(("id" = i64, Path, description = "Astronomer id"), PageQuery),
    responses(
        (status = 200, description = "Observations, newest first", body = AstronomerObservations),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "astronomers"
)]
pub async fn astronomer_observations(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<AstronomerObservations>, ApiError> {
    let page = query.page()?;
    let observations = state
        .db
        .astronomer_repo()
        .observations(id, page)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(observations))
}
