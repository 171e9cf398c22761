use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use astro_core::body::{CelestialBodyPatch, NewCelestialBody};
use astro_core::stats::{BodyObservers, BodyStatistics};
use astro_core::{AppError, Fetch};

use crate::dto::{BodyListQuery, BodySearchQuery, CelestialBodyResponse, ErrorResponse};
use crate::error::ApiError;
use crate::extract::{IdPath, QueryParams, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/celestial-bodies", post(create_body).get(list_bodies))
        .route("/celestial-bodies/batch", post(create_bodies_batch))
        .route("/celestial-bodies/search/advanced", get(search_bodies))
        .route("/celestial-bodies/statistics", get(body_statistics))
        .route(
            "/celestial-bodies/{id}",
            get(get_body).put(update_body).delete(delete_body),
        )
        .route("/celestial-bodies/{id}/children", get(body_children))
        .route("/celestial-bodies/{id}/observers", get(body_observers))
}

fn not_found(id: i64) -> ApiError {
    ApiError(AppError::NotFound(format!("Celestial body {id} not found")))
}

fn responses(bodies: Vec<astro_core::body::CelestialBodyDetails>) -> Json<Vec<CelestialBodyResponse>> {
    Json(bodies.into_iter().map(Into::into).collect())
}

#[utoipa::path(
    post,
    path = "/celestial-bodies",
    request_body = NewCelestialBody,
    responses(
        (status = 201, description = "Body created", body = CelestialBodyResponse),
        (status = 400, description = "Name already taken", body = ErrorResponse),
        (status = 404, description = "Parent body not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn create_body(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<NewCelestialBody>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.db.body_repo().create(&body).await?;
    tracing::info!("Created celestial body {} ({})", created.body.name, created.body.id);
    Ok((StatusCode::CREATED, Json(CelestialBodyResponse::from(created))))
}

#[utoipa::path(
    post,
    path = "/celestial-bodies/batch",
    request_body = Vec<NewCelestialBody>,
    responses(
        (status = 201, description = "Bodies created; existing names skipped", body = [CelestialBodyResponse]),
        (status = 404, description = "Parent body not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn create_bodies_batch(
    State(state): State<Arc<AppState>>,
    ValidatedJson(bodies): ValidatedJson<Vec<NewCelestialBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.db.body_repo().create_many(&bodies).await?;
    tracing::info!(
        "Batch created {} of {} celestial bodies",
        created.len(),
        bodies.len()
    );
    Ok((StatusCode::CREATED, responses(created)))
}

#[utoipa::path(
    get,
    path = "/celestial-bodies",
    params(BodyListQuery),
    responses(
        (status = 200, description = "Matching bodies", body = [CelestialBodyResponse]),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn list_bodies(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<BodyListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, page) = query.into_parts()?;
    let bodies = state
        .db
        .body_repo()
        .list(&filter, None, page, Fetch::WithRelated)
        .await?;
    Ok(responses(bodies))
}

#[utoipa::path(
    get,
    path = "/celestial-bodies/search/advanced",
    params(BodySearchQuery),
    responses(
        (status = 200, description = "Matching bodies", body = [CelestialBodyResponse]),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn search_bodies(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<BodySearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, sort, page) = query.into_parts()?;
    let bodies = state
        .db
        .body_repo()
        .list(&filter, sort.as_ref(), page, Fetch::WithRelated)
        .await?;
    Ok(responses(bodies))
}

#[utoipa::path(
    get,
    path = "/celestial-bodies/statistics",
    responses((status = 200, description = "Catalog statistics", body = BodyStatistics)),
    tag = "celestial-bodies"
)]
pub async fn body_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BodyStatistics>, ApiError> {
    Ok(Json(state.db.body_repo().statistics().await?))
}

#[utoipa::path(
    get,
    path = "/celestial-bodies/{id}",
    params(("id" = i64, Path, description = "Body id")),
    responses(
        (status = 200, description = "Body", body = CelestialBodyResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn get_body(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<CelestialBodyResponse>, ApiError> {
    let body = state
        .db
        .body_repo()
        .get(id, Fetch::WithRelated)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(body.into()))
}

#[utoipa::path(
    put,
    path = "/celestial-bodies/{id}",
    params(("id" = i64, Path, description = "Body id")),
    request_body = CelestialBodyPatch,
    responses(
        (status = 200, description = "Updated body", body = CelestialBodyResponse),
        (status = 400, description = "Name already taken", body = ErrorResponse),
        (status = 404, description = "Body or new parent not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload or parent cycle", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn update_body(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ValidatedJson(patch): ValidatedJson<CelestialBodyPatch>,
) -> Result<Json<CelestialBodyResponse>, ApiError> {
    let updated = state.db.body_repo().update(id, &patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/celestial-bodies/{id}",
    params(("id" = i64, Path, description = "Body id")),
    responses(
        (status = 204, description = "Deleted along with its observations"),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn delete_body(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    if !state.db.body_repo().delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!("Deleted celestial body {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/celestial-bodies/{id}/children",
    params(("id" = i64, Path, description = "Parent body id")),
    responses(
        (status = 200, description = "Direct children", body = [CelestialBodyResponse]),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn body_children(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let children = state
        .db
        .body_repo()
        .children(id, Fetch::WithRelated)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(responses(children))
}

#[utoipa::path(
    get,
    path = "/celestial-bodies/{id}/observers",
    params(("id" = i64, Path, description = "Body id")),
    responses(
        (status = 200, description = "Astronomers who observed the body", body = BodyObservers),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "celestial-bodies"
)]
pub async fn body_observers(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<BodyObservers>, ApiError> {
    let observers = state
        .db
        .body_repo()
        .observers(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(observers))
}
