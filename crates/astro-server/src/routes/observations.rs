use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use astro_core::observation::{NewObservation, ObservationPatch};
use astro_core::stats::ObservationStatistics;
use astro_core::{AppError, Fetch};

use crate::dto::{ErrorResponse, ObservationListQuery, ObservationResponse};
use crate::error::ApiError;
use crate::extract::{IdPath, QueryParams, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/observations", post(create_observation).get(list_observations))
        .route("/observations/statistics", get(observation_statistics))
        .route(
            "/observations/{id}",
            get(get_observation)
                .put(update_observation)
                .delete(delete_observation),
        )
}

fn not_found(id: i64) -> ApiError {
    ApiError(AppError::NotFound(format!("Observation {id} not found")))
}

#[utoipa::path(
    post,
    path = "/observations",
    request_body = NewObservation,
    responses(
        (status = 201, description = "Observation recorded", body = ObservationResponse),
        (status = 400, description = "Already observed on that day", body = ErrorResponse),
        (status = 404, description = "Astronomer or body not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "observations"
)]
pub async fn create_observation(
    State(state): State<Arc<AppState>>,
    ValidatedJson(observation): ValidatedJson<NewObservation>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.db.observation_repo().create(&observation).await?;
    tracing::info!(
        "Recorded observation {} of body {} by astronomer {}",
        created.observation.id,
        created.observation.celestial_body_id,
        created.observation.astronomer_id
    );
    Ok((StatusCode::CREATED, Json(ObservationResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/observations",
    params(ObservationListQuery),
    responses(
        (status = 200, description = "Observations, newest first", body = [ObservationResponse]),
        (status = 422, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "observations"
)]
pub async fn list_observations(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ObservationListQuery>,
) -> Result<Json<Vec<ObservationResponse>>, ApiError> {
    let (filter, page) = query.into_parts()?;
    let observations = state
        .db
        .observation_repo()
        .list(&filter, page, Fetch::WithRelated)
        .await?;
    Ok(Json(observations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/observations/statistics",
    responses((status = 200, description = "Observation statistics", body = ObservationStatistics)),
    tag = "observations"
)]
pub async fn observation_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ObservationStatistics>, ApiError> {
    Ok(Json(state.db.observation_repo().statistics().await?))
}

#[utoipa::path(
    get,
    path = "/observations/{id}",
    params(("id" = i64, Path, description = "Observation id")),
    responses(
        (status = 200, description = "Observation", body = ObservationResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "observations"
)]
pub async fn get_observation(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<ObservationResponse>, ApiError> {
    let observation = state
        .db
        .observation_repo()
        .get(id, Fetch::WithRelated)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(observation.into()))
}

#[utoipa::path(
    put,
    path = "/observations/{id}",
    params(("id" = i64, Path, description = "Observation id")),
    request_body = ObservationPatch,
    responses(
        (status = 200, description = "Updated observation", body = ObservationResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "observations"
)]
pub async fn update_observation(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ValidatedJson(patch): ValidatedJson<ObservationPatch>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let updated = state.db.observation_repo().update(id, &patch).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/observations/{id}",
    params(("id" = i64, Path, description = "Observation id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "observations"
)]
pub async fn delete_observation(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    if !state.db.observation_repo().delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!("Deleted observation {id}");
    Ok(StatusCode::NO_CONTENT)
}
