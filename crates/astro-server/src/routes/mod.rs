use std::sync::Arc;

use axum::Router;
use axum::middleware;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::guard_writes;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod astronomers;
pub mod auth;
pub mod bodies;
pub mod observations;
pub mod system;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let catalog = Router::new()
        .merge(bodies::routes())
        .merge(astronomers::routes())
        .merge(observations::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), guard_writes));

    let public = Router::new()
        .merge(system::routes())
        .merge(auth::routes())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    public.merge(catalog).with_state(state)
}
