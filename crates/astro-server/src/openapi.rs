use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Astro Catalog API",
        version = "0.1.0",
        description = "Catalog of celestial bodies, astronomers and their observations."
    ),
    paths(
        crate::routes::bodies::create_body,
        crate::routes::bodies::create_bodies_batch,
        crate::routes::bodies::list_bodies,
        crate::routes::bodies::search_bodies,
        crate::routes::bodies::body_statistics,
        crate::routes::bodies::get_body,
        crate::routes::bodies::update_body,
        crate::routes::bodies::delete_body,
        crate::routes::bodies::body_children,
        crate::routes::bodies::body_observers,
        crate::routes::astronomers::create_astronomer,
        crate::routes::astronomers::list_astronomers,
        crate::routes::astronomers::astronomer_statistics,
        crate::routes::astronomers::get_astronomer,
        crate::routes::astronomers::update_astronomer,
        crate::routes::astronomers::delete_astronomer,
        crate::routes::astronomers::astronomer_observations,
        crate::routes::observations::create_observation,
        crate::routes::observations::list_observations,
        crate::routes::observations::observation_statistics,
        crate::routes::observations::get_observation,
        crate::routes::observations::update_observation,
        crate::routes::observations::delete_observation,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::auth::update_me,
        crate::routes::auth::change_password,
        crate::routes::system::root,
        crate::routes::system::health,
    ),
    components(schemas(
        astro_core::body::BodyType,
        astro_core::body::SpectralClass,
        astro_core::body::NewCelestialBody,
        astro_core::body::CelestialBodyPatch,
        astro_core::astronomer::NewAstronomer,
        astro_core::astronomer::AstronomerPatch,
        astro_core::astronomer::ObservedBody,
        astro_core::observation::NewObservation,
        astro_core::observation::ObservationPatch,
        astro_core::observation::ObservationSummary,
        astro_core::user::NewUser,
        astro_core::user::UserPatch,
        astro_core::user::PasswordChange,
        astro_core::user::Credentials,
        astro_core::stats::BodyStatistics,
        astro_core::stats::DistanceStatistics,
        astro_core::stats::AstronomerStatistics,
        astro_core::stats::ObservationStatistics,
        astro_core::stats::RankedEntry,
        astro_core::stats::BodyObservers,
        astro_core::stats::Observer,
        astro_core::stats::AstronomerObservations,
        astro_core::validation::FieldError,
        crate::dto::CelestialBodyResponse,
        crate::dto::AstronomerResponse,
        crate::dto::ObservationResponse,
        crate::dto::UserResponse,
        crate::dto::TokenResponse,
        crate::dto::HealthResponse,
        crate::dto::RootResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "celestial-bodies", description = "Stars, planets, galaxies and other bodies"),
        (name = "astronomers", description = "Astronomer records"),
        (name = "observations", description = "Who observed what, and when"),
        (name = "auth", description = "Registration, login and profile"),
        (name = "system", description = "Health and service information"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from POST /auth/token."))
                        .build(),
                ),
            );
        }
    }
}
