use astro_core::security::TokenService;
use astro_db::Database;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub tokens: TokenService,
    /// Require a bearer token for catalog writes (and a superuser for deletes).
    pub protect_writes: bool,
}
