use astro_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::astronomer_repository::AstronomerRepository;
use crate::body_repository::CelestialBodyRepository;
use crate::config::DatabaseConfig;
use crate::observation_repository::ObservationRepository;
use crate::user_repository::UserRepository;

/// Owns the connection pool, runs migrations and vends repositories.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests hand in the container's pool).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply every pending migration from `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Round-trips a trivial query; used by the health endpoint.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Health check failed: {e}")))?;
        Ok(())
    }

    pub fn body_repo(&self) -> CelestialBodyRepository {
        CelestialBodyRepository::new(self.pool.clone())
    }

    pub fn astronomer_repo(&self) -> AstronomerRepository {
        AstronomerRepository::new(self.pool.clone())
    }

    pub fn observation_repo(&self) -> ObservationRepository {
        ObservationRepository::new(self.pool.clone())
    }

    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
