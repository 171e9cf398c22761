pub mod astronomer_repository;
pub mod body_repository;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod observation_repository;
pub mod user_repository;

pub use astronomer_repository::AstronomerRepository;
pub use body_repository::CelestialBodyRepository;
pub use config::DatabaseConfig;
pub use database::Database;
pub use error::map_db_error;
pub use observation_repository::ObservationRepository;
pub use user_repository::UserRepository;
