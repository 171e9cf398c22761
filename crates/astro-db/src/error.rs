use std::str::FromStr;

use astro_core::AppError;

/// Translate a sqlx error into the application taxonomy. Constraint
/// violations become client errors; anything else is a database error.
pub fn map_db_error(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        let constraint = db_err.constraint().unwrap_or_default();
        if db_err.is_unique_violation() {
            return AppError::Conflict(unique_message(constraint).to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(format!("Referenced record not found ({constraint})"));
        }
        if db_err.is_check_violation() {
            let (field, message) = check_field(constraint);
            return AppError::invalid(field, message);
        }
    }
    AppError::DatabaseError(err.to_string())
}

/// Parse an enum stored as text. The CHECK constraints keep these columns
/// in range, so a failure here means the schema and the code disagree.
pub(crate) fn decode<T: FromStr>(raw: &str, column: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::DatabaseError(format!("Unexpected value '{raw}' in column {column}")))
}

fn unique_message(constraint: &str) -> &'static str {
    match constraint {
        "uq_celestial_bodies_name" => "A celestial body with this name already exists",
        "uq_users_username" => "Username already registered",
        "uq_users_email" => "Email already registered",
        "uq_observations_per_day" => {
            "The astronomer already observed this body on this date"
        }
        _ => "Record already exists",
    }
}

fn check_field(constraint: &str) -> (&'static str, &'static str) {
    match constraint {
        "chk_celestial_bodies_spectral_class" => {
            ("spectral_class", "spectral class can only be set for stars")
        }
        "chk_celestial_bodies_temperature" => ("temperature", "must be between 0 and 100000000"),
        "chk_celestial_bodies_parent" => ("parent_id", "a celestial body cannot be its own parent"),
        "chk_astronomers_dates" => ("death_date", "death date cannot be before birth date"),
        "chk_observations_duration" => ("duration_hours", "must be greater than or equal to 0"),
        _ => ("body", "violates a database constraint"),
    }
}
