use astro_core::AppError;
use chrono::Duration;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Server settings read from the environment.
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub protect_writes: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("token_ttl", &self.token_ttl)
            .field("protect_writes", &self.protect_writes)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// - `ASTRO_SERVER_PORT` (default 8000)
    /// - `ASTRO_JWT_SECRET` (required, at least 16 bytes)
    /// - `ASTRO_TOKEN_TTL_MINUTES` (default 30)
    /// - `ASTRO_PROTECT_WRITES` (default false)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match lookup("ASTRO_SERVER_PORT") {
            None => 8000,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid ASTRO_SERVER_PORT '{raw}'"))
            })?,
        };

        let jwt_secret = lookup("ASTRO_JWT_SECRET")
            .ok_or_else(|| AppError::ConfigError("ASTRO_JWT_SECRET must be set".into()))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AppError::ConfigError(format!(
                "ASTRO_JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let ttl_minutes: i64 = match lookup("ASTRO_TOKEN_TTL_MINUTES") {
            None => 30,
            Some(raw) => match raw.parse() {
                Ok(minutes) if minutes >= 1 => minutes,
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid ASTRO_TOKEN_TTL_MINUTES '{raw}': must be a positive integer"
                    )));
                }
            },
        };

        let protect_writes = match lookup("ASTRO_PROTECT_WRITES") {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::ConfigError(format!("Invalid ASTRO_PROTECT_WRITES '{raw}'"))
            })?,
        };

        Ok(Self {
            port,
            jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            protect_writes,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
