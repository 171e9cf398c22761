use astro_core::AppError;
use astro_core::user::{User, UserPatch, UserRecord};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};

use crate::error::map_db_error;

/// Repository for user accounts. Callers hash passwords before they get here.
#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. A taken username or email is a `Conflict`.
    pub async fn create(&self, record: &UserRecord) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE username = $1),
                   EXISTS(SELECT 1 FROM users WHERE email = $2)
            "#,
        )
        .bind(&record.username)
        .bind(&record.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if username_taken {
            return Err(AppError::Conflict("Username already registered".into()));
        }
        if email_taken {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, hashed_password, full_name, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.hashed_password)
        .bind(&record.full_name)
        .bind(record.is_superuser)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(r#"SELECT * FROM users WHERE username = $1"#)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    /// Login lookup: matches the username exactly or the email
    /// case-insensitively.
    pub async fn find_for_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT * FROM users
            WHERE username = $1 OR email = LOWER(TRIM($1))
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    /// Update the profile fields of `id`. A new email already used by another
    /// account is a `Conflict`.
    pub async fn update_profile(&self, id: i64, patch: &UserPatch) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, UserRow>(r#"SELECT * FROM users WHERE id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| not_found(id))?;
        let mut user = User::from(row);
        let previous_email = user.email.clone();
        patch.apply_to(&mut user);

        if user.email != previous_email {
            let taken: bool = sqlx::query_scalar(
                r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)"#,
            )
            .bind(&user.email)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if taken {
                return Err(AppError::Conflict("Email already registered".into()));
            }
        }

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET email = $2, full_name = $3, bio = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.bio)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(row.into())
    }

    pub async fn set_password(&self, id: i64, hashed_password: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1"#,
        )
        .bind(id)
        .bind(hashed_password)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Stamp a successful login.
    pub async fn touch_last_login(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(r#"UPDATE users SET last_login = NOW() WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    /// Enable or disable an account. Returns false for an unknown username.
    pub async fn set_active(&self, username: &str, active: bool) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"UPDATE users SET is_active = $2, updated_at = NOW() WHERE username = $1"#,
        )
        .bind(username)
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    hashed_password: String,
    full_name: Option<String>,
    bio: Option<String>,
    is_active: bool,
    is_superuser: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            hashed_password: row.hashed_password,
            full_name: row.full_name,
            bio: row.bio,
            is_active: row.is_active,
            is_superuser: row.is_superuser,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
