use astro_core::AppError;
use astro_core::astronomer::full_name;
use astro_core::observation::{NewObservation, Observation, ObservationDetails, ObservationPatch};
use astro_core::query::ObservationFilter;
use astro_core::stats::{ObservationStatistics, RankedEntry};
use astro_core::{Fetch, Page};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Pool, Postgres, QueryBuilder};

use crate::error::map_db_error;
use crate::filter::{push_observation_filter, push_page};

const SELECT_BARE: &str = r#"
    SELECT o.*,
           NULL::VARCHAR AS astronomer_first_name,
           NULL::VARCHAR AS astronomer_last_name,
           NULL::VARCHAR AS astronomer_patronymic,
           NULL::VARCHAR AS celestial_body_name
    FROM observations o"#;

const SELECT_RELATED: &str = r#"
    SELECT o.*,
           a.first_name AS astronomer_first_name,
           a.last_name AS astronomer_last_name,
           a.patronymic AS astronomer_patronymic,
           b.name AS celestial_body_name
    FROM observations o
    JOIN astronomers a ON a.id = o.astronomer_id
    JOIN celestial_bodies b ON b.id = o.celestial_body_id"#;

/// How many entries each ranking in the statistics carries.
const TOP_N: i64 = 5;

fn select(fetch: Fetch) -> &'static str {
    match fetch {
        Fetch::Bare => SELECT_BARE,
        Fetch::WithRelated => SELECT_RELATED,
    }
}

/// Repository for observations, the astronomer/body join records.
#[derive(Clone)]
pub struct ObservationRepository {
    pool: Pool<Postgres>,
}

impl ObservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an observation. Both referenced records must exist, and the
    /// astronomer may observe a given body at most once per UTC day.
    pub async fn create(&self, observation: &NewObservation) -> Result<ObservationDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if !row_exists(&mut tx, "astronomers", observation.astronomer_id).await? {
            return Err(AppError::NotFound(format!(
                "Astronomer {} not found",
                observation.astronomer_id
            )));
        }
        if !row_exists(&mut tx, "celestial_bodies", observation.celestial_body_id).await? {
            return Err(AppError::NotFound(format!(
                "Celestial body {} not found",
                observation.celestial_body_id
            )));
        }

        let same_day: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM observations
                WHERE astronomer_id = $1
                  AND celestial_body_id = $2
                  AND (observation_date AT TIME ZONE 'UTC')::date = $3
            )
            "#,
        )
        .bind(observation.astronomer_id)
        .bind(observation.celestial_body_id)
        .bind(observation.observation_date.date_naive())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if same_day {
            return Err(AppError::Conflict(
                "The astronomer already observed this body on this date".into(),
            ));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO observations (
                astronomer_id, celestial_body_id, observation_date, location, equipment,
                duration_hours, weather_conditions, notes, data_collected
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(observation.astronomer_id)
        .bind(observation.celestial_body_id)
        .bind(observation.observation_date)
        .bind(&observation.location)
        .bind(&observation.equipment)
        .bind(observation.duration_hours)
        .bind(&observation.weather_conditions)
        .bind(&observation.notes)
        .bind(&observation.data_collected)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let created = fetch_by_id(&mut *tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }

    /// Filtered listing, newest observation first.
    pub async fn list(
        &self,
        filter: &ObservationFilter,
        page: Page,
        fetch: Fetch,
    ) -> Result<Vec<ObservationDetails>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(select(fetch));
        push_observation_filter(&mut qb, filter);
        qb.push(" ORDER BY o.observation_date DESC, o.id");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<ObservationDetailsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64, fetch: Fetch) -> Result<Option<ObservationDetails>, AppError> {
        fetch_by_id(&self.pool, id, fetch).await
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &ObservationPatch,
    ) -> Result<ObservationDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, ObservationRow>(
            r#"SELECT * FROM observations WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| not_found(id))?;
        let mut observation = Observation::from(row);
        patch.apply_to(&mut observation);

        sqlx::query(
            r#"
            UPDATE observations
            SET location = $2, equipment = $3, duration_hours = $4,
                weather_conditions = $5, notes = $6, data_collected = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&observation.location)
        .bind(&observation.equipment)
        .bind(observation.duration_hours)
        .bind(&observation.weather_conditions)
        .bind(&observation.notes)
        .bind(&observation.data_collected)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let updated = fetch_by_id(&mut *tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(r#"DELETE FROM observations WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Total count plus the five most active astronomers and the five most
    /// observed bodies.
    pub async fn statistics(&self) -> Result<ObservationStatistics, AppError> {
        let total_observations: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM observations"#)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let astronomers: Vec<(i64, String, String, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT a.id, a.first_name, a.last_name, a.patronymic, COUNT(o.id) AS observation_count
            FROM astronomers a
            JOIN observations o ON o.astronomer_id = a.id
            GROUP BY a.id
            ORDER BY observation_count DESC, a.id
            LIMIT $1
            "#,
        )
        .bind(TOP_N)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let bodies: Vec<(i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT b.id, b.name, COUNT(o.id) AS observation_count
            FROM celestial_bodies b
            JOIN observations o ON o.celestial_body_id = b.id
            GROUP BY b.id
            ORDER BY observation_count DESC, b.id
            LIMIT $1
            "#,
        )
        .bind(TOP_N)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ObservationStatistics {
            total_observations,
            top_astronomers: astronomers
                .into_iter()
                .map(|(id, first, last, patronymic, observation_count)| RankedEntry {
                    id,
                    name: full_name(&first, &last, patronymic.as_deref()),
                    observation_count,
                })
                .collect(),
            top_celestial_bodies: bodies
                .into_iter()
                .map(|(id, name, observation_count)| RankedEntry {
                    id,
                    name,
                    observation_count,
                })
                .collect(),
        })
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Observation {id} not found"))
}

/// `table` is always one of our own table names, never user input.
async fn row_exists(conn: &mut PgConnection, table: &str, id: i64) -> Result<bool, AppError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_db_error)
}

async fn fetch_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
    fetch: Fetch,
) -> Result<Option<ObservationDetails>, AppError> {
    let sql = format!("{} WHERE o.id = $1", select(fetch));
    let row = sqlx::query_as::<_, ObservationDetailsRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(map_db_error)?;

    Ok(row.map(Into::into))
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    astronomer_id: i64,
    celestial_body_id: i64,
    observation_date: DateTime<Utc>,
    location: Option<String>,
    equipment: Option<String>,
    duration_hours: Option<f64>,
    weather_conditions: Option<String>,
    notes: Option<String>,
    data_collected: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            id: row.id,
            astronomer_id: row.astronomer_id,
            celestial_body_id: row.celestial_body_id,
            observation_date: row.observation_date,
            location: row.location,
            equipment: row.equipment,
            duration_hours: row.duration_hours,
            weather_conditions: row.weather_conditions,
            notes: row.notes,
            data_collected: row.data_collected,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ObservationDetailsRow {
    #[sqlx(flatten)]
    observation: ObservationRow,
    astronomer_first_name: Option<String>,
    astronomer_last_name: Option<String>,
    astronomer_patronymic: Option<String>,
    celestial_body_name: Option<String>,
}

impl From<ObservationDetailsRow> for ObservationDetails {
    fn from(row: ObservationDetailsRow) -> Self {
        let astronomer_name = match (&row.astronomer_first_name, &row.astronomer_last_name) {
            (Some(first), Some(last)) => {
                Some(full_name(first, last, row.astronomer_patronymic.as_deref()))
            }
            _ => None,
        };
        ObservationDetails {
            observation: row.observation.into(),
            astronomer_name,
            celestial_body_name: row.celestial_body_name,
        }
    }
}
