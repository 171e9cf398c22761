use std::collections::BTreeMap;

use astro_core::AppError;
use astro_core::astronomer::{
    Astronomer, AstronomerDetails, AstronomerPatch, NewAstronomer, ObservedBody,
};
use astro_core::observation::ObservationSummary;
use astro_core::query::AstronomerFilter;
use astro_core::stats::{AstronomerObservations, AstronomerStatistics};
use astro_core::{Fetch, Page, Sort};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Pool, Postgres, QueryBuilder};

use crate::error::{decode, map_db_error};
use crate::filter::{ASTRONOMER_SORT_COLUMNS, push_astronomer_filter, push_order, push_page};

const SELECT_BARE: &str = r#"
    SELECT a.*,
           NULL::BIGINT AS observation_count,
           NULL::BIGINT AS observed_bodies_count
    FROM astronomers a"#;

const SELECT_RELATED: &str = r#"
    SELECT a.*,
           (SELECT COUNT(*) FROM observations o WHERE o.astronomer_id = a.id) AS observation_count,
           (SELECT COUNT(DISTINCT o.celestial_body_id)
              FROM observations o WHERE o.astronomer_id = a.id) AS observed_bodies_count
    FROM astronomers a"#;

fn select(fetch: Fetch) -> &'static str {
    match fetch {
        Fetch::Bare => SELECT_BARE,
        Fetch::WithRelated => SELECT_RELATED,
    }
}

/// Repository for astronomers.
#[derive(Clone)]
pub struct AstronomerRepository {
    pool: Pool<Postgres>,
}

impl AstronomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated astronomer. Another astronomer with the same first
    /// and last name is a `Conflict`.
    pub async fn create(&self, astronomer: &NewAstronomer) -> Result<AstronomerDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if name_taken(&mut tx, &astronomer.first_name, &astronomer.last_name, None).await? {
            return Err(name_conflict(&astronomer.first_name, &astronomer.last_name));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO astronomers (
                first_name, last_name, patronymic, birth_date, death_date, nationality,
                biography, achievements, notable_discoveries, academic_degree,
                institution, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&astronomer.first_name)
        .bind(&astronomer.last_name)
        .bind(&astronomer.patronymic)
        .bind(astronomer.birth_date)
        .bind(astronomer.death_date)
        .bind(&astronomer.nationality)
        .bind(&astronomer.biography)
        .bind(&astronomer.achievements)
        .bind(&astronomer.notable_discoveries)
        .bind(&astronomer.academic_degree)
        .bind(&astronomer.institution)
        .bind(astronomer.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let created = fetch_by_id(&mut tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }

    /// Listing with counts when `fetch` asks for them. The per-astronomer
    /// body list is only resolved by [`AstronomerRepository::get`].
    pub async fn list(
        &self,
        filter: &AstronomerFilter,
        sort: Option<&Sort>,
        page: Page,
        fetch: Fetch,
    ) -> Result<Vec<AstronomerDetails>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(select(fetch));
        push_astronomer_filter(&mut qb, filter);
        push_order(&mut qb, sort, ASTRONOMER_SORT_COLUMNS, "a.id");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<AstronomerDetailsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64, fetch: Fetch) -> Result<Option<AstronomerDetails>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        fetch_by_id(&mut conn, id, fetch).await
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &AstronomerPatch,
    ) -> Result<AstronomerDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, AstronomerRow>(
            r#"SELECT * FROM astronomers WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| not_found(id))?;
        let mut astronomer = Astronomer::from(row);

        patch.apply_to(&mut astronomer);
        astronomer.check_invariants()?;

        if patch.renames()
            && name_taken(&mut tx, &astronomer.first_name, &astronomer.last_name, Some(id)).await?
        {
            return Err(name_conflict(&astronomer.first_name, &astronomer.last_name));
        }

        sqlx::query(
            r#"
            UPDATE astronomers
            SET first_name = $2, last_name = $3, patronymic = $4, birth_date = $5,
                death_date = $6, nationality = $7, biography = $8, achievements = $9,
                notable_discoveries = $10, academic_degree = $11, institution = $12,
                is_active = $13, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&astronomer.first_name)
        .bind(&astronomer.last_name)
        .bind(&astronomer.patronymic)
        .bind(astronomer.birth_date)
        .bind(astronomer.death_date)
        .bind(&astronomer.nationality)
        .bind(&astronomer.biography)
        .bind(&astronomer.achievements)
        .bind(&astronomer.notable_discoveries)
        .bind(&astronomer.academic_degree)
        .bind(&astronomer.institution)
        .bind(astronomer.is_active)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let updated = fetch_by_id(&mut tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    /// Delete an astronomer and, by cascade, their observations.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(r#"DELETE FROM astronomers WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn statistics(&self) -> Result<AstronomerStatistics, AppError> {
        let (total, active): (i64, i64) = sqlx::query_as(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM astronomers"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        let by_nationality: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT nationality, COUNT(*)
            FROM astronomers
            WHERE nationality IS NOT NULL
            GROUP BY nationality
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(AstronomerStatistics {
            total,
            active,
            inactive: total - active,
            by_nationality: by_nationality.into_iter().collect::<BTreeMap<_, _>>(),
        })
    }

    /// One page of an astronomer's observations, newest first, with the
    /// unpaginated total. `None` when the astronomer does not exist.
    pub async fn observations(
        &self,
        id: i64,
        page: Page,
    ) -> Result<Option<AstronomerObservations>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let Some(row) = sqlx::query_as::<_, AstronomerRow>(r#"SELECT * FROM astronomers WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let astronomer = Astronomer::from(row);

        let observation_count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM observations WHERE astronomer_id = $1"#)
                .bind(id)
                .fetch_one(&mut *conn)
                .await
                .map_err(map_db_error)?;

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT o.id, b.name AS celestial_body, o.observation_date, o.location, o.duration_hours
            FROM observations o
            JOIN celestial_bodies b ON b.id = o.celestial_body_id
            WHERE o.astronomer_id = $1
            ORDER BY o.observation_date DESC, o.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_db_error)?;

        Ok(Some(AstronomerObservations {
            astronomer: astronomer.full_name(),
            observation_count,
            observations: rows.into_iter().map(Into::into).collect(),
        }))
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Astronomer {id} not found"))
}

fn name_conflict(first_name: &str, last_name: &str) -> AppError {
    AppError::Conflict(format!("Astronomer {first_name} {last_name} already exists"))
}

async fn name_taken(
    conn: &mut PgConnection,
    first_name: &str,
    last_name: &str,
    exclude: Option<i64>,
) -> Result<bool, AppError> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM astronomers
            WHERE first_name = $1 AND last_name = $2 AND ($3::BIGINT IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// Loads one astronomer; with `Fetch::WithRelated` the counts and the
/// distinct observed bodies come along.
async fn fetch_by_id(
    conn: &mut PgConnection,
    id: i64,
    fetch: Fetch,
) -> Result<Option<AstronomerDetails>, AppError> {
    let sql = format!("{} WHERE a.id = $1", select(fetch));
    let Some(row) = sqlx::query_as::<_, AstronomerDetailsRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
    else {
        return Ok(None);
    };

    let mut details = AstronomerDetails::from(row);
    if fetch == Fetch::WithRelated {
        details.observed_bodies = Some(observed_bodies(&mut *conn, id).await?);
    }
    Ok(Some(details))
}

async fn observed_bodies<'e>(
    executor: impl PgExecutor<'e>,
    astronomer_id: i64,
) -> Result<Vec<ObservedBody>, AppError> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        r#"
        SELECT DISTINCT b.id, b.name, b.body_type
        FROM observations o
        JOIN celestial_bodies b ON b.id = o.celestial_body_id
        WHERE o.astronomer_id = $1
        ORDER BY b.id
        "#,
    )
    .bind(astronomer_id)
    .fetch_all(executor)
    .await
    .map_err(map_db_error)?;

    rows.into_iter()
        .map(|(id, name, body_type)| {
            Ok(ObservedBody {
                id,
                name,
                body_type: decode(&body_type, "body_type")?,
            })
        })
        .collect()
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct AstronomerRow {
    id: i64,
    first_name: String,
    last_name: String,
    patronymic: Option<String>,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
    nationality: Option<String>,
    biography: Option<String>,
    achievements: Option<String>,
    notable_discoveries: Option<String>,
    academic_degree: Option<String>,
    institution: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AstronomerRow> for Astronomer {
    fn from(row: AstronomerRow) -> Self {
        Astronomer {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            patronymic: row.patronymic,
            birth_date: row.birth_date,
            death_date: row.death_date,
            nationality: row.nationality,
            biography: row.biography,
            achievements: row.achievements,
            notable_discoveries: row.notable_discoveries,
            academic_degree: row.academic_degree,
            institution: row.institution,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AstronomerDetailsRow {
    #[sqlx(flatten)]
    astronomer: AstronomerRow,
    observation_count: Option<i64>,
    observed_bodies_count: Option<i64>,
}

impl From<AstronomerDetailsRow> for AstronomerDetails {
    fn from(row: AstronomerDetailsRow) -> Self {
        AstronomerDetails {
            astronomer: row.astronomer.into(),
            observation_count: row.observation_count,
            observed_bodies_count: row.observed_bodies_count,
            observed_bodies: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    celestial_body: String,
    observation_date: DateTime<Utc>,
    location: Option<String>,
    duration_hours: Option<f64>,
}

impl From<SummaryRow> for ObservationSummary {
    fn from(row: SummaryRow) -> Self {
        ObservationSummary {
            id: row.id,
            celestial_body: row.celestial_body,
            observation_date: row.observation_date,
            location: row.location,
            duration_hours: row.duration_hours,
        }
    }
}
