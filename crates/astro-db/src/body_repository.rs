use std::collections::{BTreeMap, HashSet};

use astro_core::AppError;
use astro_core::astronomer::full_name;
use astro_core::body::{CelestialBody, CelestialBodyDetails, CelestialBodyPatch, NewCelestialBody};
use astro_core::query::BodyFilter;
use astro_core::stats::{BodyObservers, BodyStatistics, DistanceStatistics, Observer};
use astro_core::{Fetch, Page, Sort};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool, Pool, Postgres, QueryBuilder};

use crate::error::{decode, map_db_error};
use crate::filter::{BODY_SORT_COLUMNS, push_body_filter, push_order, push_page};

const SELECT_BARE: &str = r#"
    SELECT b.*,
           NULL::VARCHAR AS parent_name,
           NULL::BIGINT AS children_count,
           NULL::BIGINT AS observation_count
    FROM celestial_bodies b"#;

const SELECT_RELATED: &str = r#"
    SELECT b.*,
           p.name AS parent_name,
           (SELECT COUNT(*) FROM celestial_bodies c WHERE c.parent_id = b.id) AS children_count,
           (SELECT COUNT(*) FROM observations ob WHERE ob.celestial_body_id = b.id) AS observation_count
    FROM celestial_bodies b
    LEFT JOIN celestial_bodies p ON p.id = b.parent_id"#;

fn select(fetch: Fetch) -> &'static str {
    match fetch {
        Fetch::Bare => SELECT_BARE,
        Fetch::WithRelated => SELECT_RELATED,
    }
}

/// Repository for celestial bodies and their parent/child tree.
#[derive(Clone)]
pub struct CelestialBodyRepository {
    pool: Pool<Postgres>,
}

impl CelestialBodyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated body. Fails with `Conflict` when the name is taken
    /// and `NotFound` when `parent_id` points nowhere.
    pub async fn create(&self, body: &NewCelestialBody) -> Result<CelestialBodyDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if name_taken(&mut tx, &body.name, None).await? {
            return Err(AppError::Conflict(
                "A celestial body with this name already exists".into(),
            ));
        }
        if let Some(parent_id) = body.parent_id {
            ensure_parent_exists(&mut tx, parent_id).await?;
        }

        let id = insert(&mut tx, body).await?;
        let created = fetch_by_id(&mut *tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| AppError::DatabaseError(format!("Inserted body {id} vanished")))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }

    /// Insert several bodies in one transaction. Names already stored, or
    /// repeated within the batch, are skipped. A missing parent aborts the
    /// whole batch.
    pub async fn create_many(
        &self,
        bodies: &[NewCelestialBody],
    ) -> Result<Vec<CelestialBodyDetails>, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(bodies.len());

        for body in bodies {
            if !seen.insert(body.name.as_str()) || name_taken(&mut tx, &body.name, None).await? {
                tracing::debug!(name = %body.name, "Skipping duplicate body in batch");
                continue;
            }
            if let Some(parent_id) = body.parent_id {
                ensure_parent_exists(&mut tx, parent_id).await?;
            }
            ids.push(insert(&mut tx, body).await?);
        }

        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(details) = fetch_by_id(&mut *tx, id, Fetch::WithRelated).await? {
                created.push(details);
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }

    pub async fn get(&self, id: i64, fetch: Fetch) -> Result<Option<CelestialBodyDetails>, AppError> {
        fetch_by_id(&self.pool, id, fetch).await
    }

    /// Filtered, sorted, paginated listing.
    pub async fn list(
        &self,
        filter: &BodyFilter,
        sort: Option<&Sort>,
        page: Page,
        fetch: Fetch,
    ) -> Result<Vec<CelestialBodyDetails>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(select(fetch));
        push_body_filter(&mut qb, filter);
        push_order(&mut qb, sort, BODY_SORT_COLUMNS, "b.id");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<BodyDetailsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Apply a partial update. Cross-field rules are checked against the
    /// merged record; a new parent must exist and must not be a descendant.
    pub async fn update(
        &self,
        id: i64,
        patch: &CelestialBodyPatch,
    ) -> Result<CelestialBodyDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, BodyRow>(
            r#"SELECT * FROM celestial_bodies WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| not_found(id))?;
        let mut body = CelestialBody::try_from(row)?;

        if let Some(name) = patch.name.as_deref()
            && name != body.name
            && name_taken(&mut tx, name, Some(id)).await?
        {
            return Err(AppError::Conflict(
                "A celestial body with this name already exists".into(),
            ));
        }

        patch.apply_to(&mut body);
        body.check_invariants()?;

        if let Some(parent_id) = patch.new_parent() {
            ensure_parent_exists(&mut tx, parent_id).await?;
            if is_ancestor_or_self(&mut tx, id, parent_id).await? {
                return Err(AppError::invalid(
                    "parent_id",
                    "parent assignment would create a cycle",
                ));
            }
        }

        sqlx::query(
            r#"
            UPDATE celestial_bodies
            SET name = $2, body_type = $3, description = $4, mass = $5, radius = $6,
                temperature = $7, distance_from_earth = $8, spectral_class = $9,
                absolute_magnitude = $10, apparent_magnitude = $11,
                right_ascension = $12, declination = $13, parent_id = $14,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&body.name)
        .bind(body.body_type.as_str())
        .bind(&body.description)
        .bind(body.mass)
        .bind(body.radius)
        .bind(body.temperature)
        .bind(body.distance_from_earth)
        .bind(body.spectral_class.map(|c| c.as_str()))
        .bind(body.absolute_magnitude)
        .bind(body.apparent_magnitude)
        .bind(body.right_ascension)
        .bind(body.declination)
        .bind(body.parent_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let updated = fetch_by_id(&mut *tx, id, Fetch::WithRelated)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    /// Delete a body. Its observations go with it; its children are detached.
    /// Returns false when no such body exists.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(r#"DELETE FROM celestial_bodies WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Direct children of a body, or `None` if the body itself is absent.
    pub async fn children(
        &self,
        id: i64,
        fetch: Fetch,
    ) -> Result<Option<Vec<CelestialBodyDetails>>, AppError> {
        if !exists(&self.pool, id).await? {
            return Ok(None);
        }

        let sql = format!("{} WHERE b.parent_id = $1 ORDER BY b.id", select(fetch));
        let rows = sqlx::query_as::<_, BodyDetailsRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Distinct astronomers who observed a body, busiest first.
    pub async fn observers(&self, id: i64) -> Result<Option<BodyObservers>, AppError> {
        let name: Option<String> =
            sqlx::query_scalar(r#"SELECT name FROM celestial_bodies WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        let Some(name) = name else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ObserverRow>(
            r#"
            SELECT a.id, a.first_name, a.last_name, a.patronymic, a.institution,
                   COUNT(o.id) AS observation_count
            FROM observations o
            JOIN astronomers a ON a.id = o.astronomer_id
            WHERE o.celestial_body_id = $1
            GROUP BY a.id
            ORDER BY observation_count DESC, a.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let observers: Vec<Observer> = rows.into_iter().map(Into::into).collect();
        Ok(Some(BodyObservers {
            celestial_body: name,
            observer_count: observers.len(),
            observers,
        }))
    }

    pub async fn statistics(&self) -> Result<BodyStatistics, AppError> {
        let by_type: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT body_type, COUNT(*) FROM celestial_bodies GROUP BY body_type"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let (average, minimum, maximum): (Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
            r#"
            SELECT AVG(distance_from_earth), MIN(distance_from_earth), MAX(distance_from_earth)
            FROM celestial_bodies
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        let by_type: BTreeMap<String, i64> = by_type.into_iter().collect();
        Ok(BodyStatistics {
            total: by_type.values().sum(),
            by_type,
            distance_statistics: DistanceStatistics {
                average,
                minimum,
                maximum,
            },
        })
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Celestial body {id} not found"))
}

async fn fetch_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
    fetch: Fetch,
) -> Result<Option<CelestialBodyDetails>, AppError> {
    let sql = format!("{} WHERE b.id = $1", select(fetch));
    let row = sqlx::query_as::<_, BodyDetailsRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(map_db_error)?;

    row.map(TryInto::try_into).transpose()
}

async fn exists<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<bool, AppError> {
    sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM celestial_bodies WHERE id = $1)"#)
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(map_db_error)
}

async fn ensure_parent_exists(conn: &mut PgConnection, parent_id: i64) -> Result<(), AppError> {
    if exists(&mut *conn, parent_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!(
            "Parent celestial body {parent_id} not found"
        )))
    }
}

async fn name_taken(
    conn: &mut PgConnection,
    name: &str,
    exclude: Option<i64>,
) -> Result<bool, AppError> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM celestial_bodies
            WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// True when `body_id` is `candidate` or one of its ancestors, i.e. making
/// `candidate` the parent of `body_id` would close a loop.
async fn is_ancestor_or_self(
    conn: &mut PgConnection,
    body_id: i64,
    candidate: i64,
) -> Result<bool, AppError> {
    sqlx::query_scalar(
        r#"
        WITH RECURSIVE lineage(id, parent_id) AS (
            SELECT id, parent_id FROM celestial_bodies WHERE id = $1
            UNION
            SELECT c.id, c.parent_id
            FROM celestial_bodies c
            JOIN lineage l ON c.id = l.parent_id
        )
        SELECT EXISTS(SELECT 1 FROM lineage WHERE id = $2)
        "#,
    )
    .bind(candidate)
    .bind(body_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

async fn insert(conn: &mut PgConnection, body: &NewCelestialBody) -> Result<i64, AppError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO celestial_bodies (
            name, body_type, description, mass, radius, temperature,
            distance_from_earth, spectral_class, absolute_magnitude,
            apparent_magnitude, right_ascension, declination, parent_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        "#,
    )
    .bind(&body.name)
    .bind(body.body_type.as_str())
    .bind(&body.description)
    .bind(body.mass)
    .bind(body.radius)
    .bind(body.temperature)
    .bind(body.distance_from_earth)
    .bind(body.spectral_class.map(|c| c.as_str()))
    .bind(body.absolute_magnitude)
    .bind(body.apparent_magnitude)
    .bind(body.right_ascension)
    .bind(body.declination)
    .bind(body.parent_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct BodyRow {
    id: i64,
    name: String,
    body_type: String,
    description: Option<String>,
    mass: Option<f64>,
    radius: Option<f64>,
    temperature: Option<f64>,
    distance_from_earth: Option<f64>,
    spectral_class: Option<String>,
    absolute_magnitude: Option<f64>,
    apparent_magnitude: Option<f64>,
    right_ascension: Option<f64>,
    declination: Option<f64>,
    parent_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BodyRow> for CelestialBody {
    type Error = AppError;

    fn try_from(row: BodyRow) -> Result<Self, Self::Error> {
        Ok(CelestialBody {
            id: row.id,
            name: row.name,
            body_type: decode(&row.body_type, "body_type")?,
            description: row.description,
            mass: row.mass,
            radius: row.radius,
            temperature: row.temperature,
            distance_from_earth: row.distance_from_earth,
            spectral_class: row
                .spectral_class
                .as_deref()
                .map(|c| decode(c, "spectral_class"))
                .transpose()?,
            absolute_magnitude: row.absolute_magnitude,
            apparent_magnitude: row.apparent_magnitude,
            right_ascension: row.right_ascension,
            declination: row.declination,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BodyDetailsRow {
    #[sqlx(flatten)]
    body: BodyRow,
    parent_name: Option<String>,
    children_count: Option<i64>,
    observation_count: Option<i64>,
}

impl TryFrom<BodyDetailsRow> for CelestialBodyDetails {
    type Error = AppError;

    fn try_from(row: BodyDetailsRow) -> Result<Self, Self::Error> {
        Ok(CelestialBodyDetails {
            body: row.body.try_into()?,
            parent_name: row.parent_name,
            children_count: row.children_count,
            observation_count: row.observation_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ObserverRow {
    id: i64,
    first_name: String,
    last_name: String,
    patronymic: Option<String>,
    institution: Option<String>,
    observation_count: i64,
}

impl From<ObserverRow> for Observer {
    fn from(row: ObserverRow) -> Self {
        Observer {
            id: row.id,
            name: full_name(&row.first_name, &row.last_name, row.patronymic.as_deref()),
            institution: row.institution,
            observation_count: row.observation_count,
        }
    }
}
