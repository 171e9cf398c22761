use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use astro_core::astronomer::{AstronomerDetails, ObservedBody};
use astro_core::body::{BodyType, CelestialBodyDetails, SpectralClass};
use astro_core::observation::ObservationDetails;
use astro_core::query::{AstronomerFilter, BodyFilter, ObservationFilter};
use astro_core::user::User;
use astro_core::validation::FieldError;
use astro_core::{Page, Sort, ValidationErrors};

// ---------------------------------------------------------------------------
// Celestial bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CelestialBodyResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub description: Option<String>,
    pub mass: Option<f64>,
    pub radius: Option<f64>,
    pub temperature: Option<f64>,
    pub distance_from_earth: Option<f64>,
    pub spectral_class: Option<SpectralClass>,
    pub absolute_magnitude: Option<f64>,
    pub apparent_magnitude: Option<f64>,
    pub right_ascension: Option<f64>,
    pub declination: Option<f64>,
    pub parent_id: Option<i64>,
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CelestialBodyDetails> for CelestialBodyResponse {
    fn from(details: CelestialBodyDetails) -> Self {
        let body = details.body;
        Self {
            id: body.id,
            name: body.name,
            body_type: body.body_type,
            description: body.description,
            mass: body.mass,
            radius: body.radius,
            temperature: body.temperature,
            distance_from_earth: body.distance_from_earth,
            spectral_class: body.spectral_class,
            absolute_magnitude: body.absolute_magnitude,
            apparent_magnitude: body.apparent_magnitude,
            right_ascension: body.right_ascension,
            declination: body.declination,
            parent_id: body.parent_id,
            parent_name: details.parent_name,
            children_count: details.children_count,
            observation_count: details.observation_count,
            created_at: body.created_at,
            updated_at: body.updated_at,
        }
    }
}

/// `GET /celestial-bodies` query string.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct BodyListQuery {
    /// Records to skip (>= 0)
    pub skip: Option<i64>,
    /// Page size (1-100, default 10)
    pub limit: Option<i64>,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub body_type: Option<BodyType>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

impl BodyListQuery {
    pub fn into_parts(self) -> Result<(BodyFilter, Page), ValidationErrors> {
        let filter = BodyFilter {
            name: self.search,
            body_type: self.body_type,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            ..Default::default()
        };
        let ((), page) = both(filter.validate(), Page::new(self.skip, self.limit))?;
        Ok((filter, page))
    }
}

/// `GET /celestial-bodies/search/advanced` query string.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct BodySearchQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub body_type: Option<BodyType>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    /// Lower bound on apparent magnitude
    pub min_magnitude: Option<f64>,
    /// Upper bound on apparent magnitude
    pub max_magnitude: Option<f64>,
    pub spectral_class: Option<SpectralClass>,
    /// Only bodies with (true) or without (false) observations
    pub has_observations: Option<bool>,
    /// Column to sort by; unknown columns are ignored
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort_order: Option<String>,
}

impl BodySearchQuery {
    pub fn into_parts(self) -> Result<(BodyFilter, Option<Sort>, Page), ValidationErrors> {
        let filter = BodyFilter {
            name: self.name,
            body_type: self.body_type,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            min_magnitude: self.min_magnitude,
            max_magnitude: self.max_magnitude,
            spectral_class: self.spectral_class,
            has_observations: self.has_observations,
        };
        let ((sort, ()), page) = both(
            both(
                Sort::parse(self.sort_by, self.sort_order.as_deref()),
                filter.validate(),
            ),
            Page::new(self.skip, self.limit),
        )?;
        Ok((filter, sort, page))
    }
}

// ---------------------------------------------------------------------------
// Astronomers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AstronomerResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    /// "First Last (Patronymic)"
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub achievements: Option<String>,
    pub notable_discoveries: Option<String>,
    pub academic_degree: Option<String>,
    pub institution: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_bodies_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_bodies: Option<Vec<ObservedBody>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AstronomerDetails> for AstronomerResponse {
    fn from(details: AstronomerDetails) -> Self {
        let full_name = details.astronomer.full_name();
        let a = details.astronomer;
        Self {
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            patronymic: a.patronymic,
            full_name,
            birth_date: a.birth_date,
            death_date: a.death_date,
            nationality: a.nationality,
            biography: a.biography,
            achievements: a.achievements,
            notable_discoveries: a.notable_discoveries,
            academic_degree: a.academic_degree,
            institution: a.institution,
            is_active: a.is_active,
            observation_count: details.observation_count,
            observed_bodies_count: details.observed_bodies_count,
            observed_bodies: details.observed_bodies,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AstronomerListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Substring of the first or last name
    pub search: Option<String>,
    pub nationality: Option<String>,
    /// Substring of the institution
    pub institution: Option<String>,
    pub is_active: Option<bool>,
    pub has_observations: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl AstronomerListQuery {
    pub fn into_parts(self) -> Result<(AstronomerFilter, Option<Sort>, Page), ValidationErrors> {
        let filter = AstronomerFilter {
            name: self.search,
            nationality: self.nationality,
            institution: self.institution,
            is_active: self.is_active,
            has_observations: self.has_observations,
        };
        let (sort, page) = both(
            Sort::parse(self.sort_by, self.sort_order.as_deref()),
            Page::new(self.skip, self.limit),
        )?;
        Ok((filter, sort, page))
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, ValidationErrors> {
        Page::new(self.skip, self.limit)
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ObservationResponse {
    pub id: i64,
    pub astronomer_id: i64,
    pub celestial_body_id: i64,
    pub observation_date: DateTime<Utc>,
    pub location: Option<String>,
    pub equipment: Option<String>,
    pub duration_hours: Option<f64>,
    pub weather_conditions: Option<String>,
    pub notes: Option<String>,
    pub data_collected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub astronomer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celestial_body_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ObservationDetails> for ObservationResponse {
    fn from(details: ObservationDetails) -> Self {
        let o = details.observation;
        Self {
            id: o.id,
            astronomer_id: o.astronomer_id,
            celestial_body_id: o.celestial_body_id,
            observation_date: o.observation_date,
            location: o.location,
            equipment: o.equipment,
            duration_hours: o.duration_hours,
            weather_conditions: o.weather_conditions,
            notes: o.notes,
            data_collected: o.data_collected,
            astronomer_name: details.astronomer_name,
            celestial_body_name: details.celestial_body_name,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ObservationListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub astronomer_id: Option<i64>,
    pub celestial_body_id: Option<i64>,
    /// Inclusive lower bound (RFC 3339)
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub end_date: Option<DateTime<Utc>>,
}

impl ObservationListQuery {
    pub fn into_parts(self) -> Result<(ObservationFilter, Page), ValidationErrors> {
        let page = Page::new(self.skip, self.limit)?;
        let filter = ObservationFilter {
            astronomer_id: self.astronomer_id,
            celestial_body_id: self.celestial_body_id,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        Ok((filter, page))
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Public view of an account; never carries the password hash.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
    pub openapi: &'static str,
}

/// Body of every error response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `not_found`
    pub error: String,
    pub detail: String,
    /// Per-field problems, present for validation errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Runs both checks and reports the problems of each, not just the first.
fn both<A, B>(
    a: Result<A, ValidationErrors>,
    b: Result<B, ValidationErrors>,
) -> Result<(A, B), ValidationErrors> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (a, b) => {
            let mut errors = ValidationErrors::default();
            if let Err(e) = a {
                errors.merge(e);
            }
            if let Err(e) = b {
                errors.merge(e);
            }
            Err(errors)
        }
    }
}
