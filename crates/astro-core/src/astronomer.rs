use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::body::BodyType;
use crate::patch::{self, double_option};
use crate::validation::{Checker, Validate, ValidationErrors};

/// A stored astronomer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Astronomer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub achievements: Option<String>,
    pub notable_discoveries: Option<String>,
    pub academic_degree: Option<String>,
    pub institution: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Astronomer {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name, self.patronymic.as_deref())
    }

    pub fn check_invariants(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        check_dates(&mut c, self.birth_date, self.death_date, today());
        c.finish()
    }
}

/// "First Last", with the patronymic in parentheses when known.
pub fn full_name(first: &str, last: &str, patronymic: Option<&str>) -> String {
    match patronymic {
        Some(p) if !p.is_empty() => format!("{first} {last} ({p})"),
        _ => format!("{first} {last}"),
    }
}

/// A body an astronomer has observed at least once.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ObservedBody {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub body_type: BodyType,
}

/// An astronomer together with relationship data computed at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct AstronomerDetails {
    pub astronomer: Astronomer,
    pub observation_count: Option<i64>,
    pub observed_bodies_count: Option<i64>,
    pub observed_bodies: Option<Vec<ObservedBody>>,
}

impl From<Astronomer> for AstronomerDetails {
    fn from(astronomer: Astronomer) -> Self {
        Self {
            astronomer,
            observation_count: None,
            observed_bodies_count: None,
            observed_bodies: None,
        }
    }
}

/// Payload for creating an astronomer.
#[derive(Debug, Clone, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct NewAstronomer {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub achievements: Option<String>,
    #[serde(default)]
    pub notable_discoveries: Option<String>,
    #[serde(default)]
    pub academic_degree: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewAstronomer {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            patronymic: None,
            birth_date: None,
            death_date: None,
            nationality: None,
            biography: None,
            achievements: None,
            notable_discoveries: None,
            academic_degree: None,
            institution: None,
            is_active: true,
        }
    }
}

impl Validate for NewAstronomer {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.length("first_name", &self.first_name, 1, 100)
            .length("last_name", &self.last_name, 1, 100)
            .max_length("patronymic", self.patronymic.as_deref(), 100)
            .max_length("nationality", self.nationality.as_deref(), 100)
            .max_length("academic_degree", self.academic_degree.as_deref(), 100)
            .max_length("institution", self.institution.as_deref(), 200);
        check_dates(&mut c, self.birth_date, self.death_date, today());
        c.finish()
    }
}

/// Partial update for an astronomer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct AstronomerPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub patronymic: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub death_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub nationality: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub biography: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub achievements: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notable_discoveries: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub academic_degree: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub institution: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl AstronomerPatch {
    pub fn apply_to(&self, a: &mut Astronomer) {
        patch::apply(&mut a.first_name, self.first_name.clone());
        patch::apply(&mut a.last_name, self.last_name.clone());
        patch::apply(&mut a.patronymic, self.patronymic.clone());
        patch::apply(&mut a.birth_date, self.birth_date);
        patch::apply(&mut a.death_date, self.death_date);
        patch::apply(&mut a.nationality, self.nationality.clone());
        patch::apply(&mut a.biography, self.biography.clone());
        patch::apply(&mut a.achievements, self.achievements.clone());
        patch::apply(&mut a.notable_discoveries, self.notable_discoveries.clone());
        patch::apply(&mut a.academic_degree, self.academic_degree.clone());
        patch::apply(&mut a.institution, self.institution.clone());
        patch::apply(&mut a.is_active, self.is_active);
    }

    /// True if the patch touches the name pair used for duplicate detection.
    pub fn renames(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

impl Validate for AstronomerPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        if let Some(first) = &self.first_name {
            c.length("first_name", first, 1, 100);
        }
        if let Some(last) = &self.last_name {
            c.length("last_name", last, 1, 100);
        }
        c.max_length("patronymic", self.patronymic.as_ref().and_then(|p| p.as_deref()), 100)
            .max_length("nationality", self.nationality.as_ref().and_then(|n| n.as_deref()), 100)
            .max_length(
                "academic_degree",
                self.academic_degree.as_ref().and_then(|d| d.as_deref()),
                100,
            )
            .max_length(
                "institution",
                self.institution.as_ref().and_then(|i| i.as_deref()),
                200,
            );
        // Cross-field date ordering is checked on the merged record.
        check_dates(&mut c, self.birth_date.flatten(), None, today());
        c.finish()
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn check_dates(
    c: &mut Checker,
    birth: Option<NaiveDate>,
    death: Option<NaiveDate>,
    today: NaiveDate,
) {
    if let Some(b) = birth {
        c.ensure(b <= today, "birth_date", "birth date cannot be in the future");
    }
    if let (Some(b), Some(d)) = (birth, death) {
        c.ensure(d >= b, "death_date", "death date cannot be before birth date");
    }
}
