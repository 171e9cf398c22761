//! Descriptors for list/search requests: pagination, sorting, filters and
//! relationship loading. They carry no SQL; `astro-db` translates them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::body::{BodyType, SpectralClass};
use crate::validation::{Checker, ValidationErrors};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// Builds a page from raw query values, rejecting `skip < 0` and
    /// `limit` outside `1..=100`.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self, ValidationErrors> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let mut c = Checker::new();
        c.ensure(skip >= 0, "skip", "must be greater than or equal to 0")
            .ensure(
                (1..=MAX_LIMIT).contains(&limit),
                "limit",
                "must be between 1 and 100",
            );
        c.finish()?;
        Ok(Self { skip, limit })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("sort order must be 'asc' or 'desc', got '{s}'")),
        }
    }
}

/// Requested ordering. Unknown field names are ignored by the query builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn parse(field: Option<String>, order: Option<&str>) -> Result<Option<Self>, ValidationErrors> {
        let order = match order {
            Some(raw) => raw.parse::<SortOrder>().map_err(|msg| {
                let mut errors = ValidationErrors::default();
                errors.add("sort_order", msg);
                errors
            })?,
            None => SortOrder::Asc,
        };
        Ok(field
            .filter(|f| !f.is_empty())
            .map(|field| Sort { field, order }))
    }
}

/// Whether a repository read should also resolve related rows in the same
/// round trip (parent names, counts, nested lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Bare,
    WithRelated,
}

/// Celestial body filters; every `Some` adds one AND-ed predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyFilter {
    pub name: Option<String>,
    pub body_type: Option<BodyType>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub min_magnitude: Option<f64>,
    pub max_magnitude: Option<f64>,
    pub spectral_class: Option<SpectralClass>,
    pub has_observations: Option<bool>,
}

impl BodyFilter {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.range("min_distance", self.min_distance, Some(0.0), None)
            .range("max_distance", self.max_distance, Some(0.0), None);
        c.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstronomerFilter {
    /// Substring of first or last name
    pub name: Option<String>,
    pub nationality: Option<String>,
    /// Substring of institution
    pub institution: Option<String>,
    pub is_active: Option<bool>,
    pub has_observations: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    pub astronomer_id: Option<i64>,
    pub celestial_body_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
