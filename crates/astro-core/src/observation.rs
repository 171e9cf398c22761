use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::{self, double_option};
use crate::validation::{Checker, Validate, ValidationErrors};

/// A stored observation linking one astronomer to one body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Observation {
    /// UTC calendar day used by the one-observation-per-day rule.
    pub fn calendar_date(&self) -> NaiveDate {
        self.observation_date.date_naive()
    }
}

/// An observation with the names of both sides resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDetails {
    pub observation: Observation,
    pub astronomer_name: Option<String>,
    pub celestial_body_name: Option<String>,
}

/// Compact entry in an astronomer's observation log.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ObservationSummary {
    pub id: i64,
    pub celestial_body: String,
    pub observation_date: DateTime<Utc>,
    pub location: Option<String>,
    pub duration_hours: Option<f64>,
}

/// Payload for recording an observation.
#[derive(Debug, Clone, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct NewObservation {
    pub astronomer_id: i64,
    pub celestial_body_id: i64,
    /// Must not be in the future
    pub observation_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub weather_conditions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub data_collected: Option<String>,
}

impl NewObservation {
    pub fn new(astronomer_id: i64, celestial_body_id: i64, observation_date: DateTime<Utc>) -> Self {
        Self {
            astronomer_id,
            celestial_body_id,
            observation_date,
            location: None,
            equipment: None,
            duration_hours: None,
            weather_conditions: None,
            notes: None,
            data_collected: None,
        }
    }
}

impl Validate for NewObservation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.min_id("astronomer_id", Some(self.astronomer_id))
            .min_id("celestial_body_id", Some(self.celestial_body_id))
            .ensure(
                self.observation_date <= Utc::now(),
                "observation_date",
                "observation date cannot be in the future",
            );
        check_details(
            &mut c,
            self.location.as_deref(),
            self.equipment.as_deref(),
            self.duration_hours,
            self.weather_conditions.as_deref(),
        );
        c.finish()
    }
}

/// Partial update for an observation. The astronomer, body and date of an
/// observation are fixed once recorded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct ObservationPatch {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub equipment: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub duration_hours: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub weather_conditions: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub data_collected: Option<Option<String>>,
}

impl ObservationPatch {
    pub fn apply_to(&self, o: &mut Observation) {
        patch::apply(&mut o.location, self.location.clone());
        patch::apply(&mut o.equipment, self.equipment.clone());
        patch::apply(&mut o.duration_hours, self.duration_hours);
        patch::apply(&mut o.weather_conditions, self.weather_conditions.clone());
        patch::apply(&mut o.notes, self.notes.clone());
        patch::apply(&mut o.data_collected, self.data_collected.clone());
    }
}

impl Validate for ObservationPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        check_details(
            &mut c,
            self.location.as_ref().and_then(|v| v.as_deref()),
            self.equipment.as_ref().and_then(|v| v.as_deref()),
            self.duration_hours.flatten(),
            self.weather_conditions.as_ref().and_then(|v| v.as_deref()),
        );
        c.finish()
    }
}

fn check_details(
    c: &mut Checker,
    location: Option<&str>,
    equipment: Option<&str>,
    duration_hours: Option<f64>,
    weather: Option<&str>,
) {
    c.max_length("location", location, 200)
        .max_length("equipment", equipment, 200)
        .range("duration_hours", duration_hours, Some(0.0), None)
        .max_length("weather_conditions", weather, 100);
}
