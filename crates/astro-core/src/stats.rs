use std::collections::BTreeMap;

use serde::Serialize;

use crate::observation::ObservationSummary;

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct DistanceStatistics {
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct BodyStatistics {
    pub total: i64,
    /// Count per body type; types with no bodies are omitted
    pub by_type: BTreeMap<String, i64>,
    pub distance_statistics: DistanceStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct AstronomerStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_nationality: BTreeMap<String, i64>,
}

/// An entry in a "most observations" ranking.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct RankedEntry {
    pub id: i64,
    pub name: String,
    pub observation_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ObservationStatistics {
    pub total_observations: i64,
    pub top_astronomers: Vec<RankedEntry>,
    pub top_celestial_bodies: Vec<RankedEntry>,
}

/// An astronomer who observed a given body.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Observer {
    pub id: i64,
    pub name: String,
    pub institution: Option<String>,
    /// Observations of this particular body
    pub observation_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct BodyObservers {
    pub celestial_body: String,
    pub observer_count: usize,
    pub observers: Vec<Observer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct AstronomerObservations {
    pub astronomer: String,
    /// Total, independent of pagination
    pub observation_count: i64,
    pub observations: Vec<ObservationSummary>,
}
