use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::{self, double_option};
use crate::validation::{Checker, Validate, ValidationErrors};

/// Upper bound for surface temperature, in Kelvin.
pub const MAX_TEMPERATURE_K: f64 = 1e8;

/// Kind of celestial body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Planet,
    Star,
    Galaxy,
    Nebula,
    Comet,
    Asteroid,
    BlackHole,
}

impl BodyType {
    pub const ALL: [BodyType; 7] = [
        BodyType::Planet,
        BodyType::Star,
        BodyType::Galaxy,
        BodyType::Nebula,
        BodyType::Comet,
        BodyType::Asteroid,
        BodyType::BlackHole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Planet => "planet",
            BodyType::Star => "star",
            BodyType::Galaxy => "galaxy",
            BodyType::Nebula => "nebula",
            BodyType::Comet => "comet",
            BodyType::Asteroid => "asteroid",
            BodyType::BlackHole => "black_hole",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BodyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        BodyType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("Unknown body type: {s}"))
    }
}

/// Harvard spectral classification, hottest (O) to coolest (M).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
}

impl SpectralClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectralClass::O => "O",
            SpectralClass::B => "B",
            SpectralClass::A => "A",
            SpectralClass::F => "F",
            SpectralClass::G => "G",
            SpectralClass::K => "K",
            SpectralClass::M => "M",
        }
    }
}

impl fmt::Display for SpectralClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SpectralClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "O" => Ok(SpectralClass::O),
            "B" => Ok(SpectralClass::B),
            "A" => Ok(SpectralClass::A),
            "F" => Ok(SpectralClass::F),
            "G" => Ok(SpectralClass::G),
            "K" => Ok(SpectralClass::K),
            "M" => Ok(SpectralClass::M),
            _ => Err(format!("Unknown spectral class: {s}")),
        }
    }
}

/// A stored celestial body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialBody {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CelestialBody {
    /// Cross-field rules that must hold for every stored body.
    pub fn check_invariants(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        check_spectral_class(&mut c, self.body_type, self.spectral_class);
        c.ensure(
            self.parent_id != Some(self.id),
            "parent_id",
            "a celestial body cannot be its own parent",
        );
        c.finish()
    }
}

/// A body together with relationship data computed at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct CelestialBodyDetails {
    pub body: CelestialBody,
    pub parent_name: Option<String>,
    pub children_count: Option<i64>,
    pub observation_count: Option<i64>,
}

impl From<CelestialBody> for CelestialBodyDetails {
    fn from(body: CelestialBody) -> Self {
        Self {
            body,
            parent_name: None,
            children_count: None,
            observation_count: None,
        }
    }
}

/// Payload for creating a body.
#[derive(Debug, Clone, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct NewCelestialBody {
    /// Unique name, 1-200 characters
    pub name: String,
    #[serde(rename = "type")]
    pub body_type: BodyType,
    #[serde(default)]
    pub description: Option<String>,
    /// Mass in solar or Earth masses
    #[serde(default)]
    pub mass: Option<f64>,
    /// Radius in solar or Earth radii
    #[serde(default)]
    pub radius: Option<f64>,
    /// Surface temperature in Kelvin (0 - 1e8)
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Distance from Earth in light years
    #[serde(default)]
    pub distance_from_earth: Option<f64>,
    /// Only allowed when `type` is `star`
    #[serde(default)]
    pub spectral_class: Option<SpectralClass>,
    #[serde(default)]
    pub absolute_magnitude: Option<f64>,
    #[serde(default)]
    pub apparent_magnitude: Option<f64>,
    /// Hours, 0 - 24
    #[serde(default)]
    pub right_ascension: Option<f64>,
    /// Degrees, -90 - 90
    #[serde(default)]
    pub declination: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl NewCelestialBody {
    pub fn new(name: impl Into<String>, body_type: BodyType) -> Self {
        Self {
            name: name.into(),
            body_type,
            description: None,
            mass: None,
            radius: None,
            temperature: None,
            distance_from_earth: None,
            spectral_class: None,
            absolute_magnitude: None,
            apparent_magnitude: None,
            right_ascension: None,
            declination: None,
            parent_id: None,
        }
    }
}

impl Validate for NewCelestialBody {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.length("name", &self.name, 1, 200);
        check_measurements(
            &mut c,
            Measurements {
                mass: self.mass,
                radius: self.radius,
                temperature: self.temperature,
                distance_from_earth: self.distance_from_earth,
                right_ascension: self.right_ascension,
                declination: self.declination,
            },
        );
        c.min_id("parent_id", self.parent_id);
        check_spectral_class(&mut c, self.body_type, self.spectral_class);
        c.finish()
    }
}

/// Partial update for a body. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct CelestialBodyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub body_type: Option<BodyType>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub mass: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub radius: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub temperature: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub distance_from_earth: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<SpectralClass>)]
    pub spectral_class: Option<Option<SpectralClass>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub absolute_magnitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub apparent_magnitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub right_ascension: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub declination: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<Option<i64>>,
}

impl CelestialBodyPatch {
    /// Writes every supplied field into `body`.
    pub fn apply_to(&self, body: &mut CelestialBody) {
        patch::apply(&mut body.name, self.name.clone());
        patch::apply(&mut body.body_type, self.body_type);
        patch::apply(&mut body.description, self.description.clone());
        patch::apply(&mut body.mass, self.mass);
        patch::apply(&mut body.radius, self.radius);
        patch::apply(&mut body.temperature, self.temperature);
        patch::apply(&mut body.distance_from_earth, self.distance_from_earth);
        patch::apply(&mut body.spectral_class, self.spectral_class);
        patch::apply(&mut body.absolute_magnitude, self.absolute_magnitude);
        patch::apply(&mut body.apparent_magnitude, self.apparent_magnitude);
        patch::apply(&mut body.right_ascension, self.right_ascension);
        patch::apply(&mut body.declination, self.declination);
        patch::apply(&mut body.parent_id, self.parent_id);
    }

    /// The parent the body will point at after the patch, if the patch sets one.
    pub fn new_parent(&self) -> Option<i64> {
        self.parent_id.flatten()
    }
}

impl Validate for CelestialBodyPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        if let Some(name) = &self.name {
            c.length("name", name, 1, 200);
        }
        check_measurements(
            &mut c,
            Measurements {
                mass: self.mass.flatten(),
                radius: self.radius.flatten(),
                temperature: self.temperature.flatten(),
                distance_from_earth: self.distance_from_earth.flatten(),
                right_ascension: self.right_ascension.flatten(),
                declination: self.declination.flatten(),
            },
        );
        c.min_id("parent_id", self.parent_id.flatten());
        c.finish()
    }
}

struct Measurements {
    mass: Option<f64>,
    radius: Option<f64>,
    temperature: Option<f64>,
    distance_from_earth: Option<f64>,
    right_ascension: Option<f64>,
    declination: Option<f64>,
}

fn check_measurements(c: &mut Checker, m: Measurements) {
    c.range("mass", m.mass, Some(0.0), None)
        .range("radius", m.radius, Some(0.0), None)
        .range("temperature", m.temperature, Some(0.0), Some(MAX_TEMPERATURE_K))
        .range("distance_from_earth", m.distance_from_earth, Some(0.0), None)
        .range("right_ascension", m.right_ascension, Some(0.0), Some(24.0))
        .range("declination", m.declination, Some(-90.0), Some(90.0));
}

fn check_spectral_class(c: &mut Checker, body_type: BodyType, class: Option<SpectralClass>) {
    c.ensure(
        class.is_none() || body_type == BodyType::Star,
        "spectral_class",
        "spectral class can only be set for stars",
    );
}
