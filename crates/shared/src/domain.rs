use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// GEOID-style county identifier, e.g. `"51107"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountyId(pub String);

impl fmt::Display for CountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Counties,
    DataCenters,
    Utilities,
}

/// One county of the coverage area. Immutable for the session; loaded once
/// from the geodata provider.
#[derive(Debug, Clone)]
pub struct County {
    pub id: CountyId,
    pub name: String,
    pub area_sq_mi: f64,
    pub total_withdrawal_gpd: f64,
    pub boundary: MultiPolygon<f64>,
}

/// Existing data-center footprint, informational only. Every attribute
/// except the footprint is optional in the upstream dataset.
#[derive(Debug, Clone)]
pub struct DataCenter {
    pub name: String,
    pub capacity_mw: Option<f64>,
    pub year_operational: Option<String>,
    pub location: Option<String>,
    pub operator: Option<String>,
    pub size_rank: Option<String>,
    pub footprint: MultiPolygon<f64>,
}

impl Default for DataCenter {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity_mw: None,
            year_operational: None,
            location: None,
            operator: None,
            size_rank: None,
            footprint: MultiPolygon(Vec::new()),
        }
    }
}

/// Water-utility service area, informational only.
#[derive(Debug, Clone)]
pub struct UtilityServiceArea {
    pub utility_id: Option<String>,
    pub utility_name: Option<String>,
    pub boundary_quality: Option<String>,
    pub service_area: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

/// Position of an interaction event in screen/render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// The user-selected candidate site. Exactly one is live at a time and it
/// is replaced wholesale on each new in-coverage click.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalLocation {
    pub lat: f64,
    pub lng: f64,
    pub county_name: String,
    pub county_id: CountyId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolingType {
    AirCooled,
    Hybrid,
    Evaporative,
}

impl CoolingType {
    pub const ALL: [Self; 3] = [Self::AirCooled, Self::Hybrid, Self::Evaporative];

    pub fn label(self) -> &'static str {
        match self {
            Self::AirCooled => "Air Cooled",
            Self::Hybrid => "Hybrid",
            Self::Evaporative => "Evaporative",
        }
    }

    /// Advertised water-demand rate for configuration UIs. The binding
    /// rate values live in the simulation service.
    pub fn rate_label(self) -> &'static str {
        match self {
            Self::AirCooled => "1,000 GPD / MW",
            Self::Hybrid => "2,500 GPD / MW",
            Self::Evaporative => "5,000 GPD / MW",
        }
    }
}

impl fmt::Display for CoolingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wire = match self {
            Self::AirCooled => "air_cooled",
            Self::Hybrid => "hybrid",
            Self::Evaporative => "evaporative",
        };
        f.write_str(wire)
    }
}
