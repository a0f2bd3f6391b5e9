use serde::{Deserialize, Serialize};

use crate::domain::{CoolingType, CountyId};

/// One simulation request for a proposed facility at a geographic point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub lat: f64,
    pub lng: f64,
    pub mw: f64,
    pub cooling_type: CoolingType,
}

/// Successful simulation outcome. The backend may attach additional
/// utility-attribution fields; they are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub county: String,
    pub county_id: CountyId,
    pub mw: f64,
    pub cooling_type: String,
    pub daily_water_gpd: f64,
    pub total_withdrawal_gpd: f64,
    pub strain_percent: f64,
}
