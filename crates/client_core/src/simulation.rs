use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::CoolingType;
use shared::error::ApiError;
use shared::protocol::{SimulationRequest, SimulationResponse};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::StateStore;

pub const INVALID_CAPACITY_MESSAGE: &str = "MW capacity must be greater than 0.";
pub const MISSING_COOLING_MESSAGE: &str = "Select a cooling system type.";
pub const GENERIC_SIMULATION_FAILURE: &str =
    "Simulation failed. Check that the AquaGrid backend is reachable.";

#[derive(Debug, Error)]
pub enum SimulationServiceError {
    /// The service rejected the request and supplied a human-readable
    /// detail string.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("simulation request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SimulationServiceError {
    /// Message suitable for inline display: the server-supplied detail
    /// when available, else the generic fallback.
    pub fn display_message(&self) -> String {
        match self {
            Self::Rejected { detail, .. } => detail.clone(),
            Self::Transport(_) => GENERIC_SIMULATION_FAILURE.to_string(),
        }
    }
}

/// The external strain-computation service.
#[async_trait]
pub trait SimulationService: Send + Sync {
    async fn simulate(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationResponse, SimulationServiceError>;
}

pub struct MissingSimulationService;

#[async_trait]
impl SimulationService for MissingSimulationService {
    async fn simulate(
        &self,
        _request: SimulationRequest,
    ) -> Result<SimulationResponse, SimulationServiceError> {
        Err(SimulationServiceError::Rejected {
            status: 503,
            detail: "simulation service is unavailable".to_string(),
        })
    }
}

pub struct HttpSimulationService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSimulationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SimulationService for HttpSimulationService {
    async fn simulate(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationResponse, SimulationServiceError> {
        let response = self
            .http
            .post(format!("{}/simulate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ApiError>().await {
                Ok(error) => error.detail,
                Err(_) => format!("simulation service returned status {status}"),
            };
            return Err(SimulationServiceError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json().await?)
    }
}

/// Orchestrates the request/response lifecycle against the simulation
/// service. Reads and writes exclusively through the store's mutators.
pub struct SimulationController {
    store: Arc<StateStore>,
    service: Arc<dyn SimulationService>,
}

impl SimulationController {
    pub fn new(store: Arc<StateStore>, service: Arc<dyn SimulationService>) -> Self {
        Self { store, service }
    }

    /// Validates the inputs, issues one request for the current proposal
    /// location, and writes the outcome. Validation failures surface as
    /// the inline error without any network call. A run invoked while a
    /// request is already in flight is refused.
    pub async fn run(&self, capacity_mw: f64, cooling: Option<CoolingType>) -> Result<()> {
        let snapshot = self.store.snapshot().await;
        if snapshot.loading {
            warn!("simulation already in flight; refusing re-invocation");
            return Ok(());
        }

        if !(capacity_mw > 0.0) {
            self.store
                .set_error(Some(INVALID_CAPACITY_MESSAGE.to_string()))
                .await;
            return Ok(());
        }
        let Some(cooling) = cooling else {
            self.store
                .set_error(Some(MISSING_COOLING_MESSAGE.to_string()))
                .await;
            return Ok(());
        };
        let issued_for = snapshot
            .proposal_location
            .ok_or_else(|| anyhow!("no proposal location selected"))?;

        self.store.set_error(None).await;
        self.store.set_loading(true).await;

        info!(
            county_id = %issued_for.county_id,
            mw = capacity_mw,
            cooling = %cooling,
            "issuing simulation request"
        );
        let outcome = self
            .service
            .simulate(SimulationRequest {
                lat: issued_for.lat,
                lng: issued_for.lng,
                mw: capacity_mw,
                cooling_type: cooling,
            })
            .await;

        // The user may have picked a different location while the request
        // was in flight. A response for an abandoned location is discarded;
        // only the in-flight flag is released.
        let current = self.store.snapshot().await.proposal_location;
        if current.as_ref() != Some(&issued_for) {
            warn!(
                county_id = %issued_for.county_id,
                "discarding simulation response for stale location"
            );
            self.store.set_loading(false).await;
            return Ok(());
        }

        match outcome {
            Ok(result) => {
                info!(
                    county_id = %result.county_id,
                    strain_percent = result.strain_percent,
                    "simulation completed"
                );
                self.store.set_simulation_result(result).await;
            }
            Err(error) => {
                warn!(error = %error, "simulation failed");
                self.store.set_error(Some(error.display_message())).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/simulation_tests.rs"]
mod tests;
