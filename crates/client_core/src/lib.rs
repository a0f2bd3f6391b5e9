use std::sync::Arc;

use anyhow::Result;
use shared::domain::{CoolingType, LngLat};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod geodata;
pub mod map;
pub mod picker;
pub mod presentation;
pub mod simulation;
pub mod store;

use geodata::GeodataProvider;
use map::{MapController, MapSurface};
use picker::{LocationPicker, MapClickEvent};
use simulation::{SimulationController, SimulationService};
use store::{post_transient_notice, AppState, GeodataCollection, StateChange, StateStore};

/// Aggregate notice shown when the initial bulk geodata load fails.
pub const CONNECTIVITY_NOTICE: &str = "Failed to connect to the AquaGrid backend.";

/// Interaction and lifecycle events reported by the basemap.
#[derive(Debug, Clone)]
pub enum MapEvent {
    StyleLoadStarted,
    StyleLoaded,
    Click(MapClickEvent),
    Hover {
        layer: String,
        feature_index: usize,
        anchor: LngLat,
    },
    HoverEnd,
}

/// The interactive client: owns the state store and wires the location
/// picker, map controller, and simulation controller around it. All
/// external dependencies come in as trait objects.
pub struct AquaGridClient {
    store: Arc<StateStore>,
    geodata: Arc<dyn GeodataProvider>,
    map: Arc<MapController>,
    picker: LocationPicker,
    simulation: SimulationController,
}

impl AquaGridClient {
    pub fn new(
        geodata: Arc<dyn GeodataProvider>,
        simulation_service: Arc<dyn SimulationService>,
        surface: Arc<dyn MapSurface>,
    ) -> Arc<Self> {
        let store = StateStore::new();
        Arc::new(Self {
            picker: LocationPicker::new(Arc::clone(&store)),
            simulation: SimulationController::new(Arc::clone(&store), simulation_service),
            map: Arc::new(MapController::new(Arc::clone(&store), surface)),
            geodata,
            store,
        })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn map(&self) -> &Arc<MapController> {
        &self.map
    }

    pub async fn snapshot(&self) -> AppState {
        self.store.snapshot().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.store.subscribe()
    }

    /// Fetches the three geodata collections concurrently and populates
    /// the store with whatever arrived. Any failure surfaces one aggregate
    /// connectivity notice; there is no automatic retry.
    pub async fn load_geodata(&self) -> Result<()> {
        let (counties, data_centers, utilities) = tokio::join!(
            self.geodata.counties(),
            self.geodata.data_centers(),
            self.geodata.utilities(),
        );

        let mut failed = false;
        match counties {
            Ok(features) => {
                info!(features = features.len(), "counties loaded");
                self.store
                    .set_geodata(GeodataCollection::Counties(Arc::new(features)))
                    .await;
            }
            Err(error) => {
                warn!(error = %error, "county fetch failed");
                failed = true;
            }
        }
        match data_centers {
            Ok(features) => {
                info!(features = features.len(), "data centers loaded");
                self.store
                    .set_geodata(GeodataCollection::DataCenters(Arc::new(features)))
                    .await;
            }
            Err(error) => {
                warn!(error = %error, "data-center fetch failed");
                failed = true;
            }
        }
        match utilities {
            Ok(features) => {
                info!(features = features.len(), "utility service areas loaded");
                self.store
                    .set_geodata(GeodataCollection::Utilities(Arc::new(features)))
                    .await;
            }
            Err(error) => {
                warn!(error = %error, "utility fetch failed");
                failed = true;
            }
        }

        if failed {
            post_transient_notice(&self.store, CONNECTIVITY_NOTICE).await;
        }
        Ok(())
    }

    pub async fn handle_map_event(&self, event: MapEvent) -> Result<()> {
        match event {
            MapEvent::StyleLoadStarted => {
                self.map.begin_loading().await;
                Ok(())
            }
            MapEvent::StyleLoaded => self.map.style_loaded().await,
            MapEvent::Click(click) => {
                self.picker.handle_click(click).await;
                Ok(())
            }
            MapEvent::Hover {
                layer,
                feature_index,
                anchor,
            } => self.map.handle_hover(&layer, feature_index, anchor).await,
            MapEvent::HoverEnd => self.map.handle_hover_end().await,
        }
    }

    pub async fn run_simulation(
        &self,
        capacity_mw: f64,
        cooling: Option<CoolingType>,
    ) -> Result<()> {
        self.simulation.run(capacity_mw, cooling).await
    }

    pub async fn reset(&self) {
        self.store.reset().await;
    }

    pub async fn dismiss_notice(&self) {
        self.store.set_notice(None).await;
    }

    /// Spawns the reaction loop that forwards store changes into the map
    /// synchronization pass. The loop ends when the store is dropped.
    pub fn spawn_map_reaction(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let mut changes = client.store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if let Err(error) = client.map.sync().await {
                            warn!(error = %error, change = ?change, "map sync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "map reaction lagged; running catch-up sync");
                        if let Err(error) = client.map.sync().await {
                            warn!(error = %error, "map sync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
