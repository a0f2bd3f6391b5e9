use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{CountyId, DataCenter, DatasetKind, LngLat, ProposalLocation};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::{AppState, GeodataCollection, StateStore};

pub const COUNTIES_SOURCE: &str = "counties";
pub const DATACENTERS_SOURCE: &str = "datacenters";
pub const UTILITIES_SOURCE: &str = "utilities";

pub const COUNTIES_FILL_LAYER: &str = "counties-fill";
pub const COUNTIES_OUTLINE_LAYER: &str = "counties-outline";
pub const COUNTIES_HIGHLIGHT_LAYER: &str = "counties-highlight";
pub const COUNTY_LABELS_LAYER: &str = "county-labels";
pub const DC_FILL_LAYER: &str = "dc-fill";
pub const DC_OUTLINE_LAYER: &str = "dc-outline";
pub const UTILITIES_FILL_LAYER: &str = "utilities-fill";
pub const UTILITIES_OUTLINE_LAYER: &str = "utilities-outline";

const HIGHLIGHT_VISIBLE_OPACITY: f64 = 0.8;

/// County fill shading over the baseline withdrawal value, purely
/// informational and independent of simulation state.
pub const COUNTY_FILL_RAMP: LinearRamp = LinearRamp {
    property: "total_withdrawal_gpd",
    stops: [(25_000_000.0, 0.04), (120_000_000.0, 0.14)],
};

/// Piecewise-linear interpolation between two reference breakpoints over a
/// numeric feature property, clamped at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRamp {
    pub property: &'static str,
    pub stops: [(f64, f64); 2],
}

impl LinearRamp {
    pub fn eval(&self, value: f64) -> f64 {
        let [(x0, y0), (x1, y1)] = self.stops;
        if value <= x0 {
            return y0;
        }
        if value >= x1 {
            return y1;
        }
        y0 + (value - x0) / (x1 - x0) * (y1 - y0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOpacity {
    Fixed(f64),
    Ramp(LinearRamp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerPaint {
    Fill {
        color: &'static str,
        opacity: FillOpacity,
    },
    Line {
        color: &'static str,
        opacity: f64,
        width: f64,
        dash: Option<[f64; 2]>,
    },
    Symbol {
        text_property: &'static str,
        text_color: &'static str,
        halo_color: &'static str,
    },
}

/// Filter applied to the highlight layer: exactly one county, or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightFilter {
    CountyIdEquals(CountyId),
    MatchNone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: &'static str,
    pub source: &'static str,
    pub paint: LayerPaint,
    pub filter: Option<HighlightFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub label: &'static str,
    pub value: String,
}

/// The external basemap renderer, consumed read-only for rendering
/// context. Sources, layers, markers, and popups are the only operations
/// the controller needs from it.
#[async_trait]
pub trait MapSurface: Send + Sync {
    async fn add_source(&self, id: &'static str, data: GeodataCollection) -> Result<()>;
    async fn add_layer(&self, spec: LayerSpec) -> Result<()>;
    async fn set_filter(&self, layer: &'static str, filter: HighlightFilter) -> Result<()>;
    async fn set_line_opacity(&self, layer: &'static str, opacity: f64) -> Result<()>;
    async fn place_marker(&self, position: LngLat) -> Result<MarkerId>;
    async fn remove_marker(&self, marker: MarkerId) -> Result<()>;
    async fn show_popup(&self, anchor: LngLat, rows: Vec<PopupRow>) -> Result<()>;
    async fn hide_popup(&self) -> Result<()>;
}

pub struct MissingMapSurface;

#[async_trait]
impl MapSurface for MissingMapSurface {
    async fn add_source(&self, id: &'static str, _data: GeodataCollection) -> Result<()> {
        Err(anyhow!("map surface is unavailable for source {id}"))
    }

    async fn add_layer(&self, spec: LayerSpec) -> Result<()> {
        Err(anyhow!("map surface is unavailable for layer {}", spec.id))
    }

    async fn set_filter(&self, layer: &'static str, _filter: HighlightFilter) -> Result<()> {
        Err(anyhow!("map surface is unavailable for layer {layer}"))
    }

    async fn set_line_opacity(&self, layer: &'static str, _opacity: f64) -> Result<()> {
        Err(anyhow!("map surface is unavailable for layer {layer}"))
    }

    async fn place_marker(&self, _position: LngLat) -> Result<MarkerId> {
        Err(anyhow!("map surface is unavailable"))
    }

    async fn remove_marker(&self, _marker: MarkerId) -> Result<()> {
        Err(anyhow!("map surface is unavailable"))
    }

    async fn show_popup(&self, _anchor: LngLat, _rows: Vec<PopupRow>) -> Result<()> {
        Err(anyhow!("map surface is unavailable"))
    }

    async fn hide_popup(&self) -> Result<()> {
        Err(anyhow!("map surface is unavailable"))
    }
}

/// Base map lifecycle, driven by the asynchronous style load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPhase {
    Uninitialized,
    Loading,
    Ready,
}

struct MapControllerState {
    phase: MapPhase,
    registered: HashSet<DatasetKind>,
    marker: Option<MarkerId>,
    marker_for: Option<ProposalLocation>,
}

/// Binds geodata collections to map sources/layers and derives the visual
/// layer state (fill, highlight, marker, popups) from the store. Owns no
/// business state of its own.
pub struct MapController {
    store: Arc<StateStore>,
    surface: Arc<dyn MapSurface>,
    inner: Mutex<MapControllerState>,
}

impl MapController {
    pub fn new(store: Arc<StateStore>, surface: Arc<dyn MapSurface>) -> Self {
        Self {
            store,
            surface,
            inner: Mutex::new(MapControllerState {
                phase: MapPhase::Uninitialized,
                registered: HashSet::new(),
                marker: None,
                marker_for: None,
            }),
        }
    }

    pub async fn phase(&self) -> MapPhase {
        self.inner.lock().await.phase
    }

    pub async fn begin_loading(&self) {
        let mut inner = self.inner.lock().await;
        if inner.phase == MapPhase::Uninitialized {
            inner.phase = MapPhase::Loading;
        }
    }

    /// Completion of the base map/style load. Transitions to `Ready` and
    /// runs an immediate synchronization pass.
    pub async fn style_loaded(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.phase == MapPhase::Ready {
                debug!("duplicate style-load notification; already ready");
                return Ok(());
            }
            inner.phase = MapPhase::Ready;
            info!("base map style loaded");
        }
        self.sync().await
    }

    /// Synchronization reaction: registers any loaded-but-unregistered
    /// dataset and re-derives the highlight and marker from the current
    /// state. Idempotent, and tolerant of being invoked for unrelated
    /// state changes.
    pub async fn sync(&self) -> Result<()> {
        let state = self.store.snapshot().await;
        let mut inner = self.inner.lock().await;
        if inner.phase != MapPhase::Ready {
            return Ok(());
        }

        self.register_pending(&state, &mut inner).await?;
        self.apply_highlight(&state, &inner).await?;
        self.apply_marker(&state, &mut inner).await?;
        Ok(())
    }

    /// Hover over an informational overlay feature. Only data-center
    /// features carry popup detail.
    pub async fn handle_hover(
        &self,
        layer: &str,
        feature_index: usize,
        anchor: LngLat,
    ) -> Result<()> {
        if layer != DC_FILL_LAYER {
            return Ok(());
        }
        let Some(data_centers) = self.store.snapshot().await.data_centers else {
            return Ok(());
        };
        let Some(data_center) = data_centers.get(feature_index) else {
            warn!(feature_index, "hover over unknown data-center feature");
            return Ok(());
        };
        self.surface
            .show_popup(anchor, popup_rows(data_center))
            .await
    }

    pub async fn handle_hover_end(&self) -> Result<()> {
        self.surface.hide_popup().await
    }

    /// Registers each loaded dataset exactly once, no matter how many
    /// times the reaction runs. The registry entry is recorded before the
    /// surface calls so a failing add is never re-attempted.
    async fn register_pending(
        &self,
        state: &AppState,
        inner: &mut MapControllerState,
    ) -> Result<()> {
        let loaded = [
            state.counties.clone().map(GeodataCollection::Counties),
            state.data_centers.clone().map(GeodataCollection::DataCenters),
            state.utilities.clone().map(GeodataCollection::Utilities),
        ];

        for collection in loaded.into_iter().flatten() {
            let kind = collection.kind();
            if !inner.registered.insert(kind) {
                continue;
            }
            info!(dataset = ?kind, features = collection.len(), "registering geodata on map");
            self.surface.add_source(source_id(kind), collection).await?;
            for spec in layer_stack(kind) {
                self.surface.add_layer(spec).await?;
            }
        }
        Ok(())
    }

    /// The highlight exists iff a simulation result does, and identifies
    /// exactly the result's county.
    async fn apply_highlight(&self, state: &AppState, inner: &MapControllerState) -> Result<()> {
        if !inner.registered.contains(&DatasetKind::Counties) {
            return Ok(());
        }
        let (filter, opacity) = match &state.simulation_result {
            Some(result) => (
                HighlightFilter::CountyIdEquals(result.county_id.clone()),
                HIGHLIGHT_VISIBLE_OPACITY,
            ),
            None => (HighlightFilter::MatchNone, 0.0),
        };
        self.surface
            .set_filter(COUNTIES_HIGHLIGHT_LAYER, filter)
            .await?;
        self.surface
            .set_line_opacity(COUNTIES_HIGHLIGHT_LAYER, opacity)
            .await
    }

    /// At most one live marker; the previous one is torn down before a new
    /// one is placed whenever the proposal location changes.
    async fn apply_marker(&self, state: &AppState, inner: &mut MapControllerState) -> Result<()> {
        if state.proposal_location == inner.marker_for {
            return Ok(());
        }
        if let Some(marker) = inner.marker.take() {
            self.surface.remove_marker(marker).await?;
        }
        if let Some(location) = &state.proposal_location {
            let marker = self
                .surface
                .place_marker(LngLat {
                    lng: location.lng,
                    lat: location.lat,
                })
                .await?;
            inner.marker = Some(marker);
        }
        inner.marker_for = state.proposal_location.clone();
        Ok(())
    }
}

pub fn source_id(kind: DatasetKind) -> &'static str {
    match kind {
        DatasetKind::Counties => COUNTIES_SOURCE,
        DatasetKind::DataCenters => DATACENTERS_SOURCE,
        DatasetKind::Utilities => UTILITIES_SOURCE,
    }
}

pub fn layer_stack(kind: DatasetKind) -> Vec<LayerSpec> {
    match kind {
        DatasetKind::Counties => vec![
            LayerSpec {
                id: COUNTIES_FILL_LAYER,
                source: COUNTIES_SOURCE,
                paint: LayerPaint::Fill {
                    color: "#00d4aa",
                    opacity: FillOpacity::Ramp(COUNTY_FILL_RAMP),
                },
                filter: None,
            },
            LayerSpec {
                id: COUNTIES_OUTLINE_LAYER,
                source: COUNTIES_SOURCE,
                paint: LayerPaint::Line {
                    color: "#00d4aa",
                    opacity: 0.3,
                    width: 1.5,
                    dash: Some([4.0, 3.0]),
                },
                filter: None,
            },
            LayerSpec {
                id: COUNTIES_HIGHLIGHT_LAYER,
                source: COUNTIES_SOURCE,
                paint: LayerPaint::Line {
                    color: "#00d4aa",
                    opacity: 0.0,
                    width: 3.0,
                    dash: None,
                },
                filter: Some(HighlightFilter::MatchNone),
            },
            LayerSpec {
                id: COUNTY_LABELS_LAYER,
                source: COUNTIES_SOURCE,
                paint: LayerPaint::Symbol {
                    text_property: "name",
                    text_color: "rgba(245,158,11,0.5)",
                    halo_color: "rgba(6,9,15,0.9)",
                },
                filter: None,
            },
        ],
        DatasetKind::DataCenters => vec![
            LayerSpec {
                id: DC_FILL_LAYER,
                source: DATACENTERS_SOURCE,
                paint: LayerPaint::Fill {
                    color: "#f59e0b",
                    opacity: FillOpacity::Fixed(0.28),
                },
                filter: None,
            },
            LayerSpec {
                id: DC_OUTLINE_LAYER,
                source: DATACENTERS_SOURCE,
                paint: LayerPaint::Line {
                    color: "#f59e0b",
                    opacity: 0.6,
                    width: 1.0,
                    dash: None,
                },
                filter: None,
            },
        ],
        DatasetKind::Utilities => vec![
            LayerSpec {
                id: UTILITIES_FILL_LAYER,
                source: UTILITIES_SOURCE,
                paint: LayerPaint::Fill {
                    color: "#60a5fa",
                    opacity: FillOpacity::Fixed(0.05),
                },
                filter: None,
            },
            LayerSpec {
                id: UTILITIES_OUTLINE_LAYER,
                source: UTILITIES_SOURCE,
                paint: LayerPaint::Line {
                    color: "#60a5fa",
                    opacity: 0.5,
                    width: 1.0,
                    dash: None,
                },
                filter: None,
            },
        ],
    }
}

/// Popup detail rows for a data-center feature. Only fields present and
/// non-empty are rendered, in a fixed priority order.
pub fn popup_rows(data_center: &DataCenter) -> Vec<PopupRow> {
    let name = if data_center.name.trim().is_empty() {
        "Data Center".to_string()
    } else {
        data_center.name.clone()
    };
    let mut rows = vec![PopupRow {
        label: "NAME",
        value: name,
    }];

    if let Some(mw) = data_center.capacity_mw {
        rows.push(PopupRow {
            label: "CAPACITY",
            value: format!("{mw} MW"),
        });
    }
    if let Some(year) = present(&data_center.year_operational) {
        rows.push(PopupRow {
            label: "YEAR OPERATIONAL",
            value: year.to_string(),
        });
    }
    if let Some(location) = present(&data_center.location) {
        rows.push(PopupRow {
            label: "LOCATION",
            value: location.to_string(),
        });
    }
    if let Some(operator) = present(&data_center.operator) {
        rows.push(PopupRow {
            label: "DEVELOPER",
            value: operator.to_string(),
        });
    }
    if let Some(rank) = present(&data_center.size_rank) {
        if !rank.eq_ignore_ascii_case("unknown") {
            rows.push(PopupRow {
                label: "SIZERANK",
                value: rank.to_string(),
            });
        }
    }
    rows
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "tests/map_tests.rs"]
mod tests;
