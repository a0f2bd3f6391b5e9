use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Router};
use geo::polygon;
use shared::domain::{County, CountyId, ScreenPoint};
use shared::protocol::{SimulationRequest, SimulationResponse};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::geodata::{GeodataError, HttpGeodataProvider};
use crate::map::{HighlightFilter, LayerSpec, MapSurface, MarkerId, PopupRow, COUNTIES_HIGHLIGHT_LAYER};
use crate::simulation::{MissingSimulationService, SimulationServiceError};

use super::*;

fn square_county(id: &str, name: &str, x0: f64) -> County {
    County {
        id: CountyId(id.to_string()),
        name: name.to_string(),
        area_sq_mi: 500.0,
        total_withdrawal_gpd: 32_000_000.0,
        boundary: geo::MultiPolygon(vec![polygon![
            (x: x0, y: 0.0),
            (x: x0 + 2.0, y: 0.0),
            (x: x0 + 2.0, y: 2.0),
            (x: x0, y: 2.0),
            (x: x0, y: 0.0),
        ]]),
    }
}

struct FixtureGeodata;

#[async_trait]
impl geodata::GeodataProvider for FixtureGeodata {
    async fn counties(&self) -> Result<Vec<County>, GeodataError> {
        Ok(vec![
            square_county("w-1", "West", 0.0),
            square_county("e-1", "East", 2.0),
        ])
    }

    async fn data_centers(&self) -> Result<Vec<shared::domain::DataCenter>, GeodataError> {
        Ok(Vec::new())
    }

    async fn utilities(&self) -> Result<Vec<shared::domain::UtilityServiceArea>, GeodataError> {
        Ok(Vec::new())
    }
}

/// Answers with the county containing the requested point, the way the
/// real backend resolves the request coordinates on its own.
struct RegionAwareSimulation;

#[async_trait]
impl SimulationService for RegionAwareSimulation {
    async fn simulate(
        &self,
        request: SimulationRequest,
    ) -> Result<SimulationResponse, SimulationServiceError> {
        let (county, county_id) = if request.lng < 2.0 {
            ("West", "w-1")
        } else {
            ("East", "e-1")
        };
        Ok(SimulationResponse {
            county: county.to_string(),
            county_id: CountyId(county_id.to_string()),
            mw: request.mw,
            cooling_type: request.cooling_type.to_string(),
            daily_water_gpd: request.mw * 5_000.0,
            total_withdrawal_gpd: 32_000_000.0,
            strain_percent: 0.78,
        })
    }
}

#[derive(Default)]
struct RecordingSurface {
    markers_placed: Mutex<Vec<MarkerId>>,
    markers_removed: Mutex<Vec<MarkerId>>,
    filters: Mutex<Vec<HighlightFilter>>,
    opacities: Mutex<Vec<f64>>,
    next_marker: std::sync::atomic::AtomicU64,
}

impl RecordingSurface {
    async fn live_marker_count(&self) -> usize {
        let placed = self.markers_placed.lock().await;
        let removed = self.markers_removed.lock().await;
        placed.iter().filter(|id| !removed.contains(id)).count()
    }

    /// The controller always applies the filter and the opacity together,
    /// so the last entry of each log forms one consistent highlight.
    async fn last_highlight(&self) -> Option<(HighlightFilter, f64)> {
        let filter = self.filters.lock().await.last().cloned()?;
        let opacity = self.opacities.lock().await.last().copied()?;
        Some((filter, opacity))
    }
}

#[async_trait]
impl MapSurface for RecordingSurface {
    async fn add_source(&self, _id: &'static str, _data: GeodataCollection) -> Result<()> {
        Ok(())
    }

    async fn add_layer(&self, _spec: LayerSpec) -> Result<()> {
        Ok(())
    }

    async fn set_filter(&self, layer: &'static str, filter: HighlightFilter) -> Result<()> {
        if layer == COUNTIES_HIGHLIGHT_LAYER {
            self.filters.lock().await.push(filter);
        }
        Ok(())
    }

    async fn set_line_opacity(&self, layer: &'static str, opacity: f64) -> Result<()> {
        if layer == COUNTIES_HIGHLIGHT_LAYER {
            self.opacities.lock().await.push(opacity);
        }
        Ok(())
    }

    async fn place_marker(&self, _position: LngLat) -> Result<MarkerId> {
        let marker = MarkerId(
            self.next_marker
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                + 1,
        );
        self.markers_placed.lock().await.push(marker);
        Ok(marker)
    }

    async fn remove_marker(&self, marker: MarkerId) -> Result<()> {
        self.markers_removed.lock().await.push(marker);
        Ok(())
    }

    async fn show_popup(&self, _anchor: LngLat, _rows: Vec<PopupRow>) -> Result<()> {
        Ok(())
    }

    async fn hide_popup(&self) -> Result<()> {
        Ok(())
    }
}

fn click_at(lng: f64, lat: f64) -> MapEvent {
    MapEvent::Click(MapClickEvent {
        lng_lat: LngLat { lng, lat },
        point: ScreenPoint { x: 0.0, y: 0.0 },
    })
}

fn fixture_client(surface: Arc<RecordingSurface>) -> Arc<AquaGridClient> {
    AquaGridClient::new(
        Arc::new(FixtureGeodata),
        Arc::new(RegionAwareSimulation),
        surface as Arc<dyn MapSurface>,
    )
}

#[tokio::test]
async fn click_configure_simulate_scenario() {
    let surface = Arc::new(RecordingSurface::default());
    let client = fixture_client(Arc::clone(&surface));

    client
        .handle_map_event(MapEvent::StyleLoadStarted)
        .await
        .expect("loading");
    client.load_geodata().await.expect("geodata");
    client
        .handle_map_event(MapEvent::StyleLoaded)
        .await
        .expect("ready");

    client.handle_map_event(click_at(1.0, 1.0)).await.expect("click");
    client.map().sync().await.expect("sync");

    let state = client.snapshot().await;
    assert_eq!(
        state.proposal_location.as_ref().map(|loc| loc.county_name.as_str()),
        Some("West")
    );
    assert_eq!(surface.live_marker_count().await, 1);

    client
        .run_simulation(50.0, Some(CoolingType::Evaporative))
        .await
        .expect("run");
    client.map().sync().await.expect("sync");

    let state = client.snapshot().await;
    let result = state.simulation_result.expect("result");
    assert!(!state.loading);
    assert_eq!(result.strain_percent, 0.78);
    assert_eq!(result.daily_water_gpd, 250_000.0);
    assert_eq!(
        surface.last_highlight().await,
        Some((
            HighlightFilter::CountyIdEquals(CountyId("w-1".to_string())),
            0.8
        ))
    );
}

#[tokio::test]
async fn second_click_leaves_one_marker_and_rehighlights_its_region() {
    let surface = Arc::new(RecordingSurface::default());
    let client = fixture_client(Arc::clone(&surface));

    client.load_geodata().await.expect("geodata");
    client
        .handle_map_event(MapEvent::StyleLoaded)
        .await
        .expect("ready");

    client.handle_map_event(click_at(1.0, 1.0)).await.expect("click");
    client.map().sync().await.expect("sync");
    client
        .run_simulation(50.0, Some(CoolingType::Evaporative))
        .await
        .expect("run");
    client.map().sync().await.expect("sync");

    client.handle_map_event(click_at(3.0, 1.0)).await.expect("click");
    client.map().sync().await.expect("sync");

    // The new location invalidated the previous result and its highlight.
    assert_eq!(
        surface.last_highlight().await,
        Some((HighlightFilter::MatchNone, 0.0))
    );
    assert_eq!(surface.live_marker_count().await, 1);

    client
        .run_simulation(80.0, Some(CoolingType::Hybrid))
        .await
        .expect("run");
    client.map().sync().await.expect("sync");

    assert_eq!(surface.live_marker_count().await, 1);
    assert_eq!(
        surface.last_highlight().await,
        Some((
            HighlightFilter::CountyIdEquals(CountyId("e-1".to_string())),
            0.8
        ))
    );
}

#[tokio::test]
async fn reaction_loop_places_the_marker_without_manual_syncs() {
    let surface = Arc::new(RecordingSurface::default());
    let client = fixture_client(Arc::clone(&surface));
    let _reaction = client.spawn_map_reaction();

    client.load_geodata().await.expect("geodata");
    client
        .handle_map_event(MapEvent::StyleLoaded)
        .await
        .expect("ready");
    client.handle_map_event(click_at(1.0, 1.0)).await.expect("click");

    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if surface.live_marker_count().await == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("marker placed by reaction loop");
}

async fn spawn_partial_geodata_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route(
            "/api/counties",
            get(|| async { r#"{ "type": "FeatureCollection", "features": [] }"# }),
        )
        .route(
            "/api/data-centers",
            get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route(
            "/api/utilities",
            get(|| async { r#"{ "type": "FeatureCollection", "features": [] }"# }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

#[tokio::test]
async fn partial_geodata_failure_surfaces_one_aggregate_notice() {
    let base_url = spawn_partial_geodata_server().await;
    let client = AquaGridClient::new(
        Arc::new(HttpGeodataProvider::new(base_url)),
        Arc::new(MissingSimulationService),
        Arc::new(RecordingSurface::default()) as Arc<dyn MapSurface>,
    );

    client.load_geodata().await.expect("load");

    let state = client.snapshot().await;
    assert!(state.counties.is_some());
    assert!(state.utilities.is_some());
    assert!(state.data_centers.is_none());
    assert_eq!(
        state.notice.map(|notice| notice.text),
        Some(CONNECTIVITY_NOTICE.to_string())
    );
}

#[tokio::test]
async fn notices_can_be_dismissed_manually() {
    let surface = Arc::new(RecordingSurface::default());
    let client = fixture_client(Arc::clone(&surface));
    client.load_geodata().await.expect("geodata");

    client.handle_map_event(click_at(50.0, 50.0)).await.expect("click");
    assert!(client.snapshot().await.notice.is_some());

    client.dismiss_notice().await;
    assert!(client.snapshot().await.notice.is_none());
}
