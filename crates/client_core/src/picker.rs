use std::sync::Arc;

use geo::{Contains, Point};
use shared::domain::{County, LngLat, ProposalLocation, ScreenPoint};
use tracing::{debug, info};

use crate::store::{post_transient_notice, StateStore};

/// Notice shown when a click resolves to no county.
pub const OUT_OF_COVERAGE_NOTICE: &str = "Simulation only supported in Northern Virginia (MVP).";

/// A map interaction event: the geographic coordinate and the position in
/// screen/render space as reported by the basemap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapClickEvent {
    pub lng_lat: LngLat,
    pub point: ScreenPoint,
}

/// Resolves map clicks to a county and writes the proposal location.
/// Never computes a result; this only resolves identity.
pub struct LocationPicker {
    store: Arc<StateStore>,
}

impl LocationPicker {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub async fn handle_click(&self, event: MapClickEvent) {
        let counties = self.store.snapshot().await.counties;
        let Some(counties) = counties else {
            debug!("click before county data loaded; ignoring");
            return;
        };

        let point = Point::new(event.lng_lat.lng, event.lng_lat.lat);
        let mut hits: Vec<&County> = counties
            .iter()
            .filter(|county| county.boundary.contains(&point))
            .collect();

        if hits.is_empty() {
            debug!(
                lng = event.lng_lat.lng,
                lat = event.lng_lat.lat,
                "click outside coverage area"
            );
            post_transient_notice(&self.store, OUT_OF_COVERAGE_NOTICE).await;
            return;
        }

        // Overlapping or adjacent boundaries: the smallest county wins.
        hits.sort_by(|a, b| a.area_sq_mi.total_cmp(&b.area_sq_mi));
        let county = hits[0];

        info!(
            county_id = %county.id,
            county = %county.name,
            "resolved proposal location"
        );
        self.store
            .set_proposal_location(ProposalLocation {
                lat: event.lng_lat.lat,
                lng: event.lng_lat.lng,
                county_name: county.name.clone(),
                county_id: county.id.clone(),
            })
            .await;
    }
}

#[cfg(test)]
#[path = "tests/picker_tests.rs"]
mod tests;
