use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use client_core::map::{HighlightFilter, LayerSpec, MapSurface, MarkerId, PopupRow};
use client_core::store::GeodataCollection;
use shared::domain::LngLat;
use tracing::info;

/// Headless stand-in for a basemap renderer: every surface operation is
/// logged instead of drawn.
#[derive(Default)]
pub struct LogMapSurface {
    next_marker: AtomicU64,
}

#[async_trait]
impl MapSurface for LogMapSurface {
    async fn add_source(&self, id: &'static str, data: GeodataCollection) -> Result<()> {
        info!(source = id, features = data.len(), "add source");
        Ok(())
    }

    async fn add_layer(&self, spec: LayerSpec) -> Result<()> {
        info!(layer = spec.id, source = spec.source, "add layer");
        Ok(())
    }

    async fn set_filter(&self, layer: &'static str, filter: HighlightFilter) -> Result<()> {
        info!(layer, filter = ?filter, "set filter");
        Ok(())
    }

    async fn set_line_opacity(&self, layer: &'static str, opacity: f64) -> Result<()> {
        info!(layer, opacity, "set line opacity");
        Ok(())
    }

    async fn place_marker(&self, position: LngLat) -> Result<MarkerId> {
        let marker = MarkerId(self.next_marker.fetch_add(1, Ordering::Relaxed) + 1);
        info!(marker = marker.0, lng = position.lng, lat = position.lat, "place marker");
        Ok(marker)
    }

    async fn remove_marker(&self, marker: MarkerId) -> Result<()> {
        info!(marker = marker.0, "remove marker");
        Ok(())
    }

    async fn show_popup(&self, anchor: LngLat, rows: Vec<PopupRow>) -> Result<()> {
        info!(lng = anchor.lng, lat = anchor.lat, rows = rows.len(), "show popup");
        Ok(())
    }

    async fn hide_popup(&self) -> Result<()> {
        info!("hide popup");
        Ok(())
    }
}
