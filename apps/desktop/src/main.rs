use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use client_core::geodata::HttpGeodataProvider;
use client_core::picker::MapClickEvent;
use client_core::presentation;
use client_core::simulation::HttpSimulationService;
use client_core::{AquaGridClient, MapEvent};
use shared::domain::{CoolingType, LngLat, ScreenPoint};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod surface;

use surface::LogMapSurface;

#[derive(Parser, Debug)]
#[command(name = "aquagrid", about = "Headless AquaGrid strain-simulation client")]
struct Args {
    /// Base URL of the AquaGrid API; overrides aquagrid.toml and env.
    #[arg(long)]
    api_base_url: Option<String>,
    /// Proposal longitude.
    #[arg(long, default_value_t = -77.52, allow_hyphen_values = true)]
    lng: f64,
    /// Proposal latitude.
    #[arg(long, default_value_t = 39.05)]
    lat: f64,
    /// Facility capacity in MW.
    #[arg(long, default_value_t = 50.0)]
    mw: f64,
    /// Cooling system: air_cooled, hybrid, or evaporative.
    #[arg(long, default_value = "evaporative")]
    cooling: String,
}

fn parse_cooling(value: &str) -> Result<CoolingType> {
    match value {
        "air_cooled" => Ok(CoolingType::AirCooled),
        "hybrid" => Ok(CoolingType::Hybrid),
        "evaporative" => Ok(CoolingType::Evaporative),
        other => {
            bail!("unknown cooling type {other:?}; expected air_cooled, hybrid, or evaporative")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let cooling = parse_cooling(&args.cooling)?;

    let mut settings = config::load_settings();
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }

    let client = AquaGridClient::new(
        Arc::new(HttpGeodataProvider::new(settings.api_base_url.clone())),
        Arc::new(HttpSimulationService::new(settings.api_base_url.clone())),
        Arc::new(LogMapSurface::default()),
    );
    let _reaction = client.spawn_map_reaction();

    info!(style = %settings.style_url, api = %settings.api_base_url, "starting base map load");
    client.handle_map_event(MapEvent::StyleLoadStarted).await?;
    client.load_geodata().await?;
    client.handle_map_event(MapEvent::StyleLoaded).await?;

    client
        .handle_map_event(MapEvent::Click(MapClickEvent {
            lng_lat: LngLat {
                lng: args.lng,
                lat: args.lat,
            },
            point: ScreenPoint { x: 0.0, y: 0.0 },
        }))
        .await?;

    let state = client.snapshot().await;
    let Some(location) = state.proposal_location.clone() else {
        if let Some(notice) = state.notice {
            println!("{}", notice.text);
        } else {
            println!("No location resolved; is the backend reachable?");
        }
        return Ok(());
    };
    println!(
        "Proposed site: {} ({:.4}, {:.4})",
        location.county_name, location.lat, location.lng
    );

    client.run_simulation(args.mw, Some(cooling)).await?;

    let state = client.snapshot().await;
    if let Some(result) = state.simulation_result {
        let tag = presentation::strain_tag(result.strain_percent);
        println!("Strain: {:.2}% [{}]", result.strain_percent, tag.label());
        println!(
            "Cooling: {}",
            presentation::cooling_display(&result.cooling_type)
        );
        println!(
            "Demand: {} GPD",
            presentation::format_gpd(result.daily_water_gpd)
        );
        println!(
            "Baseline: {} GPD",
            presentation::format_gpd(result.total_withdrawal_gpd)
        );
    } else if let Some(error) = state.error {
        println!("Simulation failed: {error}");
    }

    Ok(())
}
