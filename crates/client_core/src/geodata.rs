use async_trait::async_trait;
use geo::MultiPolygon;
use geojson::{FeatureCollection, GeoJson, JsonObject};
use shared::domain::{County, CountyId, DataCenter, UtilityServiceArea};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GeodataError {
    #[error("geodata request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid geodata payload: {0}")]
    Decode(String),
    #[error("geodata provider is unavailable")]
    Unavailable,
}

/// The external read-only geodata source, fetched once at startup.
#[async_trait]
pub trait GeodataProvider: Send + Sync {
    async fn counties(&self) -> Result<Vec<County>, GeodataError>;
    async fn data_centers(&self) -> Result<Vec<DataCenter>, GeodataError>;
    async fn utilities(&self) -> Result<Vec<UtilityServiceArea>, GeodataError>;
}

pub struct MissingGeodataProvider;

#[async_trait]
impl GeodataProvider for MissingGeodataProvider {
    async fn counties(&self) -> Result<Vec<County>, GeodataError> {
        Err(GeodataError::Unavailable)
    }

    async fn data_centers(&self) -> Result<Vec<DataCenter>, GeodataError> {
        Err(GeodataError::Unavailable)
    }

    async fn utilities(&self) -> Result<Vec<UtilityServiceArea>, GeodataError> {
        Err(GeodataError::Unavailable)
    }
}

pub struct HttpGeodataProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGeodataProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_collection(&self, path: &str) -> Result<FeatureCollection, GeodataError> {
        let body = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let geojson = body
            .parse::<GeoJson>()
            .map_err(|error| GeodataError::Decode(error.to_string()))?;
        FeatureCollection::try_from(geojson)
            .map_err(|error| GeodataError::Decode(error.to_string()))
    }
}

#[async_trait]
impl GeodataProvider for HttpGeodataProvider {
    async fn counties(&self) -> Result<Vec<County>, GeodataError> {
        Ok(decode_counties(self.fetch_collection("/counties").await?))
    }

    async fn data_centers(&self) -> Result<Vec<DataCenter>, GeodataError> {
        Ok(decode_data_centers(
            self.fetch_collection("/data-centers").await?,
        ))
    }

    async fn utilities(&self) -> Result<Vec<UtilityServiceArea>, GeodataError> {
        Ok(decode_utilities(self.fetch_collection("/utilities").await?))
    }
}

/// Decodes county features. A feature missing its polygon geometry or any
/// of the required properties is skipped, not fatal.
pub fn decode_counties(collection: FeatureCollection) -> Vec<County> {
    let mut counties = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let geojson::Feature {
            geometry,
            properties,
            ..
        } = feature;
        let Some(boundary) = multipolygon(geometry) else {
            warn!("skipping county feature without polygon geometry");
            continue;
        };
        let (Some(id), Some(name)) = (
            string_prop(&properties, "county_id"),
            string_prop(&properties, "name"),
        ) else {
            warn!("skipping county feature without identity properties");
            continue;
        };
        let (Some(area_sq_mi), Some(total_withdrawal_gpd)) = (
            number_prop(&properties, "area_sq_mi"),
            number_prop(&properties, "total_withdrawal_gpd"),
        ) else {
            warn!(county = %name, "skipping county feature without baseline properties");
            continue;
        };
        counties.push(County {
            id: CountyId(id),
            name,
            area_sq_mi,
            total_withdrawal_gpd,
            boundary,
        });
    }
    counties
}

/// Decodes data-center features. Every attribute except the footprint is
/// optional; absent, null, and empty-string properties all map to `None`,
/// and numbers are accepted as JSON strings.
pub fn decode_data_centers(collection: FeatureCollection) -> Vec<DataCenter> {
    let mut data_centers = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let geojson::Feature {
            geometry,
            properties,
            ..
        } = feature;
        let Some(footprint) = multipolygon(geometry) else {
            warn!("skipping data-center feature without polygon geometry");
            continue;
        };
        data_centers.push(DataCenter {
            name: string_prop(&properties, "name").unwrap_or_default(),
            capacity_mw: number_prop(&properties, "mw"),
            year_operational: string_prop(&properties, "year_operational"),
            location: string_prop(&properties, "location"),
            operator: string_prop(&properties, "operator"),
            size_rank: string_prop(&properties, "sizerank"),
            footprint,
        });
    }
    data_centers
}

pub fn decode_utilities(collection: FeatureCollection) -> Vec<UtilityServiceArea> {
    let mut utilities = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let geojson::Feature {
            geometry,
            properties,
            ..
        } = feature;
        let Some(service_area) = multipolygon(geometry) else {
            warn!("skipping utility feature without polygon geometry");
            continue;
        };
        utilities.push(UtilityServiceArea {
            utility_id: string_prop(&properties, "utility_id"),
            utility_name: string_prop(&properties, "utility_name"),
            boundary_quality: string_prop(&properties, "boundary_quality"),
            service_area,
        });
    }
    utilities
}

fn multipolygon(geometry: Option<geojson::Geometry>) -> Option<MultiPolygon<f64>> {
    let geometry = geometry?;
    match geo::Geometry::<f64>::try_from(geometry).ok()? {
        geo::Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        geo::Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    }
}

fn string_prop(properties: &Option<JsonObject>, key: &str) -> Option<String> {
    match properties.as_ref()?.get(key)? {
        serde_json::Value::String(value) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        serde_json::Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn number_prop(properties: &Option<JsonObject>, key: &str) -> Option<f64> {
    match properties.as_ref()?.get(key)? {
        serde_json::Value::Number(value) => value.as_f64(),
        serde_json::Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/geodata_tests.rs"]
mod tests;
