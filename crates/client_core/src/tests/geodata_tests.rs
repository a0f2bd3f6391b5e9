use axum::{routing::get, Router};
use geo::{Contains, Point};
use tokio::net::TcpListener;

use super::*;

const COUNTIES_FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {
        "name": "Loudoun",
        "county_id": "51107",
        "area_sq_mi": 520.0,
        "total_withdrawal_gpd": 32000000
      },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
      }
    },
    {
      "type": "Feature",
      "properties": { "name": "Broken" },
      "geometry": null
    },
    {
      "type": "Feature",
      "properties": { "name": "NoBaseline", "county_id": "00000" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0], [5.0, 5.0]]]
      }
    }
  ]
}"#;

const DATACENTERS_FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {
        "name": "Ashburn Campus",
        "mw": "120.5",
        "year_operational": 2019,
        "operator": "",
        "sizerank": "3"
      },
      "geometry": {
        "type": "MultiPolygon",
        "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]]
      }
    }
  ]
}"#;

fn parse(fixture: &str) -> FeatureCollection {
    let geojson = fixture.parse::<GeoJson>().expect("geojson");
    FeatureCollection::try_from(geojson).expect("feature collection")
}

#[test]
fn county_decoding_skips_unusable_features() {
    let counties = decode_counties(parse(COUNTIES_FIXTURE));

    assert_eq!(counties.len(), 1);
    let loudoun = &counties[0];
    assert_eq!(loudoun.id, CountyId("51107".to_string()));
    assert_eq!(loudoun.name, "Loudoun");
    assert_eq!(loudoun.area_sq_mi, 520.0);
    assert_eq!(loudoun.total_withdrawal_gpd, 32_000_000.0);
    assert!(loudoun.boundary.contains(&Point::new(1.0, 1.0)));
}

#[test]
fn data_center_decoding_is_lenient_about_property_types() {
    let data_centers = decode_data_centers(parse(DATACENTERS_FIXTURE));

    assert_eq!(data_centers.len(), 1);
    let dc = &data_centers[0];
    assert_eq!(dc.name, "Ashburn Campus");
    assert_eq!(dc.capacity_mw, Some(120.5));
    assert_eq!(dc.year_operational.as_deref(), Some("2019"));
    assert_eq!(dc.operator, None);
    assert_eq!(dc.size_rank.as_deref(), Some("3"));
}

#[test]
fn utility_decoding_keeps_optional_attribution() {
    let fixture = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": { "utility_id": "U1", "utility_name": "Loudoun Water" },
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
          }
        }
      ]
    }"#;
    let utilities = decode_utilities(parse(fixture));

    assert_eq!(utilities.len(), 1);
    assert_eq!(utilities[0].utility_id.as_deref(), Some("U1"));
    assert_eq!(utilities[0].boundary_quality, None);
}

async fn spawn_geodata_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route(
            "/api/counties",
            get(|| async {
                (
                    [(axum::http::header::CONTENT_TYPE, "application/geo+json")],
                    COUNTIES_FIXTURE,
                )
            }),
        )
        .route(
            "/api/data-centers",
            get(|| async {
                (
                    [(axum::http::header::CONTENT_TYPE, "application/geo+json")],
                    DATACENTERS_FIXTURE,
                )
            }),
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
async fn http_provider_fetches_and_decodes_all_three_collections() {
    let base_url = spawn_geodata_server().await;
    let provider = HttpGeodataProvider::new(base_url);

    let counties = provider.counties().await.expect("counties");
    let data_centers = provider.data_centers().await.expect("data centers");
    let utilities = provider.utilities().await.expect("utilities");

    assert_eq!(counties.len(), 1);
    assert_eq!(data_centers.len(), 1);
    assert!(utilities.is_empty());
}

#[tokio::test]
async fn http_provider_surfaces_transport_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let provider = HttpGeodataProvider::new(format!("http://{addr}/api"));
    let error = provider.counties().await.expect_err("must fail");
    assert!(matches!(error, GeodataError::Transport(_)));
}
