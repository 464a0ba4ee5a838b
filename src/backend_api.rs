// Functions to interact with the rental backend (vehicle search, vehicle details)

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::{
    config::Settings,
    models::{RawVehicleRecord, TripWindow, VehicleCategory},
    trip,
};

const SEARCH_PATH: &str = "api/search/vehicles/";
// Keys the backend has been seen wrapping result arrays in
const RESULT_ARRAY_KEYS: [&str; 3] = ["results", "vehicles", "data"];

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to rental backend failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("rental backend returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("could not decode rental backend response: {0}")]
    Decode(String),
    #[error("invalid vehicle id '{0}'")]
    InvalidId(String),
}

// Shared client, built once at startup and kept in AppState
pub fn build_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("rentals_rust/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(settings.backend_timeout_secs));

    if let Some(proxy_url) = settings.proxy_url.as_deref().filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy_url).context("Invalid proxy_url in configuration")?;
        builder = builder.proxy(proxy);
        tracing::info!("Routing backend requests through configured proxy.");
    }

    builder.build().context("Failed to build reqwest client")
}

/// Query string for `GET /api/search/vehicles/`. Dates and times are only sent
/// when the whole trip window is known.
pub fn search_query(
    category: VehicleCategory,
    location: Option<&str>,
    window: Option<&TripWindow>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("vehicle_type", category.as_str().to_string())];
    if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
        query.push(("location", location.to_string()));
    }
    if let Some(window) = window {
        query.push(("start_date", trip::query_date(&window.start)));
        query.push(("end_date", trip::query_date(&window.end)));
        query.push(("start_time", trip::query_time(&window.start)));
        query.push(("end_time", trip::query_time(&window.end)));
    }
    query
}

pub async fn fetch_vehicles(
    client: &Client,
    settings: &Settings,
    category: VehicleCategory,
    location: Option<&str>,
    window: Option<&TripWindow>,
) -> Result<Vec<RawVehicleRecord>, BackendError> {
    let url = settings.backend_url(SEARCH_PATH);
    let query = search_query(category, location, window);
    tracing::info!(category = %category, location = ?location, "Searching rental backend");

    // The search endpoint itself must exist; a 404 here is a broken upstream,
    // not an empty result or a missing vehicle.
    let json = get_json(client, settings, &url, &query, "vehicle search")
        .await
        .map_err(|e| match e {
            BackendError::NotFound(_) => BackendError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: String::new(),
            },
            other => other,
        })?;
    let records = vehicle_records(json)?;
    tracing::info!(category = %category, count = records.len(), "Backend search complete");
    Ok(records)
}

pub async fn fetch_vehicle_detail(
    client: &Client,
    settings: &Settings,
    vehicle_id: &str,
) -> Result<RawVehicleRecord, BackendError> {
    if !is_valid_vehicle_id(vehicle_id) {
        tracing::warn!(vehicle_id, "Rejecting malformed vehicle id");
        return Err(BackendError::InvalidId(vehicle_id.to_string()));
    }
    let url = settings.backend_url(&format!("api/vehicles/{}/", vehicle_id));
    let json = get_json(client, settings, &url, &[], &format!("vehicle {}", vehicle_id)).await?;

    // Some deployments wrap the record in {"data": {...}}
    let record = match json {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(record).map_err(|e| BackendError::Decode(e.to_string()))
}

// Ids go into the URL path verbatim, so only plain id characters are allowed
pub fn is_valid_vehicle_id(vehicle_id: &str) -> bool {
    !vehicle_id.is_empty()
        && vehicle_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// Accepts a bare array or an object holding one under a known key.
// Elements that are not vehicle objects are skipped.
fn vehicle_records(json: Value) -> Result<Vec<RawVehicleRecord>, BackendError> {
    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut map) => RESULT_ARRAY_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| BackendError::Decode("no vehicle array in search response".into()))?,
        other => {
            return Err(BackendError::Decode(format!(
                "expected a vehicle array, got {}",
                type_name(&other)
            )));
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawVehicleRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed vehicle record");
                None
            }
        })
        .collect();
    Ok(records)
}

// GET with the configured number of attempts and a doubling delay between them.
// A 404 is final and never retried.
async fn get_json(
    client: &Client,
    settings: &Settings,
    url: &str,
    query: &[(&str, String)],
    what: &str,
) -> Result<Value, BackendError> {
    let max_attempts = settings.backend_max_attempts.max(1);
    let mut retry_delay = Duration::from_millis(settings.backend_retry_delay_ms);
    let mut attempt = 1;

    loop {
        tracing::debug!(url, attempt, "Fetch attempt {}/{}", attempt, max_attempts);
        match get_once(client, url, query, what).await {
            Ok(json) => return Ok(json),
            Err(e @ BackendError::NotFound(_)) => return Err(e),
            Err(e) if attempt >= max_attempts => {
                tracing::error!(url, attempt, error = %e, "Backend request failed, giving up");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(url, attempt, error = %e, "Backend request failed. Retrying...");
                sleep(retry_delay).await;
                retry_delay *= 2;
                attempt += 1;
            }
        }
    }
}

async fn get_once(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    what: &str,
) -> Result<Value, BackendError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    tracing::debug!(url, status = %status, "Received response status");

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "[Failed to read response body]".to_string());
        tracing::debug!(url, status = %status, response_body = body.as_str(), "HTTP error details");
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice::<Value>(&bytes).map_err(|e| {
        tracing::debug!(url, response_body = %String::from_utf8_lossy(&bytes), "JSON parse error details");
        BackendError::Decode(e.to_string())
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn settings_for(server: &MockServer) -> Settings {
        Settings::for_backend(&server.uri())
    }

    fn window() -> TripWindow {
        TripWindow::from_parts("2024-05-01", "10:00", "2024-05-02", "12:30").unwrap()
    }

    #[test]
    fn query_includes_trip_window() {
        let query = search_query(VehicleCategory::Car, Some(" Pune "), Some(&window()));
        assert_eq!(
            query,
            vec![
                ("vehicle_type", "car".to_string()),
                ("location", "Pune".to_string()),
                ("start_date", "2024-05-01".to_string()),
                ("end_date", "2024-05-02".to_string()),
                ("start_time", "10:00:00".to_string()),
                ("end_time", "12:30:00".to_string()),
            ]
        );
    }

    #[test]
    fn query_without_window_or_location() {
        let query = search_query(VehicleCategory::Cycle, Some(""), None);
        assert_eq!(query, vec![("vehicle_type", "cycle".to_string())]);
    }

    #[tokio::test]
    async fn fetches_search_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .and(query_param("vehicle_type", "bike"))
            .and(query_param("location", "Goa"))
            .and(query_param("start_time", "10:00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "brand": "Honda", "price_per_hour": "40" },
                "not a vehicle",
                { "id": 2, "brand": "TVS", "price_per_hour": 35 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let records = fetch_vehicles(&client, &settings, VehicleCategory::Bike, Some("Goa"), Some(&window()))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].brand, Some(json!("TVS")));
    }

    #[tokio::test]
    async fn accepts_wrapped_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "count": 1, "results": [{ "id": "c1" }] })),
            )
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let records = fetch_vehicles(&client, &settings, VehicleCategory::Car, None, None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn server_error_is_reported_without_retry_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let err = fetch_vehicles(&client, &settings, VehicleCategory::Car, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn retries_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 5 }])))
            .mount(&server)
            .await;

        let mut settings = settings_for(&server);
        settings.backend_max_attempts = 3;
        let client = build_client(&settings).unwrap();
        let records = fetch_vehicles(&client, &settings, VehicleCategory::Car, None, None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let err = fetch_vehicles(&client, &settings, VehicleCategory::Car, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn detail_not_found_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vehicles/42/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = settings_for(&server);
        settings.backend_max_attempts = 3;
        let client = build_client(&settings).unwrap();
        let err = fetch_vehicle_detail(&client, &settings, "42").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn detail_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vehicles/7/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "id": 7, "model": "Nexon EV" } })),
            )
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let record = fetch_vehicle_detail(&client, &settings, "7").await.unwrap();
        assert_eq!(record.model, Some(json!("Nexon EV")));
    }

    #[test]
    fn vehicle_ids_are_plain_tokens() {
        assert!(is_valid_vehicle_id("42"));
        assert!(is_valid_vehicle_id("car-7_b"));
        assert!(!is_valid_vehicle_id(""));
        assert!(!is_valid_vehicle_id(".."));
        assert!(!is_valid_vehicle_id("../search/vehicles"));
        assert!(!is_valid_vehicle_id("7?vehicle_type=car"));
        assert!(!is_valid_vehicle_id("7#x"));
    }

    #[tokio::test]
    async fn detail_rejects_path_traversal_without_calling_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .expect(0)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let err = fetch_vehicle_detail(&client, &settings, "../search/vehicles")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidId(_)));
    }

    #[test]
    fn records_with_numeric_text_fields_are_kept() {
        let records = vehicle_records(json!([
            { "id": 1, "brand": "BMW", "model": 3 },
            { "id": 2, "distance": "1 km", "distance_label": "1 km away" }
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model, Some(json!(3)));
    }

    #[tokio::test]
    async fn missing_search_endpoint_is_an_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/vehicles/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let client = build_client(&settings).unwrap();
        let err = fetch_vehicles(&client, &settings, VehicleCategory::Car, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 404, .. }));
    }
}
