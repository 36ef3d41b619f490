//! Integration tests for weathersvc
//!
//! A worker cycle runs against a mocked forecast API and a real SQLite file,
//! then the stored data is read back through the HTTP router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use weathersvc::api::{self, ErrorBody};
use weathersvc::{
    Location, LocationRegistry, OpenMeteoClient, PollingWorker, SqliteWeatherStore,
    WeatherReading, WeatherStore,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn almaty() -> Location {
    Location::new("Almaty", 43.2567, 76.9286)
}

fn moscow() -> Location {
    Location::new("Moscow", 55.7522, 37.6156)
}

fn forecast_body(latitude: f64, longitude: f64, time: &str, temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": latitude,
        "longitude": longitude,
        "generationtime_ms": 0.03,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "timezone_abbreviation": "GMT",
        "current": {
            "time": time,
            "interval": 900,
            "temperature_2m": temperature,
            "relativehumidity_2m": 55,
            "precipitation_probability": 0,
            "visibility": 24140.0,
            "windspeed_10m": 4.3
        }
    })
}

/// Almaty answers, Moscow's upstream is broken
async fn mock_forecast_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "43.26"))
        .and(query_param("longitude", "76.93"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(43.25, 76.9375, "2024-02-10T14:15", -1.8)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "55.75"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
        .mount(&server)
        .await;

    server
}

struct Harness {
    _server: MockServer,
    _dir: tempfile::TempDir,
    store: Arc<SqliteWeatherStore>,
    worker: PollingWorker,
}

async fn harness() -> Harness {
    let server = mock_forecast_api().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteWeatherStore::open(dir.path().join("weathersvc.db"))
            .await
            .unwrap(),
    );

    let registry = Arc::new(LocationRegistry::new(vec![almaty(), moscow()]).unwrap());
    let fetcher = Arc::new(
        OpenMeteoClient::new(
            &format!("{}/v1/forecast", server.uri()),
            Duration::from_secs(5),
            registry.clone(),
        )
        .unwrap(),
    );
    let worker =
        PollingWorker::new(registry, fetcher, store.clone(), Duration::from_secs(900)).unwrap();

    Harness {
        _server: server,
        _dir: dir,
        store,
        worker,
    }
}

async fn get(store: Arc<SqliteWeatherStore>, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = api::router(store)
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

/// One location fails, the other is stored, and the summary says so
#[tokio::test]
async fn test_cycle_with_partial_failure() {
    let h = harness().await;

    let summary = h.worker.run_cycle(&CancellationToken::new()).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.to_string(), "Successful: 1 of 2");
    assert_eq!(summary.failures[0].location, "Moscow");
    assert!(summary.failures[0].error.contains("500"));

    assert_eq!(h.store.count_readings("Almaty").await.unwrap(), 1);
    assert_eq!(h.store.count_readings("Moscow").await.unwrap(), 0);
}

/// Polling the same upstream timestamp twice keeps a single row
#[tokio::test]
async fn test_repeated_cycles_do_not_duplicate_rows() {
    let h = harness().await;
    let cancel = CancellationToken::new();

    h.worker.run_cycle(&cancel).await;
    h.worker.run_cycle(&cancel).await;

    assert_eq!(h.store.count_readings("Almaty").await.unwrap(), 1);
}

/// Stored reading is served back field for field
#[tokio::test]
async fn test_latest_endpoint_serves_polled_reading() {
    let h = harness().await;
    h.worker.run_cycle(&CancellationToken::new()).await;

    let (status, body) = get(h.store.clone(), "/weather/latest?location=Almaty").await;
    assert_eq!(status, StatusCode::OK);

    let reading: WeatherReading = serde_json::from_slice(&body).unwrap();
    assert_eq!(reading, h.store.get_latest("Almaty").await.unwrap());
    assert_eq!(reading.location, almaty());
    assert_eq!(reading.temperature, -1.8);
    assert_eq!(reading.relative_humidity, 55);
    assert_eq!(reading.visibility, 24140.0);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["timestamp"], "2024-02-10T14:15:00Z");
    assert_eq!(json["windspeed_10m"], 4.3);
}

/// Missing parameter is a client error with a JSON envelope
#[tokio::test]
async fn test_latest_endpoint_without_location() {
    let h = harness().await;

    let (status, body) = get(h.store.clone(), "/weather/latest").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(!err.error.is_empty());
}

/// A location with no stored data is a server error, never an empty reading
#[tokio::test]
async fn test_latest_endpoint_for_location_without_data() {
    let h = harness().await;
    h.worker.run_cycle(&CancellationToken::new()).await;

    let (status, body) = get(h.store.clone(), "/weather/latest?location=Moscow").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let err: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(!err.error.is_empty());
}

/// The worker keeps running after failures and stops on cancellation
#[tokio::test]
async fn test_worker_run_until_cancelled() {
    let h = harness().await;
    let worker = Arc::new(h.worker);
    let cancel = CancellationToken::new();
    let mut states = worker.subscribe();

    let handle = tokio::spawn({
        let worker = worker.clone();
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    states
        .wait_for(|s| *s == weathersvc::WorkerState::Waiting)
        .await
        .unwrap();
    assert_eq!(h.store.count_readings("Almaty").await.unwrap(), 1);

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(worker.state(), weathersvc::WorkerState::Stopped);
}
