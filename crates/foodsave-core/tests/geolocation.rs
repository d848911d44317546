//! Integration tests for IP geolocation and the location pipeline on top of it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use foodsave_core::location::{
    now_millis, GeolocationError, GeolocationProvider, IpApiProvider, LocationCache,
    LocationOutcome, LocationService, LocationStep, PositionOptions,
};
use foodsave_core::{Coordinate, MemoryStorage, NotificationCenter};

fn lookup_url(server: &MockServer) -> String {
    format!("{}/json/", server.uri())
}

#[tokio::test]
async fn ip_lookup_resolves_and_reuses_recent_fix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "lat": 55.75, "lon": 37.61})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = IpApiProvider::new(lookup_url(&server));
    let options = PositionOptions::default();

    let first = provider.current_position(&options).await;
    assert_eq!(first, Ok(Coordinate::new(55.75, 37.61)));

    // Within maximum_age: answered without a second request
    let second = provider.current_position(&options).await;
    assert_eq!(second, first);
}

#[tokio::test]
async fn ip_lookup_failure_status_is_position_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "fail", "message": "private range"})),
        )
        .mount(&server)
        .await;

    let provider = IpApiProvider::new(lookup_url(&server));
    let result = provider.current_position(&PositionOptions::default()).await;
    assert_eq!(
        result,
        Err(GeolocationError::PositionUnavailable("private range".to_string()))
    );
}

#[tokio::test]
async fn slow_lookup_times_out_through_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "lat": 1.0, "lon": 1.0}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let storage = MemoryStorage::shared();
    let notifications = NotificationCenter::new();
    let service = LocationService::new(
        LocationCache::new(storage),
        Some(Arc::new(IpApiProvider::new(lookup_url(&server)))),
        notifications.clone(),
    )
    .with_options(PositionOptions {
        timeout: Duration::from_millis(200),
        ..PositionOptions::default()
    });

    assert_eq!(service.begin(now_millis()), LocationStep::Detect);
    let outcome = service.resolve().await;
    assert_eq!(outcome, LocationOutcome::Failed(GeolocationError::Timeout));
    assert_eq!(notifications.drain()[0].message, "Location request timed out");
}
