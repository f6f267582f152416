//! Integration tests for OpenWeatherLookup using wiremock.

use weather_now_core::{
    GeoPosition, LookupFailure, OpenWeatherLookup, WeatherLookup, WeatherSnapshot,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn london_body() -> serde_json::Value {
    serde_json::json!({
        "name": "London",
        "main": {"temp": 15.2, "temp_min": 12, "temp_max": 18, "humidity": 70},
        "wind": {"speed": 3.1, "deg": 200},
        "weather": [{"icon": "04d", "description": "broken clouds"}]
    })
}

#[tokio::test]
async fn test_by_city_normalizes_name_and_maps_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "London"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lookup = OpenWeatherLookup::new("KEY".into(), &mock_server.uri()).unwrap();
    let snapshot = lookup.by_city("Londres").await.unwrap();

    assert_eq!(
        snapshot,
        WeatherSnapshot {
            city_name: "London".into(),
            current_temp: 15.2,
            min_temp: 12.0,
            max_temp: 18.0,
            wind_speed: 3.1,
            wind_direction: 200,
            humidity: 70,
            weather_icon: "04d".into(),
            weather_description: "broken clouds".into(),
        }
    );
}

#[tokio::test]
async fn test_by_city_passes_unknown_names_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Buenos Aires"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Buenos Aires",
            "main": {"temp": 22.0, "temp_min": 20.0, "temp_max": 25.0, "humidity": 55},
            "wind": {"speed": 5.0, "deg": 90},
            "weather": []
        })))
        .mount(&mock_server)
        .await;

    let lookup = OpenWeatherLookup::new("KEY".into(), &mock_server.uri()).unwrap();
    let snapshot = lookup.by_city("Buenos Aires").await.unwrap();

    assert_eq!(snapshot.city_name, "Buenos Aires");
    assert_eq!(snapshot.weather_icon, "");
    assert_eq!(snapshot.weather_description, "");
}

#[tokio::test]
async fn test_by_position_sends_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "-34.9"))
        .and(query_param("lon", "-56.2"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "",
            "main": {"temp": 18.0, "temp_min": 16.0, "temp_max": 21.0, "humidity": 80},
            "wind": {"speed": 6.2, "deg": 140},
            "weather": [{"icon": "10d", "description": "light rain"}]
        })))
        .mount(&mock_server)
        .await;

    let lookup = OpenWeatherLookup::new("KEY".into(), &mock_server.uri()).unwrap();
    let position = GeoPosition::new(-34.9, -56.2).unwrap();
    let snapshot = lookup.by_position(position).await.unwrap();

    // Unnamed places fall back to their coordinates.
    assert_eq!(snapshot.city_name, "-34.9000, -56.2000");
    assert_eq!(snapshot.weather_description, "light rain");
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(r#"{"cod":"404","message":"city not found"}"#),
        )
        .mount(&mock_server)
        .await;

    let lookup = OpenWeatherLookup::new("KEY".into(), &mock_server.uri()).unwrap();
    let err = lookup.by_city("Atlantis").await.unwrap_err();

    assert!(matches!(err, LookupFailure::Status { status, .. } if status.as_u16() == 404));
    assert!(err.message().contains("city not found"));
    assert!(!err.message().contains("KEY"));
}

#[tokio::test]
async fn test_malformed_body_is_decode_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let lookup = OpenWeatherLookup::new("KEY".into(), &mock_server.uri()).unwrap();
    let err = lookup.by_city("Munich").await.unwrap_err();

    assert!(matches!(err, LookupFailure::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_failure_without_key() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let lookup = OpenWeatherLookup::new("SECRET".into(), &uri).unwrap();
    let err = lookup.by_city("Munich").await.unwrap_err();

    assert!(matches!(err, LookupFailure::Transport(_)));
    assert!(!err.message().contains("SECRET"));
}
