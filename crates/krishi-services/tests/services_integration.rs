//! Price and user-location services against mock HTTP servers.

use krishi_core::config::RetrySettings;
use krishi_core::{NetworkError, PricesConfig, RetryConfig, WeatherConfig};
use krishi_services::{
    CropPriceClient, LocationError, PriceError, PriceQuery, UserLocationStore,
};
use krishi_weather::{Geocoder, WeatherError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn price_client(server: &MockServer) -> CropPriceClient {
    let config = PricesConfig {
        api_url: format!("{}/resource/prices", server.uri()),
        api_key: Some("test-key".to_string()),
        default_limit: 10,
        timeout_secs: 5,
    };
    CropPriceClient::new(&config)
        .unwrap()
        .with_retry(RetryConfig::new(2, 1, 5))
}

fn geocoder(server: &MockServer) -> Geocoder {
    Geocoder::new(&WeatherConfig {
        geocode_url: format!("{}/search", server.uri()),
        reverse_geocode_url: format!("{}/reverse", server.uri()),
        timeout_secs: 5,
        retry: RetrySettings::default(),
        ..WeatherConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_price_lookup_by_state_only() {
    let server = MockServer::start().await;
    let body = r#"{"records":[{"state":"Punjab","commodity":"Wheat","modal_price":"2275"}]}"#;
    Mock::given(method("GET"))
        .and(path("/resource/prices"))
        .and(query_param("api-key", "test-key"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "10"))
        .and(query_param("filters[state.keyword]", "Punjab"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let text = price_client(&server)
        .fetch(&PriceQuery::for_state("Punjab"))
        .await
        .unwrap();

    assert_eq!(text, body);
}

#[tokio::test]
async fn test_price_lookup_with_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/prices"))
        .and(query_param("filters[state.keyword]", "Madhya Pradesh"))
        .and(query_param("filters[commodity]", "Soyabean"))
        .and(query_param("filters[district]", "Indore"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&server)
        .await;

    let query = PriceQuery {
        commodity: Some("Soyabean".to_string()),
        district: Some("Indore".to_string()),
        limit: Some(3),
        ..PriceQuery::for_state("Madhya Pradesh")
    };
    let text = price_client(&server).fetch(&query).await.unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["records"], json!([]));
}

#[tokio::test]
async fn test_price_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/prices"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Key not authorised"))
        .expect(1)
        .mount(&server)
        .await;

    match price_client(&server)
        .fetch(&PriceQuery::for_state("Punjab"))
        .await
    {
        Err(PriceError::Upstream(NetworkError::ServerError { status, message })) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Key not authorised");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_price_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/prices"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resource/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let text = price_client(&server)
        .fetch(&PriceQuery::for_state("Punjab"))
        .await
        .unwrap();
    assert_eq!(text, "{}");
}

#[tokio::test]
async fn test_initialize_user_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "display_name": "Nashik, Maharashtra, India",
            "address": {
                "town": "Nashik",
                "county": "Nashik",
                "state": "Maharashtra",
                "country": "India"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let info_path = dir.path().join("user").join("user_info.json");

    let store = UserLocationStore::new(&info_path, geocoder(&server));
    let user = store.initialize(19.99, 73.79).await.unwrap();

    assert_eq!(user.location.city.as_deref(), Some("Nashik"));
    assert_eq!(user.location.district.as_deref(), Some("Nashik"));

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&info_path).unwrap()).unwrap();
    assert_eq!(on_disk["coords"], json!({"lat": 19.99, "lon": 73.79}));
    assert_eq!(on_disk["location"]["state"], "Maharashtra");
    assert_eq!(on_disk["location"]["country"], "India");

    assert_eq!(store.load().unwrap(), Some(user));
}

#[tokio::test]
async fn test_initialize_reports_geocoder_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let info_path = dir.path().join("user_info.json");

    let store = UserLocationStore::new(&info_path, geocoder(&server));
    let err = store.initialize(28.6, 77.2).await.unwrap_err();

    assert!(matches!(
        err,
        LocationError::Geocode(WeatherError::Upstream(NetworkError::ServerError {
            status: 500,
            ..
        }))
    ));
    assert!(!info_path.exists());
}
