//! Tests for the card database client

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{ApiCard, CardApi};
use crate::error::PriceCheckError;

fn api_with_mock(uri: &str) -> CardApi {
    CardApi::new(
        reqwest::Client::new(),
        Some("test_token".to_string()),
        uri,
    )
}

fn charizard_record() -> serde_json::Value {
    serde_json::json!({
        "id": "base1-4",
        "name": "Charizard",
        "number": "4",
        "rarity": "Rare Holo",
        "set": {"id": "base1", "name": "Base", "series": "Base"},
        "images": {
            "small": "https://images.example.com/base1/4.png",
            "large": "https://images.example.com/base1/4_hires.png"
        },
        "tcgplayer": {
            "url": "https://prices.example.com/base1-4",
            "prices": {"holofoil": {"market": 420.5, "low": 300.0}}
        }
    })
}

// ── record mapping ──────────────────────────────────────────────────────────

#[test]
fn test_into_canonical_prefers_large_artwork() {
    let card: ApiCard = serde_json::from_value(charizard_record()).unwrap();
    let canonical = card.into_canonical();

    assert_eq!(canonical.card_id, "base1-4");
    assert_eq!(canonical.card_name, "Charizard");
    assert_eq!(canonical.set_name.as_deref(), Some("Base"));
    assert_eq!(canonical.card_number.as_deref(), Some("4"));
    assert_eq!(
        canonical.image_url.as_deref(),
        Some("https://images.example.com/base1/4_hires.png")
    );

    let tcgplayer = canonical.tcgplayer.expect("marketplace payload carried");
    assert_eq!(
        tcgplayer.prices.holofoil.unwrap().market,
        Some(420.5)
    );
}

#[test]
fn test_into_summary_uses_small_artwork() {
    let card: ApiCard = serde_json::from_value(charizard_record()).unwrap();
    let summary = card.into_summary();

    assert_eq!(summary.card_id, "base1-4");
    assert_eq!(
        summary.image_url.as_deref(),
        Some("https://images.example.com/base1/4.png")
    );
}

#[test]
fn test_api_card_deserialize_minimal() {
    let card: ApiCard =
        serde_json::from_str(r#"{"id": "xy1-1", "name": "Venusaur-EX"}"#).unwrap();

    assert_eq!(card.id, "xy1-1");
    assert!(card.set.is_none());
    assert!(card.images.is_none());
    assert!(card.tcgplayer.is_none());
}

// ── lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_cards_builds_filtered_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param(
            "q",
            "name:\"Charizard\" set.name:\"Base\" number:4",
        ))
        .and(header("X-Api-Key", "test_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [charizard_record()]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let cards = api
        .find_cards("Charizard", Some("Base"), Some("4/102"))
        .await
        .unwrap();

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].name, "Charizard");
}

#[tokio::test]
async fn find_cards_retries_with_name_only() {
    let mock_server = MockServer::start().await;

    // Filtered query finds nothing (the set was misread off the photo).
    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param(
            "q",
            "name:\"Charizard\" set.name:\"Base St\"",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param("q", "name:\"Charizard\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [charizard_record()]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let cards = api
        .find_cards("Charizard", Some("Base St"), None)
        .await
        .unwrap();

    assert_eq!(cards.len(), 1);
}

#[tokio::test]
async fn find_cards_name_only_query_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param("q", "name:\"Missingno\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let cards = api.find_cards("Missingno", None, None).await.unwrap();

    assert!(cards.is_empty());
}

#[tokio::test]
async fn find_cards_propagates_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let result = api.find_cards("Charizard", None, None).await;

    match result {
        Err(PriceCheckError::HttpStatus(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn find_cards_rejects_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let result = api.find_cards("Charizard", None, None).await;

    match result {
        Err(PriceCheckError::Parse(_)) => {}
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[tokio::test]
async fn card_by_id_maps_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/base1-4"))
        .and(header("X-Api-Key", "test_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": charizard_record()})),
        )
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let card = api.card_by_id("base1-4").await.unwrap();

    assert_eq!(card.id, "base1-4");
    assert_eq!(card.name, "Charizard");
}

#[tokio::test]
async fn card_by_id_unknown_id_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/nope-0"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let result = api.card_by_id("nope-0").await;

    match result {
        Err(PriceCheckError::CardNotFound(id)) => assert_eq!(id, "nope-0"),
        other => panic!("expected CardNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn card_by_id_rejects_malformed_body() {
    let mock_server = MockServer::start().await;

    // A misbehaving proxy answering 200 with an HTML error page
    Mock::given(method("GET"))
        .and(path("/cards/base1-4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Bad Gateway</html>"))
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let result = api.card_by_id("base1-4").await;

    match result {
        Err(PriceCheckError::Parse(_)) => {}
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[tokio::test]
async fn search_cards_caps_page_size() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param("q", "name:char*"))
        .and(query_param("pageSize", "5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [charizard_record()]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let results = api.search_cards("name:char*", 5).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].card_name, "Charizard");
}

#[tokio::test]
async fn search_cards_degrades_to_empty_on_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let api = api_with_mock(&mock_server.uri());
    let results = api.search_cards("name:char*", 10).await;

    assert!(results.is_empty());
}
