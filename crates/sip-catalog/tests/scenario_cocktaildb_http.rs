//! CocktailDbSource against a local mock HTTP server.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sip_catalog::{CatalogSource, CocktailDbSource, SourceUnavailable};
use sip_schemas::{GlassType, Provenance};

fn source_for(server: &MockServer, timeout_ms: u64) -> CocktailDbSource {
    CocktailDbSource::new_with_base_url(
        "test-key".to_string(),
        server.url("/api/json/v1"),
        Duration::from_millis(timeout_ms),
    )
    .unwrap()
}

#[tokio::test]
async fn search_hits_keyed_endpoint_and_maps_drinks() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/json/v1/test-key/search.php")
                .query_param("s", "tomata");
            then.status(200).json_body(json!({
                "drinks": [{
                    "idDrink": "17200",
                    "strDrink": "Tomata Margarita",
                    "strCategory": "Ordinary Drink",
                    "strAlcoholic": "Alcoholic",
                    "strGlass": "Margarita/Coupette glass",
                    "strInstructions": "Rub the rim with salt.",
                    "strIngredient1": "Tequila",
                    "strMeasure1": "1 1/2 oz ",
                    "strIngredient2": "Tomato juice",
                    "strMeasure2": "3 oz "
                }]
            }));
        })
        .await;

    let out = source_for(&server, 2_000).search_by_name("tomata").await.unwrap();
    m.assert_async().await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "Tomata Margarita");
    assert_eq!(out[0].glass, Some(GlassType::Margarita));
    assert_eq!(out[0].provenance, Provenance::ExternalCatalog);
    let links: Vec<(&str, &str)> = out[0]
        .ingredients
        .iter()
        .map(|l| (l.ingredient.name.as_str(), l.measurement.as_str()))
        .collect();
    assert_eq!(links, vec![("Tequila", "1 1/2 oz"), ("Tomato juice", "3 oz")]);
}

#[tokio::test]
async fn no_match_is_empty_list() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/json/v1/test-key/search.php");
            then.status(200).json_body(json!({ "drinks": null }));
        })
        .await;

    let out = source_for(&server, 2_000).search_by_name("zzz").await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn server_error_is_status_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/json/v1/test-key/search.php");
            then.status(503);
        })
        .await;

    let err = source_for(&server, 2_000).search_by_name("mojito").await.unwrap_err();
    assert_eq!(err, SourceUnavailable::Status { code: 503 });
}

#[tokio::test]
async fn garbage_body_is_decode_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/json/v1/test-key/search.php");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let err = source_for(&server, 2_000).search_by_name("mojito").await.unwrap_err();
    assert!(matches!(err, SourceUnavailable::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_server_is_timeout_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/json/v1/test-key/search.php");
            then.status(200)
                .delay(Duration::from_millis(1_500))
                .json_body(json!({ "drinks": null }));
        })
        .await;

    let err = source_for(&server, 100).search_by_name("mojito").await.unwrap_err();
    assert_eq!(err, SourceUnavailable::Timeout { after_ms: 100 });
}
