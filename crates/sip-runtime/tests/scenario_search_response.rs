//! Wire shape of a merged search answer.

use sip_catalog::SourceUnavailable;
use sip_runtime::{SearchOutcome, SearchResponse};
use sip_schemas::{Beverage, GlassType, Provenance};

fn local(name: &str) -> Beverage {
    Beverage {
        id: None,
        external_id: None,
        name: name.to_string(),
        tag: None,
        alcohol: true,
        glass: Some(GlassType::Highball),
        instruction: None,
        image: None,
        video: None,
        image_attribution: None,
        creative_commons_confirmed: false,
        provenance: Provenance::Local,
        version: 0,
        ingredients: Vec::new(),
    }
}

#[test]
fn healthy_outcome_omits_the_reason() {
    let resp = SearchResponse::from(SearchOutcome {
        results: vec![local("Mojito")],
        degraded: None,
    });
    assert!(!resp.degraded);

    let v = serde_json::to_value(&resp).unwrap();
    assert_eq!(v["degraded"], false);
    assert!(v.get("degraded_reason").is_none());
    assert_eq!(v["results"][0]["name"], "Mojito");
}

#[test]
fn degraded_outcome_carries_the_reason_text() {
    let resp = SearchResponse::from(SearchOutcome {
        results: vec![local("Mojito")],
        degraded: Some(SourceUnavailable::Status { code: 503 }),
    });
    assert!(resp.degraded);
    assert_eq!(
        resp.degraded_reason.as_deref(),
        Some("external catalog returned status 503")
    );

    let text = serde_json::to_string(&resp).unwrap();
    let back: SearchResponse = serde_json::from_str(&text).unwrap();
    assert_eq!(back, resp);
}
