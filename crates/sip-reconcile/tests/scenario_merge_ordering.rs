use sip_reconcile::merge_results;
use sip_schemas::{Beverage, BeverageId, GlassType, Provenance};

fn bev(name: &str, provenance: Provenance) -> Beverage {
    Beverage {
        id: (provenance == Provenance::Local).then_some(BeverageId(name.len() as i64)),
        external_id: None,
        name: name.to_string(),
        tag: None,
        alcohol: false,
        glass: Some(GlassType::Tumbler),
        instruction: None,
        image: None,
        video: None,
        image_attribution: None,
        creative_commons_confirmed: false,
        provenance,
        version: 1,
        ingredients: vec![],
    }
}

fn names(list: &[Beverage]) -> Vec<&str> {
    list.iter().map(|b| b.name.as_str()).collect()
}

#[test]
fn local_first_then_external_in_source_order() {
    let local = vec![bev("A", Provenance::Local), bev("B", Provenance::Local)];
    let external = vec![
        bev("C", Provenance::ExternalCatalog),
        bev("D", Provenance::ExternalCatalog),
    ];
    assert_eq!(names(&merge_results(local, external)), vec!["A", "B", "C", "D"]);
}

#[test]
fn empty_local_returns_external_unchanged() {
    let external = vec![
        bev("Mojito", Provenance::ExternalCatalog),
        bev("Tomata Margarita", Provenance::ExternalCatalog),
    ];
    let out = merge_results(vec![], external.clone());
    assert_eq!(out, external);
}

#[test]
fn same_name_in_both_sources_is_kept_twice() {
    let out = merge_results(
        vec![bev("Mojito", Provenance::Local)],
        vec![bev("Mojito", Provenance::ExternalCatalog)],
    );
    assert_eq!(out.len(), 2);
    assert!(out[0].is_local());
    assert!(!out[1].is_local());
}

#[test]
fn both_empty_is_empty_not_absent() {
    assert!(merge_results(vec![], vec![]).is_empty());
}
