//! End-to-end catalog properties over the in-memory store, the scripted
//! catalog and the fault-injecting store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sip_catalog::SourceUnavailable;
use sip_db::{EntityStore, MemStore};
use sip_runtime::{CatalogError, CatalogService};
use sip_schemas::{BeverageId, BeveragePayload, IngredientId, Provenance};
use sip_testkit::fixtures::{self, existing_ref, fields, inline_ref};
use sip_testkit::{local_store, FakeCatalog, FaultyStore};

const TIMEOUT: Duration = Duration::from_millis(200);

fn service(store: Arc<dyn EntityStore>, catalog: FakeCatalog) -> CatalogService {
    CatalogService::new(store, Arc::new(catalog), TIMEOUT)
}

fn names(list: &[sip_schemas::Beverage]) -> Vec<&str> {
    list.iter().map(|b| b.name.as_str()).collect()
}

#[tokio::test]
async fn create_twice_yields_one_beverage_and_duplicate_name() {
    let store = Arc::new(MemStore::new());
    let svc = service(store.clone(), FakeCatalog::empty());

    svc.create(&fixtures::mojito_payload()).await.unwrap();
    let err = svc.create(&fixtures::mojito_payload()).await.unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName { ref name } if name == "Mojito"));

    let c = store.counts().await;
    assert_eq!(c.beverages, 1);
    // The rejected second call never staged another "Mint".
    assert_eq!(c.ingredients, 1);
}

#[tokio::test]
async fn create_then_get_round_trips_fields_and_links() {
    let store = Arc::new(local_store().await);
    let svc = service(store, FakeCatalog::empty());

    let mut payload = BeveragePayload {
        fields: fields("Arnold Palmer"),
        ingredients: vec![existing_ref(1, "4 oz"), existing_ref(2, "4 oz"), inline_ref("Ice", "1 cup")],
    };
    payload.fields.instruction = Some("Half lemonade, half tea".to_string());

    let created = svc.create(&payload).await.unwrap();
    let id = created.id.expect("local key assigned");
    let read = svc.get(id).await.unwrap();

    assert_eq!(read.name, payload.fields.name);
    assert_eq!(read.tag, payload.fields.tag);
    assert_eq!(read.alcohol, payload.fields.alcohol);
    assert_eq!(read.glass, Some(payload.fields.glass));
    assert_eq!(read.instruction, payload.fields.instruction);
    assert_eq!(read.provenance, Provenance::Local);

    let mut links: Vec<(i64, String)> = read
        .ingredients
        .iter()
        .map(|l| (l.ingredient_id().map_or(0, |i| i.0), l.measurement.clone()))
        .collect();
    links.sort();
    assert_eq!(
        links,
        vec![
            (1, "4 oz".to_string()),
            (2, "4 oz".to_string()),
            (4, "1 cup".to_string()),
        ]
    );
    assert_eq!(read, created);
}

#[tokio::test]
async fn two_beverages_share_one_existing_ingredient() {
    let store = Arc::new(local_store().await);
    let svc = service(store.clone(), FakeCatalog::empty());
    let before = store.counts().await;

    for name in ["Tequila Sunrise", "Paloma"] {
        svc.create(&BeveragePayload {
            fields: fields(name),
            ingredients: vec![existing_ref(3, "2 oz")],
        })
        .await
        .unwrap();
    }

    let after = store.counts().await;
    assert_eq!(after.ingredients, before.ingredients);
    assert_eq!(after.links, before.links + 2);
    let tequila_links = [BeverageId(4), BeverageId(5)];
    for id in tequila_links {
        let b = svc.get(id).await.unwrap();
        assert_eq!(b.ingredients[0].ingredient_id(), Some(IngredientId(3)));
    }
}

#[tokio::test]
async fn search_lists_local_then_external() {
    let store = Arc::new(local_store().await);
    let catalog = FakeCatalog::returning(fixtures::external_catalog());
    let svc = service(store, catalog);

    let out = svc.search("e").await.unwrap();
    assert!(!out.is_degraded());
    assert_eq!(
        names(&out.results),
        vec!["Strawberry Lemonade", "Iced Tea", "Mojito", "Tomata Margarita"]
    );
}

#[tokio::test]
async fn search_with_no_local_hits_returns_external_only() {
    let store = Arc::new(local_store().await);
    let svc = service(store, FakeCatalog::returning(fixtures::external_catalog()));
    let out = svc.search("mojito").await.unwrap();
    assert_eq!(names(&out.results), vec!["Mojito", "Tomata Margarita"]);
}

#[tokio::test]
async fn external_failure_degrades_to_local_results() {
    let store = Arc::new(local_store().await);
    let svc = service(store, FakeCatalog::failing(SourceUnavailable::Status { code: 503 }));

    let out = svc.search("e").await.unwrap();
    assert_eq!(names(&out.results), vec!["Strawberry Lemonade", "Iced Tea"]);
    assert_eq!(out.degraded, Some(SourceUnavailable::Status { code: 503 }));
    assert!(out.degraded_reason().unwrap().contains("503"));
}

#[tokio::test]
async fn external_timeout_degrades_with_timeout_reason() {
    let store = Arc::new(local_store().await);
    let catalog = FakeCatalog::stalled(Duration::from_secs(5), fixtures::external_catalog());
    let svc = service(store, catalog);

    let out = svc.search("tea").await.unwrap();
    assert_eq!(names(&out.results), vec!["Iced Tea"]);
    assert_eq!(out.degraded, Some(SourceUnavailable::Timeout { after_ms: 200 }));
}

#[tokio::test]
async fn local_and_external_lookups_overlap() {
    const STALL: Duration = Duration::from_millis(300);

    let store = FaultyStore::new(local_store().await);
    store.stall_searches(STALL);
    let catalog = Arc::new(FakeCatalog::stalled(STALL, fixtures::external_catalog()));
    let svc = CatalogService::new(Arc::new(store), catalog, Duration::from_secs(2));

    let started = Instant::now();
    let out = svc.search("tea").await.unwrap();
    let elapsed = started.elapsed();

    assert!(!out.is_degraded());
    assert_eq!(names(&out.results)[0], "Iced Tea");
    assert!(elapsed >= STALL, "finished before either lookup: {elapsed:?}");
    // Run one after the other the two stalls would need 600ms.
    assert!(elapsed < STALL * 2 - Duration::from_millis(50), "lookups ran serially: {elapsed:?}");
}

#[tokio::test]
async fn empty_local_and_failed_external_is_empty_degraded_list() {
    let store = Arc::new(local_store().await);
    let svc = service(store, FakeCatalog::failing(SourceUnavailable::Transport("refused".into())));
    let out = svc.search("zzz").await.unwrap();
    assert!(out.results.is_empty());
    assert!(out.is_degraded());
}

#[tokio::test]
async fn local_store_failure_fails_the_search() {
    let store = FaultyStore::new(local_store().await);
    store.fail_searches(true);
    let catalog = Arc::new(FakeCatalog::returning(fixtures::external_catalog()));
    let svc = CatalogService::new(Arc::new(store), catalog, TIMEOUT);
    let err = svc.search("e").await.unwrap_err();
    assert!(matches!(err, CatalogError::PersistenceFailure(_)));
}

#[tokio::test]
async fn rejected_save_leaves_no_staged_ingredient_or_beverage() {
    let faulty = Arc::new(FaultyStore::new(local_store().await));
    faulty.fail_saves(true);
    let before = faulty.inner().counts().await;
    let svc = CatalogService::new(faulty.clone(), Arc::new(FakeCatalog::empty()), TIMEOUT);

    let payload = BeveragePayload {
        fields: fields("Half Built"),
        ingredients: vec![inline_ref("Yuzu", "1 oz"), inline_ref("Shiso", "2 leaves")],
    };
    let err = svc.create(&payload).await.unwrap_err();
    assert!(matches!(err, CatalogError::PersistenceFailure(_)), "got {err:?}");

    let rejected = faulty.rejected_saves();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].new_ingredients.len(), 2);

    assert_eq!(faulty.inner().counts().await, before);
    assert!(faulty
        .inner()
        .find_beverage_id_by_name("Half Built")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn mojito_with_inline_mint_gets_one_fresh_ingredient() {
    let store = Arc::new(local_store().await);
    let svc = service(store.clone(), FakeCatalog::empty());

    let b = svc.create(&fixtures::mojito_payload()).await.unwrap();
    assert_eq!(b.ingredients.len(), 1);
    let link = &b.ingredients[0];
    assert_eq!(link.ingredient.name, "Mint");
    assert_eq!(link.measurement, "10 leaves");
    assert_eq!(link.ingredient_id(), Some(IngredientId(4)));
}

#[tokio::test]
async fn update_of_missing_beverage_is_not_found() {
    let store = Arc::new(MemStore::new());
    let svc = service(store, FakeCatalog::empty());
    let err = svc
        .update(BeverageId(1), &fixtures::mojito_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { what: "beverage", id: 1 }));
}

#[tokio::test]
async fn external_results_are_never_persisted() {
    let store = Arc::new(local_store().await);
    let before = store.counts().await;
    let catalog = FakeCatalog::returning(fixtures::external_catalog());
    let svc = service(store.clone(), catalog);

    svc.search("margarita").await.unwrap();
    assert_eq!(store.counts().await, before);
}
