//! sip-testkit
//!
//! Shared test support: recipe fixtures, a scripted external catalog and a
//! fault-injecting store wrapper. Never linked into production binaries.

mod fake_catalog;
pub mod fixtures;
mod faulty_store;

pub use fake_catalog::FakeCatalog;
pub use faulty_store::FaultyStore;

use sip_db::MemStore;

/// In-memory store pre-loaded with [`fixtures::local_catalog`].
pub async fn local_store() -> MemStore {
    let store = MemStore::new();
    let applied = sip_db::EntityStore::bootstrap(&store, &fixtures::local_catalog())
        .await
        .expect("fixture seed is valid");
    assert!(applied, "fixture seed applies to an empty store");
    store
}
