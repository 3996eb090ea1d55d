use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sip_db::{EntityStore, FavoriteOutcome, SeedData, StoreError};
use sip_schemas::{Beverage, BeverageId, ChangeSet, Ingredient, IngredientId, UserId};

/// Fault-injecting wrapper around any [`EntityStore`].
///
/// With a fault armed, the matching call returns `StoreError::Backend`
/// without touching the inner store. Rejected change sets are kept for
/// inspection. A search stall delays `search_beverages` before it reaches
/// the inner store.
pub struct FaultyStore<S> {
    inner: S,
    fail_saves: AtomicBool,
    fail_searches: AtomicBool,
    search_stall_ms: AtomicU64,
    rejected: Mutex<Vec<ChangeSet>>,
}

impl<S: EntityStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
            fail_searches: AtomicBool::new(false),
            search_stall_ms: AtomicU64::new(0),
            rejected: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_saves(&self, on: bool) {
        self.fail_saves.store(on, Ordering::SeqCst);
    }

    pub fn fail_searches(&self, on: bool) {
        self.fail_searches.store(on, Ordering::SeqCst);
    }

    pub fn stall_searches(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.search_stall_ms.store(ms, Ordering::SeqCst);
    }

    /// Change sets refused while `fail_saves` was armed, oldest first.
    pub fn rejected_saves(&self) -> Vec<ChangeSet> {
        self.rejected.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("injected fault: {what}"))
}

#[async_trait]
impl<S: EntityStore> EntityStore for FaultyStore<S> {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn find_beverage(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError> {
        self.inner.find_beverage(id).await
    }

    async fn find_beverage_id_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BeverageId>, StoreError> {
        self.inner.find_beverage_id_by_name(name).await
    }

    async fn search_beverages(&self, term: &str) -> Result<Vec<Beverage>, StoreError> {
        let stall = self.search_stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(injected("search_beverages"));
        }
        self.inner.search_beverages(term).await
    }

    async fn find_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError> {
        self.inner.find_ingredients(ids).await
    }

    async fn save_atomic(&self, changes: &ChangeSet) -> Result<BeverageId, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            if let Ok(mut r) = self.rejected.lock() {
                r.push(changes.clone());
            }
            return Err(injected("save_atomic"));
        }
        self.inner.save_atomic(changes).await
    }

    async fn delete_beverage(&self, id: BeverageId) -> Result<bool, StoreError> {
        self.inner.delete_beverage(id).await
    }

    async fn favorites_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<Vec<Beverage>>, StoreError> {
        self.inner.favorites_for_user(user).await
    }

    async fn add_favorite(
        &self,
        user: UserId,
        beverage: BeverageId,
    ) -> Result<FavoriteOutcome, StoreError> {
        self.inner.add_favorite(user, beverage).await
    }

    async fn bootstrap(&self, seed: &SeedData) -> Result<bool, StoreError> {
        self.inner.bootstrap(seed).await
    }
}
