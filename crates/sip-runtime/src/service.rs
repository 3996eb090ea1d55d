//! Catalog operations: the write path (duplicate check, ingredient lookup,
//! reconcile, atomic save) and the merged search with degradation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sip_catalog::{CatalogSource, SourceUnavailable};
use sip_db::{EntityStore, FavoriteOutcome, SeedData};
use sip_reconcile::{merge_results, reconcile, KnownIngredients};
use sip_schemas::{Beverage, BeverageId, BeveragePayload, UserId};
use tracing::{debug, info, warn};

use crate::CatalogError;

/// Merged search result. `degraded` is set when the external catalog could
/// not answer; `results` then holds local records only.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<Beverage>,
    pub degraded: Option<SourceUnavailable>,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn degraded_reason(&self) -> Option<String> {
        self.degraded.as_ref().map(ToString::to_string)
    }
}

/// Wire shape of a search answer, shared by the HTTP daemon and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Local matches first, then external catalog matches.
    pub results: Vec<Beverage>,
    /// True when the external catalog could not answer.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(out: SearchOutcome) -> Self {
        let degraded_reason = out.degraded_reason();
        Self {
            degraded: degraded_reason.is_some(),
            degraded_reason,
            results: out.results,
        }
    }
}

/// Shared, cheap-to-clone handle over the store and the external source.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn EntityStore>,
    source: Arc<dyn CatalogSource>,
    external_timeout: Duration,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        source: Arc<dyn CatalogSource>,
        external_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            external_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get(&self, id: BeverageId) -> Result<Beverage, CatalogError> {
        self.store
            .find_beverage(id)
            .await?
            .ok_or_else(|| CatalogError::beverage_not_found(id))
    }

    /// Local and external name search, run concurrently, local first.
    ///
    /// Only a local store failure fails the call; any external failure
    /// (including the timeout) degrades it.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(CatalogError::validation("term", "search term must not be empty"));
        }

        let local_fut = self.store.search_beverages(term);
        let external_fut = tokio::time::timeout(self.external_timeout, self.source.search_by_name(term));
        let (local, external) = tokio::join!(local_fut, external_fut);

        let local = local?;
        let (external, degraded) = match external {
            Ok(Ok(list)) => (list, None),
            Ok(Err(SourceUnavailable::Disabled)) => (Vec::new(), None),
            Ok(Err(e)) => (Vec::new(), Some(e)),
            Err(_elapsed) => (
                Vec::new(),
                Some(SourceUnavailable::Timeout {
                    after_ms: u64::try_from(self.external_timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            ),
        };

        if let Some(reason) = &degraded {
            warn!(
                term,
                source = self.source.source_name(),
                local = local.len(),
                %reason,
                "external catalog unavailable; serving local results only"
            );
        }
        debug!(term, local = local.len(), external = external.len(), "search merged");

        Ok(SearchOutcome {
            results: merge_results(local, external),
            degraded,
        })
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a beverage. A name already in use is rejected before any
    /// ingredient is looked up or staged.
    pub async fn create(&self, payload: &BeveragePayload) -> Result<Beverage, CatalogError> {
        let name = &payload.fields.name;
        if self.store.find_beverage_id_by_name(name).await?.is_some() {
            return Err(CatalogError::DuplicateName { name: name.clone() });
        }

        let known = self.known_ingredients(payload).await?;
        let plan = reconcile(None, payload, &known)?;
        let id = self
            .store
            .save_atomic(&plan.changes)
            .await
            .map_err(|e| CatalogError::from_save(e, name))?;

        info!(
            beverage_id = id.0,
            new_ingredients = plan.changes.new_ingredients.len(),
            links = plan.changes.new_links.len(),
            "beverage created"
        );
        self.read_back(id, plan.beverage).await
    }

    /// Full-payload update of an existing beverage. Links the payload does
    /// not mention are kept.
    pub async fn update(
        &self,
        id: BeverageId,
        payload: &BeveragePayload,
    ) -> Result<Beverage, CatalogError> {
        let existing = self.get(id).await?;

        let name = &payload.fields.name;
        if *name != existing.name {
            if let Some(holder) = self.store.find_beverage_id_by_name(name).await? {
                if holder != id {
                    return Err(CatalogError::DuplicateName { name: name.clone() });
                }
            }
        }

        let known = self.known_ingredients(payload).await?;
        let plan = reconcile(Some(&existing), payload, &known)?;
        self.store
            .save_atomic(&plan.changes)
            .await
            .map_err(|e| CatalogError::from_save(e, name))?;

        info!(
            beverage_id = id.0,
            link_updates = plan.changes.link_updates.len(),
            new_links = plan.changes.new_links.len(),
            "beverage updated"
        );
        self.read_back(id, plan.beverage).await
    }

    pub async fn delete(&self, id: BeverageId) -> Result<(), CatalogError> {
        if !self.store.delete_beverage(id).await? {
            return Err(CatalogError::beverage_not_found(id));
        }
        info!(beverage_id = id.0, "beverage deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Favorites
    // -----------------------------------------------------------------------

    pub async fn favorites(&self, user: UserId) -> Result<Vec<Beverage>, CatalogError> {
        self.store
            .favorites_for_user(user)
            .await?
            .ok_or(CatalogError::NotFound {
                what: "user",
                id: user.0,
            })
    }

    /// Idempotent: adding an existing favorite succeeds.
    pub async fn add_favorite(&self, user: UserId, beverage: BeverageId) -> Result<(), CatalogError> {
        match self.store.add_favorite(user, beverage).await? {
            FavoriteOutcome::Added | FavoriteOutcome::AlreadyPresent => Ok(()),
            FavoriteOutcome::UnknownUser => Err(CatalogError::NotFound {
                what: "user",
                id: user.0,
            }),
            FavoriteOutcome::UnknownBeverage => Err(CatalogError::beverage_not_found(beverage)),
        }
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    pub async fn bootstrap(&self, seed: &SeedData) -> Result<bool, CatalogError> {
        let applied = self.store.bootstrap(seed).await?;
        if applied {
            info!(
                backend = self.store.backend_name(),
                beverages = seed.beverages.len(),
                ingredients = seed.ingredients.len(),
                "seed applied to empty storage"
            );
        } else {
            debug!(backend = self.store.backend_name(), "storage not empty; seed skipped");
        }
        Ok(applied)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn known_ingredients(
        &self,
        payload: &BeveragePayload,
    ) -> Result<KnownIngredients, CatalogError> {
        let ids = payload.referenced_ingredient_ids();
        if ids.is_empty() {
            return Ok(KnownIngredients::empty());
        }
        let rows = self.store.find_ingredients(&ids).await?;
        Ok(KnownIngredients::from_rows(rows))
    }

    /// Committed state with store-assigned keys. Falls back to the projection
    /// if the row vanished right after commit.
    async fn read_back(&self, id: BeverageId, mut projected: Beverage) -> Result<Beverage, CatalogError> {
        match self.store.find_beverage(id).await? {
            Some(b) => Ok(b),
            None => {
                projected.id = Some(id);
                Ok(projected)
            }
        }
    }
}
