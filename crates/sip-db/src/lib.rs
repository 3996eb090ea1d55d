//! sip-db
//!
//! Entity Store: the repository boundary for beverages, ingredients, their
//! join links, users and favorites.
//!
//! Two backends implement [`EntityStore`]:
//! - [`PgStore`]: Postgres via sqlx, one transaction per `save_atomic`.
//! - [`MemStore`]: an in-process arena with the same constraints, used for
//!   development and tests.
//!
//! The store owns its own concurrency control. Callers get all-or-nothing
//! `save_atomic` and an optimistic version check on beverage updates.

mod mem;
mod pg;
pub mod seed;

pub use mem::{MemStore, StoreCounts};
pub use pg::PgStore;
pub use seed::{default_seed, SeedData};

use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sip_schemas::{Beverage, BeverageId, ChangeSet, Ingredient, IngredientId, UserId};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "SIP_DATABASE_URL";

/// Unique constraint on `beverages.name`.
pub const UQ_BEVERAGE_NAME: &str = "uq_beverages_name";
/// Unique constraint on `(beverage_id, ingredient_id)` links.
pub const UQ_BEVERAGE_INGREDIENT: &str = "uq_beverage_ingredient";
pub const FK_LINK_INGREDIENT: &str = "fk_link_ingredient";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by an [`EntityStore`]. A failed `save_atomic` has left
/// storage exactly as it was.
#[derive(Debug)]
pub enum StoreError {
    /// The beverage changed since it was read (optimistic concurrency).
    StaleVersion {
        beverage_id: BeverageId,
        expected: i64,
        found: i64,
    },
    /// A named unique constraint rejected the write.
    UniqueViolation { constraint: String },
    /// A named foreign key rejected the write.
    ForeignKeyViolation { constraint: String },
    /// A row the change set targets does not exist.
    MissingRow { what: &'static str, id: i64 },
    /// The change set or seed is internally inconsistent.
    Rejected(String),
    /// Connectivity, decoding or any other backend failure.
    Backend(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::StaleVersion {
                beverage_id,
                expected,
                found,
            } => write!(
                f,
                "stale version for beverage {beverage_id}: expected {expected}, found {found}"
            ),
            StoreError::UniqueViolation { constraint } => {
                write!(f, "unique constraint violated: {constraint}")
            }
            StoreError::ForeignKeyViolation { constraint } => {
                write!(f, "foreign key violated: {constraint}")
            }
            StoreError::MissingRow { what, id } => write!(f, "{what} {id} does not exist"),
            StoreError::Rejected(msg) => write!(f, "rejected: {msg}"),
            StoreError::Backend(e) => write!(f, "store backend error: {e:#}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// Result of [`EntityStore::add_favorite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    AlreadyPresent,
    UnknownUser,
    UnknownBeverage,
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Repository consumed by the catalog core.
///
/// Lookups on missing keys return `None` / `false`, never an error.
/// Name search is a case-insensitive substring match, ordered by beverage id.
#[async_trait]
pub trait EntityStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Beverage with its links and linked ingredients.
    async fn find_beverage(&self, id: BeverageId) -> Result<Option<Beverage>, StoreError>;

    /// Exact (case-sensitive) name lookup.
    async fn find_beverage_id_by_name(&self, name: &str)
        -> Result<Option<BeverageId>, StoreError>;

    async fn search_beverages(&self, term: &str) -> Result<Vec<Beverage>, StoreError>;

    /// Ingredients among `ids` that exist, ordered by id.
    async fn find_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError>;

    /// Apply every mutation in `changes` or none of them.
    async fn save_atomic(&self, changes: &ChangeSet) -> Result<BeverageId, StoreError>;

    /// Remove a beverage, its links and favorites. Ingredients are untouched.
    async fn delete_beverage(&self, id: BeverageId) -> Result<bool, StoreError>;

    /// `None` if the user does not exist.
    async fn favorites_for_user(&self, user: UserId) -> Result<Option<Vec<Beverage>>, StoreError>;

    async fn add_favorite(
        &self,
        user: UserId,
        beverage: BeverageId,
    ) -> Result<FavoriteOutcome, StoreError>;

    /// Load `seed` into empty storage. Returns false (and writes nothing) when
    /// any beverage, ingredient or user already exists.
    async fn bootstrap(&self, seed: &SeedData) -> Result<bool, StoreError>;
}

/// Case-insensitive substring predicate shared by the in-memory backend and tests.
pub fn name_matches(name: &str, term: &str) -> bool {
    name.to_lowercase().contains(&term.to_lowercase())
}

// ---------------------------------------------------------------------------
// Postgres plumbing
// ---------------------------------------------------------------------------

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect to Postgres using SIP_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_beverages_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='beverages'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_beverages_table: exists,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_match_is_case_insensitive_substring() {
        assert!(name_matches("Potato Margarita", "marg"));
        assert!(name_matches("Potato Margarita", "POTATO"));
        assert!(name_matches("Potato Margarita", ""));
        assert!(!name_matches("Potato Margarita", "martini"));
    }

    #[test]
    fn store_error_display_names_constraint() {
        let e = StoreError::UniqueViolation {
            constraint: UQ_BEVERAGE_NAME.to_string(),
        };
        assert_eq!(e.to_string(), "unique constraint violated: uq_beverages_name");
        assert!(e.is_unique_violation(UQ_BEVERAGE_NAME));
        assert!(!e.is_unique_violation(UQ_BEVERAGE_INGREDIENT));
    }

    #[test]
    fn backend_error_keeps_source() {
        use std::error::Error;
        let e = StoreError::Backend(anyhow::anyhow!("connection reset"));
        assert!(e.source().is_some());
        assert!(e.to_string().contains("connection reset"));
    }
}
