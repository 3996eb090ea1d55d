//! sip-catalog
//!
//! External catalog adapter. Owns the [`CatalogSource`] abstraction and the
//! TheCocktailDB implementation. Read-only: nothing fetched here is ever
//! written to local storage.

mod cocktaildb;
mod provider;

pub use cocktaildb::{CocktailDbSource, DEFAULT_BASE_URL};
pub use provider::{CatalogSource, DisabledSource, SourceUnavailable};
