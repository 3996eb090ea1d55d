//! sip-runtime
//!
//! Orchestration between the entity store, the external catalog and the pure
//! planning crate. [`CatalogService`] is the single entry point used by the
//! HTTP daemon and the CLI.
//!
//! Within one write the steps are strictly sequential: duplicate-name check,
//! ingredient lookup, reconcile, one atomic save. Dropping a write before the
//! save commits leaves storage untouched.

mod error;
mod service;
pub mod wiring;

pub use error::CatalogError;
pub use service::{CatalogService, SearchOutcome, SearchResponse};
