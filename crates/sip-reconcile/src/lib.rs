//! sip-reconcile
//!
//! Pure planning for the catalog:
//! - [`reconcile`] turns a validated write payload plus the current state of a
//!   beverage into the minimal [`sip_schemas::ChangeSet`] the store must apply.
//! - [`merge_results`] combines local and external search results.
//!
//! Deterministic. No IO, no store calls, no catalog calls.

mod engine;
mod merge;
mod types;

pub use engine::reconcile;
pub use merge::merge_results;
pub use types::*;
