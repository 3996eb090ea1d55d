//! External catalog source abstraction.
//!
//! A [`CatalogSource`] answers name searches against a third-party recipe
//! catalog and returns records in the same [`Beverage`] shape local storage
//! uses, tagged `Provenance::ExternalCatalog` and carrying no local keys.

use sip_schemas::Beverage;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// The external catalog could not produce an answer.
///
/// Callers treat every variant the same way (degrade, do not fail); the
/// variants exist for logs and the degraded-reason text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUnavailable {
    /// The request did not complete within the configured bound.
    Timeout { after_ms: u64 },
    /// Connection, TLS or request-level failure.
    Transport(String),
    /// Non-success HTTP status.
    Status { code: u16 },
    /// The body was not the expected shape.
    Decode(String),
    /// The source is switched off in configuration.
    Disabled,
}

impl std::fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceUnavailable::Timeout { after_ms } => {
                write!(f, "external catalog timed out after {after_ms}ms")
            }
            SourceUnavailable::Transport(msg) => write!(f, "external catalog transport error: {msg}"),
            SourceUnavailable::Status { code } => write!(f, "external catalog returned status {code}"),
            SourceUnavailable::Decode(msg) => write!(f, "external catalog decode error: {msg}"),
            SourceUnavailable::Disabled => write!(f, "external catalog disabled"),
        }
    }
}

impl std::error::Error for SourceUnavailable {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Read-only name search against an external catalog.
///
/// Object safe; held as `Arc<dyn CatalogSource>` by the service.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short identifier for logs (e.g. `"thecocktaildb"`).
    fn source_name(&self) -> &'static str;

    async fn search_by_name(&self, term: &str) -> Result<Vec<Beverage>, SourceUnavailable>;
}

/// Source used when the external catalog is disabled: always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSource;

#[async_trait::async_trait]
impl CatalogSource for DisabledSource {
    fn source_name(&self) -> &'static str {
        "disabled"
    }

    async fn search_by_name(&self, _term: &str) -> Result<Vec<Beverage>, SourceUnavailable> {
        Err(SourceUnavailable::Disabled)
    }
}
