//! Shared runtime state for sip-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Everything here is
//! immutable after startup; the mutable catalog lives behind the service's
//! store.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use sip_config::{AuthConfig, ResolvedSecrets};
use sip_runtime::CatalogService;
use tracing::debug;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "sip-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

// ---------------------------------------------------------------------------
// AccessPolicy
// ---------------------------------------------------------------------------

/// Bearer-token gate for write routes.
///
/// Tokens are issued by the identity provider; the daemon only knows the
/// accepted set. An empty set with `required == false` lets every request
/// through (development).
#[derive(Clone)]
pub struct AccessPolicy {
    required: bool,
    tokens: Vec<String>,
}

/// Why a write request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    MissingToken,
    UnknownToken,
}

impl AccessPolicy {
    pub fn new(required: bool, tokens: Vec<String>) -> Self {
        Self { required, tokens }
    }

    /// No checks at all.
    pub fn open() -> Self {
        Self::new(false, Vec::new())
    }

    pub fn from_config(auth: &AuthConfig, secrets: &ResolvedSecrets) -> Self {
        Self::new(auth.required, secrets.auth_tokens.clone())
    }

    pub fn is_open(&self) -> bool {
        !self.required && self.tokens.is_empty()
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), Denied> {
        if self.is_open() {
            return Ok(());
        }
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Denied::MissingToken)?;

        if self.tokens.iter().any(|t| t == token) {
            Ok(())
        } else {
            debug!("bearer token not in accepted set");
            Err(Denied::UnknownToken)
        }
    }
}

impl std::fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPolicy")
            .field("required", &self.required)
            .field("tokens", &format!("<{} REDACTED>", self.tokens.len()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: CatalogService,
    pub auth: AccessPolicy,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(service: CatalogService, auth: AccessPolicy) -> Self {
        Self {
            service,
            auth,
            build: BuildInfo::default(),
        }
    }
}
