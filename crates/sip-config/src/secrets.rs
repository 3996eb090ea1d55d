//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"SIP_DATABASE_URL"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the result
//!   into constructors; never scatter `std::env::var` calls across the codebase.
//! - `Debug` redacts values. Error messages name the env var, never the value.
//!
//! # Enforcement
//! | Condition                    | Required                       |
//! |------------------------------|--------------------------------|
//! | `store.backend: postgres`    | database URL                   |
//! | `auth.required: true`        | at least one accepted token    |
//!
//! The TheCocktailDB key is always optional; the public test key is used when absent.

use anyhow::{bail, Result};

use crate::{ServiceConfig, StoreBackend};

/// Public TheCocktailDB key usable for development.
pub const COCKTAILDB_TEST_KEY: &str = "1";

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` for the in-memory backend.
    pub database_url: Option<String>,
    pub catalog_api_key: String,
    /// Bearer tokens the identity provider issued and the daemon accepts.
    pub auth_tokens: Vec<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field("catalog_api_key", &"<REDACTED>")
            .field("auth_tokens", &format!("<{} REDACTED>", self.auth_tokens.len()))
            .finish()
    }
}

/// Resolve a named environment variable; unset or blank is `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve all secrets named by `cfg` from the process environment.
pub fn resolve_secrets(cfg: &ServiceConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, resolve_env)
}

/// Same as [`resolve_secrets`] with an injectable lookup (tests).
pub fn resolve_secrets_with<F>(cfg: &ServiceConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = match cfg.store.backend {
        StoreBackend::Postgres => match lookup(&cfg.store.database_url_env) {
            Some(url) => Some(url),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
                cfg.store.database_url_env
            ),
        },
        StoreBackend::Memory => None,
    };

    let catalog_api_key =
        lookup(&cfg.catalog.api_key_env).unwrap_or_else(|| COCKTAILDB_TEST_KEY.to_string());

    let auth_tokens = lookup(&cfg.auth.tokens_env)
        .map(|raw| split_tokens(&raw))
        .unwrap_or_default();
    if cfg.auth.required && auth_tokens.is_empty() {
        bail!(
            "SECRETS_MISSING: auth.required=true but env var '{}' holds no tokens",
            cfg.auth.tokens_env
        );
    }

    Ok(ResolvedSecrets {
        database_url,
        catalog_api_key,
        auth_tokens,
    })
}
