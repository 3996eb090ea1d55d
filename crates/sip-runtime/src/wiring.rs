//! Startup wiring shared by the daemon and the CLI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sip_catalog::{CatalogSource, CocktailDbSource, DisabledSource};
use sip_config::{
    report_unused_keys, LoadedConfig, ResolvedSecrets, ServiceConfig, StoreBackend,
    UnusedKeyPolicy, UnusedKeyReport,
};
use sip_db::{EntityStore, MemStore, PgStore};
use tracing::{info, warn};

use crate::CatalogService;

/// Typed config from a loaded layer stack. Keys the service never reads are
/// logged at `warn` and returned; they do not stop startup.
pub fn service_config(loaded: &LoadedConfig) -> Result<(ServiceConfig, UnusedKeyReport)> {
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(
            count = report.unused_leaf_pointers.len(),
            "CONFIG_UNUSED_KEYS: config contains keys the service does not read"
        );
        for key in &report.unused_leaf_pointers {
            warn!(key = %key, "CONFIG_UNUSED_KEYS: unused config key");
        }
    }
    let cfg = loaded.service().context("parse service config")?;
    Ok((cfg, report))
}

/// Open the configured store. Postgres is migrated before use.
pub async fn open_store(
    cfg: &ServiceConfig,
    secrets: &ResolvedSecrets,
) -> Result<Arc<dyn EntityStore>> {
    match cfg.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemStore::new())),
        StoreBackend::Postgres => {
            let url = secrets
                .database_url
                .as_deref()
                .with_context(|| format!("env var {} not resolved", cfg.store.database_url_env))?;
            let pool = sip_db::connect(url, cfg.store.max_connections).await?;
            sip_db::migrate(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

pub fn build_source(
    cfg: &ServiceConfig,
    secrets: &ResolvedSecrets,
) -> Result<Arc<dyn CatalogSource>> {
    if !cfg.catalog.enabled {
        return Ok(Arc::new(DisabledSource));
    }
    let source = CocktailDbSource::new_with_base_url(
        secrets.catalog_api_key.clone(),
        cfg.catalog.base_url.clone(),
        Duration::from_millis(cfg.catalog.timeout_ms),
    )
    .context("build TheCocktailDB client")?;
    Ok(Arc::new(source))
}

/// Store + source + service, with the seed applied when `store.seed_on_boot` is set.
pub async fn build_service(cfg: &ServiceConfig, secrets: &ResolvedSecrets) -> Result<CatalogService> {
    let store = open_store(cfg, secrets).await?;
    let source = build_source(cfg, secrets)?;
    let service = CatalogService::new(
        store,
        source,
        Duration::from_millis(cfg.catalog.timeout_ms),
    );

    if cfg.store.seed_on_boot {
        service
            .bootstrap(&sip_db::default_seed())
            .await
            .context("seed on boot failed")?;
    }

    info!(
        backend = service.store().backend_name(),
        catalog = service.source_name(),
        "catalog service ready"
    );
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(seed: bool) -> (ServiceConfig, ResolvedSecrets) {
        let mut cfg = ServiceConfig::default();
        cfg.store.backend = StoreBackend::Memory;
        cfg.store.seed_on_boot = seed;
        cfg.catalog.enabled = false;
        cfg.auth.required = false;
        let secrets = sip_config::secrets::resolve_secrets_with(&cfg, |_| None).unwrap();
        (cfg, secrets)
    }

    #[test]
    fn service_config_reports_mistyped_keys_and_keeps_defaults() {
        let loaded = sip_config::load_layered_yaml_from_strings(&[
            "store:\n  backend: \"memory\"\ncatalog:\n  timout_ms: 1\n",
        ])
        .unwrap();
        let (cfg, report) = service_config(&loaded).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.catalog.timeout_ms, 3_000);
        assert_eq!(report.unused_leaf_pointers, vec!["/catalog/timout_ms".to_string()]);
    }

    #[test]
    fn service_config_still_rejects_invalid_values() {
        let loaded =
            sip_config::load_layered_yaml_from_strings(&["catalog:\n  timeout_ms: 0\n"]).unwrap();
        assert!(service_config(&loaded).is_err());
    }

    #[tokio::test]
    async fn memory_backend_with_seed_on_boot_serves_seed() {
        let (cfg, secrets) = memory_config(true);
        let svc = build_service(&cfg, &secrets).await.unwrap();
        assert_eq!(svc.store().backend_name(), "memory");
        assert_eq!(svc.source_name(), "disabled");
        let b = svc.get(sip_schemas::BeverageId(2)).await.unwrap();
        assert_eq!(b.name, "Tomato Martini");
    }

    #[tokio::test]
    async fn disabled_catalog_search_is_not_degraded() {
        let (cfg, secrets) = memory_config(true);
        let svc = build_service(&cfg, &secrets).await.unwrap();
        let out = svc.search("potato").await.unwrap();
        assert!(!out.is_degraded());
        assert_eq!(out.results.len(), 1);
    }

    #[tokio::test]
    async fn without_seed_storage_is_empty() {
        let (cfg, secrets) = memory_config(false);
        let svc = build_service(&cfg, &secrets).await.unwrap();
        assert!(svc.search("a").await.unwrap().results.is_empty());
    }
}
