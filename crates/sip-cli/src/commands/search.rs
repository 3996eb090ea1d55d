use anyhow::{Context, Result};
use sip_runtime::{wiring, SearchResponse};

pub async fn run(term: &str, config_paths: &[String]) -> Result<()> {
    let (loaded, cfg) = super::load_config(config_paths)?;
    tracing::debug!(config_hash = %loaded.config_hash, "config loaded");

    let secrets = sip_config::resolve_secrets(&cfg)?;
    let service = wiring::build_service(&cfg, &secrets).await?;

    let out = service
        .search(term)
        .await
        .with_context(|| format!("search '{term}' failed"))?;

    let json = serde_json::to_string_pretty(&SearchResponse::from(out))?;
    println!("{json}");
    Ok(())
}
