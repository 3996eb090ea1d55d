//! Command handler modules for sip-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod db;
pub mod search;

use anyhow::Result;
use sip_config::{LoadedConfig, ServiceConfig};
use sip_runtime::wiring;

/// Load layered config from explicit `--config` paths, or from `SIP_CONFIG`
/// when none were given. Unused keys are logged, not fatal.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, ServiceConfig)> {
    let loaded = if paths.is_empty() {
        sip_config::load_from_env()?
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        sip_config::load_layered_yaml(&refs)?
    };
    let (cfg, _unused) = wiring::service_config(&loaded)?;
    Ok((loaded, cfg))
}
