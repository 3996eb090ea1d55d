//! Layered config hashing must be deterministic and sensitive to values.

use sip_config::{load_layered_yaml, load_layered_yaml_from_strings, StoreBackend};

const BASE_YAML: &str = r#"
server:
  bind_addr: "0.0.0.0:8899"
store:
  backend: "postgres"
  database_url_env: "SIP_DATABASE_URL"
catalog:
  timeout_ms: 2500
"#;

const BASE_YAML_REORDERED: &str = r#"
catalog:
  timeout_ms: 2500
store:
  database_url_env: "SIP_DATABASE_URL"
  backend: "postgres"
server:
  bind_addr: "0.0.0.0:8899"
"#;

const DEV_OVERLAY: &str = r#"
store:
  backend: "memory"
  seed_on_boot: true
auth:
  required: false
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_base_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, DEV_OVERLAY]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let cfg = layered.service().unwrap();
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert!(cfg.store.seed_on_boot);
    assert!(!cfg.auth.required);
    // Untouched base values survive the merge.
    assert_eq!(cfg.server.bind_addr, "0.0.0.0:8899");
    assert_eq!(cfg.catalog.timeout_ms, 2500);
    assert_eq!(cfg.store.database_url_env, "SIP_DATABASE_URL");
}

#[test]
fn files_on_disk_load_like_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let dev = dir.path().join("dev.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&dev, DEV_OVERLAY).unwrap();

    let base_s = base.to_string_lossy().to_string();
    let dev_s = dev.to_string_lossy().to_string();
    let from_files = load_layered_yaml(&[base_s.as_str(), dev_s.as_str()]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, DEV_OVERLAY]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_an_error_naming_the_path() {
    let err = load_layered_yaml(&["/nonexistent/sip/base.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/sip/base.yaml"));
}
