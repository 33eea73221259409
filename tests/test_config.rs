use std::path::PathBuf;
use std::time::Duration;

use driftwood::config::{Config, DEFAULT_DRAIN_FALLBACK_MS, ServerConfig};

#[test]
fn test_config_defaults() {
    let cfg = ServerConfig::default();

    assert_eq!(cfg.idle_timeout_ms, 0);
    assert_eq!(cfg.default_document, "/index.html");
    assert_eq!(cfg.server_name, "Driftwood");
    assert_eq!(cfg.drain_fallback_ms, DEFAULT_DRAIN_FALLBACK_MS);
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  port: 8443
  bind_host: 127.0.0.1
  document_root: /srv/www
  idle_timeout_ms: 2500
"#;
    let cfg = Config::from_yaml(yaml).unwrap();

    assert_eq!(cfg.server.port, 8443);
    assert_eq!(cfg.server.listen_addr(), "127.0.0.1:8443");
    assert_eq!(cfg.server.document_root, PathBuf::from("/srv/www"));
    assert_eq!(cfg.server.idle_timeout(), Some(Duration::from_millis(2500)));
    // Unspecified fields fall back to defaults
    assert_eq!(cfg.server.default_document, "/index.html");
}

#[test]
fn test_config_empty_yaml_section() {
    let cfg = Config::from_yaml("server: {}").unwrap();
    assert_eq!(cfg.server.port, ServerConfig::default().port);
}

#[test]
fn test_config_rejects_bad_yaml() {
    assert!(Config::from_yaml("server: [1, 2").is_err());
    assert!(Config::from_yaml("server:\n  port: not-a-number").is_err());
}

#[test]
fn test_zero_idle_timeout_means_none() {
    let cfg = ServerConfig {
        idle_timeout_ms: 0,
        ..ServerConfig::default()
    };
    assert_eq!(cfg.idle_timeout(), None);
}

#[test]
fn test_shutdown_grace_follows_idle_timeout() {
    let cfg = ServerConfig {
        idle_timeout_ms: 750,
        ..ServerConfig::default()
    };
    assert_eq!(cfg.shutdown_grace(), Duration::from_millis(750));
}

#[test]
fn test_shutdown_grace_uses_fallback_without_idle_timeout() {
    let cfg = ServerConfig {
        idle_timeout_ms: 0,
        drain_fallback_ms: 1234,
        ..ServerConfig::default()
    };
    assert_eq!(cfg.shutdown_grace(), Duration::from_millis(1234));
}

#[test]
fn test_validate_port_must_exceed_1024() {
    let mut cfg = Config::default();
    cfg.server.document_root = std::env::temp_dir();

    cfg.server.port = 1024;
    assert!(cfg.validate().is_err());

    cfg.server.port = 1025;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_validate_document_root_must_exist() {
    let mut cfg = Config::default();
    cfg.server.document_root = std::env::temp_dir().join("driftwood-no-such-root");

    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_server_name_must_be_ascii() {
    let mut cfg = Config::default();
    cfg.server.document_root = std::env::temp_dir();
    cfg.server.server_name = "Drïftwood".to_string();

    assert!(cfg.validate().is_err());
}

#[test]
fn test_load_reads_file_then_env_overrides() {
    let dir = std::env::temp_dir().join(format!("driftwood-cfg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("driftwood.yaml");
    std::fs::write(
        &file,
        format!(
            "server:\n  port: 9000\n  document_root: {}\n  idle_timeout_ms: 300\n",
            dir.display()
        ),
    )
    .unwrap();

    unsafe {
        std::env::set_var("DRIFTWOOD_CONFIG", &file);
        std::env::set_var("DRIFTWOOD_PORT", "9001");
    }
    let cfg = Config::load();
    unsafe {
        std::env::remove_var("DRIFTWOOD_CONFIG");
        std::env::remove_var("DRIFTWOOD_PORT");
    }

    let cfg = cfg.unwrap();
    assert_eq!(cfg.server.port, 9001);
    assert_eq!(cfg.server.idle_timeout_ms, 300);
    assert_eq!(cfg.server.document_root, dir);
}
