//! Server configuration.
//!
//! Configuration comes from an optional YAML file (named by `DRIFTWOOD_CONFIG`,
//! or `driftwood.yaml` in the working directory) with a few environment
//! overrides layered on top.

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Drain period used on shutdown when the idle timeout is disabled.
pub const DEFAULT_DRAIN_FALLBACK_MS: u64 = 10_000;

const DEFAULT_CONFIG_FILE: &str = "driftwood.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings consumed by the connection engine. Immutable once the server starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port, must be above 1024.
    pub port: u16,
    pub bind_host: String,
    /// Directory files are served from.
    pub document_root: PathBuf,
    /// Per-read idle timeout in milliseconds. `0` disables it.
    pub idle_timeout_ms: u64,
    /// Shutdown grace period used when `idle_timeout_ms` is `0`.
    pub drain_fallback_ms: u64,
    /// Value of the `Server` response header.
    pub server_name: String,
    /// Path served for a request of `/`.
    pub default_document: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_host: "0.0.0.0".to_string(),
            document_root: PathBuf::from("."),
            idle_timeout_ms: 0,
            drain_fallback_ms: DEFAULT_DRAIN_FALLBACK_MS,
            server_name: "Driftwood".to_string(),
            default_document: "/index.html".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// How long in-flight workers may run after shutdown before being cancelled.
    pub fn shutdown_grace(&self) -> Duration {
        self.idle_timeout()
            .unwrap_or(Duration::from_millis(self.drain_fallback_ms))
    }
}

impl Config {
    /// Loads the config file (if any), applies environment overrides and validates.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DRIFTWOOD_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(port) = std::env::var("DRIFTWOOD_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid DRIFTWOOD_PORT {port:?}"))?;
        }
        if let Ok(root) = std::env::var("DRIFTWOOD_ROOT") {
            self.server.document_root = PathBuf::from(root);
        }
        if let Ok(ms) = std::env::var("DRIFTWOOD_IDLE_TIMEOUT_MS") {
            self.server.idle_timeout_ms = ms
                .parse()
                .with_context(|| format!("invalid DRIFTWOOD_IDLE_TIMEOUT_MS {ms:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let server = &self.server;
        if server.port <= 1024 {
            bail!("port must be greater than 1024, got {}", server.port);
        }
        if !server.document_root.is_dir() {
            bail!(
                "document root {} is not a directory",
                server.document_root.display()
            );
        }
        if !server.server_name.is_ascii() {
            bail!("server name must be ASCII");
        }
        if !server.default_document.starts_with('/') {
            bail!("default document must start with '/'");
        }
        Ok(())
    }
}
