//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub stores: StoreConfig,
    pub ivr: IvrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Inactivity TTL for call contexts, seconds
    pub context_ttl_secs: u64,
    /// Inactivity TTL for IVR sessions, seconds
    pub session_ttl_secs: u64,
    /// Interval of the background expiry sweep, seconds
    pub purge_interval_secs: u64,
    /// Bound on retained audit records
    pub audit_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IvrConfig {
    /// TTL for cached department catalogs, seconds
    pub catalog_cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: 3600,
            session_ttl_secs: 1800,
            purge_interval_secs: 60,
            audit_capacity: 10_000,
        }
    }
}

impl Default for IvrConfig {
    fn default() -> Self {
        Self {
            catalog_cache_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when the file is
    /// absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
