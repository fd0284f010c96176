use serde::Deserialize;

use crate::models::Timeframe;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Management API root, e.g. `https://inventory.local/api`.
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    /// RRD window embedded in backup payloads and used when `/api/series` omits one.
    #[serde(default)]
    pub default_timeframe: Timeframe,
    /// Assumed host vCPUs when a guest's node is missing from the node list.
    #[serde(default = "default_host_cpu_fallback")]
    pub host_cpu_fallback: u32,
    #[serde(default = "default_host_memory_fallback_bytes")]
    pub host_memory_fallback_bytes: u64,
    /// Backup items requested per store listing.
    #[serde(default = "default_backup_page_size")]
    pub backup_page_size: u32,
}

fn default_host_cpu_fallback() -> u32 {
    128
}

fn default_host_memory_fallback_bytes() -> u64 {
    128 * 1024 * 1024 * 1024
}

fn default_backup_page_size() -> u32 {
    50
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            default_timeframe: Timeframe::default(),
            host_cpu_fallback: default_host_cpu_fallback(),
            host_memory_fallback_bytes: default_host_memory_fallback_bytes(),
            backup_page_size: default_backup_page_size(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.upstream.base_url.starts_with("http://")
                || self.upstream.base_url.starts_with("https://"),
            "upstream.base_url must be an http(s) URL, got {:?}",
            self.upstream.base_url
        );
        anyhow::ensure!(
            self.upstream.request_timeout_ms > 0,
            "upstream.request_timeout_ms must be > 0, got {}",
            self.upstream.request_timeout_ms
        );
        anyhow::ensure!(
            self.resolution.host_cpu_fallback > 0,
            "resolution.host_cpu_fallback must be > 0, got {}",
            self.resolution.host_cpu_fallback
        );
        anyhow::ensure!(
            self.resolution.host_memory_fallback_bytes > 0,
            "resolution.host_memory_fallback_bytes must be > 0, got {}",
            self.resolution.host_memory_fallback_bytes
        );
        anyhow::ensure!(
            self.resolution.backup_page_size > 0,
            "resolution.backup_page_size must be > 0, got {}",
            self.resolution.backup_page_size
        );
        Ok(())
    }
}
