// Configuration module for steam-details
// TOML configuration file with environment variable overrides

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "steam-details";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerConfig,

    /// Outbound fetch configuration
    pub fetch: FetchConfig,

    /// Details cache configuration
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 8000)
    pub port: u16,

    /// Bind address (default: 127.0.0.1)
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Steam storefront country code, decides the price currency
    pub country_code: String,

    /// Per-request timeout in seconds
    pub http_timeout_secs: u64,

    /// User-Agent presented to the scraped sites
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            country_code: "de".to_string(),
            http_timeout_secs: 15,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:129.0) Gecko/20100101 Firefox/129.0"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Details cache TTL in minutes
    pub ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_minutes: 15 }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration with the following priority:
    /// 1. Environment variables (STEAM_DETAILS_*)
    /// 2. Config file (STEAM_DETAILS_CONFIG or the XDG config dir)
    /// 3. Defaults
    pub fn load() -> Self {
        let file = Self::read_config_file();
        let mut config = AppConfig {
            server: file.server,
            fetch: file.fetch,
            cache: file.cache,
        };

        if let Ok(port) = std::env::var("STEAM_DETAILS_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid STEAM_DETAILS_PORT: {}", port),
            }
        }
        if let Ok(addr) = std::env::var("STEAM_DETAILS_BIND") {
            config.server.bind_address = addr;
        }
        if let Ok(country) = std::env::var("STEAM_DETAILS_COUNTRY") {
            config.fetch.country_code = country;
        }

        config
    }

    fn read_config_file() -> ConfigFile {
        let path = std::env::var("STEAM_DETAILS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_config_path());

        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(file) => {
                    tracing::info!("Loaded config from {:?}", path);
                    file
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {:?}: {}, using defaults", path, e);
                    ConfigFile::default()
                }
            },
            Err(_) => ConfigFile::default(),
        }
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.http_timeout_secs)
    }

    pub fn log_config(&self) {
        tracing::info!(
            "Server: {}:{}",
            self.server.bind_address,
            self.server.port
        );
        tracing::info!(
            "Store country: {}, HTTP timeout: {}s, cache TTL: {}min",
            self.fetch.country_code,
            self.fetch.http_timeout_secs,
            self.cache.ttl_minutes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.fetch.country_code, "de");
        assert_eq!(config.cache_ttl(), Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000

            [cache]
            ttl_minutes = 5
            "#,
        )
        .unwrap();
        assert_eq!(file.server.port, 9000);
        assert_eq!(file.server.bind_address, "127.0.0.1");
        assert_eq!(file.fetch.http_timeout_secs, 15);
        assert_eq!(file.cache.ttl_minutes, 5);
    }
}
