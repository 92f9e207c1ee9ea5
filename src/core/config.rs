use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub countries: ProviderEndpoint,
    pub rates: ProviderEndpoint,
    pub frankfurter: ProviderEndpoint,
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            countries: ProviderEndpoint {
                base_url: "https://restcountries.com".to_string(),
            },
            rates: ProviderEndpoint {
                base_url: "https://open.er-api.com".to_string(),
            },
            frankfurter: ProviderEndpoint {
                base_url: "https://api.frankfurter.app".to_string(),
            },
            timeout_secs: 30,
            retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which collaborator answers "what is the rate from home to X".
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateStrategy {
    /// One rate table per home currency, looked up per destination.
    #[default]
    Table,
    /// One live pairwise request per destination currency.
    Pairwise,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct RatesConfig {
    pub strategy: RateStrategy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached rate tables and pairwise rates. Country metadata
    /// never expires.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct CountriesConfig {
    /// Warm the country cache from the directory's full listing at startup.
    pub preload: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct BudgetConfig {
    /// Resolve all destinations concurrently instead of one at a time.
    pub parallel_lookups: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub rates: RatesConfig,
    pub cache: CacheConfig,
    pub countries: CountriesConfig,
    pub budget: BudgetConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "travelbudget", "travel-budget")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = if config_str.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&config_str).with_context(|| {
                format!("Failed to parse config file: {}", path.as_ref().display())
            })?
        };
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
