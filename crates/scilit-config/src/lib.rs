//! Configuration loading for SciLit.
//! Reads scilit.toml from the current directory or the path in the SCILIT_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_ENV: &str = "SCILIT_CONFIG";
pub const SERVER_ADDRESS_ENV: &str = "SCILIT_NLP_SERVER_ADDRESS";
pub const DEFAULT_CONFIG_PATH: &str = "scilit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url()   -> String { "http://localhost:8060".to_string() }
fn default_api_prefix() -> String { "/ml-api".to_string() }
fn default_user_agent() -> String { format!("scilit/{}", env!("CARGO_PKG_VERSION")) }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            user_agent: default_user_agent(),
        }
    }
}

impl BackendConfig {
    /// Full URL of a versioned endpoint, e.g. `{base}/ml-api/doc-search/v1.0`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let prefix = self.api_prefix.trim_end_matches('/');
        let prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };
        format!("{}{}/{}/v1.0", self.base_url.trim_end_matches('/'), prefix, endpoint)
    }
}

/// Per-endpoint deadlines in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_10s")]
    pub search_ms: u64,
    #[serde(default = "default_5s")]
    pub get_papers_ms: u64,
    #[serde(default = "default_5s")]
    pub summarize_ms: u64,
    #[serde(default = "default_5s")]
    pub generate_ms: u64,
    #[serde(default = "default_5s")]
    pub process_ms: u64,
    #[serde(default = "default_5s")]
    pub title_search_ms: u64,
    #[serde(default = "default_10s")]
    pub export_ms: u64,
}

fn default_5s()  -> u64 { 5_000 }
fn default_10s() -> u64 { 10_000 }

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            search_ms: default_10s(),
            get_papers_ms: default_5s(),
            summarize_ms: default_5s(),
            generate_ms: default_5s(),
            process_ms: default_5s(),
            title_search_ms: default_5s(),
            export_ms: default_10s(),
        }
    }
}

impl TimeoutConfig {
    fn all(&self) -> [(&'static str, u64); 7] {
        [
            ("search_ms", self.search_ms),
            ("get_papers_ms", self.get_papers_ms),
            ("summarize_ms", self.summarize_ms),
            ("generate_ms", self.generate_ms),
            ("process_ms", self.process_ms),
            ("title_search_ms", self.title_search_ms),
            ("export_ms", self.export_ms),
        ]
    }

    pub fn duration(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

fn default_page_size() -> usize { 2 }
fn default_n_results() -> usize { 100 }

impl Default for PagingConfig {
    fn default() -> Self {
        Self { page_size: default_page_size(), n_results: default_n_results() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_words")]
    pub max_words_in_highlights: usize,
}

fn default_max_words() -> usize { 35 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { max_words_in_highlights: default_max_words() }
    }
}


impl Config {
    /// Load configuration.
    /// Checks SCILIT_CONFIG env var first, then ./scilit.toml, then falls back
    /// to built-in defaults. SCILIT_NLP_SERVER_ADDRESS overrides the backend address.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_ENV).ok();
        let mut config = Self::load_from(explicit.as_deref().map(Path::new))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// An explicitly named file must exist; the default path is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(SERVER_ADDRESS_ENV) {
            let address = address.trim();
            if !address.is_empty() {
                self.backend.base_url = address.to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = url::Url::parse(&self.backend.base_url).map_err(|e| {
            ConfigError::Invalid(format!("backend.base_url {:?}: {e}", self.backend.base_url))
        })?;
        if base.host_str().is_none() {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url {:?} has no host",
                self.backend.base_url
            )));
        }
        if self.paging.page_size == 0 {
            return Err(ConfigError::Invalid("paging.page_size must be positive".to_string()));
        }
        if self.paging.n_results == 0 {
            return Err(ConfigError::Invalid("paging.n_results must be positive".to_string()));
        }
        if let Some((name, _)) = self.timeouts.all().into_iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("timeouts.{name} must be positive")));
        }
        Ok(())
    }
}
