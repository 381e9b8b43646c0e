//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_input() -> PathBuf {
    "input.json".into()
}
fn default_output() -> PathBuf {
    "result.json".into()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the quote API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Pause between consecutive quote requests. Zero disables the pause.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://financialmodelingprep.com/api/v3".into()
}
fn default_api_key_env() -> String {
    "FMP_API_KEY".into()
}
fn default_rate_limit() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    30
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            rate_limit_ms: default_rate_limit(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` if present, otherwise fall back to built-in defaults.
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.pricing.base_url.is_empty() {
            return Err(Error::Config("pricing.base_url must not be empty".into()));
        }
        if self.pricing.api_key_env.is_empty() {
            return Err(Error::Config(
                "pricing.api_key_env must not be empty".into(),
            ));
        }
        if self.pricing.timeout_secs == 0 {
            return Err(Error::Config("pricing.timeout_secs must be > 0".into()));
        }
        if self.files.input == self.files.output {
            return Err(Error::Config(
                "files.input and files.output must be different paths".into(),
            ));
        }
        Ok(())
    }
}
