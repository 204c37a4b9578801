use crate::error::{Error, Result};
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Replaces the built-in insight and recommendation tables when present.
    #[serde(default)]
    pub rules: Option<RuleSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_generator")]
    pub generator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

fn default_title() -> String { "Rebate Metrics Report".to_string() }
fn default_currency_symbol() -> String { "¥".to_string() }
fn default_generator() -> String { format!("rebate_report v{}", env!("CARGO_PKG_VERSION")) }
fn default_out_dir() -> PathBuf { PathBuf::from("processed") }
fn default_history_file() -> PathBuf { PathBuf::from("processing_history.jsonl") }

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            currency_symbol: default_currency_symbol(),
            generator: default_generator(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_out_dir(), history_file: default_history_file() }
    }
}

impl Config {
    /// Load from `path`, falling back to the default location. A missing
    /// file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if config_path.exists() {
            log::info!("Loading config from: {}", config_path.display());
            let content = fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            log::debug!("No config at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn rules(&self) -> RuleSet {
        self.rules.clone().unwrap_or_default()
    }

    fn default_path() -> PathBuf {
        PathBuf::from("rebate_report.toml")
    }
}
