use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::criteria::{ThresholdOverrides, ThresholdTable};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://placement_tracker.db?mode=rwc";
pub const DEFAULT_CONFIG_FILE: &str = "placement-tracker.toml";
pub const CONFIG_ENV: &str = "PLACEMENT_TRACKER_CONFIG";

/// Contents of `placement-tracker.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub thresholds: ThresholdOverrides,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: Option<String>,
    pub thresholds: ThresholdTable,
    /// Config file that was read, if any.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    /// Resolves configuration from an explicit path, `$PLACEMENT_TRACKER_CONFIG`,
    /// or `placement-tracker.toml` in the working directory, in that order.
    /// `DATABASE_URL` wins over the file's database url.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let source = explicit.map(Path::to_path_buf).or(env_path).or_else(|| {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            default_path.exists().then_some(default_path)
        });
        let file = match &source {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };

        let mut config = Self::from_parts(file, std::env::var("DATABASE_URL").ok())?;
        config.source = source;
        Ok(config)
    }

    pub fn from_parts(file: FileConfig, database_url_env: Option<String>) -> anyhow::Result<Self> {
        let thresholds = ThresholdTable::default()
            .with_overrides(&file.thresholds)
            .context("invalid [thresholds] section")?;

        Ok(Self {
            database_url: database_url_env
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_level: file.log_level,
            thresholds,
            source: None,
        })
    }

    /// Filter directive for the subscriber: `-v` flags win, then the file, then `warn`.
    pub fn log_filter(&self, verbose: u8) -> String {
        match verbose {
            0 => self.log_level.clone().unwrap_or_else(|| "warn".to_string()),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace,sqlx=debug".to_string(),
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}
