use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::workspace::FolderLayout;

pub const DEFAULT_TIMEOUT_SECONDS: f64 = 20.0;
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the raw/processed/... folder layout.
    pub base_folder: PathBuf,
    /// Soft budget checked once cleaning is done.
    pub timeout_seconds: f64,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_folder: PathBuf::from("./data"),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: PipelineConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(text).context("Parsing pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.timeout_seconds.is_finite() && self.timeout_seconds >= 0.0,
            "timeout_seconds must be a non-negative number, got {}",
            self.timeout_seconds
        );
        Ok(())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs_f64();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::ZERO)
    }

    pub fn layout(&self) -> FolderLayout {
        FolderLayout::new(&self.base_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = PipelineConfig::from_yaml_str("timeout_seconds: 5\n").expect("parse");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.base_folder, PathBuf::from("./data"));
        assert_eq!(config.preview_rows, DEFAULT_PREVIEW_ROWS);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let err = PipelineConfig::from_yaml_str("timeout_seconds: -1\n").unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn default_timeout_is_twenty_seconds() {
        assert_eq!(PipelineConfig::default().timeout(), Duration::from_secs(20));
    }
}
