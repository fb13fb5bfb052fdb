use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ExplorerError, Result};
use crate::render::CellStyle;
use crate::search::MatchMode;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "indicator-explorer.yaml";

/// Runtime settings, read from YAML and overridable from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Prefix of the data file names, as in `<data_source>-annual-data.csv`.
    pub data_source: String,
    /// Directory or `http(s)://` base URL holding the data files.
    pub data_root: String,
    pub rows_per_page: usize,
    pub missing_placeholder: String,
    /// Show literal zero as the placeholder in tables.
    pub zero_as_blank: bool,
    pub export_prefix: String,
    pub fetch_timeout_secs: u64,
    pub facet_match: MatchMode,
    pub max_text_width: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data_source: "all".to_string(),
            data_root: "data".to_string(),
            rows_per_page: 25,
            missing_placeholder: "...".to_string(),
            zero_as_blank: false,
            export_prefix: "indicators".to_string(),
            fetch_timeout_secs: 30,
            facet_match: MatchMode::Contains,
            max_text_width: 28,
        }
    }
}

impl ExplorerConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if present, or use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (candidate, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let config = match std::fs::read_to_string(&candidate) {
            Ok(content) => {
                let config: ExplorerConfig = serde_yaml::from_str(&content).map_err(|e| {
                    ExplorerError::Config(format!("{}: {}", candidate.display(), e))
                })?;
                info!("⚙️  Loaded configuration from {}", candidate.display());
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                ExplorerConfig::default()
            }
            Err(source) => {
                return Err(ExplorerError::Io {
                    path: candidate.display().to_string(),
                    source,
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(ExplorerError::Config("rows_per_page must be at least 1".to_string()));
        }
        if self.missing_placeholder.is_empty() {
            return Err(ExplorerError::Config(
                "missing_placeholder must not be empty".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ExplorerError::Config(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.data_source.trim().is_empty() {
            return Err(ExplorerError::Config("data_source must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn cell_style(&self) -> CellStyle {
        CellStyle {
            placeholder: self.missing_placeholder.clone(),
            zero_as_blank: self.zero_as_blank,
            max_text_width: self.max_text_width,
        }
    }
}
