//! Settings that steer how a model is assembled from its files.
//!
//! Loaded from `loader_config.json`, with `PRMS_LOADER_CONFIG_PATH` as an
//! override.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_LOADER_CONFIG: &str = include_str!("data/loader_config.json");

pub const LOADER_CONFIG_ENV: &str = "PRMS_LOADER_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Files whose name contains this token are loaded as cascade files.
    pub cascade_marker: String,
    /// Dimension that indexes spatial units; statistics of parameters led by
    /// it are restricted to active units.
    pub unit_dimension: String,
    /// Parameter whose positive entries mark a unit as active.
    pub unit_type_param: String,
    /// Default output name of the check report, relative to the workspace.
    pub report_file: String,
    pub parallel_load: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cascade_marker: "cascade".to_string(),
            unit_dimension: "nhru".to_string(),
            unit_type_param: "hru_type".to_string(),
            report_file: "param_check.json".to_string(),
            parallel_load: true,
        }
    }
}

impl LoaderConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_LOADER_CONFIG)
                .expect("builtin loader config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, LoaderConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| LoaderConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = LoaderConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn is_cascade_file(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().contains(&self.cascade_marker))
            .unwrap_or(false)
    }
}

#[derive(Debug, Error)]
pub enum LoaderConfigError {
    #[error("failed to parse loader config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read loader config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve the loader config, preferring the file named by
/// `PRMS_LOADER_CONFIG_PATH`. Returns the config and the file it came from,
/// or `None` for the builtin copy.
pub fn load_loader_config_from_env() -> (Arc<LoaderConfig>, Option<PathBuf>) {
    let Some(path) = env::var_os(LOADER_CONFIG_ENV).map(PathBuf::from) else {
        tracing::info!(target: "prms::config", "loader_config.loaded=builtin");
        return (LoaderConfig::builtin(), None);
    };

    match LoaderConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "prms::config",
                path = %path.display(),
                "loader_config.loaded=file"
            );
            (Arc::new(config), Some(path))
        }
        Err(err) => {
            tracing::warn!(
                target: "prms::config",
                path = %path.display(),
                error = %err,
                "loader_config.load_failed"
            );
            tracing::info!(target: "prms::config", "loader_config.loaded=builtin");
            (LoaderConfig::builtin(), None)
        }
    }
}
