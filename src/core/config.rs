//! Configuration
//!
//! Loaded from `--config` or `.commark.toml` in the root; every field has a
//! default, so a missing file or an empty one is fine.

use serde::Deserialize;
use std::path::Path;

use crate::anchors::patterns::GLOBAL;
use crate::core::file_reader::{FileReadConfig, DEFAULT_MAX_FILE_SIZE};
use crate::doc::reflow::ReflowOptions;
use crate::doc::repo::RepositoryInfo;
use crate::error::{Error, Result};

/// Default config file name, looked up in the root
pub const CONFIG_FILE_NAME: &str = ".commark.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comma-separated extra anchor tags
    pub custom_tags: String,

    /// Project name stamped on scanned anchors
    pub project: Option<String>,

    /// Files above this size are skipped by workspace scans (bytes)
    pub max_file_size: u64,

    pub reflow: ReflowOptions,

    /// Where `#123` issue references link to
    pub repository: Option<RepositoryInfo>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            custom_tags: String::new(),
            project: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            reflow: ReflowOptions::default(),
            repository: None,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default file under `root`
    pub fn load(config_path: Option<&Path>, root: &Path) -> Result<Self> {
        let path = config_path.map(Path::to_path_buf).or_else(|| {
            let default = root.join(CONFIG_FILE_NAME);
            default.exists().then_some(default)
        });

        match path {
            Some(path) => {
                log::debug!("loading config from {}", path.display());
                let content = std::fs::read_to_string(&path).map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
                toml::from_str(&content).map_err(|e| Error::Config {
                    path,
                    message: e.to_string(),
                })
            }
            None => Ok(Config::default()),
        }
    }

    /// Publish the custom tags to the process-wide pattern library
    pub fn apply(&self) -> bool {
        GLOBAL.configure(&self.custom_tags)
    }

    pub fn file_read_config(&self) -> FileReadConfig {
        FileReadConfig {
            max_file_size: self.max_file_size,
            ..Default::default()
        }
    }
}
