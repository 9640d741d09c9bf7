//! Pipeline configuration: where inputs come from and where outputs go.
//!
//! Persisted as TOML (default file name [`DEFAULT_CONFIG_FILE`]). Every stage
//! receives a resolved [`PipelineConfig`]; no path is derived from the location
//! of the running executable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::analytics::CentralityConfig;
use crate::person::Gender;

/// Conventional config file name.
pub const DEFAULT_CONFIG_FILE: &str = "isnad.toml";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Raw input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    /// Person table (`id`, `displayname`, `gender`, ...).
    #[serde(default = "default_persons")]
    pub persons: PathBuf,
    /// Record table (`isnad`, ...).
    #[serde(default = "default_records")]
    pub records: PathBuf,
}

/// Output artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// Metadata table, rewritten in place by each stage.
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
    /// Node-link JSON of the filtered subgraph.
    #[serde(default = "default_graph")]
    pub graph: PathBuf,
}

/// Which persons form the analysed subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetConfig {
    /// Gender value selecting the subset (case-insensitive).
    #[serde(default = "default_gender")]
    pub gender: String,
}

impl SubsetConfig {
    pub fn gender(&self) -> Gender {
        Gender::parse(&self.gender)
    }
}

fn default_persons() -> PathBuf {
    PathBuf::from("data/raw/isnad-datasets/data/variousnarrators.csv")
}
fn default_records() -> PathBuf {
    PathBuf::from("data/raw/isnad-datasets/data/hadiths.csv")
}
fn default_metadata() -> PathBuf {
    PathBuf::from("data/processed/muhaddithat_metadata.csv")
}
fn default_graph() -> PathBuf {
    PathBuf::from("docs/muhaddithat_network.json")
}
fn default_gender() -> String {
    "female".into()
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            persons: default_persons(),
            records: default_records(),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            metadata: default_metadata(),
            graph: default_graph(),
        }
    }
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            gender: default_gender(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub inputs: InputPaths,
    #[serde(default)]
    pub outputs: OutputPaths,
    #[serde(default)]
    pub subset: SubsetConfig,
    #[serde(default)]
    pub centrality: CentralityConfig,
}

impl PipelineConfig {
    /// Read a config file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve(base))
    }

    /// Parse TOML text. `origin` only labels errors.
    pub fn from_toml(content: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        for path in [
            &mut self.inputs.persons,
            &mut self.inputs.records,
            &mut self.outputs.metadata,
            &mut self.outputs.graph,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }

    /// Write this config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }
}
