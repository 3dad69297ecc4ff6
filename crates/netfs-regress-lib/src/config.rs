//! Suite configuration
//!
//! Settings come from an optional TOML file; every field has a default so an
//! empty file (or no file at all) describes the stock run.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::debug;
use serde::Deserialize;

use crate::capability::Capability;
use crate::error::HarnessError;

/// Default name of the per-run working directory
pub const DEFAULT_SUITE_DIR: &str = "cifstests";

/// Default number of numbered directories in the cache-consistency case
pub const DEFAULT_CACHE_ENTRIES: u32 = 23;

/// Digest used by the checksum-stability case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    #[default]
    Md5,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Parent of the working directory, normally a path on the mount under test
    pub base_dir: Option<PathBuf>,
    /// Name of the working directory created under `base_dir`
    pub suite_dir: String,
    /// Directory the checksum case moves into before reading by absolute path
    pub scratch_dir: PathBuf,
    /// Number of numbered directories created by the cache case
    pub cache_entries: u32,
    pub digest: DigestKind,
    /// Capabilities forced off for this run
    pub disable: Vec<Capability>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            suite_dir: DEFAULT_SUITE_DIR.to_string(),
            scratch_dir: std::env::temp_dir(),
            cache_entries: DEFAULT_CACHE_ENTRIES,
            digest: DigestKind::default(),
            disable: Vec::new(),
        }
    }
}

impl SuiteConfig {
    /// Location of the per-user configuration file
    ///
    /// Default location: `~/.config/netfs-regress/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("netfs-regress").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|source| HarnessError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit file if given, else the per-user file if it exists,
    /// else the defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, HarnessError> {
        if let Some(path) = explicit {
            debug!("Loading configuration from {:?}", path);
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!("Loading configuration from {:?}", path);
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Absolute path of the working directory for this run
    pub fn working_dir(&self) -> std::io::Result<PathBuf> {
        let base = match &self.base_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => std::env::current_dir()?.join(dir),
            None => std::env::current_dir()?,
        };
        Ok(base.join(&self.suite_dir))
    }
}
