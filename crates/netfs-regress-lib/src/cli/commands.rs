use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::capability::Capability;
use crate::config::SuiteConfig;

/// netfs-regress - Regression tests for network filesystem clients
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Configuration file (default: ~/.config/netfs-regress/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the suite
    ///
    /// Creates a fresh working directory under the base directory, runs every
    /// selected case in order and removes the directory again.
    Run {
        /// Parent of the working directory, normally a path on the mount under test
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,

        /// Name of the working directory (default: cifstests)
        #[arg(long, value_name = "NAME")]
        suite_dir: Option<String>,

        /// Skip cases depending on this capability
        #[arg(long, value_enum, value_name = "CAPABILITY")]
        disable: Vec<Capability>,

        /// Only run cases whose name contains one of these substrings
        #[arg(value_name = "FILTER")]
        filters: Vec<String>,
    },

    /// List every case with its required capabilities
    List,
}

impl Commands {
    /// Fold command line overrides into a loaded configuration
    pub fn apply_overrides(&self, config: &mut SuiteConfig) {
        if let Commands::Run {
            base_dir,
            suite_dir,
            disable,
            ..
        } = self
        {
            if let Some(dir) = base_dir {
                config.base_dir = Some(dir.clone());
            }
            if let Some(name) = suite_dir {
                config.suite_dir = name.clone();
            }
            for cap in disable {
                if !config.disable.contains(cap) {
                    config.disable.push(*cap);
                }
            }
        }
    }
}
