//! Configuration parsing and validation
//!
//! nixkit reads an optional `nixkit.yaml`:
//!
//! ```yaml
//! nix_build: /run/current-system/sw/bin/nix-build
//! nixpkgs: import <nixpkgs> { config.allowUnfree = true; }
//! temp_dir: /tmp/nixkit
//! timeout_secs: 3600
//! format: true
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "nixkit.yaml";

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Builder executable
    #[serde(default = "default_nix_build")]
    pub nix_build: String,

    /// Expression producing the package set recipes are given
    #[serde(default = "default_nixpkgs")]
    pub nixpkgs: String,

    /// Directory for transient expression files (system default if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Kill the builder after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Pretty-print generated expressions by default
    #[serde(default)]
    pub format: bool,
}

fn default_nix_build() -> String {
    "nix-build".to_string()
}

fn default_nixpkgs() -> String {
    "import <nixpkgs> {}".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nix_build: default_nix_build(),
            nixpkgs: default_nixpkgs(),
            temp_dir: None,
            timeout_secs: None,
            format: false,
        }
    }
}

impl Config {
    /// Load configuration from a file that must exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&contents)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the first existing file of `candidates`, or the defaults
    pub fn discover<I, P>(candidates: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for candidate in candidates {
            if candidate.as_ref().is_file() {
                return Self::load(candidate);
            }
        }
        Ok(Self::default())
    }

    /// Parse and validate configuration text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults configuration.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.nix_build.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "nix_build must not be empty".to_string(),
            });
        }
        if self.nixpkgs.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "nixpkgs must not be empty".to_string(),
            });
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::ConfigInvalid {
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
