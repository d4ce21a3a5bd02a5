//! Configuration lookup and wiring
//!
//! `--config` wins; otherwise `./nixkit.yaml`, then the user config
//! directory, then built-in defaults. Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use nixkit_codegen::{BuilderSettings, Compiler, ModuleResolver, Orchestrator};
use nixkit_core::Config;
use nixkit_core::config::CONFIG_FILE;

/// Load the configuration the way the command line asks for
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()));
    }

    let candidates = candidates();
    tracing::debug!("Looking for configuration in {:?}", candidates);
    Config::discover(&candidates).context("Failed to load configuration")
}

/// Implicit configuration locations, most specific first
fn candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dirs) = ProjectDirs::from("dev", "nixkit", "nixkit") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE));
    }
    candidates
}

/// Builder settings from the configuration, with `nix_build` overriding
/// the configured executable
pub fn builder_settings(config: &Config, nix_build: Option<String>) -> BuilderSettings {
    BuilderSettings {
        program: nix_build.unwrap_or_else(|| config.nix_build.clone()),
        temp_dir: config.temp_dir.clone(),
        timeout: config.timeout_secs.map(Duration::from_secs),
        forward_output: true,
    }
}

/// Orchestrator for the current working directory
pub fn orchestrator(config: &Config, nix_build: Option<String>) -> Result<Orchestrator> {
    let resolver =
        ModuleResolver::from_current_dir().context("Failed to determine working directory")?;
    let compiler = Compiler::new(resolver).with_package_set(config.nixpkgs.clone());
    Ok(Orchestrator::new(
        compiler,
        builder_settings(config, nix_build),
    ))
}
