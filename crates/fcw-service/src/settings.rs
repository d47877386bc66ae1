//! Configuration loading
//!
//! Format follows the file extension (yaml, toml, json). The algorithm
//! config can be overridden from the environment with the `FCW__` prefix,
//! e.g. `FCW__FCW__SAFETY_RADIUS=40`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use fcw_core::{CameraConfig, FcwConfig};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const ENV_PREFIX: &str = "FCW";

fn environment(vars: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(vars.map(|v| v.into_iter().collect()))
}

/// Load the algorithm config, with overrides from `vars` (process environment when `None`)
pub fn load_fcw_config_with(path: &Path, vars: Option<HashMap<String, String>>) -> Result<FcwConfig> {
    let config: FcwConfig = Config::builder()
        .add_source(File::from(path))
        .add_source(environment(vars))
        .build()
        .with_context(|| format!("Failed to read config {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Invalid config {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config {}", path.display()))?;
    info!("Loaded FCW config from {}", path.display());
    Ok(config)
}

pub fn load_fcw_config(path: &Path) -> Result<FcwConfig> {
    load_fcw_config_with(path, None)
}

pub fn load_camera_config(path: &Path) -> Result<CameraConfig> {
    let camera: CameraConfig = Config::builder()
        .add_source(File::from(path))
        .build()
        .with_context(|| format!("Failed to read camera config {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Invalid camera config {}", path.display()))?;
    info!("Loaded camera config from {}", path.display());
    Ok(camera)
}
