// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads a TOML file, deserializes it into `Config` and validates the
//! `[recorder]` table before anything is started.

use crate::config::model::{Config, ConfigError};
use std::{fs, path::Path};

/// Load, parse and validate the configuration at `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    log::debug!("Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg = parse(&txt)?;
    log::info!("Loaded config from {:?}", path);
    Ok(cfg)
}

/// Parse and validate configuration from TOML text.
pub fn parse(txt: &str) -> Result<Config, ConfigError> {
    let cfg: Config = toml::from_str(txt)?;
    cfg.recorder.validate()?;
    Ok(cfg)
}
