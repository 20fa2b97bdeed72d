use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_feed_core::ExportConfig;

pub mod channels;
pub mod export;
pub mod ids;

pub const CONFIG_ENV: &str = "CATALOG_FEED_CONFIG";

/// Loads the feed configuration from `--config`, falling back to `CATALOG_FEED_CONFIG`.
pub fn load_config(path: Option<PathBuf>) -> Result<ExportConfig> {
    let path = path
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
        .with_context(|| format!("--config (or {CONFIG_ENV}) must be set"))?;

    ExportConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
