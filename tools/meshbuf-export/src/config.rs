//! Codec configuration file loading

use anyhow::{Context, Result};
use meshbuf_common::CodecConfig;
use std::path::Path;

/// Load codec settings from a TOML file, or defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: CodecConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {:?}", path))?;

    tracing::debug!("Loaded codec config from {:?}: {:?}", path, config);
    Ok(config)
}
