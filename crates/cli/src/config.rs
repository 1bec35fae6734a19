//! TOML configuration for the CLI.
//!
//! ```toml
//! [resolver]
//! aliases = [["kunde", "customer"], ["ort", "city"]]
//!
//! [preview]
//! max_rows = 500
//! ```
//!
//! Config aliases extend (never override) the engine's built-in
//! dictionary; `max_rows` caps preview output after execution.

use crate::CliError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub aliases: Vec<(String, String)>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewConfig {
    pub max_rows: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| CliError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
