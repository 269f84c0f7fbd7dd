//! Settings loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::Settings;
use crate::config::validation::validate_settings;
use crate::error::{Error, Result};

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(Error::Validation)?;

    Ok(settings)
}
