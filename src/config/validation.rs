//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `&Settings → Result<(), Vec<String>>`

use crate::config::schema::Settings;

/// Check semantic constraints serde cannot express.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if settings.sink.max_size_mb == 0 {
        errors.push("sink.max_size_mb must be greater than 0".to_string());
    }
    if settings.sink.max_age_days == 0 {
        errors.push("sink.max_age_days must be greater than 0".to_string());
    }

    for (name, prefix) in [
        ("info_prefix", &settings.info_prefix),
        ("error_prefix", &settings.error_prefix),
    ] {
        if prefix.trim().is_empty() {
            errors.push(format!("{name} must not be empty"));
        } else if prefix.contains(['/', '\\']) {
            errors.push(format!("{name} must not contain path separators"));
        }
    }
    if settings.info_prefix == settings.error_prefix {
        errors.push("info_prefix and error_prefix must differ".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
