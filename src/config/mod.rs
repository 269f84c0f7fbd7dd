//! Settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → Logger::apply_settings (swap settings, rebuild pipeline)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new settings
//!     → channel → apply_updates → Logger::apply_settings
//! ```
//!
//! # Design Decisions
//! - Every field has a default; an empty file yields the built-in behavior
//! - Validation collects every problem, not just the first
//! - A file that fails to load keeps the current settings

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::load_settings;
pub use schema::{Settings, SinkConfig};
pub use watcher::{apply_updates, SettingsWatcher};
