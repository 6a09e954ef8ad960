//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/slidepress/config.toml)
//! 3. Project config (./slidepress.toml)
//! 4. Environment variables (SLIDEPRESS_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::{ConfigLoader, PROJECT_CONFIG_FILE};
pub use types::*;
