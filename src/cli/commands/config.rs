//! Config Command
//!
//! Manage SlidePress configuration.
//!
//! Usage:
//!   slidepress config show [-f toml|json]
//!   slidepress config path
//!   slidepress config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::{Result, SlideError};

/// Print the effective configuration
pub fn show(config: &Config, format: &str) -> Result<()> {
    let as_json = match format {
        "json" => true,
        "toml" | "text" => false,
        other => {
            return Err(SlideError::Config(format!(
                "Unknown format '{}'. Valid values: toml, json",
                other
            )));
        }
    };
    println!("{}", ConfigLoader::render(config, as_json)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a config template (project by default, global with `-g`)
pub fn init(global: bool, force: bool, out: &Output) -> Result<()> {
    let existed = if global {
        ConfigLoader::global_config_path().is_some_and(|p| p.exists())
    } else {
        ConfigLoader::project_config_path().exists()
    };

    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    if existed && !force {
        out.info(&format!(
            "Config already exists: {} (use --force to overwrite)",
            path.display()
        ));
    } else {
        out.success(&format!("Initialized configuration: {}", path.display()));
    }
    Ok(())
}
