//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/slidepress/config.toml)
//! 3. Project config (./slidepress.toml, or the file given with --config)
//! 4. Environment variables (SLIDEPRESS_* prefix, `__` separates sections)

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, SlideError};

/// Project config file name, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "slidepress.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_with(None)
    }

    /// Same as [`ConfigLoader::load`], with an explicit project config file.
    ///
    /// An explicit file must exist; the implicit `slidepress.toml` is optional.
    pub fn load_with(project_override: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = match project_override {
            Some(path) if !path.exists() => {
                return Err(SlideError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => path.to_path_buf(),
            None => Self::project_config_path(),
        };
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. SLIDEPRESS_TOOLS__PANDOC -> tools.pandoc
        figment = figment.merge(Env::prefixed("SLIDEPRESS_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| SlideError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| SlideError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/slidepress/)
    pub fn global_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("slidepress"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            Ok(toml::to_string_pretty(config)?)
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            SlideError::Config("Cannot determine global config directory".to_string())
        })?;
        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        Self::write_template(&config_path, force)?;
        Ok(config_path)
    }

    /// Initialize project configuration in the working directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let config_path = Self::project_config_path();
        Self::write_template(&config_path, force)?;
        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }

        let body = toml::to_string_pretty(&Config::default())?;
        fs::write(
            path,
            format!(
                "# SlidePress Configuration\n# Every key is optional; omitted keys use the built-in defaults.\n\n{}",
                body
            ),
        )?;
        info!("Created config: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MathEngine;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slidepress.toml");
        fs::write(
            &path,
            "[build]\nroot = \"decks\"\njobs = 4\n\n[pandoc]\nmath = \"mathjax\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.build.root, PathBuf::from("decks"));
        assert_eq!(config.build.jobs, 4);
        assert_eq!(config.pandoc.math, MathEngine::Mathjax);
        assert_eq!(config.build.root_document, "main.tex");
    }

    #[test]
    fn test_load_from_file_validates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[pandoc]\ntoc_depth = 12\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(SlideError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(ConfigLoader::load_with(Some(&missing)).is_err());
    }

    #[test]
    fn test_env_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slidepress.toml");
        fs::write(&path, "").unwrap();

        // SAFETY: This test runs in isolation
        unsafe {
            std::env::set_var("SLIDEPRESS_TOOLS__DVISVGM", "/opt/tex/bin/dvisvgm");
        }
        let config = ConfigLoader::load_with(Some(&path)).unwrap();
        assert_eq!(config.tools.dvisvgm, "/opt/tex/bin/dvisvgm");
        unsafe {
            std::env::remove_var("SLIDEPRESS_TOOLS__DVISVGM");
        }
    }

    #[test]
    fn test_render_round_trips_through_toml() {
        let rendered = ConfigLoader::render(&Config::default(), false).unwrap();
        assert!(rendered.contains("[build]"));
        assert!(rendered.contains("root_document = \"main.tex\""));

        let json = ConfigLoader::render(&Config::default(), true).unwrap();
        assert!(json.contains("\"toc_depth\": 3"));
    }
}
