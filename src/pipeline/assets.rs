//! Stylesheet, script and filter payloads.
//!
//! Lookup order for each payload: unit-local file, then the configured
//! default path, then the copy compiled into the binary.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::AssetsConfig;
use crate::types::{BuildUnit, Result, ResultExt};

pub const BUILTIN_STYLESHEET: &str = include_str!("../../assets/styles.css");
pub const BUILTIN_SCRIPT: &str = include_str!("../../assets/index.js");
pub const BUILTIN_LUA_FILTER: &str = include_str!("../../assets/theorem_ids.lua");

/// Where a payload came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    UnitLocal(PathBuf),
    Configured(PathBuf),
    BuiltIn,
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnitLocal(path) => write!(f, "unit ({})", path.display()),
            Self::Configured(path) => write!(f, "configured ({})", path.display()),
            Self::BuiltIn => write!(f, "built-in"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Payload {
    pub source: AssetSource,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    default_stylesheet: Option<PathBuf>,
    default_script: Option<PathBuf>,
}

impl AssetResolver {
    pub fn from_config(config: &AssetsConfig) -> Self {
        Self {
            default_stylesheet: config.default_stylesheet.clone(),
            default_script: config.default_script.clone(),
        }
    }

    pub fn stylesheet(&self, unit: &BuildUnit) -> Result<Payload> {
        resolve(
            unit.stylesheet_override.as_deref(),
            self.default_stylesheet.as_deref(),
            BUILTIN_STYLESHEET,
        )
    }

    pub fn script(&self, unit: &BuildUnit) -> Result<Payload> {
        resolve(
            unit.script_override.as_deref(),
            self.default_script.as_deref(),
            BUILTIN_SCRIPT,
        )
    }
}

/// A unit-local file that exists but cannot be read is an error; an
/// unreadable configured default only falls back to the built-in copy.
fn resolve(local: Option<&Path>, configured: Option<&Path>, builtin: &str) -> Result<Payload> {
    if let Some(path) = local {
        let text = fs::read_to_string(path).with_path(path)?;
        debug!("Using unit asset {}", path.display());
        return Ok(Payload {
            source: AssetSource::UnitLocal(path.to_path_buf()),
            text,
        });
    }

    if let Some(path) = configured {
        match fs::read_to_string(path) {
            Ok(text) => {
                return Ok(Payload {
                    source: AssetSource::Configured(path.to_path_buf()),
                    text,
                });
            }
            Err(e) => warn!(
                "Configured asset {} unreadable ({}), using built-in default",
                path.display(),
                e
            ),
        }
    }

    Ok(Payload {
        source: AssetSource::BuiltIn,
        text: builtin.to_string(),
    })
}
