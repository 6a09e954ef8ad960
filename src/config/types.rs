//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/slidepress/) and project (./slidepress.toml) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{diagram, layout, pandoc, tools};
use crate::types::{Result, SlideError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Unit discovery and scheduling
    pub build: BuildConfig,

    /// Diagram compilation settings
    pub diagram: DiagramConfig,

    /// External tool locations and limits
    pub tools: ToolsConfig,

    /// Document converter options
    pub pandoc: PandocConfig,

    /// Shared stylesheet/script payloads
    pub assets: AssetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            build: BuildConfig::default(),
            diagram: DiagramConfig::default(),
            tools: ToolsConfig::default(),
            pandoc: PandocConfig::default(),
            assets: AssetsConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `SlideError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.build.jobs == 0 {
            return Err(SlideError::Config(
                "build.jobs must be greater than 0".to_string(),
            ));
        }

        if self.diagram.jobs == 0 {
            return Err(SlideError::Config(
                "diagram.jobs must be greater than 0".to_string(),
            ));
        }

        if self.tools.timeout_secs == 0 {
            return Err(SlideError::Config(
                "tools.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(1..=pandoc::MAX_TOC_DEPTH).contains(&self.pandoc.toc_depth) {
            return Err(SlideError::Config(format!(
                "pandoc.toc_depth must be between 1 and {}, got {}",
                pandoc::MAX_TOC_DEPTH,
                self.pandoc.toc_depth
            )));
        }

        for (key, value) in [
            ("tools.latex", &self.tools.latex),
            ("tools.dvisvgm", &self.tools.dvisvgm),
            ("tools.pandoc", &self.tools.pandoc),
            ("diagram.font_format", &self.diagram.font_format),
            ("build.root_document", &self.build.root_document),
            ("build.output", &self.build.output),
            ("build.image_dir", &self.build.image_dir),
        ] {
            if value.trim().is_empty() {
                return Err(SlideError::Config(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Build Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory whose immediate sub-directories are units
    pub root: PathBuf,

    /// Root document file name inside each unit
    pub root_document: String,

    /// Generated page file name
    pub output: String,

    /// Bibliography file name (used only when present)
    pub bibliography: String,

    /// Diagram artifact sub-directory
    pub image_dir: String,

    /// Units built concurrently (1 = sequential)
    pub jobs: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(layout::DEFAULT_ROOT),
            root_document: layout::ROOT_DOCUMENT.to_string(),
            output: layout::OUTPUT_HTML.to_string(),
            bibliography: layout::BIBLIOGRAPHY.to_string(),
            image_dir: layout::IMAGE_DIR.to_string(),
            jobs: 1,
        }
    }
}

// =============================================================================
// Diagram Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// TikZ libraries loaded by the standalone template
    pub tikz_libraries: Vec<String>,

    /// Extra `\usepackage` arguments, e.g. `"{mathtools}"` or `"[all]{xy}"`
    pub extra_packages: Vec<String>,

    /// Font format embedded into SVGs so text stays selectable
    pub font_format: String,

    /// Skip recompiling blocks whose SVG fingerprint still matches
    pub reuse_unchanged: bool,

    /// Blocks of one unit compiled concurrently
    pub jobs: usize,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            tikz_libraries: diagram::DEFAULT_TIKZ_LIBRARIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_packages: Vec::new(),
            font_format: diagram::DEFAULT_FONT_FORMAT.to_string(),
            reuse_unchanged: true,
            jobs: 1,
        }
    }
}

// =============================================================================
// Tools Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Typesetting compiler producing DVI output
    pub latex: String,

    /// DVI to SVG converter
    pub dvisvgm: String,

    /// Document converter
    pub pandoc: String,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            latex: tools::LATEX.to_string(),
            dvisvgm: tools::DVISVGM.to_string(),
            pandoc: tools::PANDOC.to_string(),
            timeout_secs: tools::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Pandoc Configuration
// =============================================================================

/// Math rendering engine requested from the document converter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MathEngine {
    #[default]
    Katex,
    Mathjax,
}

impl MathEngine {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Katex => "--katex",
            Self::Mathjax => "--mathjax",
        }
    }
}

impl std::fmt::Display for MathEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MathEngine::Katex => write!(f, "katex"),
            MathEngine::Mathjax => write!(f, "mathjax"),
        }
    }
}

impl std::str::FromStr for MathEngine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "katex" => Ok(MathEngine::Katex),
            "mathjax" => Ok(MathEngine::Mathjax),
            _ => Err(format!(
                "Unknown math engine: {}. Valid values: katex, mathjax",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PandocConfig {
    /// Number sections in the output
    pub number_sections: bool,

    /// Depth of the generated table of contents
    pub toc_depth: u8,

    pub math: MathEngine,

    /// Lua filter path; the built-in theorem-id filter is used when unset
    pub lua_filter: Option<PathBuf>,

    /// Additional arguments appended verbatim
    pub extra_args: Vec<String>,
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            number_sections: true,
            toc_depth: pandoc::DEFAULT_TOC_DEPTH,
            math: MathEngine::default(),
            lua_filter: None,
            extra_args: Vec::new(),
        }
    }
}

// =============================================================================
// Assets Configuration
// =============================================================================

/// Fallback payloads used when a unit has no local override.
/// Unset paths fall back to the defaults compiled into the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub default_stylesheet: Option<PathBuf>,
    pub default_script: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.build.root, PathBuf::from("slides"));
        assert_eq!(config.build.root_document, "main.tex");
        assert_eq!(config.pandoc.toc_depth, 3);
        assert_eq!(config.diagram.font_format, "woff2");
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let mut config = Config::default();
        config.build.jobs = 0;
        assert!(matches!(config.validate(), Err(SlideError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_toc_depth() {
        let mut config = Config::default();
        config.pandoc.toc_depth = 9;
        assert!(config.validate().is_err());
        config.pandoc.toc_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_tool() {
        let mut config = Config::default();
        config.tools.pandoc = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tools.pandoc"));
    }

    #[test]
    fn test_math_engine_parse() {
        assert_eq!("KaTeX".parse::<MathEngine>().unwrap(), MathEngine::Katex);
        assert_eq!("mathjax".parse::<MathEngine>().unwrap(), MathEngine::Mathjax);
        assert!("mathml".parse::<MathEngine>().is_err());
        assert_eq!(MathEngine::Mathjax.flag(), "--mathjax");
    }
}
