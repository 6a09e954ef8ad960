//! Build unit model and lifecycle.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{Result, SlideError};
use crate::config::BuildConfig;
use crate::constants::html::{SCRIPT_NAME, STYLESHEET_NAME};
use crate::constants::layout::TEMP_SOURCE_SUFFIX;

/// Lifecycle of one unit within a build run.
///
/// Units move strictly forward through the success states; `Failed` can be
/// entered from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    Discovered,
    IncludesExpanded,
    DiagramsCompiled,
    Assembled,
    PostProcessed,
    CleanedUp,
    Failed,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::IncludesExpanded => "includes-expanded",
            Self::DiagramsCompiled => "diagrams-compiled",
            Self::Assembled => "assembled",
            Self::PostProcessed => "post-processed",
            Self::CleanedUp => "cleaned-up",
            Self::Failed => "failed",
        }
    }

    /// The only success state reachable from this one
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Discovered => Some(Self::IncludesExpanded),
            Self::IncludesExpanded => Some(Self::DiagramsCompiled),
            Self::DiagramsCompiled => Some(Self::Assembled),
            Self::Assembled => Some(Self::PostProcessed),
            Self::PostProcessed => Some(Self::CleanedUp),
            Self::CleanedUp | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CleanedUp | Self::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently buildable source directory
#[derive(Debug, Clone)]
pub struct BuildUnit {
    /// Directory name, used for filtering and the page title
    pub name: String,
    /// Unit directory
    pub dir: PathBuf,
    /// Root source document
    pub root_document: PathBuf,
    /// Bibliography, when one exists next to the root document
    pub bibliography: Option<PathBuf>,
    /// Unit-local stylesheet override
    pub stylesheet_override: Option<PathBuf>,
    /// Unit-local script override
    pub script_override: Option<PathBuf>,
    /// Generated page
    pub output_html: PathBuf,
    /// Diagram artifact directory
    pub image_dir: PathBuf,
    state: UnitState,
}

impl BuildUnit {
    /// Inspect `dir` and build a unit if it contains the root document
    pub fn discover(dir: &Path, layout: &BuildConfig) -> Option<Self> {
        let root_document = dir.join(&layout.root_document);
        if !root_document.is_file() {
            return None;
        }

        let name = dir.file_name()?.to_string_lossy().to_string();
        let existing = |file: &str| {
            let path = dir.join(file);
            path.is_file().then_some(path)
        };

        Some(Self {
            name,
            dir: dir.to_path_buf(),
            root_document,
            bibliography: existing(&layout.bibliography),
            stylesheet_override: existing(STYLESHEET_NAME),
            script_override: existing(SCRIPT_NAME),
            output_html: dir.join(&layout.output),
            image_dir: dir.join(&layout.image_dir),
            state: UnitState::Discovered,
        })
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Path of the temporary composite source handed to the document converter
    pub fn temp_source(&self) -> PathBuf {
        let stem = self
            .root_document
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());
        self.dir.join(format!("{}{}", stem, TEMP_SOURCE_SUFFIX))
    }

    /// Move to `to`, which must be the direct successor of the current state
    pub fn advance(&mut self, to: UnitState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(SlideError::Lifecycle {
                unit: self.name.clone(),
                from: self.state.as_str(),
                to: to.as_str(),
            });
        }
        debug!("[{}] {} -> {}", self.name, self.state, to);
        self.state = to;
        Ok(())
    }

    /// Enter the failed state from any non-terminal state
    pub fn fail(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(SlideError::Lifecycle {
                unit: self.name.clone(),
                from: self.state.as_str(),
                to: UnitState::Failed.as_str(),
            });
        }
        debug!("[{}] {} -> failed", self.name, self.state);
        self.state = UnitState::Failed;
        Ok(())
    }
}
