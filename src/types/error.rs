//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Classifies failures so the orchestrator can decide whether a condition
//! only warrants a warning or ends the enclosing unit.
//!
//! ## Error Kinds
//!
//! - **MissingUnit**: root or requested unit not found (warn, fatal for root)
//! - **IncludeResolution**: referenced sub-file missing (warn, continue)
//! - **ExternalTool**: latex/dvisvgm/pandoc failed (unit fails)
//! - **PostProcess**: generated HTML unusable (unit fails)

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::constants::tools::MAX_DIAGNOSTIC_CHARS;

// =============================================================================
// External Tool Failure
// =============================================================================

/// How an external tool invocation ended unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// Process ran and exited with a non-zero code (None when killed by signal)
    ExitStatus(Option<i32>),
    /// Process could not be started
    Spawn(String),
    /// Process exceeded its time budget and was killed
    Timeout(Duration),
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitStatus(Some(code)) => write!(f, "exited with code {}", code),
            Self::ExitStatus(None) => write!(f, "terminated by signal"),
            Self::Spawn(reason) => write!(f, "could not be started ({})", reason),
            Self::Timeout(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum SlideError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    // -------------------------------------------------------------------------
    // Build Errors
    // -------------------------------------------------------------------------
    /// Root directory or requested unit does not exist
    #[error("Unit not found: {}", .path.display())]
    MissingUnit { path: PathBuf },

    /// A referenced sub-file could not be resolved
    #[error("Included file not found: {} (referenced from {})", .missing.display(), .from.display())]
    IncludeResolution { missing: PathBuf, from: PathBuf },

    /// External tool exited unsuccessfully
    #[error("{tool} {failure}\n{}", diagnostic_text(.stderr, .stdout))]
    ExternalTool {
        tool: String,
        failure: ToolFailure,
        stderr: String,
        stdout: String,
    },

    /// Generated HTML could not be processed
    #[error("Post-processing failed for {}: {message}", .path.display())]
    PostProcess { path: PathBuf, message: String },

    /// Unit pipeline attempted an out-of-order transition
    #[error("Illegal lifecycle transition for unit '{unit}': {from} -> {to}")]
    Lifecycle {
        unit: String,
        from: &'static str,
        to: &'static str,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SlideError>;

/// Pick the most useful captured stream, keeping only its tail
fn diagnostic_text(stderr: &str, stdout: &str) -> String {
    let text = if !stderr.trim().is_empty() {
        stderr.trim()
    } else if !stdout.trim().is_empty() {
        stdout.trim()
    } else {
        return "(no output)".to_string();
    };

    let count = text.chars().count();
    if count <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect();
    format!("…{}", tail)
}

// =============================================================================
// Helper Functions
// =============================================================================

impl SlideError {
    /// Create an external tool error from captured process output
    pub fn external_tool(
        tool: impl Into<String>,
        failure: ToolFailure,
        stderr: impl Into<String>,
        stdout: impl Into<String>,
    ) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            failure,
            stderr: stderr.into(),
            stdout: stdout.into(),
        }
    }

    /// Create a post-processing error
    pub fn post_process(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PostProcess {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Captured tool output worth showing to the user, if any
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::ExternalTool { stderr, stdout, .. } => Some(diagnostic_text(stderr, stdout)),
            _ => None,
        }
    }

    /// Whether this error ends the enclosing unit's pipeline.
    ///
    /// Missing includes are recorded and skipped; missing units are skipped
    /// by the orchestrator (only a missing root aborts the whole run).
    pub fn is_unit_fatal(&self) -> bool {
        !matches!(
            self,
            Self::IncludeResolution { .. } | Self::MissingUnit { .. }
        )
    }

    /// Short label used in summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) | Self::Toml(_) => "serialization",
            Self::MissingUnit { .. } => "missing-unit",
            Self::IncludeResolution { .. } => "include",
            Self::ExternalTool { .. } => "external-tool",
            Self::PostProcess { .. } => "post-process",
            Self::Lifecycle { .. } => "lifecycle",
            Self::Config(_) => "config",
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Attach the path being operated on to an IO error
    fn with_path(self, path: &std::path::Path) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| {
            SlideError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_display() {
        assert_eq!(ToolFailure::ExitStatus(Some(1)).to_string(), "exited with code 1");
        assert_eq!(ToolFailure::ExitStatus(None).to_string(), "terminated by signal");
        assert!(
            ToolFailure::Timeout(Duration::from_secs(5))
                .to_string()
                .contains("5s")
        );
    }

    #[test]
    fn test_external_tool_prefers_stderr() {
        let err = SlideError::external_tool(
            "latex",
            ToolFailure::ExitStatus(Some(1)),
            "! Undefined control sequence.",
            "This is pdfTeX",
        );
        assert_eq!(
            err.diagnostic().as_deref(),
            Some("! Undefined control sequence.")
        );
        assert!(err.to_string().starts_with("latex exited with code 1"));
    }

    #[test]
    fn test_external_tool_falls_back_to_stdout() {
        let err = SlideError::external_tool(
            "pandoc",
            ToolFailure::ExitStatus(Some(64)),
            "  ",
            "Could not find data file",
        );
        assert_eq!(err.diagnostic().as_deref(), Some("Could not find data file"));

        let silent = SlideError::external_tool("dvisvgm", ToolFailure::ExitStatus(Some(1)), "", "");
        assert_eq!(silent.diagnostic().as_deref(), Some("(no output)"));
    }

    #[test]
    fn test_diagnostic_keeps_tail() {
        let long = format!("{}END", "x".repeat(MAX_DIAGNOSTIC_CHARS * 2));
        let text = diagnostic_text(&long, "");
        assert!(text.ends_with("END"));
        assert!(text.chars().count() <= MAX_DIAGNOSTIC_CHARS + 1);
    }

    #[test]
    fn test_fatality_classification() {
        let include = SlideError::IncludeResolution {
            missing: PathBuf::from("a.tex"),
            from: PathBuf::from("main.tex"),
        };
        assert!(!include.is_unit_fatal());

        let missing = SlideError::MissingUnit {
            path: PathBuf::from("slides/none"),
        };
        assert!(!missing.is_unit_fatal());

        let tool = SlideError::external_tool("latex", ToolFailure::ExitStatus(Some(1)), "", "");
        assert!(tool.is_unit_fatal());
        assert_eq!(tool.kind(), "external-tool");

        let post = SlideError::post_process("index.html", "no </head>");
        assert!(post.is_unit_fatal());
    }

    #[test]
    fn test_with_path_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = result.with_path(std::path::Path::new("x/main.tex")).unwrap_err();
        assert!(err.to_string().contains("x/main.tex"));
    }
}
