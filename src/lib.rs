//! SlidePress - LaTeX Lecture Notes to Self-Contained HTML
//!
//! Turns a directory of LaTeX lecture units into standalone web pages.
//! Each unit is flattened, its TikZ diagrams are compiled to SVG, the
//! document is converted with pandoc and the resulting page is finished with
//! a sidebar table of contents, inlined styles, script and diagrams.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use slidepress::{BuildOrchestrator, ConfigLoader, ProcessRunner};
//!
//! let config = ConfigLoader::load()?;
//! let runner = Arc::new(ProcessRunner::new(Duration::from_secs(config.tools.timeout_secs)));
//! let report = BuildOrchestrator::new(config, runner).run(None).await?;
//! for outcome in report.failed() {
//!     eprintln!("{}: {:?}", outcome.name, outcome.error);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: build stages, tool invocation and orchestration
//! - [`config`]: layered configuration
//! - [`types`]: units, diagram blocks and the error type
//! - [`cli`]: command handlers and terminal output

pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{Result, ResultExt, SlideError, ToolFailure};

// Domain
pub use types::{BuildUnit, DiagramBlock, UnitState};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    BuildOrchestrator, BuildReport, HtmlPostProcessor, IncludeExpander, ProcessRunner, ToolRunner,
    UnitOutcome,
};
