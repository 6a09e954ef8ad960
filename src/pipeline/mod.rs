//! Build Pipeline
//!
//! One stage per module, leaf-first:
//! - `include`: flatten the root document
//! - `extract`: locate diagram blocks
//! - `compile`: diagram block to SVG via latex + dvisvgm
//! - `assemble`: composite source to HTML via pandoc
//! - `postprocess`: idempotent HTML fixes and payload inlining
//! - `janitor`: intermediate artifact removal
//! - `orchestrator`: unit discovery, filtering and scheduling
//!
//! External processes go through [`tool::ToolRunner`].

pub mod assemble;
pub mod assets;
pub mod compile;
pub mod extract;
pub mod include;
pub mod janitor;
pub mod orchestrator;
pub mod postprocess;
pub mod preflight;
pub mod tool;

pub use assemble::{DocumentAssembler, page_title};
pub use assets::{AssetResolver, AssetSource};
pub use compile::{Compilation, DiagramCompiler};
pub use extract::DiagramExtractor;
pub use include::{IncludeExpander, SourceTree};
pub use janitor::{ArtifactJanitor, JanitorReport};
pub use orchestrator::{BuildOrchestrator, BuildReport, CleanReport, Selection, UnitOutcome};
pub use postprocess::{HtmlPostProcessor, PostProcessSummary};
pub use preflight::{CheckResult, PreflightCheck, PreflightResult};
pub use tool::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
