pub mod diagram;
pub mod error;
pub mod unit;

pub use diagram::{ArtifactKind, CompileStatus, DiagramBlock, artifact_stem};
pub use error::{Result, ResultExt, SlideError, ToolFailure};
pub use unit::{BuildUnit, UnitState};
