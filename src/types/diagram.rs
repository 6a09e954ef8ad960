//! Diagram block and artifact types.

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::constants::diagram::{ARTIFACT_PREFIX, FINAL_EXTENSION};

/// Compile status of a single diagram block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileStatus {
    #[default]
    Pending,
    /// Both tools ran and produced the final artifact
    Compiled,
    /// The existing artifact matched the block's fingerprint
    Reused,
    Failed,
}

impl CompileStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Compiled | Self::Reused)
    }
}

/// An embedded diagram region of the flattened source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// 1-based position in scan order
    pub ordinal: usize,
    /// Raw block text, markers included
    pub content: String,
    /// Byte range of the block in the flattened source
    pub span: Range<usize>,
    pub status: CompileStatus,
}

impl DiagramBlock {
    pub fn new(ordinal: usize, content: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            ordinal,
            content: content.into(),
            span,
            status: CompileStatus::Pending,
        }
    }

    /// File stem shared by every artifact of this block (`tikz-3`)
    pub fn stem(&self) -> String {
        artifact_stem(self.ordinal)
    }

    /// Final artifact path inside `image_dir`
    pub fn artifact_path(&self, image_dir: &Path) -> PathBuf {
        image_dir.join(format!("{}.{}", self.stem(), FINAL_EXTENSION))
    }

    /// Reference used by the assembled source and the generated HTML
    pub fn artifact_reference(&self, image_dir_name: &str) -> String {
        format!("{}/{}.{}", image_dir_name, self.stem(), FINAL_EXTENSION)
    }
}

pub fn artifact_stem(ordinal: usize) -> String {
    format!("{}-{}", ARTIFACT_PREFIX, ordinal)
}

/// Retention class of a file found in an image directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Byproduct of compilation (`.tex`, `.dvi`, `.log`, `.aux`, ...)
    Intermediate,
    /// Compiled vector graphic kept across runs
    Final,
}

impl ArtifactKind {
    /// Classify a file name; `None` for files not produced by the compiler
    pub fn classify(file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(ARTIFACT_PREFIX)?.strip_prefix('-')?;
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || !rest[digits..].starts_with('.') {
            return None;
        }

        if file_name.ends_with(&format!(".{}", FINAL_EXTENSION)) {
            Some(Self::Final)
        } else {
            Some(Self::Intermediate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_naming() {
        let block = DiagramBlock::new(2, r"\begin{tikzpicture}\end{tikzpicture}", 0..10);
        assert_eq!(block.stem(), "tikz-2");
        assert_eq!(
            block.artifact_path(Path::new("/u/images")),
            PathBuf::from("/u/images/tikz-2.svg")
        );
        assert_eq!(block.artifact_reference("images"), "images/tikz-2.svg");
        assert_eq!(block.status, CompileStatus::Pending);
    }

    #[test]
    fn test_classify_artifacts() {
        assert_eq!(ArtifactKind::classify("tikz-1.svg"), Some(ArtifactKind::Final));
        assert_eq!(
            ArtifactKind::classify("tikz-12.dvi"),
            Some(ArtifactKind::Intermediate)
        );
        assert_eq!(
            ArtifactKind::classify("tikz-3.tex"),
            Some(ArtifactKind::Intermediate)
        );
        assert_eq!(
            ArtifactKind::classify("tikz-3.log"),
            Some(ArtifactKind::Intermediate)
        );
        assert_eq!(ArtifactKind::classify("photo.png"), None);
        assert_eq!(ArtifactKind::classify("tikz-.tex"), None);
        assert_eq!(ArtifactKind::classify("tikz-a.tex"), None);
        assert_eq!(ArtifactKind::classify("tikz_1.tex"), None);
        assert_eq!(ArtifactKind::classify("tikz-1"), None);
    }

    #[test]
    fn test_status_success() {
        assert!(CompileStatus::Compiled.is_success());
        assert!(CompileStatus::Reused.is_success());
        assert!(!CompileStatus::Pending.is_success());
        assert!(!CompileStatus::Failed.is_success());
    }
}
