//! Diagram block extraction.

use regex::Regex;
use std::sync::LazyLock;

use tracing::info;

use crate::constants::diagram::{BEGIN_MARKER, END_MARKER};
use crate::types::DiagramBlock;

// Lazy match: the first end marker closes the block
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s){}.*?{}",
        regex::escape(BEGIN_MARKER),
        regex::escape(END_MARKER)
    ))
    .expect("valid diagram block pattern")
});

pub struct DiagramExtractor;

impl DiagramExtractor {
    /// Find every diagram block, numbered from 1 in scan order
    pub fn extract(source: &str) -> Vec<DiagramBlock> {
        let blocks: Vec<DiagramBlock> = BLOCK_RE
            .find_iter(source)
            .enumerate()
            .map(|(i, m)| DiagramBlock::new(i + 1, m.as_str(), m.range()))
            .collect();

        if blocks.is_empty() {
            info!("No diagram blocks found");
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_order() {
        let source = "intro\n\\begin{tikzpicture}\\node{A};\\end{tikzpicture}\nmid\n\\begin{tikzpicture}[scale=2]\n\\draw (0,0) -- (1,1);\n\\end{tikzpicture}\n";
        let blocks = DiagramExtractor::extract(source);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].ordinal, 1);
        assert_eq!(blocks[1].ordinal, 2);
        assert!(blocks[0].content.contains("\\node{A};"));
        assert!(blocks[1].content.starts_with("\\begin{tikzpicture}[scale=2]"));
        assert!(blocks[1].content.ends_with("\\end{tikzpicture}"));
        for block in &blocks {
            assert_eq!(&source[block.span.clone()], block.content);
        }
    }

    #[test]
    fn test_first_end_marker_closes_block() {
        let source = "\\begin{tikzpicture}a\\begin{tikzpicture}b\\end{tikzpicture}c\\end{tikzpicture}";
        let blocks = DiagramExtractor::extract(source);

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].content,
            "\\begin{tikzpicture}a\\begin{tikzpicture}b\\end{tikzpicture}"
        );
    }

    #[test]
    fn test_no_blocks() {
        assert!(DiagramExtractor::extract("plain text, no figures").is_empty());
        assert!(DiagramExtractor::extract("\\begin{tikzpicture} unterminated").is_empty());
    }
}
