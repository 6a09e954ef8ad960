//! Diagram Compilation
//!
//! Each block is wrapped in a standalone document, typeset to DVI and
//! converted to SVG with embedded fonts. Compiled SVGs carry a fingerprint
//! of their inputs so unchanged blocks can skip both tools on the next run.

use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::tool::{ToolInvocation, ToolRunner, run_checked};
use crate::config::{DiagramConfig, ToolsConfig};
use crate::constants::diagram::{BASE_PACKAGES, FINGERPRINT_PREFIX};
use crate::types::{CompileStatus, DiagramBlock, Result, ResultExt, SlideError};

/// Wrap raw block content in a standalone document
pub fn render_standalone(content: &str, settings: &DiagramConfig) -> String {
    let mut doc = String::from("\\documentclass[tikz,border=2pt]{standalone}\n");
    for package in BASE_PACKAGES
        .iter()
        .copied()
        .chain(settings.extra_packages.iter().map(String::as_str))
    {
        doc.push_str(&format!("\\usepackage{}\n", package_argument(package)));
    }
    if !settings.tikz_libraries.is_empty() {
        doc.push_str(&format!(
            "\\usetikzlibrary{{{}}}\n",
            settings.tikz_libraries.join(",")
        ));
    }
    doc.push_str("\\begin{document}\n");
    doc.push_str(content);
    doc.push_str("\n\\end{document}\n");
    doc
}

/// Accept both `mathtools` and `{mathtools}` / `[opt]{pkg}` forms
fn package_argument(package: &str) -> String {
    if package.starts_with('{') || package.starts_with('[') {
        package.to_string()
    } else {
        format!("{{{}}}", package)
    }
}

/// SHA-256 over the wrapped source and the converter flags
pub fn fingerprint(source: &str, converter_flags: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    for flag in converter_flags {
        hasher.update([0u8]);
        hasher.update(flag.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Insert the fingerprint comment after the XML prolog (or at the start)
pub fn stamp(svg: &str, fingerprint: &str) -> String {
    let comment = format!("{}{} -->\n", FINGERPRINT_PREFIX, fingerprint);
    let at = svg
        .starts_with("<?xml")
        .then(|| svg.find("?>").map(|i| i + 2))
        .flatten()
        .map(|end| end + usize::from(svg[end..].starts_with('\n')))
        .unwrap_or(0);

    let mut stamped = String::with_capacity(svg.len() + comment.len());
    stamped.push_str(&svg[..at]);
    if at > 0 && !svg[..at].ends_with('\n') {
        stamped.push('\n');
    }
    stamped.push_str(&comment);
    stamped.push_str(&svg[at..]);
    stamped
}

/// Fingerprint previously stamped into `svg`
pub fn read_stamp(svg: &str) -> Option<&str> {
    let start = svg.find(FINGERPRINT_PREFIX)? + FINGERPRINT_PREFIX.len();
    let len = svg[start..].find(" -->")?;
    Some(&svg[start..start + len])
}

/// Outcome of compiling one unit's blocks
#[derive(Debug, Default)]
pub struct Compilation {
    /// Every block in ordinal order; blocks after a failure stay `Pending`
    pub blocks: Vec<DiagramBlock>,
    /// Error of the block marked `Failed`
    pub error: Option<SlideError>,
}

impl Compilation {
    pub fn failed(&self) -> Option<&DiagramBlock> {
        self.blocks
            .iter()
            .find(|b| b.status == CompileStatus::Failed)
    }

    pub fn reused(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.status == CompileStatus::Reused)
            .count()
    }

    /// Blocks with a usable artifact
    pub fn succeeded(&self) -> usize {
        self.blocks.iter().filter(|b| b.status.is_success()).count()
    }

    /// The compiled blocks, or the error that stopped compilation
    pub fn into_result(self) -> Result<Vec<DiagramBlock>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.blocks),
        }
    }
}

pub struct DiagramCompiler {
    runner: Arc<dyn ToolRunner>,
    tools: ToolsConfig,
    settings: DiagramConfig,
}

impl DiagramCompiler {
    pub fn new(runner: Arc<dyn ToolRunner>, tools: ToolsConfig, settings: DiagramConfig) -> Self {
        Self {
            runner,
            tools,
            settings,
        }
    }

    fn converter_flags(&self) -> Vec<String> {
        vec![
            format!("--font-format={}", self.settings.font_format),
            "--exact".to_string(),
        ]
    }

    /// Compile every block into `image_dir`, stopping at the first failure.
    ///
    /// Up to `diagram.jobs` blocks run at once; results keep ordinal order.
    /// Only setup problems (the image directory) are returned as `Err`; a
    /// failing block is reported through [`Compilation::error`].
    pub async fn compile_all(
        &self,
        blocks: Vec<DiagramBlock>,
        image_dir: &Path,
    ) -> Result<Compilation> {
        if blocks.is_empty() {
            return Ok(Compilation::default());
        }

        tokio::fs::create_dir_all(image_dir)
            .await
            .with_path(image_dir)?;
        let image_dir = std::path::absolute(image_dir).with_path(image_dir)?;

        let mut compilation = Compilation::default();
        {
            let mut attempts = stream::iter(blocks.iter().cloned())
                .map(|block| self.compile_one(block, &image_dir))
                .buffered(self.settings.jobs.max(1));

            // Dropping the stream cancels blocks still in flight
            while let Some((block, result)) = attempts.next().await {
                compilation.blocks.push(block);
                if let Err(e) = result {
                    compilation.error = Some(e);
                    break;
                }
            }
        }
        let done = compilation.blocks.len();
        compilation.blocks.extend(blocks.into_iter().skip(done));

        match compilation.failed() {
            Some(block) => warn!(
                "Diagram {} failed, {} left uncompiled",
                block.ordinal,
                compilation.blocks.len() - done
            ),
            None => info!(
                "Compiled {} diagram(s) ({} reused)",
                compilation.succeeded() - compilation.reused(),
                compilation.reused()
            ),
        }
        Ok(compilation)
    }

    /// Returns the block with its final status alongside the failure, if any
    async fn compile_one(
        &self,
        mut block: DiagramBlock,
        image_dir: &Path,
    ) -> (DiagramBlock, Result<()>) {
        let stem = block.stem();
        let source = render_standalone(&block.content, &self.settings);
        let flags = self.converter_flags();
        let print = fingerprint(&source, &flags);
        let svg_path = block.artifact_path(image_dir);

        if self.settings.reuse_unchanged && self.is_current(&svg_path, &print).await {
            debug!("{} unchanged, reusing {}", stem, svg_path.display());
            block.status = CompileStatus::Reused;
            return (block, Ok(()));
        }

        let tex_path = image_dir.join(format!("{}.tex", stem));
        let dvi_path = image_dir.join(format!("{}.dvi", stem));

        let latex = ToolInvocation::new(format!("latex [{}]", stem), &self.tools.latex)
            .args([
                "-interaction=nonstopmode",
                "-halt-on-error",
                "-output-directory",
            ])
            .arg(image_dir)
            .arg(&tex_path)
            .current_dir(image_dir);

        let dvisvgm = ToolInvocation::new(format!("dvisvgm [{}]", stem), &self.tools.dvisvgm)
            .args(flags)
            .arg(&dvi_path)
            .arg("-o")
            .arg(&svg_path)
            .current_dir(image_dir);

        let result = async {
            tokio::fs::write(&tex_path, &source)
                .await
                .with_path(&tex_path)?;
            run_checked(self.runner.as_ref(), &latex).await?;
            run_checked(self.runner.as_ref(), &dvisvgm).await?;
            Self::stamp_file(&svg_path, &print).await
        }
        .await;

        block.status = match result {
            Ok(()) => CompileStatus::Compiled,
            Err(_) => CompileStatus::Failed,
        };
        (block, result)
    }

    async fn is_current(&self, svg_path: &Path, print: &str) -> bool {
        match tokio::fs::read_to_string(svg_path).await {
            Ok(svg) => read_stamp(&svg) == Some(print),
            Err(_) => false,
        }
    }

    async fn stamp_file(svg_path: &Path, print: &str) -> Result<()> {
        let svg = tokio::fs::read_to_string(svg_path)
            .await
            .with_path(svg_path)?;
        tokio::fs::write(svg_path, stamp(&svg, print))
            .await
            .with_path(svg_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tool::testing::ScriptedRunner;
    use tempfile::TempDir;

    fn block(ordinal: usize, body: &str) -> DiagramBlock {
        let content = format!("\\begin{{tikzpicture}}{}\\end{{tikzpicture}}", body);
        let len = content.len();
        DiagramBlock::new(ordinal, content, 0..len)
    }

    fn compiler(runner: Arc<ScriptedRunner>, settings: DiagramConfig) -> DiagramCompiler {
        DiagramCompiler::new(runner, ToolsConfig::default(), settings)
    }

    #[test]
    fn test_standalone_template() {
        let mut settings = DiagramConfig::default();
        settings.extra_packages = vec!["mathtools".to_string(), "[all]{xy}".to_string()];
        let doc = render_standalone("\\begin{tikzpicture}\\end{tikzpicture}", &settings);

        assert!(doc.starts_with("\\documentclass[tikz,border=2pt]{standalone}\n"));
        assert!(doc.contains("\\usepackage[T1]{fontenc}\n"));
        assert!(doc.contains("\\usepackage{lmodern}\n"));
        assert!(doc.contains("\\usepackage{amsmath}\n"));
        assert!(doc.contains("\\usepackage{mathtools}\n"));
        assert!(doc.contains("\\usepackage[all]{xy}\n"));
        assert!(doc.contains(
            "\\usetikzlibrary{arrows.meta,automata,positioning,calc,decorations.pathmorphing,shapes.geometric}"
        ));
        assert!(doc.ends_with("\\begin{document}\n\\begin{tikzpicture}\\end{tikzpicture}\n\\end{document}\n"));
    }

    #[test]
    fn test_stamp_after_prolog() {
        let svg = "<?xml version='1.0'?>\n<svg></svg>";
        let stamped = stamp(svg, "abc");
        assert_eq!(
            stamped,
            "<?xml version='1.0'?>\n<!-- slidepress:fingerprint=abc -->\n<svg></svg>"
        );
        assert_eq!(read_stamp(&stamped), Some("abc"));

        let bare = stamp("<svg/>", "def");
        assert!(bare.starts_with("<!-- slidepress:fingerprint=def -->\n<svg/>"));
        assert_eq!(read_stamp("<svg/>"), None);
    }

    #[test]
    fn test_fingerprint_depends_on_flags() {
        let a = fingerprint("src", &["--font-format=woff2".to_string()]);
        let b = fingerprint("src", &["--font-format=woff".to_string()]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("src", &["--font-format=woff2".to_string()]));
    }

    #[tokio::test]
    async fn test_compiles_blocks_in_order() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let runner = Arc::new(ScriptedRunner::new());
        let mut settings = DiagramConfig::default();
        settings.jobs = 3;

        let blocks = vec![block(1, "a"), block(2, "b"), block(3, "c")];
        let compiled = compiler(runner.clone(), settings)
            .compile_all(blocks, &images)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let ordinals: Vec<usize> = compiled.iter().map(|b| b.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert!(compiled.iter().all(|b| b.status == CompileStatus::Compiled));
        for n in 1..=3 {
            let svg = std::fs::read_to_string(images.join(format!("tikz-{}.svg", n))).unwrap();
            assert!(read_stamp(&svg).is_some());
        }

        let latex = runner.calls_to("latex");
        assert_eq!(latex.len(), 3);
        let args = latex[0].args_lossy();
        assert_eq!(args[0], "-interaction=nonstopmode");
        assert_eq!(args[1], "-halt-on-error");
        assert_eq!(args[2], "-output-directory");
        assert!(Path::new(&args[3]).is_absolute());

        let dvisvgm = runner.calls_to("dvisvgm");
        assert_eq!(dvisvgm[0].args_lossy()[..2], ["--font-format=woff2", "--exact"]);
    }

    #[tokio::test]
    async fn test_unchanged_blocks_are_reused() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let runner = Arc::new(ScriptedRunner::new());
        let compiler = compiler(runner.clone(), DiagramConfig::default());

        let first_run = compiler
            .compile_all(vec![block(1, "a"), block(2, "b")], &images)
            .await
            .unwrap();
        assert_eq!(first_run.reused(), 0);
        assert_eq!(first_run.succeeded(), 2);
        let first = std::fs::read(images.join("tikz-1.svg")).unwrap();

        let again = compiler
            .compile_all(vec![block(1, "a"), block(2, "changed")], &images)
            .await
            .unwrap();
        assert_eq!(again.reused(), 1);
        let again = again.into_result().unwrap();
        assert_eq!(again[0].status, CompileStatus::Reused);
        assert_eq!(again[1].status, CompileStatus::Compiled);
        assert_eq!(runner.calls_to("latex").len(), 3);
        assert_eq!(std::fs::read(images.join("tikz-1.svg")).unwrap(), first);
    }

    #[tokio::test]
    async fn test_reuse_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let runner = Arc::new(ScriptedRunner::new());
        let mut settings = DiagramConfig::default();
        settings.reuse_unchanged = false;
        let compiler = compiler(runner.clone(), settings);

        compiler.compile_all(vec![block(1, "a")], &images).await.unwrap();
        compiler.compile_all(vec![block(1, "a")], &images).await.unwrap();
        assert_eq!(runner.calls_to("latex").len(), 2);
    }

    #[tokio::test]
    async fn test_failure_carries_diagnostics() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let runner = Arc::new(ScriptedRunner::failing_on("tikz-2.tex"));

        let compilation = compiler(runner.clone(), DiagramConfig::default())
            .compile_all(vec![block(1, "a"), block(2, "b"), block(3, "c")], &images)
            .await
            .unwrap();

        let statuses: Vec<CompileStatus> = compilation.blocks.iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                CompileStatus::Compiled,
                CompileStatus::Failed,
                CompileStatus::Pending
            ]
        );
        assert_eq!(compilation.failed().map(|b| b.ordinal), Some(2));
        assert_eq!(compilation.succeeded(), 1);

        match compilation.into_result().unwrap_err() {
            SlideError::ExternalTool { tool, stderr, .. } => {
                assert_eq!(tool, "latex [tikz-2]");
                assert!(stderr.contains("Emergency stop"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Sequential by default: block 3 never starts
        assert_eq!(runner.calls_to("latex").len(), 2);
    }

    #[tokio::test]
    async fn test_no_blocks_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let runner = Arc::new(ScriptedRunner::new());

        let out = compiler(runner.clone(), DiagramConfig::default())
            .compile_all(Vec::new(), &images)
            .await
            .unwrap();
        assert!(out.blocks.is_empty());
        assert!(out.error.is_none());
        assert!(!images.exists());
        assert!(runner.calls().is_empty());
    }
}
