//! Document Assembly
//!
//! Swaps every diagram block for a graphics reference, writes the composite
//! source next to the root document and converts it to standalone HTML.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::assets::BUILTIN_LUA_FILTER;
use super::tool::{ToolInvocation, ToolRunner, run_checked};
use crate::config::PandocConfig;
use crate::types::{BuildUnit, DiagramBlock, Result, ResultExt};

/// Replace each block's span with `\includegraphics{<dir>/tikz-<n>.svg}`.
///
/// `blocks` must be in scan order with non-overlapping spans.
pub fn assemble_source(source: &str, blocks: &[DiagramBlock], image_dir_name: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for block in blocks {
        out.push_str(&source[cursor..block.span.start]);
        out.push_str(&format!(
            "\\includegraphics{{{}}}",
            block.artifact_reference(image_dir_name)
        ));
        cursor = block.span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// `linear-algebra_intro` -> `Linear Algebra Intro`
pub fn page_title(unit_name: &str) -> String {
    let spaced: String = unit_name
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut title = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if at_word_start && c.is_alphanumeric() {
            title.extend(c.to_uppercase());
        } else {
            title.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    title
}

/// Removes the composite source when assembly ends, however it ends
struct TempSource(PathBuf);

impl Drop for TempSource {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!("Removed {}", self.0.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.0.display(), e),
        }
    }
}

pub struct DocumentAssembler {
    runner: Arc<dyn ToolRunner>,
    program: String,
    settings: PandocConfig,
    image_dir_name: String,
}

impl DocumentAssembler {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        program: impl Into<String>,
        settings: PandocConfig,
        image_dir_name: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            settings,
            image_dir_name: image_dir_name.into(),
        }
    }

    /// Converter arguments for one unit, in invocation order
    pub fn pandoc_args(&self, unit: &BuildUnit, composite: &Path, filter: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![composite.into()];

        if let Some(bib) = &unit.bibliography {
            args.push("--citeproc".into());
            args.push("--bibliography".into());
            args.push(bib.into());
        }
        if self.settings.number_sections {
            args.push("--number-sections".into());
        }
        args.push("--lua-filter".into());
        args.push(filter.into());
        args.push("--metadata".into());
        args.push(format!("pagetitle={}", page_title(&unit.name)).into());
        args.push("--toc".into());
        args.push(format!("--toc-depth={}", self.settings.toc_depth).into());
        args.extend(["-t", "html5", "-s", self.settings.math.flag()].map(OsString::from));
        args.extend(self.settings.extra_args.iter().map(OsString::from));
        args.push("-o".into());
        args.push(unit.output_html.as_os_str().to_os_string());
        args
    }

    /// Write the composite source and run the converter
    pub async fn assemble(
        &self,
        unit: &BuildUnit,
        source: &str,
        blocks: &[DiagramBlock],
    ) -> Result<()> {
        let composite = unit.temp_source();
        let text = assemble_source(source, blocks, &self.image_dir_name);
        tokio::fs::write(&composite, text)
            .await
            .with_path(&composite)?;
        let _guard = TempSource(composite.clone());

        // Built-in filter lives in a temp file for the duration of the call
        let builtin_filter;
        let filter: PathBuf = match &self.settings.lua_filter {
            Some(path) => path.clone(),
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("slidepress-filter-")
                    .suffix(".lua")
                    .tempfile()?;
                file.write_all(BUILTIN_LUA_FILTER.as_bytes())?;
                let path = file.path().to_path_buf();
                builtin_filter = file;
                debug!("Materialised Lua filter at {}", builtin_filter.path().display());
                path
            }
        };

        let invocation = ToolInvocation::new("pandoc", &self.program)
            .args(self.pandoc_args(unit, &composite, &filter))
            .current_dir(&unit.dir);

        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("[{}] Converted to {}", unit.name, unit.output_html.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, MathEngine};
    use crate::pipeline::extract::DiagramExtractor;
    use crate::pipeline::tool::testing::ScriptedRunner;
    use crate::types::SlideError;
    use std::fs;
    use tempfile::TempDir;

    fn unit(temp: &TempDir, name: &str, with_bib: bool) -> BuildUnit {
        let dir = temp.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.tex"), "").unwrap();
        if with_bib {
            fs::write(dir.join("refs.bib"), "@book{k, title={T}}").unwrap();
        }
        BuildUnit::discover(&dir, &BuildConfig::default()).unwrap()
    }

    fn assembler(runner: Arc<ScriptedRunner>, settings: PandocConfig) -> DocumentAssembler {
        DocumentAssembler::new(runner, "pandoc", settings, "images")
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title("linear-algebra"), "Linear Algebra");
        assert_eq!(page_title("graph__theory-01"), "Graph Theory 01");
        assert_eq!(page_title("intro"), "Intro");
        assert_eq!(page_title("é-clair"), "É Clair");
    }

    #[test]
    fn test_assemble_source_preserves_order() {
        let source = "A\n\\begin{tikzpicture}x\\end{tikzpicture}\nB\n\\begin{tikzpicture}y\\end{tikzpicture}\nC";
        let blocks = DiagramExtractor::extract(source);
        let out = assemble_source(source, &blocks, "images");

        assert_eq!(
            out,
            "A\n\\includegraphics{images/tikz-1.svg}\nB\n\\includegraphics{images/tikz-2.svg}\nC"
        );
        assert_eq!(assemble_source("plain", &[], "images"), "plain");
    }

    #[test]
    fn test_args_without_bibliography() {
        let temp = TempDir::new().unwrap();
        let unit = unit(&temp, "set-theory", false);
        let a = assembler(Arc::new(ScriptedRunner::new()), PandocConfig::default());

        let args = strings(&a.pandoc_args(&unit, Path::new("main-temp.tex"), Path::new("f.lua")));
        let output = unit.output_html.to_string_lossy().to_string();
        assert_eq!(
            args,
            vec![
                "main-temp.tex",
                "--number-sections",
                "--lua-filter",
                "f.lua",
                "--metadata",
                "pagetitle=Set Theory",
                "--toc",
                "--toc-depth=3",
                "-t",
                "html5",
                "-s",
                "--katex",
                "-o",
                output.as_str(),
            ]
        );
    }

    #[test]
    fn test_args_with_bibliography_and_options() {
        let temp = TempDir::new().unwrap();
        let unit = unit(&temp, "logic", true);
        let settings = PandocConfig {
            number_sections: false,
            toc_depth: 2,
            math: MathEngine::Mathjax,
            lua_filter: None,
            extra_args: vec!["--section-divs".to_string()],
        };
        let a = assembler(Arc::new(ScriptedRunner::new()), settings);

        let args = strings(&a.pandoc_args(&unit, Path::new("t.tex"), Path::new("f.lua")));
        let bib = unit.dir.join("refs.bib").to_string_lossy().to_string();
        assert_eq!(args[1..4], ["--citeproc", "--bibliography", bib.as_str()]);
        assert!(!args.contains(&"--number-sections".to_string()));
        assert!(args.contains(&"--toc-depth=2".to_string()));
        assert!(args.contains(&"--mathjax".to_string()));
        assert!(args.contains(&"--section-divs".to_string()));
    }

    #[tokio::test]
    async fn test_assemble_writes_html_and_removes_temp() {
        let temp = TempDir::new().unwrap();
        let unit = unit(&temp, "deck", false);
        let runner = Arc::new(ScriptedRunner::new());
        let source = "\\section{S}\n\\begin{tikzpicture}\\end{tikzpicture}";
        let blocks = DiagramExtractor::extract(source);

        assembler(runner.clone(), PandocConfig::default())
            .assemble(&unit, source, &blocks)
            .await
            .unwrap();

        let html = fs::read_to_string(&unit.output_html).unwrap();
        assert!(html.contains("<img src=\"images/tikz-1.svg\""));
        assert!(!unit.temp_source().exists());

        let call = &runner.calls_to("pandoc")[0];
        let filter = Path::new(&call.args_lossy()[3]).to_path_buf();
        assert!(filter.to_string_lossy().ends_with(".lua"));
        assert!(!filter.exists());
    }

    #[tokio::test]
    async fn test_temp_removed_on_failure() {
        let temp = TempDir::new().unwrap();
        let unit = unit(&temp, "broken", false);
        let runner = Arc::new(ScriptedRunner::failing_on("broken"));

        let err = assembler(runner, PandocConfig::default())
            .assemble(&unit, "text", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, SlideError::ExternalTool { .. }));
        assert!(!unit.temp_source().exists());
        assert!(!unit.output_html.exists());
    }
}
