//! Build Orchestration
//!
//! Discovers units under the root directory, applies the optional name
//! filter and drives each unit through the pipeline:
//!
//! ```text
//! include expansion -> diagram extraction -> diagram compilation
//!     -> assembly -> post-processing -> artifact cleanup
//! ```
//!
//! Units share nothing but the tool runner. A failing unit is recorded in
//! the report and its siblings carry on.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::assemble::DocumentAssembler;
use super::assets::AssetResolver;
use super::compile::DiagramCompiler;
use super::extract::DiagramExtractor;
use super::include::IncludeExpander;
use super::janitor::{ArtifactJanitor, JanitorReport};
use super::postprocess::HtmlPostProcessor;
use super::tool::ToolRunner;
use crate::config::Config;
use crate::types::{BuildUnit, Result, ResultExt, SlideError, UnitState};

/// Terminal record of one unit's run
#[derive(Debug)]
pub struct UnitOutcome {
    pub name: String,
    /// `CleanedUp` on success, `Failed` otherwise
    pub state: UnitState,
    /// Last state reached before a failure
    pub failed_after: Option<UnitState>,
    pub diagrams: usize,
    pub reused: usize,
    /// Ordinal of the diagram that stopped compilation
    pub failed_diagram: Option<usize>,
    pub include_warnings: Vec<SlideError>,
    pub missing_artifacts: Vec<PathBuf>,
    pub cleanup: JanitorReport,
    pub elapsed: Duration,
    pub error: Option<SlideError>,
}

impl UnitOutcome {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: UnitState::Discovered,
            failed_after: None,
            diagrams: 0,
            reused: 0,
            failed_diagram: None,
            include_warnings: Vec::new(),
            missing_artifacts: Vec::new(),
            cleanup: JanitorReport::default(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == UnitState::CleanedUp
    }

    /// Keep a non-fatal error as a warning; fatal ones are handed back
    pub fn absorb(&mut self, err: SlideError) -> Result<()> {
        if err.is_unit_fatal() {
            return Err(err);
        }
        self.include_warnings.push(err);
        Ok(())
    }

    /// Non-fatal problems worth surfacing in the summary
    pub fn warning_count(&self) -> usize {
        self.include_warnings.len() + self.missing_artifacts.len() + self.cleanup.failures.len()
    }
}

/// Aggregated result of a build run
#[derive(Debug, Default)]
pub struct BuildReport {
    /// One entry per selected unit, in name order
    pub outcomes: Vec<UnitOutcome>,
    /// Requested names with no matching unit
    pub missing: Vec<String>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// Nothing was selected for building
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Units chosen by the filter plus names that matched nothing
#[derive(Debug, Default)]
pub struct Selection {
    pub units: Vec<BuildUnit>,
    pub missing: Vec<String>,
}

/// Result of a clean run
#[derive(Debug, Default)]
pub struct CleanReport {
    pub units: Vec<(String, JanitorReport)>,
    /// Generated pages removed with `--outputs`
    pub removed_pages: Vec<PathBuf>,
    /// Pages that could not be removed
    pub failures: Vec<(PathBuf, String)>,
    pub missing: Vec<String>,
}

pub struct BuildOrchestrator {
    config: Config,
    compiler: DiagramCompiler,
    assembler: DocumentAssembler,
    postprocessor: HtmlPostProcessor,
}

impl BuildOrchestrator {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        let compiler = DiagramCompiler::new(
            Arc::clone(&runner),
            config.tools.clone(),
            config.diagram.clone(),
        );
        let assembler = DocumentAssembler::new(
            Arc::clone(&runner),
            config.tools.pandoc.clone(),
            config.pandoc.clone(),
            config.build.image_dir.clone(),
        );
        let postprocessor = HtmlPostProcessor::new(
            AssetResolver::from_config(&config.assets),
            config.build.image_dir.clone(),
        );

        Self {
            config,
            compiler,
            assembler,
            postprocessor,
        }
    }

    /// Every immediate sub-directory of the root holding a root document, by name.
    ///
    /// A missing root is the one fatal condition of a run.
    pub fn discover(&self) -> Result<Vec<BuildUnit>> {
        let root = &self.config.build.root;
        if !root.is_dir() {
            return Err(SlideError::MissingUnit { path: root.clone() });
        }
        let root = std::path::absolute(root).with_path(root)?;

        let mut units: Vec<BuildUnit> = std::fs::read_dir(&root)
            .with_path(&root)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    None
                }
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|dir| BuildUnit::discover(&dir, &self.config.build))
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Discovered {} unit(s) in {}", units.len(), root.display());
        Ok(units)
    }

    /// Apply the allow-list; `None` selects everything
    pub fn select(units: Vec<BuildUnit>, targets: Option<&[String]>) -> Selection {
        let Some(targets) = targets else {
            return Selection {
                units,
                missing: Vec::new(),
            };
        };

        let missing: Vec<String> = targets
            .iter()
            .filter(|t| !units.iter().any(|u| &u.name == *t))
            .cloned()
            .collect();
        let units = units
            .into_iter()
            .filter(|u| targets.contains(&u.name))
            .collect();

        Selection { units, missing }
    }

    fn selected(&self, targets: Option<&[String]>) -> Result<Selection> {
        let selection = Self::select(self.discover()?, targets);
        for name in &selection.missing {
            let err = SlideError::MissingUnit {
                path: self.config.build.root.join(name),
            };
            warn!("{} (needs {})", err, self.config.build.root_document);
        }
        Ok(selection)
    }

    /// Build the selected units, at most `build.jobs` at a time
    pub async fn run(&self, targets: Option<&[String]>) -> Result<BuildReport> {
        let start = Instant::now();
        let selection = self.selected(targets)?;

        if selection.units.is_empty() {
            warn!("No units to build");
            return Ok(BuildReport {
                outcomes: Vec::new(),
                missing: selection.missing,
                elapsed: start.elapsed(),
            });
        }

        let outcomes: Vec<UnitOutcome> = stream::iter(selection.units)
            .map(|unit| self.build_unit(unit))
            .buffered(self.config.build.jobs.max(1))
            .collect()
            .await;

        let report = BuildReport {
            outcomes,
            missing: selection.missing,
            elapsed: start.elapsed(),
        };
        info!(
            "Build finished: {} succeeded, {} failed in {:.1}s",
            report.succeeded().count(),
            report.failed().count(),
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    async fn build_unit(&self, mut unit: BuildUnit) -> UnitOutcome {
        let start = Instant::now();
        let mut outcome = UnitOutcome::new(&unit.name);
        info!("[{}] Building", unit.name);

        match self.run_stages(&mut unit, &mut outcome).await {
            Ok(()) => info!("[{}] Done in {:.1}s", unit.name, start.elapsed().as_secs_f64()),
            Err(e) => {
                error!("[{}] Failed during {}: {}", unit.name, next_stage(unit.state()), e);
                outcome.failed_after = Some(unit.state());
                if let Err(lifecycle) = unit.fail() {
                    warn!("{}", lifecycle);
                }
                outcome.error = Some(e);
            }
        }

        outcome.state = unit.state();
        outcome.elapsed = start.elapsed();
        outcome
    }

    async fn run_stages(&self, unit: &mut BuildUnit, outcome: &mut UnitOutcome) -> Result<()> {
        let tree = IncludeExpander::expand_in_background(unit.root_document.clone()).await?;
        for warning in tree.warnings {
            outcome.absorb(warning)?;
        }
        unit.advance(UnitState::IncludesExpanded)?;

        let blocks = DiagramExtractor::extract(&tree.content);
        outcome.diagrams = blocks.len();
        let compilation = self.compiler.compile_all(blocks, &unit.image_dir).await?;
        outcome.reused = compilation.reused();
        outcome.failed_diagram = compilation.failed().map(|b| b.ordinal);
        let blocks = compilation.into_result()?;
        unit.advance(UnitState::DiagramsCompiled)?;

        self.assembler.assemble(unit, &tree.content, &blocks).await?;
        unit.advance(UnitState::Assembled)?;

        let summary = self.postprocessor.process(unit).await?;
        outcome.missing_artifacts = summary.missing_artifacts;
        unit.advance(UnitState::PostProcessed)?;

        outcome.cleanup = ArtifactJanitor::sweep(&unit.image_dir).await;
        unit.advance(UnitState::CleanedUp)?;
        Ok(())
    }

    /// Remove compiler byproducts (and with `outputs`, final SVGs and pages)
    pub async fn clean(&self, targets: Option<&[String]>, outputs: bool) -> Result<CleanReport> {
        let selection = self.selected(targets)?;
        let mut report = CleanReport {
            missing: selection.missing,
            ..CleanReport::default()
        };

        for unit in selection.units {
            let swept = if outputs {
                ArtifactJanitor::purge(&unit.image_dir).await
            } else {
                ArtifactJanitor::sweep(&unit.image_dir).await
            };

            if outputs {
                match tokio::fs::remove_file(&unit.output_html).await {
                    Ok(()) => report.removed_pages.push(unit.output_html.clone()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!("Failed to remove {}: {}", unit.output_html.display(), e);
                        report
                            .failures
                            .push((unit.output_html.clone(), e.to_string()));
                    }
                }
            }

            info!("[{}] Removed {} artifact(s)", unit.name, swept.removed.len());
            report.units.push((unit.name, swept));
        }

        Ok(report)
    }
}

/// Stage that was running when a unit in `state` failed
fn next_stage(state: UnitState) -> &'static str {
    match state {
        UnitState::Discovered => "include expansion",
        UnitState::IncludesExpanded => "diagram compilation",
        UnitState::DiagramsCompiled => "assembly",
        UnitState::Assembled => "post-processing",
        UnitState::PostProcessed => "cleanup",
        UnitState::CleanedUp | UnitState::Failed => "finalization",
    }
}
