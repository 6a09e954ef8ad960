//! CLI Common Utilities
//!
//! Shared configuration loading and tool wiring for command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigLoader};
use crate::pipeline::{BuildOrchestrator, ProcessRunner, ToolRunner};
use crate::types::{Result, SlideError};

/// Global flags that override the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub jobs: Option<usize>,
    /// Explicit project config file
    pub config: Option<PathBuf>,
}

/// Command execution context
#[derive(Clone)]
pub struct CommandContext {
    /// Effective configuration (files, env, then flags)
    pub config: Config,
    pub runner: Arc<dyn ToolRunner>,
}

impl CommandContext {
    /// Load configuration, apply flag overrides and re-validate
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config = apply_overrides(ConfigLoader::load_with(overrides.config.as_deref())?, overrides)?;
        let runner = Arc::new(ProcessRunner::new(Duration::from_secs(
            config.tools.timeout_secs,
        )));
        Ok(Self { config, runner })
    }

    pub fn orchestrator(&self) -> BuildOrchestrator {
        BuildOrchestrator::new(self.config.clone(), Arc::clone(&self.runner))
    }
}

/// CLI arguments take precedence over every configuration source
pub fn apply_overrides(mut config: Config, overrides: &Overrides) -> Result<Config> {
    if let Some(root) = &overrides.root {
        config.build.root = root.clone();
    }
    if let Some(jobs) = overrides.jobs {
        if jobs == 0 {
            return Err(SlideError::Config("--jobs must be greater than 0".to_string()));
        }
        config.build.jobs = jobs;
    }
    config.validate()?;
    Ok(config)
}
