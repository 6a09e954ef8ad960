use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slidepress::cli::{CommandContext, Output, Overrides, commands, parse_targets};

#[derive(Parser)]
#[command(name = "slidepress")]
#[command(
    version,
    about = "Build LaTeX lecture notes into self-contained HTML pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    build: TargetArgs,

    #[arg(long, global = true, help = "Directory holding the units (default: slides)")]
    root: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Units built concurrently")]
    jobs: Option<usize>,

    #[arg(
        long,
        short,
        global = true,
        env = "SLIDEPRESS_CONFIG",
        help = "Project config file (default: ./slidepress.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Args, Debug, Default)]
struct TargetArgs {
    #[arg(help = "Units to process (names or comma-separated lists)")]
    targets: Vec<String>,

    #[arg(long, value_name = "LIST", help = "Restrict to these units (repeatable)")]
    only: Vec<String>,
}

impl TargetArgs {
    fn resolve(&self) -> Option<Vec<String>> {
        parse_targets(&self.targets, &self.only)
    }

    /// Targets given before the subcommand name come first
    fn after(&self, leading: &TargetArgs) -> Option<Vec<String>> {
        let positional: Vec<String> =
            leading.targets.iter().chain(&self.targets).cloned().collect();
        let only: Vec<String> = leading.only.iter().chain(&self.only).cloned().collect();
        parse_targets(&positional, &only)
    }

    fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.only.is_empty()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build units into HTML (the default command)
    Build(TargetArgs),

    /// Remove diagram byproducts
    Clean {
        #[command(flatten)]
        targets: TargetArgs,
        #[arg(long, help = "Also remove compiled SVGs and generated pages")]
        outputs: bool,
    },

    /// Check that the external tools can be launched
    Check,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a configuration template
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mSlidePress encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let out = Output::new(cli.quiet);
    let overrides = Overrides {
        root: cli.root,
        jobs: cli.jobs,
        config: cli.config,
    };

    if !cli.build.is_empty()
        && matches!(cli.command, Some(Commands::Check | Commands::Config { .. }))
    {
        anyhow::bail!("Unit targets are only accepted by build and clean");
    }

    match cli.command {
        None => {
            let ctx = CommandContext::load(&overrides)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::build::run(&ctx, cli.build.resolve(), &out))?;
        }
        Some(Commands::Build(targets)) => {
            let ctx = CommandContext::load(&overrides)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::build::run(&ctx, targets.after(&cli.build), &out))?;
        }
        Some(Commands::Clean { targets, outputs }) => {
            let ctx = CommandContext::load(&overrides)?;
            let rt = Runtime::new()?;
            let targets = targets.after(&cli.build);
            rt.block_on(commands::clean::run(&ctx, targets, outputs, &out))?;
        }
        Some(Commands::Check) => {
            let ctx = CommandContext::load(&overrides)?;
            let rt = Runtime::new()?;
            if !rt.block_on(commands::check::run(&ctx, &out)) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show { format } => {
                let ctx = CommandContext::load(&overrides)?;
                commands::config::show(&ctx.config, &format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force, &out)?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
