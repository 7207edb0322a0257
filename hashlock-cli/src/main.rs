//! hashlock - build-time integrity verifier for protected source files
//!
//! Default mode verifies the protected files against the checked-in artifact;
//! `--generate` recomputes the digests and rewrites it.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use hashlock_core::{
    config::CONFIG_FILE_NAME, FormatKind, HashlockConfig, IntegrityError, ManifestEngine,
    VerifyStrategy,
};

mod report;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Artifact formats selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    CppHeader,
    Rust,
    Json,
}

impl From<FormatArg> for FormatKind {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::CppHeader => FormatKind::CppHeader,
            FormatArg::Rust => FormatKind::Rust,
            FormatArg::Json => FormatKind::Json,
        }
    }
}

/// Verify strategies selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Parse the artifact and compare path by path
    Structured,
    /// Only require each digest to appear somewhere in the artifact
    Substring,
}

impl From<StrategyArg> for VerifyStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Structured => VerifyStrategy::Structured,
            StrategyArg::Substring => VerifyStrategy::Substring,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "hashlock",
    about = "Generate and verify SHA-256 integrity manifests of protected source files",
    version
)]
struct Cli {
    /// Regenerate the artifact instead of verifying against it
    #[clap(long)]
    generate: bool,

    /// Repository root that protected paths are relative to
    #[clap(long, default_value = ".")]
    root: PathBuf,

    /// Configuration file (default: <root>/hashlock.yml)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Override the artifact path from the configuration
    #[clap(long)]
    artifact: Option<PathBuf>,

    /// Override the artifact format from the configuration
    #[clap(long, value_enum)]
    format: Option<FormatArg>,

    /// Override the verify strategy from the configuration
    #[clap(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Set log level
    #[clap(long, default_value = "warn")]
    log_level: LogLevel,
}

/// Initialize tracing from --log-level
///
/// Logs go to stderr so the report on stdout stays machine-greppable.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            if let Some(integrity) = e.downcast_ref::<IntegrityError>() {
                integrity.log_if_security_critical();
            }
            error!("Fatal: {:#}", e);
            eprintln!("\nError: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(CONFIG_FILE_NAME));
    debug!("Using configuration: {}", config_path.display());

    let mut config = HashlockConfig::load(&config_path)?;
    if let Some(artifact) = &cli.artifact {
        config.artifact = artifact.clone();
    }
    if let Some(format) = cli.format {
        config.format = Some(format.into());
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy.into();
    }

    let files = config.protected_files()?;
    let format = config.format_kind()?;
    let engine = ManifestEngine::new(&cli.root, files, format, &config.artifact);

    report::header(cli.generate, &engine);

    if cli.generate {
        let generated = engine
            .generate()
            .with_context(|| format!("Generation failed for {}", engine.root().display()))?;
        report::file_lines(&generated.files);
        report::generated(&config.artifact);
        return Ok(ExitCode::SUCCESS);
    }

    let files = engine.compute()?;
    report::file_lines(&files);

    match engine.verify_hashes(files, config.strategy) {
        Ok(result) => {
            if result.passed() {
                report::passed();
                Ok(ExitCode::SUCCESS)
            } else {
                report::failed(&result);
                Ok(ExitCode::FAILURE)
            }
        }
        Err(IntegrityError::ArtifactMissing { .. }) => {
            report::artifact_missing(&config.artifact);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
