use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};

use arti_fetch::config::{Configuration, LogLevel};
use arti_fetch::events::ConsoleEventSink;
use arti_fetch::maven::coordinates::ArtifactRequest;
use arti_fetch::resolver::Resolver;
use arti_fetch::util::http::HyperHttpFetcher;
use arti_fetch::util::signature::NullSignatureVerifier;

/// Downloads artifacts from Maven 2 style repositories for inspection
/// before they are added to a local repository. All the files published for
/// an artifact are pulled down, checksums and signatures are verified, and
/// with `-r` the POM dependency graph is followed.
#[derive(Debug, Parser)]
#[command(name = "arti-fetch", version)]
struct Cli {
    /// Directory to store the downloaded files (defaults to the current
    /// directory).
    #[arg(short = 'd', long = "dir")]
    output: Option<PathBuf>,

    /// Resolve the POM files and their dependencies, recursively.
    #[arg(short = 'r', long = "resolve")]
    resolve: bool,

    /// Overwrite any already existing file with the same name.
    #[arg(short = 'O', long = "overwrite")]
    overwrite: bool,

    /// Increase output verbosity (repeatable).
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count)]
    verbosity: u8,

    /// Show a progress indicator.
    #[arg(short = 'p', long = "progress")]
    progress: bool,

    /// Also download dependency-management entries (parent and BOM
    /// declarations).
    #[arg(short = 'P', long = "parent")]
    parent: bool,

    /// File to append the discovered problems to.
    #[arg(short = 'e', long = "error-file")]
    error_file: Option<PathBuf>,

    /// Do not search local repository URLs first.
    #[arg(short = 'x', long = "no-local")]
    no_local: bool,

    /// Do not persist files fetched from remote repositories.
    #[arg(short = 't', long = "no-remote-download")]
    no_remote_download: bool,

    /// Do not perform PGP signature checking.
    #[arg(long = "no-pgp")]
    no_pgp: bool,

    /// Every declared license must be explicitly allowed.
    #[arg(long = "require-valid-license")]
    require_valid_license: bool,

    /// Every artifact must declare a license.
    #[arg(long = "require-license")]
    require_license: bool,

    /// Configuration file to load.
    #[arg(short = 'c', long = "config")]
    config_file: Option<PathBuf>,

    /// Artifacts to download: Maven repository URLs or
    /// group:artifact:version[:classifier[:packaging]] notation.
    #[arg(required = true, value_name = "artifact")]
    artifacts: Vec<String>,
}

fn apply_cli(config: &mut Configuration, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if cli.resolve {
        config.recursive = true;
    }
    if cli.overwrite {
        config.overwrite = true;
    }
    if cli.progress {
        config.show_progress = true;
    }
    if cli.parent {
        config.include_dep_management = true;
    }
    if let Some(error_file) = &cli.error_file {
        config.problem_file = Some(error_file.clone());
    }
    if cli.no_local {
        config.check_in_local = false;
    }
    if cli.no_remote_download {
        config.do_remote_download = false;
    }
    if cli.no_pgp {
        config.no_pgp = true;
    }
    if cli.require_valid_license {
        config.allow_unacceptable_licenses = false;
    }
    if cli.require_license {
        config.allow_no_license = false;
        config.require_license = true;
    }
    config.log_level = match cli.verbosity {
        0 => config.log_level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
}

fn init_tracing(level: LogLevel) {
    let max_level = match level {
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("arti-fetch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Configuration::discover(cli.config_file.as_deref())?;
    apply_cli(&mut config, &cli);
    config.normalise();
    init_tracing(config.log_level);

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "cannot create output directory {}",
            config.output_dir.display()
        )
    })?;

    let sink = Arc::new(ConsoleEventSink::new(
        config.show_progress,
        &config.progress_indicators,
    ));
    let known_repo_urls = config.known_repo_urls();
    let mut resolver = Resolver::new(
        config.clone(),
        Arc::new(HyperHttpFetcher::new()),
        // a PGP backend is a pluggable capability; without one installed
        // every signature check reports "skipped"
        Arc::new(NullSignatureVerifier),
        sink.clone(),
    );

    let mut seeds = Vec::new();
    for artifact in &cli.artifacts {
        match ArtifactRequest::parse(artifact, &known_repo_urls) {
            Ok(seed) => seeds.push(seed),
            Err(e) => {
                resolver.ledger().record(arti_fetch::problems::Problem {
                    kind: arti_fetch::problems::ProblemKind::NotFound,
                    coordinate: Some(artifact.clone()),
                    url: None,
                    message: format!("{:#}", e),
                    recoverable: false,
                });
            }
        }
    }
    resolver.resolve(seeds).await?;
    sink.finish();

    let problems = resolver.ledger().snapshot();
    if problems.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("Discovered problems:");
    for problem in &problems {
        eprintln!("    {}", problem);
    }
    if let Some(path) = &config.problem_file {
        resolver.ledger().write_report(path)?;
    }
    Ok(ExitCode::FAILURE)
}
