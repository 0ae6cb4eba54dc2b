use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fuzzcov::cli::{cmd_coverage, cmd_link, cmd_report, cmd_uncovered};
use fuzzcov::config::Config;
use fuzzcov::error::FuzzcovError;
use fuzzcov::model::TargetLanguage;

/// Config file read from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "fuzzcov.toml";

/// fuzzcov: correlate fuzzer reachability with runtime coverage.
#[derive(Parser)]
#[command(name = "fuzzcov", version, about)]
struct Cli {
    /// TOML config file (default: ./fuzzcov.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target language (c-cpp, python). Overrides the config file.
    #[arg(long, global = true)]
    language: Option<TargetLanguage>,

    /// Tracing filter, e.g. "debug". `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every fuzzer profile under a target directory and summarize.
    Report {
        /// Directory holding the static analysis artifacts and coverage reports.
        #[arg(long)]
        target_dir: PathBuf,

        /// Base URL of the hosted coverage report.
        #[arg(long)]
        coverage_url: Option<String>,

        /// JSON file pairing introspection log files with executables.
        #[arg(long)]
        correlation_file: Option<PathBuf>,

        /// Emit JSON instead of a text table.
        #[arg(long)]
        json: bool,
    },

    /// Show hit totals of the coverage reports in a directory.
    Coverage {
        /// A report file, or a directory to search for reports.
        path: PathBuf,

        /// Only read reports whose file name contains this.
        #[arg(long)]
        target: Option<String>,

        /// Override format detection for a single file (llvm-cov, coverage-py).
        #[arg(long)]
        format: Option<String>,
    },

    /// List reachable functions of one fuzzer that were never hit.
    Uncovered {
        /// Directory holding the coverage reports.
        #[arg(long)]
        target_dir: PathBuf,

        /// The fuzzer's `fuzzerLogFile-*.data.json` artifact.
        artifact: PathBuf,
    },

    /// Print the coverage-report link for a source location.
    Link {
        #[arg(long)]
        source_file: String,

        #[arg(long)]
        line: u32,

        /// Function at that location (used for python targets).
        #[arg(long, default_value = "")]
        function: String,

        /// Base URL of the hosted coverage report.
        #[arg(long)]
        coverage_url: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.log.as_deref().unwrap_or(&config.log_level));

    match run_command(cli.command, &config) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<FuzzcovError>() {
                Some(FuzzcovError::NoProfiles(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_optional(&PathBuf::from(DEFAULT_CONFIG)),
    };
    if let Some(language) = cli.language {
        config = config.with_language(language);
    }
    Ok(config)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(command: Commands, config: &Config) -> Result<String> {
    match command {
        Commands::Report {
            target_dir,
            coverage_url,
            correlation_file,
            json,
        } => {
            let config = with_url(config, coverage_url);
            cmd_report(&config, &target_dir, correlation_file.as_deref(), json)
        }
        Commands::Coverage {
            path,
            target,
            format,
        } => cmd_coverage(&path, config.language, target.as_deref(), format.as_deref()),
        Commands::Uncovered {
            target_dir,
            artifact,
        } => cmd_uncovered(config, &target_dir, &artifact),
        Commands::Link {
            source_file,
            line,
            function,
            coverage_url,
        } => {
            let config = with_url(config, coverage_url);
            Ok(cmd_link(&config, &source_file, line, &function))
        }
    }
}

fn with_url(config: &Config, coverage_url: Option<String>) -> Config {
    match coverage_url {
        Some(url) => config.clone().with_coverage_url(url),
        None => config.clone(),
    }
}
