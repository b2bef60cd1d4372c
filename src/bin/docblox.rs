//! Binary entry point for the docblox CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Parse sources and refresh the incremental cache
//! docblox parse
//!
//! # Build the project and write its structure as JSON
//! docblox run --output build/structure.json
//!
//! # Inspect or drop the cache
//! docblox cache status
//! docblox cache clear
//!
//! # Show the effective configuration and where each value came from
//! docblox config
//! ```
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use docblox::cli::{cache_clear, cache_status, run_build, run_parse, show_config};
use docblox::error::{DocbloxError, OutputErrorCode};
use docblox::output::{emit_response, ErrorResponse};
use docblox::settings::CliOverrides;

// ============================================================================
// CLI Structure
// ============================================================================

/// Documentation generator for PHP projects.
#[derive(Parser, Debug)]
#[command(name = "docblox", version, about = "Documentation generator for PHP projects")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Project root directory (default: current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file (default: docblox.json in the project root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Format of log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Format of log output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Options shared by the commands that read sources.
#[derive(Args, Debug, Default)]
struct BuildArgs {
    /// Project title.
    #[arg(long)]
    title: Option<String>,

    /// Visibilities to document: public, protected, private, internal, api.
    ///
    /// Repeat the flag or pass a comma separated list.
    #[arg(long)]
    visibility: Vec<String>,

    /// Source directory relative to the root (repeatable).
    #[arg(long = "source")]
    sources: Vec<PathBuf>,

    /// Glob pattern of paths to skip (repeatable).
    #[arg(long)]
    ignore: Vec<String>,

    /// Cache directory relative to the root.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Keep file contents in the output.
    #[arg(long)]
    include_source: bool,

    /// Re-parse every file even when the cache is current.
    #[arg(long)]
    force: bool,

    /// Fail when two elements share an FQSEN.
    #[arg(long)]
    strict: bool,

    /// Neither read nor write the cache.
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse source files and refresh the cache.
    Parse {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Parse, compile and export the project structure.
    Run {
        #[command(flatten)]
        build: BuildArgs,

        /// Write the structure to this file instead of embedding it.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Inspect or clear the incremental cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Cache directory relative to the root.
        #[arg(long, global = true)]
        cache_dir: Option<PathBuf>,
    },
    /// Show the resolved configuration.
    Config,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show the cached file count and last write time.
    Status,
    /// Delete the cache directory.
    Clear,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), DocbloxError> {
    let root = cli.global.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let json = match cli.command {
        Command::Parse { build } => {
            run_parse(&root, &overrides(&cli.global, &build), !build.no_cache)?
        }
        Command::Run { build, output } => run_build(
            &root,
            &overrides(&cli.global, &build),
            !build.no_cache,
            output.as_deref(),
        )?,
        Command::Cache { action, cache_dir } => {
            let overrides = CliOverrides {
                config_file: cli.global.config.clone(),
                cache_dir,
                ..CliOverrides::default()
            };
            match action {
                CacheAction::Status => cache_status(&root, &overrides)?,
                CacheAction::Clear => cache_clear(&root, &overrides)?,
            }
        }
        Command::Config => show_config(&root, &overrides(&cli.global, &BuildArgs::default()))?,
    };
    println!("{}", json);
    Ok(())
}

/// Map global and build flags onto configuration overrides.
fn overrides(global: &GlobalArgs, build: &BuildArgs) -> CliOverrides {
    CliOverrides {
        config_file: global.config.clone(),
        title: build.title.clone(),
        visibility: build.visibility.clone(),
        source_paths: build.sources.clone(),
        ignore: build.ignore.clone(),
        cache_dir: build.cache_dir.clone(),
        include_source: build.include_source,
        force: build.force,
        strict_fqsen: build.strict,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn parse_log_level_debug() {
            let cli = Cli::try_parse_from(["docblox", "--log-level", "debug", "parse"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
        }

        #[test]
        fn default_log_level_is_warn() {
            let cli = Cli::try_parse_from(["docblox", "parse"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
            assert_eq!(cli.global.log_format, LogFormat::Text);
        }

        #[test]
        fn global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "docblox",
                "run",
                "--root",
                "project",
                "--log-format",
                "json",
            ])
            .unwrap();
            assert_eq!(cli.global.root, Some(PathBuf::from("project")));
            assert_eq!(cli.global.log_format, LogFormat::Json);
        }

        #[test]
        fn build_flags_are_repeatable() {
            let cli = Cli::try_parse_from([
                "docblox",
                "parse",
                "--visibility",
                "public",
                "--visibility",
                "protected,private",
                "--ignore",
                "vendor/**",
                "--source",
                "src",
                "--source",
                "lib",
                "--no-cache",
            ])
            .unwrap();
            match cli.command {
                Command::Parse { build } => {
                    assert_eq!(build.visibility, ["public", "protected,private"]);
                    assert_eq!(build.ignore, ["vendor/**"]);
                    assert_eq!(build.sources.len(), 2);
                    assert!(build.no_cache);
                    assert!(!build.force);
                }
                _ => panic!("expected Parse"),
            }
        }

        #[test]
        fn run_with_output() {
            let cli =
                Cli::try_parse_from(["docblox", "run", "-o", "out/structure.json", "--strict"])
                    .unwrap();
            match cli.command {
                Command::Run { build, output } => {
                    assert_eq!(output, Some(PathBuf::from("out/structure.json")));
                    assert!(build.strict);
                }
                _ => panic!("expected Run"),
            }
        }

        #[test]
        fn cache_actions() {
            let cli = Cli::try_parse_from(["docblox", "cache", "status"]).unwrap();
            assert!(matches!(
                cli.command,
                Command::Cache {
                    action: CacheAction::Status,
                    cache_dir: None
                }
            ));
            let cli =
                Cli::try_parse_from(["docblox", "cache", "clear", "--cache-dir", "tmp/cache"])
                    .unwrap();
            match cli.command {
                Command::Cache { action, cache_dir } => {
                    assert!(matches!(action, CacheAction::Clear));
                    assert_eq!(cache_dir, Some(PathBuf::from("tmp/cache")));
                }
                _ => panic!("expected Cache"),
            }
        }

        #[test]
        fn unknown_subcommand_is_rejected() {
            assert!(Cli::try_parse_from(["docblox", "render"]).is_err());
        }
    }

    mod overrides_mapping {
        use super::*;

        #[test]
        fn flags_become_overrides() {
            let cli = Cli::try_parse_from([
                "docblox",
                "--config",
                "ci.json",
                "parse",
                "--title",
                "Shop",
                "--force",
                "--strict",
            ])
            .unwrap();
            let Command::Parse { build } = &cli.command else {
                panic!("expected Parse");
            };
            let overrides = overrides(&cli.global, build);
            assert_eq!(overrides.config_file, Some(PathBuf::from("ci.json")));
            assert_eq!(overrides.title.as_deref(), Some("Shop"));
            assert!(overrides.force);
            assert!(overrides.strict_fqsen);
            assert!(!overrides.include_source);
        }
    }

    mod log_level {
        use super::*;

        #[test]
        fn trace_converts_to_tracing_level() {
            assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
        }

        #[test]
        fn warn_converts_to_tracing_level() {
            assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        }

        #[test]
        fn error_converts_to_tracing_level() {
            assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        }
    }
}
