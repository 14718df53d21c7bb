//! Kiln CLI: compile contract sources through the cached pipeline.
//!
//! Provides `kiln compile` to build an entry file, `kiln request` to print
//! the request that would be sent to the compiler, and `kiln clean` to drop
//! the scratch cache.

#![warn(missing_docs)]

mod clean;
mod compile;
mod project;
mod request;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit code for a source the compiler rejected.
pub const EXIT_COMPILE_ERROR: i32 = 2;

/// Kiln: content-addressed contract compilation.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln contract compilation pipeline")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an entry file and everything it imports.
    Compile(CompileArgs),
    /// Print the compile request for an entry file without compiling.
    Request(RequestArgs),
    /// Remove every cached result and scratch directory.
    Clean,
}

/// Arguments for the `kiln compile` subcommand.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Entry source file.
    pub entry: String,

    /// Run the compiler's optimizer.
    #[arg(long)]
    pub optimize: bool,

    /// Library link directives (`name:address`, separated by spaces or commas).
    #[arg(long, default_value = "")]
    pub libraries: String,

    /// Output format for the result.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln request` subcommand.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Entry source file.
    pub entry: String,

    /// Run the compiler's optimizer.
    #[arg(long)]
    pub optimize: bool,

    /// Library link directives (`name:address`, separated by spaces or commas).
    #[arg(long, default_value = "")]
    pub libraries: String,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Request(ref args) => request::run(args, &global),
        Command::Clean => clean::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the log subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(global)));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn default_filter(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_compile_default() {
        let cli = Cli::parse_from(["kiln", "compile", "src/Token.sol"]);
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.entry, "src/Token.sol");
                assert!(!args.optimize);
                assert_eq!(args.libraries, "");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_compile_with_args() {
        let cli = Cli::parse_from([
            "kiln",
            "compile",
            "Token.sol",
            "--optimize",
            "--libraries",
            "Math:0x1234",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Compile(ref args) => {
                assert!(args.optimize);
                assert_eq!(args.libraries, "Math:0x1234");
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_request() {
        let cli = Cli::parse_from(["kiln", "request", "a.sol", "--optimize"]);
        match cli.command {
            Command::Request(ref args) => {
                assert_eq!(args.entry, "a.sol");
                assert!(args.optimize);
            }
            _ => panic!("expected Request command"),
        }
    }

    #[test]
    fn parse_clean() {
        let cli = Cli::parse_from(["kiln", "clean"]);
        assert!(matches!(cli.command, Command::Clean));
    }

    #[test]
    fn compile_requires_entry() {
        assert!(Cli::try_parse_from(["kiln", "compile"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kiln", "--quiet", "clean"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);

        let cli = Cli::parse_from(["kiln", "clean", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["kiln", "--config", "/path/to/kiln.toml", "clean"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/kiln.toml"));
    }

    #[test]
    fn default_filter_levels() {
        let mut global = GlobalArgs {
            quiet: false,
            verbose: false,
            config: None,
        };
        assert_eq!(default_filter(&global), "warn");
        global.quiet = true;
        assert_eq!(default_filter(&global), "error");
        global.verbose = true;
        assert_eq!(default_filter(&global), "debug");
    }
}
