#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use omit_tilde_core::{Options, Pattern, Policy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "omit-tilde")]
#[command(author, version, about = "Find relative imports that should be module lookups", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve every import under PATHS and report requests to rewrite
    Scan {
        /// Files or directories to scan (default: the working directory)
        paths: Vec<PathBuf>,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },

    /// Print the package names that would be rewritten
    Names {
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
}

/// Flags shared by commands that build the plugin.
#[derive(clap::Args, Debug, Clone)]
struct RewriteArgs {
    /// Options file (JSON); flags below override it
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Package names or manifest paths to watch (default: package.json)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Package names to ignore
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Request patterns (prefix, or /regex/)
    #[arg(long, value_delimiter = ',')]
    test: Vec<String>,

    /// Directory patterns (prefix, or /regex/)
    #[arg(long, value_delimiter = ',')]
    path_test: Vec<String>,

    /// Only advise; keep the original resolution
    #[arg(long)]
    deprecate: bool,

    /// How the directory and module attempts are combined
    /// (directory-first | relative-first)
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    policy: Option<Policy>,

    /// Log every eligibility decision
    #[arg(long)]
    trace: bool,
}

fn parse_policy(s: &str) -> Result<Policy, omit_tilde_core::Error> {
    s.parse()
}

impl RewriteArgs {
    /// Merge the options file (if any) with command-line flags.
    fn to_options(&self, cwd: &std::path::Path) -> Result<Options, omit_tilde_core::Error> {
        let mut options = match &self.config {
            Some(path) => Options::from_file(&cwd.join(path))?,
            None => Options::default(),
        };

        if !self.include.is_empty() {
            options.include.clone_from(&self.include);
        }
        options.exclude.extend(self.exclude.iter().cloned());
        options
            .test
            .extend(self.test.iter().map(|p| Pattern::parse(p)));
        options
            .path_test
            .extend(self.path_test.iter().map(|p| Pattern::parse(p)));
        if self.deprecate {
            options.deprecate = true;
        }
        if let Some(policy) = self.policy {
            options.policy = policy;
        }
        if self.trace {
            options.verbose = true;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Scan { paths, rewrite } => match rewrite.to_options(&cwd) {
            Ok(options) => commands::scan::run(
                commands::scan::ScanAction {
                    cwd,
                    paths,
                    options,
                },
                cli.json,
            ),
            Err(e) => commands::fail(cli.json, commands::codes::CONFIG_INVALID, &e),
        },
        Commands::Names { rewrite } => match rewrite.to_options(&cwd) {
            Ok(options) => commands::names::run(&cwd, options, cli.json),
            Err(e) => commands::fail(cli.json, commands::codes::CONFIG_INVALID, &e),
        },
    }
}
