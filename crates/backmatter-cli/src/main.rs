// Progress display and summaries convert counts to f64.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::needless_pass_by_value,    // clap hands over owned values
    clippy::fn_params_excessive_bools,
)]

//! backmatter - enrich TEI letters with their back matter
//!
//! Resolves every PMB entity a letter mentions and writes the entries to
//! its `<back>` appendix. Runs on one file or a whole edition in parallel.

mod batch;
mod checkpoint;
mod config;

use anyhow::{Context, Result};
use backmatter_pipeline::{validate_file, Enricher, FileStatus, Resolver};
use batch::{BatchOptions, BatchSummary};
use checkpoint::Checkpointer;
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{BatchSettings, Config, ResolverSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Errors only
    Quiet,
    Normal,
    /// Extra details and info logging
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
        }
    }
}

#[derive(Parser)]
#[command(name = "backmatter")]
#[command(version, about = "Enrich TEI letters with PMB back matter", long_about = None)]
struct Args {
    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Show detailed progress and info logging
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Config file (replaces ./.backmatter.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Resolver flags shared by `enrich` and `batch`.
#[derive(clap::Args, Debug, Clone, Default)]
struct ResolverArgs {
    /// Directory with listperson.xml, listbibl.xml, ...
    #[arg(long, value_name = "DIR")]
    lists_dir: Option<PathBuf>,

    /// Base URL of the PMB TEI endpoint
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// Never call the PMB API
    #[arg(long)]
    offline: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl ResolverArgs {
    /// Overlay the flags on the configured settings.
    fn apply(self, settings: ResolverSettings) -> ResolverSettings {
        ResolverSettings {
            lists_dir: self.lists_dir.or(settings.lists_dir),
            api_base: self.api_base.or(settings.api_base),
            timeout_secs: self.timeout.or(settings.timeout_secs),
            cache_capacity: settings.cache_capacity,
            offline: if self.offline {
                Some(true)
            } else {
                settings.offline
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a single letter
    Enrich {
        /// Letter to enrich
        input: PathBuf,

        /// Output file (default: overwrite the input)
        output: Option<PathBuf>,

        #[command(flatten)]
        resolver: ResolverArgs,
    },

    /// Enrich every matching letter in a directory
    Batch {
        /// Directory holding the letters [default: editions]
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Glob pattern relative to --dir [default: L*.xml]
        #[arg(long)]
        pattern: Option<String>,

        /// Number of worker threads [default: 4]
        #[arg(short = 'j', long)]
        parallel: Option<usize>,

        /// Process at most N files
        #[arg(short = 'l', long)]
        limit: Option<usize>,

        /// Commit every N successful files (0 disables)
        #[arg(long, value_name = "N")]
        commit_interval: Option<usize>,

        /// Push after each intermediate commit
        #[arg(long)]
        push: bool,

        /// Abandon a document after SECS seconds (0 disables) [default: 600]
        #[arg(long, value_name = "SECS")]
        document_timeout: Option<u64>,

        /// Print the summary as JSON on stdout
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        resolver: ResolverArgs,
    },

    /// Check enriched letters for empty births and idnos
    Validate {
        /// Directory to scan [default: editions]
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Glob pattern relative to --dir
        #[arg(long, default_value = "**/*.xml")]
        pattern: String,

        /// Write the relative paths of problematic files here
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged configuration with defaults
    Show,
    /// Print the config file locations and whether they exist
    Path,
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    let config = Config::discover(args.config.as_deref())?;

    match args.command {
        Commands::Enrich {
            input,
            output,
            resolver,
        } => enrich_command(
            &input,
            output.as_deref(),
            resolver.apply(config.resolver_settings()),
            verbosity,
        ),
        Commands::Batch {
            dir,
            pattern,
            parallel,
            limit,
            commit_interval,
            push,
            document_timeout,
            json,
            resolver,
        } => {
            let configured = config.batch_settings();
            let settings = BatchSettings {
                dir: dir.or(configured.dir),
                pattern: pattern.or(configured.pattern),
                parallel: parallel.or(configured.parallel),
                commit_interval: commit_interval.or(configured.commit_interval),
                push: if push { Some(true) } else { configured.push },
                document_timeout_secs: document_timeout.or(configured.document_timeout_secs),
            };
            batch_command(
                settings,
                limit,
                json,
                resolver.apply(config.resolver_settings()),
                verbosity,
            )
        }
        Commands::Validate {
            dir,
            pattern,
            report,
        } => {
            let dir = dir
                .or(config.batch_settings().dir)
                .unwrap_or_else(|| PathBuf::from(config::DEFAULT_EDITIONS_DIR));
            validate_command(&dir, &pattern, report.as_deref(), verbosity)
        }
        Commands::Config { action } => config_command(action, &config, args.config.as_deref()),
    }
}

fn build_enricher(settings: &ResolverSettings, verbosity: Verbosity) -> Result<Enricher> {
    let resolver_config = settings.to_resolver_config();
    let resolver = Resolver::from_config(&resolver_config).context("Failed to set up PMB resolver")?;
    if verbosity.is_verbose() {
        eprintln!(
            "Indexed {} PMB records from {}{}",
            resolver.index().len(),
            resolver_config.lists_dir.display(),
            if resolver.is_offline() { " (offline)" } else { "" }
        );
    }
    Ok(Enricher::new(Arc::new(resolver)))
}

fn enrich_command(
    input: &Path,
    output: Option<&Path>,
    settings: ResolverSettings,
    verbosity: Verbosity,
) -> Result<()> {
    if !input.exists() {
        eprintln!(
            "{} Input file not found: {}",
            "Error:".red().bold(),
            input.display()
        );
        std::process::exit(1);
    }

    let enricher = build_enricher(&settings, verbosity)?;
    let report = enricher
        .process_file(input, output, None)
        .with_context(|| format!("Failed to enrich {}", input.display()))?;

    if verbosity.should_show_output() {
        match report.status {
            FileStatus::Written => {
                eprintln!(
                    "{} {} -> {} ({:.2}s)",
                    "✓".green(),
                    report.input.display(),
                    report.output.display(),
                    report.duration.as_secs_f64()
                );
                if let Some(summary) = report.summary.filter(|_| verbosity.is_verbose()) {
                    eprintln!(
                        "  {} references, {} resolved, {} unresolved, {} authors added",
                        summary.references,
                        summary.populated.resolved,
                        summary.populated.unresolved,
                        summary.authors.entries
                    );
                }
            }
            FileStatus::Unchanged => {
                eprintln!("Skip: {} has no text body", report.input.display());
            }
            FileStatus::Cancelled => {}
        }
        eprintln!();
        eprintln!("{}", "=== PMB Processing Statistics ===".bold());
        eprintln!("{}", enricher.resolver().stats());
    }
    Ok(())
}

fn batch_command(
    settings: BatchSettings,
    limit: Option<usize>,
    json: bool,
    resolver: ResolverSettings,
    verbosity: Verbosity,
) -> Result<()> {
    let settings = BatchSettings::defaults().overlay(settings);
    let dir = settings
        .dir
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_EDITIONS_DIR));
    if !dir.is_dir() {
        eprintln!(
            "{} Directory not found: {}",
            "Error:".red().bold(),
            dir.display()
        );
        std::process::exit(1);
    }

    let commit_interval = settings.commit_interval.unwrap_or(0);
    let options = BatchOptions {
        dir: dir.clone(),
        pattern: settings
            .pattern
            .unwrap_or_else(|| config::DEFAULT_PATTERN.to_string()),
        parallel: settings.parallel.unwrap_or(config::DEFAULT_PARALLEL),
        limit,
        document_timeout: settings
            .document_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs),
        checkpointer: (commit_interval > 0).then(|| {
            Checkpointer::new(".", commit_interval, settings.push.unwrap_or(false))
        }),
        show_output: verbosity.should_show_output() && !json,
    };

    let enricher = build_enricher(&resolver, verbosity)?;
    let summary = batch::run_batch(&enricher, &options)?;

    if summary.total == 0 && verbosity.should_show_output() {
        eprintln!(
            "{} No files matching {} in {}",
            "Warning:".yellow().bold(),
            options.pattern,
            dir.display()
        );
    }

    report_summary(&summary, json, verbosity)?;

    if summary.failed > 0 {
        anyhow::bail!("{} of {} files failed", summary.failed, summary.total);
    }
    Ok(())
}

fn report_summary(summary: &BatchSummary, json: bool, verbosity: Verbosity) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        println!("{text}");
    } else if verbosity.should_show_output() {
        summary.print();
        if verbosity.is_verbose() && !summary.failures.is_empty() {
            eprintln!();
            eprintln!("{}", "Failed files:".red().bold());
            for failure in &summary.failures {
                eprintln!(
                    "  {} {}: {}",
                    "✗".red(),
                    failure.path.display(),
                    failure.error.as_deref().unwrap_or("failed")
                );
            }
        }
    }
    Ok(())
}

fn validate_command(
    dir: &Path,
    pattern: &str,
    report: Option<&Path>,
    verbosity: Verbosity,
) -> Result<()> {
    let files = batch::discover_files(dir, pattern, None)?;
    let mut problematic = Vec::new();

    for path in &files {
        let result = validate_file(path);
        if result.is_valid() {
            continue;
        }
        let relative = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
        if verbosity.should_show_output() {
            eprintln!("{} {}", "✗".red(), relative.display());
            for issue in &result.issues {
                eprintln!("    {issue}");
            }
        }
        problematic.push(relative);
    }

    if let Some(report) = report {
        let contents: String = problematic
            .iter()
            .map(|p| format!("{}\n", p.display()))
            .collect();
        fs::write(report, contents)
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
    }

    if verbosity.should_show_output() {
        eprintln!(
            "Checked {} files: {} valid, {} with issues",
            files.len(),
            files.len() - problematic.len(),
            problematic.len()
        );
    }

    if !problematic.is_empty() {
        anyhow::bail!("{} files have validation issues", problematic.len());
    }
    Ok(())
}

fn config_command(action: ConfigAction, config: &Config, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(&config.effective()).context("Failed to serialize config")?;
            print!("{text}");
        }
        ConfigAction::Path => {
            let describe = |path: &Path| {
                if path.exists() {
                    "(exists)".green().to_string()
                } else {
                    "(not found)".dimmed().to_string()
                }
            };
            if let Some(user) = Config::user_config_path() {
                println!("User:    {} {}", user.display(), describe(&user));
            }
            let project = explicit.map_or_else(Config::project_config_path, Path::to_path_buf);
            let label = if explicit.is_some() { "Explicit:" } else { "Project:" };
            println!("{label:<8} {} {}", project.display(), describe(&project));
        }
    }
    Ok(())
}
