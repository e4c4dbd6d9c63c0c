use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use name_locator::{
    load_from_path, run_name_matcher, LocatorConfig, ResolvedLoc, SourceFile, SourceLoc,
    SwiftNameMatcher,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "name-locator")]
#[command(about = "Resolve names and argument labels in Swift source", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve byte offsets in a Swift file
    Resolve {
        /// Swift source file
        file: PathBuf,

        /// Byte offset to resolve (repeatable)
        #[arg(short, long = "offset", required = true)]
        offsets: Vec<usize>,

        /// Locator config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Additional active compilation condition (repeatable)
        #[arg(short = 'D', long = "condition")]
        conditions: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve every identifier in a file or directory and summarize
    Sweep {
        /// Swift file or directory to walk
        path: PathBuf,

        /// Locator config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a locator config file
    CheckConfig {
        /// Path to the config file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            file,
            offsets,
            config,
            conditions,
            json,
        } => cmd_resolve(&file, &offsets, config.as_deref(), &conditions, json),

        Commands::Sweep { path, config } => cmd_sweep(&path, config.as_deref()),

        Commands::CheckConfig { path } => cmd_check_config(&path),
    }
}

/// Logging is off unless `NAME_LOCATOR_LOG` holds a filter directive.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("NAME_LOCATOR_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LocatorConfig> {
    match path {
        Some(path) => Ok(load_from_path(path)?),
        None => Ok(LocatorConfig::default()),
    }
}

#[derive(Serialize)]
struct JsonResult<'a> {
    offset: usize,
    text: Option<&'a str>,
    labels: Vec<Option<&'a str>>,
    #[serde(flatten)]
    resolved: &'a ResolvedLoc,
}

fn cmd_resolve(
    path: &Path,
    offsets: &[usize],
    config: Option<&Path>,
    conditions: &[String],
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let matcher = config.matcher(conditions.iter().map(String::as_str));
    let file = SourceFile::read(path)?;

    let locations: Vec<SourceLoc> = offsets.iter().copied().map(SourceLoc::new).collect();
    let vector = run_name_matcher(&matcher, &file, &locations)
        .with_context(|| format!("failed to resolve names in {}", path.display()))?;
    let results = vector.into_vec()?;

    if json {
        let rows: Vec<JsonResult<'_>> = offsets
            .iter()
            .zip(&results)
            .map(|(offset, resolved)| JsonResult {
                offset: *offset,
                text: file.text(resolved.range()),
                labels: resolved
                    .label_ranges()
                    .iter()
                    .map(|range| file.text(*range))
                    .collect(),
                resolved,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (offset, resolved) in offsets.iter().zip(&results) {
        print_resolved(&file, *offset, resolved);
    }

    Ok(())
}

fn print_resolved(file: &SourceFile, offset: usize, loc: &ResolvedLoc) {
    let name = file.text(loc.range()).unwrap_or("");
    let status = if loc.is_active() {
        "active".green()
    } else {
        "inactive".yellow()
    };

    println!(
        "{} {} {} [{}, {}]",
        format!("{offset:>6}").dimmed(),
        if name.is_empty() {
            "<none>".red()
        } else {
            name.bold()
        },
        loc.label_type().as_str().cyan(),
        loc.context(),
        status
    );

    for (idx, range) in loc.label_ranges().iter().enumerate() {
        let marker = if loc.first_trailing_label() == Some(idx) {
            "trailing".magenta().to_string()
        } else {
            String::new()
        };
        println!(
            "         label {idx}: {:?} {marker}",
            file.text(*range).unwrap_or("")
        );
    }
}

#[derive(Default)]
struct SweepTally {
    locations: usize,
    label_types: BTreeMap<&'static str, usize>,
    contexts: BTreeMap<&'static str, usize>,
    inactive: usize,
}

impl SweepTally {
    fn record(&mut self, loc: &ResolvedLoc) {
        self.locations += 1;
        *self.label_types.entry(loc.label_type().as_str()).or_default() += 1;
        *self.contexts.entry(loc.context().as_str()).or_default() += 1;
        if !loc.is_active() {
            self.inactive += 1;
        }
    }

    fn merge(&mut self, other: &SweepTally) {
        self.locations += other.locations;
        self.inactive += other.inactive;
        for (key, count) in &other.label_types {
            *self.label_types.entry(*key).or_default() += count;
        }
        for (key, count) in &other.contexts {
            *self.contexts.entry(*key).or_default() += count;
        }
    }

    fn summary(&self) -> String {
        let join = |map: &BTreeMap<&'static str, usize>| {
            map.iter()
                .map(|(key, count)| format!("{key}={count}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!(
            "{} locations, {} inactive | {} | {}",
            self.locations,
            self.inactive,
            join(&self.label_types),
            join(&self.contexts)
        )
    }
}

fn cmd_sweep(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let matcher = config.matcher(std::iter::empty());

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("swift")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .swift files found under {}", path.display());
    }

    let mut total = SweepTally::default();
    let mut failed = 0;

    for file_path in &files {
        let tally = match sweep_file(&matcher, file_path) {
            Ok(tally) => tally,
            Err(e) => {
                println!("  {} {}: {e:#}", "✗".red(), file_path.display());
                failed += 1;
                continue;
            }
        };
        println!(
            "  {} {}: {}",
            "✓".green(),
            file_path.display(),
            tally.summary()
        );
        total.merge(&tally);
    }

    println!();
    println!(
        "{} {} files: {}",
        "Total".bold(),
        files.len() - failed,
        total.summary()
    );

    if failed > 0 {
        anyhow::bail!("{failed} file(s) could not be resolved");
    }
    Ok(())
}

fn sweep_file(matcher: &SwiftNameMatcher, path: &Path) -> Result<SweepTally> {
    let file = SourceFile::read(path)?;
    let locations = file.identifier_starts();
    let results = run_name_matcher(matcher, &file, &locations)?.into_vec()?;

    let mut tally = SweepTally::default();
    for loc in &results {
        tally.record(loc);
    }
    Ok(tally)
}

fn cmd_check_config(path: &Path) -> Result<()> {
    match load_from_path(path) {
        Ok(config) => {
            println!("{} {}", "✓".green(), path.display());
            println!(
                "  {} active condition(s), comments={}, strings={}, reject_syntax_errors={}",
                config.conditions.active.len(),
                config.matcher.resolve_in_comments,
                config.matcher.resolve_in_strings,
                config.matcher.reject_syntax_errors
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), path.display());
            Err(e.into())
        }
    }
}
