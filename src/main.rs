use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use seqpatch::config::{load_from_path, PatchResult};
use seqpatch::diagnostics::{log_sequence, Context};
use seqpatch::ir::{InstructionStream, MethodBody};
use seqpatch::logging::{self, LogConfig};
use seqpatch::seq::SequenceMatcher;
use seqpatch::session::PatchSession;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "seqpatch")]
#[command(about = "Pattern-based rewriting of decoded instruction streams", long_about = None)]
#[command(version)]
struct Cli {
    /// Include targets and source locations in log lines
    #[arg(long, global = true)]
    debug: bool,

    /// Also write log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch sets to a method body
    Apply {
        /// Method body JSON file
        #[arg(short, long)]
        stream: PathBuf,

        /// Patch set TOML files, applied in order
        #[arg(short, long, required = true, num_args = 1..)]
        patches: Vec<PathBuf>,

        /// Host version checked against each set's version_range
        #[arg(long, default_value = "0.0.0")]
        host_version: String,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show what would change without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show a listing diff of the changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Locate one patch's target sequence without rewriting
    Find {
        #[arg(short, long)]
        stream: PathBuf,

        #[arg(short, long)]
        patches: PathBuf,

        /// Patch id whose target to look for
        #[arg(long)]
        id: String,

        /// Log every element of the match
        #[arg(short, long)]
        verbose: bool,
    },

    /// Log a method body, one instruction per line
    Dump {
        #[arg(short, long)]
        stream: PathBuf,
    },

    /// List patch definitions and their constraints
    List {
        #[arg(short, long, required = true, num_args = 1..)]
        patches: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig {
        debug_mode: cli.debug,
        log_file: cli.log_file.clone(),
        filter: None,
    })?;

    match cli.command {
        Commands::Apply {
            stream,
            patches,
            host_version,
            output,
            dry_run,
            diff,
        } => cmd_apply(&stream, &patches, &host_version, output, dry_run, diff),

        Commands::Find {
            stream,
            patches,
            id,
            verbose,
        } => cmd_find(&stream, &patches, &id, verbose),

        Commands::Dump { stream } => cmd_dump(&stream),

        Commands::List { patches } => cmd_list(&patches),
    }
}

fn cmd_apply(
    stream_path: &Path,
    patch_paths: &[PathBuf],
    host_version: &str,
    output: Option<PathBuf>,
    dry_run: bool,
    diff: bool,
) -> Result<()> {
    let mut body = MethodBody::load(stream_path)?;
    let original = plain_listing(&body.instructions);

    let mut session = PatchSession::new(host_version);
    session.init_from_paths(patch_paths)?;
    let report = session.transpile(&body.method, &mut body.instructions)?;
    let stats = session.teardown()?;

    if report.is_empty() {
        println!(
            "{}",
            format!("No patches target {}", body.method).yellow()
        );
    }

    for (id, result) in &report {
        match result {
            Ok(r @ PatchResult::Applied { .. }) => {
                println!("  {} {}: {}", "✓".green(), id, r);
            }
            Ok(r @ PatchResult::NotFound { .. }) => {
                println!("  {} {}: {}", "-".yellow(), id, r);
            }
            Ok(r) => {
                println!("  {} {}: {}", "·".dimmed(), id, r);
            }
            Err(e) => {
                println!("  {} {}: {}", "✗".red(), id, e);
            }
        }
    }

    let patched = plain_listing(&body.instructions);
    if diff && patched != original {
        display_diff(&body.method, &original, &patched);
    }

    println!(
        "\n{} applied, {} not found, {} skipped, {} failed",
        stats.applied.to_string().green(),
        stats.not_found.to_string().yellow(),
        stats.skipped,
        stats.failed.to_string().red()
    );

    if dry_run {
        println!("{}", "Dry run: nothing written".dimmed());
    } else if stats.applied > 0 {
        let target = output.unwrap_or_else(|| stream_path.to_path_buf());
        body.save(&target)?;
        println!("Wrote {}", target.display());
    }

    if stats.failed > 0 {
        anyhow::bail!("{} patch(es) failed", stats.failed);
    }
    Ok(())
}

fn cmd_find(stream_path: &Path, patch_path: &Path, id: &str, verbose: bool) -> Result<()> {
    let body = MethodBody::load(stream_path)?;
    let config = load_from_path(patch_path)?;
    let patch = config
        .patches
        .iter()
        .find(|p| p.id == id)
        .with_context(|| format!("no patch with id '{id}' in {}", patch_path.display()))?;
    let spec = patch.to_spec()?;

    let context = Context::with_caller(id, patch_path.display().to_string());
    let matcher = SequenceMatcher::new(&body.instructions)
        .check_mode(spec.check)
        .verbose(verbose)
        .context(&context);

    match matcher.find(&spec.target) {
        Some(start) => {
            println!(
                "{} found at {}..{} in {}",
                id.green(),
                start,
                start + spec.target.len(),
                body.method
            );
        }
        None => {
            println!("{} not found in {}", id.yellow(), body.method);
        }
    }
    Ok(())
}

fn cmd_dump(stream_path: &Path) -> Result<()> {
    let body = MethodBody::load(stream_path)?;
    log_sequence(
        &format!("{} ({} instructions):", body.method, body.instructions.len()),
        body.instructions.iter(),
    );
    print!("{}", body.instructions.listing());
    Ok(())
}

fn cmd_list(patch_paths: &[PathBuf]) -> Result<()> {
    for path in patch_paths {
        let config = load_from_path(path)?;
        let range = config.meta.version_range.as_deref().unwrap_or("any");
        println!(
            "{} {} {}",
            config.meta.name.bold(),
            format!("[{range}]").dimmed(),
            path.display().to_string().dimmed()
        );
        if let Some(description) = &config.meta.description {
            println!("  {description}");
        }
        for patch in &config.patches {
            let mut flags = Vec::new();
            if patch.required {
                flags.push("required");
            }
            if patch.all_occurrences {
                flags.push("all");
            }
            if patch.to_spec().is_err() {
                flags.push("unusable");
            }
            println!(
                "  {} -> {} ({}, check {}){}",
                patch.id.cyan(),
                patch.method,
                patch.mode,
                patch.check,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }
    }
    Ok(())
}

/// Listing without index prefixes, so insertions don't renumber every later line.
fn plain_listing(stream: &InstructionStream) -> String {
    stream.iter().map(|ins| format!("{ins}\n")).collect()
}

fn display_diff(method: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {method} (original)").dimmed());
    println!("{}", format!("+++ {method} (patched)").dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{line}");
    }
}
