//! # TimedFile CLI - Save, diff and undo for a single file
//!
//! ## Usage
//! ```bash
//! # Save the current content
//! timedfile --file notes.txt save --name "Ada" --email ada@example.com
//!
//! # Word-level diff against the last save
//! timedfile --file notes.txt diff
//!
//! # Restore the previous save, or discard uncommitted edits
//! timedfile --file notes.txt rollback
//! timedfile --file notes.txt reset
//!
//! # Keep one handle alive so rollback/fastforward can be chained
//! timedfile --file notes.txt shell
//! ```

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use std::path::{Path, PathBuf};
use std::time::Duration;
use timedfile::utils::format_bytes;
use timedfile::{Author, Commit, DiffSummary, Hunk, TimedFile, TimedFileBuilder, TimedFileError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// TimedFile CLI - version history for a single file
#[derive(Parser)]
#[command(name = "timedfile")]
#[command(version)]
#[command(about = "Save, diff, roll back and reset a single file")]
#[command(long_about = None)]
struct Cli {
    /// File to track
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Versions directory (defaults to .versions next to the file)
    #[arg(long, global = true)]
    versions: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the current content as a new commit
    Save {
        /// Author name
        #[arg(short, long)]
        name: String,

        /// Author email
        #[arg(short, long)]
        email: String,
    },

    /// Show changes since the last save
    Diff {
        /// Treat any run of whitespace as equal
        #[arg(long)]
        ignore_whitespace: bool,

        /// Show only statistics
        #[arg(long)]
        stat: bool,
    },

    /// Restore the commit before the last save
    #[command(alias = "rb")]
    Rollback,

    /// Discard uncommitted edits
    Reset,

    /// List commits
    #[command(alias = "ls")]
    Log {
        /// Limit results to the most recent commits
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show status
    Status,

    /// Read commands from stdin against a single handle
    Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<TimedFileError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("{}: {}", "Error".red().bold(), message);
        std::process::exit(1);
    }
}

/// Main command runner
async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(file) = cli.file else {
        bail!("--file is required");
    };
    let file = absolutize(&file)?;
    let versions = match cli.versions {
        Some(versions) => absolutize(&versions)?,
        None => file
            .parent()
            .map(|dir| dir.join(".versions"))
            .context("tracked file has no parent directory")?,
    };

    let ignore_whitespace = matches!(
        cli.command,
        Commands::Diff {
            ignore_whitespace: true,
            ..
        }
    );
    let timed = TimedFileBuilder::new()
        .ignore_whitespace(ignore_whitespace)
        .build(file, versions)
        .context("failed to open file history")?;

    match cli.command {
        Commands::Save { name, email } => cmd_save(&timed, Author::new(name, email)).await,
        Commands::Diff { stat, .. } => cmd_diff(&timed, stat).await,
        Commands::Rollback => cmd_rollback(&timed).await,
        Commands::Reset => cmd_reset(&timed).await,
        Commands::Log { limit } => cmd_log(&timed, limit).await,
        Commands::Status => cmd_status(&timed).await,
        Commands::Shell => cmd_shell(&timed).await,
    }
}

fn absolutize(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot read current directory")?;
    Ok(cwd.join(path))
}

/// Save the working file
async fn cmd_save(timed: &TimedFile, author: Author) -> anyhow::Result<()> {
    let id = timed.save(&author).await?;
    let commits = timed.history().await?.len();

    println!("{} Saved {}", "✓".green().bold(), id.short().yellow().bold());
    println!("  Author: {}", author.to_string().cyan());
    println!("  Commits: {}", commits.to_string().cyan());
    Ok(())
}

/// Show the diff against HEAD
async fn cmd_diff(timed: &TimedFile, stat: bool) -> anyhow::Result<()> {
    let hunks = timed.diff().await?;
    let summary = DiffSummary::from_hunks(&hunks);

    if !summary.has_changes() {
        println!("{}", "No changes since the last save.".green());
        return Ok(());
    }

    if !stat {
        print_hunks(&hunks);
        println!();
    }

    println!(
        "{} tokens added, {} tokens removed, {} unchanged",
        summary.tokens_added.to_string().green(),
        summary.tokens_removed.to_string().red(),
        summary.tokens_unchanged.to_string().dimmed()
    );
    Ok(())
}

fn print_hunks(hunks: &[Hunk]) {
    for hunk in hunks {
        match hunk {
            Hunk::Unchanged { value, .. } => print!("{}", value),
            Hunk::Added { value, .. } => print!("{}", value.green().underline()),
            Hunk::Removed { value, .. } => print!("{}", value.red().strikethrough()),
        }
    }
}

/// Restore the previous commit
async fn cmd_rollback(timed: &TimedFile) -> anyhow::Result<()> {
    let before = timed.head().await?;
    timed.rollback().await?;
    let after = timed.head().await?;

    match (before, after) {
        (Some(before), Some(after)) if before != after => {
            println!(
                "{} Rolled back {} -> {}",
                "✓".green().bold(),
                before.short().dimmed(),
                after.short().yellow().bold()
            );
        }
        _ => println!("{}", "Nothing to roll back.".yellow()),
    }
    Ok(())
}

/// Redo the most recent rollback
async fn cmd_fastforward(timed: &TimedFile) -> anyhow::Result<()> {
    if timed.roll_depth().await? == 0 {
        println!("{}", "Nothing to fast forward.".yellow());
        return Ok(());
    }

    timed.fastforward().await?;
    if let Some(head) = timed.head().await? {
        println!("{} Fast forwarded to {}", "✓".green().bold(), head.short().yellow().bold());
    }
    Ok(())
}

/// Restore HEAD over the working file
async fn cmd_reset(timed: &TimedFile) -> anyhow::Result<()> {
    match timed.head().await? {
        Some(head) => {
            timed.reset().await?;
            println!("{} Reset to {}", "✓".green().bold(), head.short().yellow().bold());
        }
        None => println!("{}", "Nothing saved yet.".yellow()),
    }
    Ok(())
}

/// List commits, newest last
async fn cmd_log(timed: &TimedFile, limit: Option<usize>) -> anyhow::Result<()> {
    let commits = timed.log().await?;
    if commits.is_empty() {
        println!("{}", "No commits found.".yellow());
        return Ok(());
    }

    let head = timed.head().await?;
    let skip = limit.map_or(0, |limit| commits.len().saturating_sub(limit));

    println!("{}", "Commits:".blue().bold());
    for commit in commits.iter().skip(skip) {
        let marker = if head.as_ref() == Some(&commit.id) {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!(
            "{} {} {} {} {}",
            marker,
            commit.id.short().yellow().bold(),
            format!("#{}", commit.position).dimmed(),
            commit.author.to_string().cyan(),
            format!("({}, {} ago)", format_bytes(commit.size), age(commit)).dimmed()
        );
    }

    if skip > 0 {
        println!(
            "\n{}",
            format!("Showing {} of {} commits", commits.len() - skip, commits.len()).dimmed()
        );
    }
    Ok(())
}

fn age(commit: &Commit) -> String {
    let elapsed = (Utc::now() - commit.timestamp).to_std().unwrap_or_default();
    format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

/// Show status
async fn cmd_status(timed: &TimedFile) -> anyhow::Result<()> {
    let history = timed.history().await?;

    println!("{}", "TimedFile Status".blue().bold());
    println!("  File: {}", timed.file_path().display().to_string().cyan());
    println!("  Versions: {}", timed.versions_path().display().to_string().cyan());
    println!("  Commits: {}", history.len().to_string().cyan());

    match timed.head().await? {
        Some(head) => println!("  HEAD: {}", head.short().yellow()),
        None => println!("  HEAD: {}", "none".dimmed()),
    }

    let rolls = timed.roll_depth().await?;
    if rolls > 0 {
        println!("  Pending fast forwards: {}", rolls.to_string().yellow());
    }

    if !history.is_empty() {
        let summary = DiffSummary::from_hunks(&timed.diff().await?);
        if summary.has_changes() {
            println!(
                "  Working copy: {} (+{} -{} tokens)",
                "modified".yellow(),
                summary.tokens_added,
                summary.tokens_removed
            );
        } else {
            println!("  Working copy: {}", "clean".green());
        }
    }
    Ok(())
}

/// Interactive loop over stdin
///
/// Each line is one command. Errors are reported and the loop continues.
async fn cmd_shell(timed: &TimedFile) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["save", name, email] => cmd_save(timed, Author::new(*name, *email)).await,
            ["diff"] => cmd_diff(timed, false).await,
            ["stat"] => cmd_diff(timed, true).await,
            ["rollback"] => cmd_rollback(timed).await,
            ["fastforward"] | ["ff"] => cmd_fastforward(timed).await,
            ["reset"] => cmd_reset(timed).await,
            ["rolls"] => match timed.roll_depth().await {
                Ok(depth) => {
                    println!("{}", depth);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            ["log"] => cmd_log(timed, None).await,
            ["status"] => cmd_status(timed).await,
            ["help"] => {
                print_shell_help();
                Ok(())
            }
            _ => {
                eprintln!("{}: unknown command '{}' (try 'help')", "Error".red().bold(), line.trim());
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
        }
    }
    Ok(())
}

fn print_shell_help() {
    println!("{}", "Commands:".blue().bold());
    println!("  save <name> <email>   Save the working file");
    println!("  diff | stat           Show changes since HEAD");
    println!("  rollback              Restore the previous commit");
    println!("  fastforward | ff      Redo the last rollback");
    println!("  reset                 Discard uncommitted edits");
    println!("  rolls                 Number of pending fast forwards");
    println!("  log | status          Show history or status");
    println!("  quit | exit           Leave the shell");
}
