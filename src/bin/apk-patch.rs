//! CLI for keyword patching of decompiled APK trees.

use anyhow::{Context, Result, anyhow};
use apk_patch::prelude::*;
use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use tracing_subscriber::EnvFilter;

/// Config file looked up in the workspace when `--config` is not given.
const WORKSPACE_CONFIG: &str = "apk-patch.yaml";

#[derive(Parser)]
#[command(name = "apk-patch")]
#[command(author, version, about = "Keyword search, replace and revert for decompiled APKs", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Workspace directory (defaults to ~/Desktop/Apk_Patch)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Decompiled tree to operate on (defaults to <workspace>/base)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Journal file (defaults to <workspace>/modification_log.json)
    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for keyword(s) in the tree
    Search {
        /// Keyword(s) or sentence(s), separated by the delimiter
        keywords: String,

        /// File type to search (e.g. ".smali", "xml"); repeatable
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Do not draw the progress indicator
        #[arg(short, long)]
        quiet: bool,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete files whose name contains any keyword
    Delete {
        /// Keyword(s), separated by the delimiter
        keywords: String,

        /// Delete all matched files without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Replace keyword(s) inside text files
    Replace {
        /// Keyword(s), separated by the delimiter
        keywords: String,

        /// Replacement text
        #[arg(short = 'w', long = "with")]
        replacement: String,

        /// Replace all matched keywords without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Revert journaled replacements and list deleted files
    Revert,

    /// Show the modification journal
    Journal,

    /// Clear old APK files and folders, keeping dependencies
    Clean {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let config = load_config(&cli.global)?;
    let mut workspace = Workspace::from_config(&config);
    if let Some(root) = &cli.global.root {
        workspace = workspace.with_base(root);
    }
    if let Some(journal) = &cli.global.journal {
        workspace = workspace.with_journal(journal);
    }

    match cli.command {
        Commands::Search {
            keywords,
            types,
            quiet,
            json,
        } => {
            let types = if types.is_empty() {
                config.file_types.clone()
            } else {
                types
            };
            cmd_search(&workspace, &config, &keywords, types, quiet, json)
        }
        Commands::Delete { keywords, yes } => cmd_delete(&workspace, &config, &keywords, yes),
        Commands::Replace {
            keywords,
            replacement,
            yes,
        } => cmd_replace(&workspace, &config, &keywords, replacement, yes),
        Commands::Revert => cmd_revert(&workspace),
        Commands::Journal => cmd_journal(&workspace),
        Commands::Clean { yes } => cmd_clean(&workspace, yes),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(global: &GlobalArgs) -> Result<PatchConfig> {
    let mut config = match &global.config {
        Some(path) => PatchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let workspace = global
                .workspace
                .clone()
                .unwrap_or_else(|| PatchConfig::default().workspace);
            let candidate = workspace.join(WORKSPACE_CONFIG);
            if candidate.is_file() {
                PatchConfig::load(&candidate)
                    .with_context(|| format!("Failed to load config {}", candidate.display()))?
            } else {
                PatchConfig::default()
            }
        }
    };

    if let Some(workspace) = &global.workspace {
        config.workspace = workspace.clone();
    }
    Ok(config)
}

fn cmd_search(
    workspace: &Workspace,
    config: &PatchConfig,
    keywords: &str,
    types: Vec<String>,
    quiet: bool,
    json: bool,
) -> Result<()> {
    let keywords = KeywordSet::parse(keywords, config.delimiter)?;
    let draw = !quiet && std::io::stderr().is_terminal();

    let mut search = Search::in_tree(workspace.base_path())
        .keywords(keywords)
        .file_types(types);
    if draw {
        // The progress line replaces per-step log output.
        search = search.mode(ProgressMode::Quiet).on_progress(|percent| {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\rProgress: {percent}%");
            let _ = stderr.flush();
        });
    }

    let report = search.run().context("Search failed")?;
    if draw {
        eprintln!();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.matches)?);
        return Ok(());
    }

    println!("=== Matches Found ===");
    if report.matches.is_empty() {
        println!("No matches found.");
    } else {
        for m in &report.matches {
            println!("{m}");
        }
    }
    println!();
    println!("Total folders scanned: {}", report.folders_scanned);
    println!("Total files scanned: {}", report.files_scanned);

    Ok(())
}

fn cmd_delete(workspace: &Workspace, config: &PatchConfig, keywords: &str, yes: bool) -> Result<()> {
    let keywords = KeywordSet::parse(keywords, config.delimiter)?;
    let base = workspace.base_path().to_path_buf();
    let store = workspace.journal_store();
    let journal_path = store.path().to_path_buf();

    let report = with_policy(yes, move |policy| {
        MutationEngine::new(base, store, policy).delete_by_filename(&keywords)
    })?
    .context("Delete failed")?;

    print_failures(&report.failures);
    println!("Deleted {} file(s) matching keyword(s).", report.files_deleted);
    println!("Modification log saved to {}", journal_path.display());
    Ok(())
}

fn cmd_replace(
    workspace: &Workspace,
    config: &PatchConfig,
    keywords: &str,
    replacement: String,
    yes: bool,
) -> Result<()> {
    let keywords = KeywordSet::parse(keywords, config.delimiter)?;
    let base = workspace.base_path().to_path_buf();
    let store = workspace.journal_store();
    let journal_path = store.path().to_path_buf();

    let report = with_policy(yes, move |policy| {
        MutationEngine::new(base, store, policy).replace_by_keyword(&keywords, &replacement)
    })?
    .context("Replace failed")?;

    print_failures(&report.failures);
    println!(
        "Replaced {} line(s) in {} file(s).",
        report.lines_replaced, report.files_rewritten
    );
    println!("Modification log saved to {}", journal_path.display());
    Ok(())
}

fn cmd_revert(workspace: &Workspace) -> Result<()> {
    let store = workspace.journal_store();
    if !store.path().exists() {
        println!("No modification log found.");
        return Ok(());
    }
    let journal = store.load().context("Failed to load journal")?;
    let report = RevertEngine::new().revert(&journal);

    if journal.replaced_lines.is_empty() {
        println!("No replaced lines to revert.");
    }
    for line in &report.restored {
        println!(
            "Reverted line {} in {}",
            line.line_number,
            line.file_path.display()
        );
    }
    for warning in &report.warnings {
        println!("[!] {warning}");
    }
    print_failures(&report.failures);

    if report.unrestorable.is_empty() {
        println!("No deleted files logged.");
    } else {
        println!(
            "\nNote: {} file(s) were deleted and cannot be restored automatically:",
            report.unrestorable.len()
        );
        for path in &report.unrestorable {
            println!("- {}", path.display());
        }
    }

    println!("\nRevert operation completed.");
    Ok(())
}

fn cmd_journal(workspace: &Workspace) -> Result<()> {
    let store = workspace.journal_store();
    let journal = store.load().context("Failed to load journal")?;

    println!("Journal: {}", store.path().display());
    println!("Deleted files: {}", journal.deleted_files.len());
    for entry in &journal.deleted_files {
        println!("  - {}", entry.file_path.display());
    }
    println!("Replaced lines: {}", journal.replaced_lines.len());
    for entry in &journal.replaced_lines {
        println!(
            "  - {}:{} '{}' -> '{}'",
            entry.file_path.display(),
            entry.line_number,
            entry.keyword,
            entry.replacement
        );
    }
    Ok(())
}

fn cmd_clean(workspace: &Workspace, yes: bool) -> Result<()> {
    let root = workspace.clone();
    let report = with_policy(yes, move |mut policy| root.clear(&mut policy))?
        .context("Cleanup failed")?;

    if report.declined {
        println!("Skipping cleanup.");
        return Ok(());
    }
    for path in &report.removed {
        println!("Deleted: {}", path.display());
    }
    print_failures(&report.failures);
    println!("Cleanup complete. Only 'dependencies' folder remains.");
    Ok(())
}

/// Runs `job` with the requested confirmation policy.
///
/// Interactive jobs run on a worker thread; this thread answers their
/// prompts from the terminal until the worker finishes.
fn with_policy<T, F>(yes: bool, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Box<dyn ConfirmationPolicy>) -> T + Send + 'static,
{
    if yes {
        return Ok(job(Box::new(ConfirmAll)));
    }

    let colored = std::io::stderr().is_terminal();
    let (prompter, requests) = input_channel();
    let policy = AskEach::new(prompter).with_detail(move |request| match request {
        ConfirmRequest::ReplaceLine { line, replaced, .. } => Some(format!(
            "Preview: {}",
            render_line_change(line.trim(), replaced.trim(), colored)
        )),
        _ => None,
    });

    let worker = thread::spawn(move || job(Box::new(policy)));
    requests.serve(&mut StdinPrompter);
    worker.join().map_err(|_| anyhow!("worker thread panicked"))
}

fn print_failures(failures: &[ItemFailure]) {
    for failure in failures {
        eprintln!("[!] {failure}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_flags() {
        let cli = Cli::try_parse_from([
            "apk-patch", "search", "ad | tracker", "-t", ".smali", "--type", "xml", "--quiet",
            "--json",
        ])
        .unwrap();

        let Commands::Search {
            keywords,
            types,
            quiet,
            json,
        } = cli.command
        else {
            panic!("expected search command");
        };
        assert_eq!(keywords, "ad | tracker");
        assert_eq!(types, vec![".smali", "xml"]);
        assert!(quiet);
        assert!(json);
    }

    #[test]
    fn test_replace_requires_replacement() {
        assert!(Cli::try_parse_from(["apk-patch", "replace", "ad"]).is_err());

        let cli =
            Cli::try_parse_from(["apk-patch", "replace", "ad", "--with", "X", "-y", "-vv"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Commands::Replace { yes: true, .. }));
    }
}
