//! Phrasebook command line tool
//!
//! Reads and writes a local phrasebook database and prints the same JSON
//! bodies the service returns.
//!
//! # Usage
//!
//! ```bash
//! phrasebook --db words.db list --page 2
//! phrasebook --db words.db filter Proverb --page 1
//! phrasebook --db words.db search "thank" --page 1
//! phrasebook --db words.db add --phrase 谢谢 --pronunciation xièxiè --tag greeting
//! phrasebook --db words.db batch words.json
//! phrasebook --db words.db delete 42
//! phrasebook --db words.db import words.jsonl.gz
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use phrasebook_core::import::{self, ImportStats};
use phrasebook_core::{Config, Error, NewEntry, Phrasebook, Response, SqliteStore};

/// Phrasebook - list, filter, search and edit vocabulary entries
#[derive(Parser, Debug)]
#[command(name = "phrasebook")]
#[command(author, version, about = "Query and edit a phrasebook database")]
struct Args {
    /// SQLite database path
    #[arg(long, env = "PHRASEBOOK_DB")]
    db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entries per page
    #[arg(long, env = "PHRASEBOOK_PAGE_SIZE")]
    page_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every entry, or one page of entries
    List {
        #[arg(long, allow_hyphen_values = true)]
        page: Option<i64>,
    },
    /// List entries with a tag; "Proverb" and "EL" match the usage category
    Filter {
        tag: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,
    },
    /// Search every text field for a keyword
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,
    },
    /// Insert a single entry
    Add {
        #[arg(long)]
        phrase: String,
        #[arg(long)]
        pronunciation: Option<String>,
        #[arg(long)]
        definition: Option<String>,
        /// Tag label, may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Audio URL or identifier
        #[arg(long)]
        audio: Option<String>,
    },
    /// Insert every entry of a JSON array file in one statement
    Batch { file: PathBuf },
    /// Delete an entry by id
    Delete { id: i64 },
    /// Bulk import full entries from a JSONL (or .jsonl.gz) file
    Import {
        input: PathBuf,
        /// Entries per insert statement
        #[arg(long, default_value_t = import::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Quiet mode - suppress progress bar
        #[arg(short, long, default_value = "false")]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    let book = phrasebook_core::open_with_config(&config)
        .with_context(|| format!("Failed to open {:?}", config.database_path))?;

    let response = match args.command {
        Command::List { page: None } => Response::page(book.list_all()),
        Command::List { page: Some(page) } => Response::page(book.list_page(page)),
        Command::Filter { tag, page } => Response::page(book.filter_page(&tag, page)),
        Command::Search { keyword, page } => Response::page(book.search_page(&keyword, page)),
        Command::Add {
            phrase,
            pronunciation,
            definition,
            tags,
            audio,
        } => {
            let entry = NewEntry {
                phrase,
                pronunciation,
                definition,
                tags,
                audio_reference: audio,
            };
            Response::created(book.insert(&entry))
        }
        Command::Batch { file } => batch_from_file(&book, &file)?,
        Command::Delete { id } => Response::deleted(book.delete(id)),
        Command::Import {
            input,
            batch_size,
            quiet,
        } => {
            run_import(&book, &input, batch_size, quiet)?;
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Defaults, then the config file, then environment and flags
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => Config::default(),
    };

    if let Some(db) = &args.db {
        config.database_path = db.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn batch_from_file(book: &Phrasebook<SqliteStore>, file: &Path) -> Result<Response> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;

    Ok(match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(payload) => Response::batch_inserted(book.batch_insert_json(&payload)),
        Err(e) => Response::error(&Error::InvalidRequest(format!(
            "Malformed JSON payload: {}",
            e
        ))),
    })
}

fn run_import(
    book: &Phrasebook<SqliteStore>,
    input: &Path,
    batch_size: usize,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    log::info!("Starting import from {:?}", input);
    let start_time = Instant::now();

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({eta})")?
            .progress_chars("#>-"),
    );

    let pb_clone = pb.clone();
    let progress_callback = move |current: u64, total_lines: u64| {
        if pb_clone.length() != Some(total_lines) {
            pb_clone.set_length(total_lines);
        }
        pb_clone.set_position(current);
    };

    let stats = import::import_from_jsonl(
        book.executor(),
        input.to_str().context("Invalid input path")?,
        batch_size,
        progress_callback,
    )
    .context("Import failed")?;

    pb.finish_and_clear();
    print_stats(&stats, start_time);
    Ok(())
}

fn print_stats(stats: &ImportStats, start_time: Instant) {
    let elapsed = start_time.elapsed();

    println!("Import complete!");
    println!();
    println!("Statistics:");
    println!("  Lines processed:    {:>12}", format_number(stats.lines_processed));
    println!("  Entries imported:   {:>12}", format_number(stats.entries_imported));
    println!("  Errors:             {:>12}", format_number(stats.errors));
    println!("  Skipped:            {:>12}", format_number(stats.skipped));
    println!("  Time elapsed:       {:>12}", HumanDuration(elapsed));
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
