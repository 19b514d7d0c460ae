use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bibliotheca_core::{AppConfig, BookRecord, BookUpdate, Library, parse_book_id};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bibliotheca",
    about = "E-book catalog administration: upload, review, publish",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting BIBLIOTHECA_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload e-book files; each becomes a new, unpublished book.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List published books.
    List {
        /// Defaults to `listing.page_size` from the config.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List unpublished books with their duplicate counts.
    New,

    /// Show one book.
    Show { id: String },

    /// Edit a book's metadata. Empty values clear a field.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, action = clap::ArgAction::Append)]
        author: Vec<String>,
        #[arg(long, action = clap::ArgAction::Append)]
        subject: Vec<String>,
        #[arg(long, action = clap::ArgAction::Append)]
        lang: Vec<String>,
    },

    /// Publish books: copy them into the books directory and make them public.
    Publish {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete books with their files and covers.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path.
    Path,
    /// Show the effective configuration.
    Show,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_logging();

    let json_output = cli.json || std::env::var("BIBLIOTHECA_JSON").as_deref() == Ok("1");
    let config = AppConfig::load()?;
    tracing::debug!(library = %config.core.library_path, "configuration loaded");
    let mut failures = 0usize;

    match cli.command {
        Commands::Upload { files } => {
            let library = Library::open(config)?;
            let mut items = Vec::new();
            for path in &files {
                match library.upload(path) {
                    Ok(upload) => {
                        if !json_output {
                            println!("Uploaded: {} ({})", upload.title, upload.file_name);
                        }
                        items.push(json!({"file": path, "title": upload.title}));
                    }
                    Err(e) => {
                        failures += 1;
                        if !json_output {
                            eprintln!("Cannot upload {}: {e}", path.display());
                        }
                        items.push(json!({"file": path, "error": e.to_string()}));
                    }
                }
            }
            if json_output {
                print_envelope(failures, json!({ "items": items }), start)?;
            }
        }

        Commands::List { limit, offset } => {
            let library = Library::open(config)?;
            let books = library.list(limit, offset)?;
            let total = library.count_published()?;

            if json_output {
                print_envelope(
                    0,
                    json!({ "items": books, "total": total, "offset": offset }),
                    start,
                )?;
            } else if books.is_empty() {
                println!("No published books. Use `bibliotheca publish` to publish uploads.");
            } else {
                for book in &books {
                    print_row(book, "");
                }
                println!("({} of {total})", books.len());
            }
        }

        Commands::New => {
            let library = Library::open(config)?;
            let candidates = library.new_books()?;

            if json_output {
                print_envelope(0, json!({ "items": candidates }), start)?;
            } else if candidates.is_empty() {
                println!("No new books.");
            } else {
                for candidate in &candidates {
                    let flag = if candidate.is_suspect() {
                        format!(
                            "  [title matches: {}, author matches: {}]",
                            candidate.title_matches, candidate.author_matches
                        )
                    } else {
                        String::new()
                    };
                    print_row(&candidate.book, &flag);
                }
            }
        }

        Commands::Show { id } => {
            let library = Library::open(config)?;
            match parse_book_id(&id).and_then(|id| library.get(&id)) {
                Ok(book) => {
                    if json_output {
                        print_envelope(0, json!(book), start)?;
                    } else {
                        println!("{}", serde_json::to_string_pretty(&book)?);
                    }
                }
                Err(e) => {
                    failures += 1;
                    report_error(json_output, &e.to_string(), start)?;
                }
            }
        }

        Commands::Edit {
            id,
            title,
            publisher,
            date,
            description,
            author,
            subject,
            lang,
        } => {
            let update = BookUpdate {
                title,
                publisher,
                date,
                description,
                authors: non_empty_list(author),
                subjects: non_empty_list(subject),
                languages: non_empty_list(lang),
            };
            let library = Library::open(config)?;
            match parse_book_id(&id).and_then(|id| library.edit(&id, &update)) {
                Ok(book) => {
                    if json_output {
                        print_envelope(0, json!(book), start)?;
                    } else {
                        println!("Updated: {}", book.metadata.title);
                    }
                }
                Err(e) => {
                    failures += 1;
                    report_error(json_output, &e.to_string(), start)?;
                }
            }
        }

        Commands::Publish { ids } => {
            let library = Library::open(config)?;
            let mut items = Vec::new();
            for id in &ids {
                match parse_book_id(id).and_then(|book_id| library.publish(&book_id)) {
                    Ok(path) => {
                        if !json_output {
                            println!("Published: {id} -> {path}");
                        }
                        items.push(json!({"id": id, "path": path}));
                    }
                    Err(e) => {
                        failures += 1;
                        if !json_output {
                            eprintln!("Cannot publish {id}: {e}");
                        }
                        items.push(json!({"id": id, "error": e.to_string()}));
                    }
                }
            }
            if json_output {
                print_envelope(failures, json!({ "items": items }), start)?;
            }
        }

        Commands::Delete { ids } => {
            let library = Library::open(config)?;
            let mut items = Vec::new();
            for id in &ids {
                match parse_book_id(id).and_then(|book_id| library.delete(&book_id)) {
                    Ok(()) => {
                        if !json_output {
                            println!("Deleted: {id}");
                        }
                        items.push(json!({"id": id, "deleted": true}));
                    }
                    Err(e) => {
                        failures += 1;
                        if !json_output {
                            eprintln!("Cannot delete {id}: {e}");
                        }
                        items.push(json!({"id": id, "error": e.to_string()}));
                    }
                }
            }
            if json_output {
                print_envelope(failures, json!({ "items": items }), start)?;
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                if json_output {
                    print_envelope(0, json!({ "path": path }), start)?;
                } else {
                    println!("{}", path.display());
                }
            }
            ConfigAction::Show => {
                if json_output {
                    print_envelope(
                        0,
                        json!({
                            "config": config,
                            "database_path": config.database_path(),
                            "books_dir": config.books_dir(),
                            "covers_dir": config.covers_dir(),
                        }),
                        start,
                    )?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                    println!("# database_path = {}", config.database_path().display());
                    println!("# books_dir     = {}", config.books_dir().display());
                    println!("# covers_dir    = {}", config.covers_dir().display());
                }
            }
        },
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Logs go to stderr so they never mix with `--json` output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("BIBLIOTHECA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_envelope(failures: usize, data: serde_json::Value, start: Instant) -> Result<()> {
    let status = if failures == 0 { "ok" } else { "partial" };
    print_json(&json!({
        "status": status,
        "data": data,
        "meta": { "duration_ms": start.elapsed().as_millis() as u64 }
    }))
}

fn report_error(json_output: bool, message: &str, start: Instant) -> Result<()> {
    if json_output {
        print_json(&json!({
            "status": "error",
            "message": message,
            "meta": { "duration_ms": start.elapsed().as_millis() as u64 }
        }))
    } else {
        eprintln!("{message}");
        Ok(())
    }
}

fn print_row(book: &BookRecord, suffix: &str) {
    let authors = book.metadata.authors.join(", ");
    println!(
        "{id}  {title:<40}  {authors:<25}{suffix}",
        id = book.id,
        title = book.metadata.title,
    );
}

fn non_empty_list(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}
