//! BookTrail command line front end.
//!
//! Usage:
//!   booktrail add 978-0-13-235088-4
//!   booktrail list --status reading --search martin
//!   booktrail page <id> 120

use std::path::PathBuf;
use std::process::ExitCode;

use booktrail::listing::{empty_message, filter_entries};
use booktrail::progress::parse_page_input;
use booktrail::{
    open_library, AppConfig, BookStatus, LibraryStats, LibraryStore, LibrarySync, ManualBookForm,
    OpenLibraryClient, SqliteLibraryStore, UserBook,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "booktrail")]
#[command(about = "Track the books you plan to read, are reading and have finished")]
struct Cli {
    /// Directory holding booktrail.db (overrides BOOKTRAIL_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one status tab, optionally filtered by title or author
    List {
        #[arg(long, default_value = "reading")]
        status: BookStatus,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Look up an ISBN without adding it
    Lookup { isbn: String },
    /// Look up an ISBN and add it to the library
    Add { isbn: String },
    /// Add a book by hand
    AddManual {
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        title: String,
        /// Comma separated
        #[arg(long)]
        authors: String,
        #[arg(long)]
        pages: String,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Show one entry
    Show { id: String },
    /// Change reading status
    Status { id: String, status: BookStatus },
    /// Set the current page
    Page { id: String, page: String },
    /// Move the current page forwards or backwards
    Bump {
        id: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Remove one entry
    Remove { id: String },
    /// Counts per status
    Stats,
    /// Delete every entry
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let library = open_library(&config).map_err(|err| err.to_string())?;
    match cli.command {
        Command::Lookup { isbn } => {
            let book = lookup(&config, &isbn)?;
            let json = serde_json::to_string_pretty(&book).map_err(|err| err.to_string())?;
            println!("{}", json);
            Ok(())
        }
        Command::List { status, search } => {
            let entries = library.entries();
            let shown = filter_entries(&entries, status, &search);
            if shown.is_empty() {
                println!("{}", empty_message(status, !search.trim().is_empty()));
            }
            for entry in shown {
                print_summary(entry);
            }
            Ok(())
        }
        Command::Add { isbn } => {
            let book = lookup(&config, &isbn)?;
            let entry = library.add_book(book).map_err(|err| err.to_string())?;
            print_summary(&entry);
            Ok(())
        }
        Command::AddManual {
            isbn,
            title,
            authors,
            pages,
            publisher,
            year,
        } => {
            let form = ManualBookForm {
                isbn,
                title,
                authors,
                number_of_pages: pages,
                publisher,
                publish_year: year,
            };
            let book = form.validate().map_err(|errors| errors.to_string())?;
            let entry = library.add_book(book).map_err(|err| err.to_string())?;
            print_summary(&entry);
            Ok(())
        }
        Command::Show { id } => {
            let entry = find(&library, &id)?;
            print_details(&entry);
            Ok(())
        }
        Command::Status { id, status } => {
            let entry = library
                .set_status(&id, status)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| not_in_library(&id))?;
            print_summary(&entry);
            Ok(())
        }
        Command::Page { id, page } => {
            let entry = find(&library, &id)?;
            let page = parse_page_input(&page, entry.book.page_count()).map_err(|err| err.to_string())?;
            let entry = library
                .set_current_page(&id, page)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| not_in_library(&id))?;
            print_summary(&entry);
            Ok(())
        }
        Command::Bump { id, delta } => {
            let entry = library
                .adjust_current_page(&id, delta)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| not_in_library(&id))?;
            print_summary(&entry);
            Ok(())
        }
        Command::Remove { id } => {
            if !remove_entry(&library, &id)? {
                println!("Nothing removed: {} is not in your library", id);
            }
            Ok(())
        }
        Command::Stats => {
            let stats = LibraryStats::from_entries(&library.entries());
            for status in BookStatus::ALL {
                println!("{:<10}{}", status.label(), stats.count(status));
            }
            println!("{:<10}{}", "Total", stats.total);
            println!("{:<10}{}", "Pages", stats.pages_read);
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                return Err("refusing to clear the library without --yes".to_string());
            }
            library.clear().map_err(|err| err.to_string())
        }
    }
}

fn lookup(config: &AppConfig, isbn: &str) -> Result<booktrail::Book, String> {
    let client = OpenLibraryClient::new(&config.lookup).map_err(|err| err.to_string())?;
    match client.fetch_book_by_isbn(isbn) {
        Ok(book) => Ok(book),
        Err(err) if err.is_not_found() => Err(format!(
            "{} (use `booktrail add-manual` to enter it by hand)",
            err
        )),
        Err(err) => Err(err.to_string()),
    }
}

/// Deletes `id`; returns whether it was in the library. An unknown id is not an error.
fn remove_entry<S: LibraryStore>(library: &LibrarySync<S>, id: &str) -> Result<bool, String> {
    let existed = library.get(id).is_some();
    library.remove(id).map_err(|err| err.to_string())?;
    Ok(existed)
}

fn find(library: &LibrarySync<SqliteLibraryStore>, id: &str) -> Result<UserBook, String> {
    library.get(id).ok_or_else(|| not_in_library(id))
}

fn not_in_library(id: &str) -> String {
    format!("This book is not in your library: {}", id)
}

fn print_summary(entry: &UserBook) {
    let progress = match entry.book.page_count() {
        Some(total) => format!("{}/{}", entry.current_page, total),
        None => entry.current_page.to_string(),
    };
    println!(
        "{}  [{}] {} by {} ({})",
        entry.id,
        entry.status,
        entry.book.title,
        entry.book.authors.join(", "),
        progress
    );
}

fn print_details(entry: &UserBook) {
    println!("{}", entry.book.title);
    println!("  by {}", entry.book.authors.join(", "));
    let meta = [
        entry.book.publisher.clone(),
        entry.book.publish_year.map(|year| year.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" · ");
    if !meta.is_empty() {
        println!("  {}", meta);
    }
    if let Some(isbn) = entry.book.preferred_isbn() {
        println!("  ISBN {}", isbn);
    }
    if let Some(cover) = &entry.book.cover_url {
        println!("  cover {}", cover);
    }
    println!("  status {}", entry.status.label());
    match (entry.book.page_count(), entry.progress_percent()) {
        (Some(total), Some(pct)) => {
            println!("  {} / {} pages ({}%)", entry.current_page, total, pct)
        }
        _ => println!("  page {}", entry.current_page),
    }
    println!("  added {}", entry.added_at.format("%b %-d, %Y"));
    println!("  updated {}", entry.updated_at.to_rfc3339());
}

#[cfg(test)]
mod tests {
    use super::*;
    use booktrail::{Book, BookSource};

    #[test]
    fn removing_unknown_id_succeeds() {
        let library = LibrarySync::new(SqliteLibraryStore::open_in_memory().expect("open store"));
        let entry = library
            .add_book(Book::new("Dune", vec!["Frank Herbert".to_string()], BookSource::Manual))
            .expect("add book");

        assert_eq!(remove_entry(&library, "missing-id"), Ok(false));
        assert_eq!(library.entries().len(), 1);

        assert_eq!(remove_entry(&library, &entry.id), Ok(true));
        assert!(library.entries().is_empty());
        assert_eq!(remove_entry(&library, &entry.id), Ok(false));
    }
}
