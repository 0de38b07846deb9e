//! E-Library - a command-line client for the library service.
//!
//! Browse the catalog, borrow and return books, and manage your profile.
//! The session is restored from the stored token on every start.

mod app;
mod routes;
mod views;

use std::io;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use elibrary_core::config::Config;
use elibrary_core::models::BookPatch;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use routes::{BookForm, Route};

#[derive(Parser, Debug)]
#[command(name = "elibrary", version, about = "Browse and borrow books from the E-Library")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: Option<String>,
        /// Read from a prompt when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored token
    Signout,
    /// Show who is signed in
    Whoami,
    /// Browse and manage the catalog
    #[command(subcommand)]
    Books(BooksCommand),
    /// Borrow a book
    Borrow {
        id: String,
        /// YYYY-MM-DD
        #[arg(long)]
        return_date: String,
    },
    /// Return a borrowed book
    Return { id: String },
    /// Your profile and borrowed books
    Profile {
        #[command(subcommand)]
        action: Option<ProfileCommand>,
    },
}

#[derive(Subcommand, Debug)]
enum BooksCommand {
    /// List every book
    List,
    /// Show one book
    Show { id: String },
    /// Add a book (admin)
    Add(AddBookArgs),
    /// Change fields of a book (admin)
    Edit(EditBookArgs),
    /// Remove books (admin)
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct AddBookArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    genre: String,
    /// Publication date, YYYY-MM-DD
    #[arg(long)]
    published: NaiveDate,
    /// URL of an already-uploaded cover image
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args, Debug)]
struct EditBookArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    published: Option<NaiveDate>,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Change name and/or email
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete your account
    Delete {
        #[arg(long)]
        yes: bool,
    },
}

impl From<Command> for Route {
    fn from(command: Command) -> Self {
        match command {
            Command::Signin { email, password } => Route::SignIn { email, password },
            Command::Signup {
                name,
                email,
                password,
            } => Route::SignUp {
                name,
                email,
                password,
            },
            Command::Signout => Route::SignOut,
            Command::Whoami => Route::WhoAmI,
            Command::Books(BooksCommand::List) => Route::Books,
            Command::Books(BooksCommand::Show { id }) => Route::BookDetail(id),
            Command::Books(BooksCommand::Add(args)) => Route::AddBook(BookForm {
                title: args.title,
                author: args.author,
                description: args.description,
                genre: args.genre,
                published: args.published,
                image: args.image,
            }),
            Command::Books(BooksCommand::Edit(args)) => Route::EditBook {
                book_id: args.id,
                patch: BookPatch {
                    title: args.title,
                    author: args.author,
                    description: args.description,
                    genre: args.genre,
                    publication_date: args.published,
                    image: args.image,
                },
            },
            Command::Books(BooksCommand::Remove { ids }) => Route::RemoveBooks(ids),
            Command::Borrow { id, return_date } => Route::Borrow {
                book_id: id,
                return_date,
            },
            Command::Return { id } => Route::Return(id),
            Command::Profile { action: None } => Route::Profile,
            Command::Profile {
                action: Some(ProfileCommand::Update { name, email }),
            } => Route::UpdateProfile { name, email },
            Command::Profile {
                action: Some(ProfileCommand::Delete { yes }),
            } => Route::DeleteAccount { confirmed: yes },
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_dir.as_ref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "elibrary.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config);
    info!("E-Library client starting");

    let mut app = App::new(config)?;
    app.navigate(Route::from(cli.command)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use elibrary_core::auth::Guarded;

    fn route(args: &[&str]) -> Route {
        Route::from(Cli::try_parse_from(args).unwrap().command)
    }

    #[test]
    fn test_parse_borrow() {
        match route(&["elibrary", "borrow", "b1", "--return-date", "2026-11-01"]) {
            Route::Borrow {
                book_id,
                return_date,
            } => {
                assert_eq!(book_id, "b1");
                assert_eq!(return_date, "2026-11-01");
            }
            other => panic!("unexpected route {:?}", other),
        }
    }

    #[test]
    fn test_parse_profile_subcommands() {
        assert!(matches!(route(&["elibrary", "profile"]), Route::Profile));
        assert!(matches!(
            route(&["elibrary", "profile", "delete", "--yes"]),
            Route::DeleteAccount { confirmed: true }
        ));
    }

    #[test]
    fn test_parse_book_edit_builds_patch() {
        match route(&["elibrary", "books", "edit", "b1", "--genre", "Classic"]) {
            Route::EditBook { book_id, patch } => {
                assert_eq!(book_id, "b1");
                assert_eq!(patch.genre.as_deref(), Some("Classic"));
                assert!(patch.title.is_none());
            }
            other => panic!("unexpected route {:?}", other),
        }
    }

    #[test]
    fn test_admin_commands_are_guarded() {
        let add = route(&[
            "elibrary", "books", "add", "--title", "Dune", "--author", "Frank Herbert",
            "--description", "Spice", "--genre", "SF", "--published", "1965-08-01",
        ]);
        assert!(add.requires_admin());
        assert!(!route(&["elibrary", "books", "list"]).requires_auth());
    }

    #[test]
    fn test_remove_needs_ids() {
        assert!(Cli::try_parse_from(["elibrary", "books", "remove"]).is_err());
    }
}
