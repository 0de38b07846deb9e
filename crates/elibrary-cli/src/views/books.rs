use anyhow::{anyhow, bail, Result};
use chrono::Local;
use elibrary_core::models::Book;
use elibrary_core::utils::truncate_string;
use tracing::info;

use crate::app::App;

use super::validation::parse_return_date;

/// Column widths for the book table
const TITLE_WIDTH: usize = 36;
const AUTHOR_WIDTH: usize = 24;
const GENRE_WIDTH: usize = 18;

fn book_row(book: &Book) -> String {
    format!(
        "{:<26} {:<title$} {:<author$} {:<genre$}",
        book.id.as_deref().unwrap_or("-"),
        truncate_string(&book.display_title(), TITLE_WIDTH),
        truncate_string(&book.display_author(), AUTHOR_WIDTH),
        truncate_string(book.genre.as_deref().unwrap_or(""), GENRE_WIDTH),
        title = TITLE_WIDTH,
        author = AUTHOR_WIDTH,
        genre = GENRE_WIDTH,
    )
}

pub async fn list(app: &mut App) -> Result<()> {
    let books = app
        .api()
        .list_books()
        .await
        .map_err(|e| anyhow!("Failed to load books: {}", e.user_message()))?;

    if books.is_empty() {
        println!("No books in the catalog yet.");
        return Ok(());
    }

    println!(
        "{:<26} {:<title$} {:<author$} {:<genre$}",
        "ID",
        "TITLE",
        "AUTHOR",
        "GENRE",
        title = TITLE_WIDTH,
        author = AUTHOR_WIDTH,
        genre = GENRE_WIDTH,
    );
    for book in &books {
        println!("{}", book_row(book));
    }
    Ok(())
}

pub async fn detail(app: &mut App, id: &str) -> Result<()> {
    let book = app
        .api()
        .get_book(id)
        .await
        .map_err(|e| anyhow!("Failed to fetch book details: {}", e.user_message()))?;

    println!("{}", book.display_title());
    println!("by {}", book.display_author());
    if let Some(genre) = book.genre.as_deref() {
        println!("Genre: {}", genre);
    }
    println!("Published on: {}", book.display_publication_date());
    if let Some(description) = book.description.as_deref() {
        println!();
        println!("{}", description);
    }
    if app.snapshot().is_authenticated {
        println!();
        println!("Borrow it with `elibrary borrow {} --return-date YYYY-MM-DD`", id);
    }
    Ok(())
}

pub async fn borrow(app: &mut App, id: &str, return_date: &str) -> Result<()> {
    let today = Local::now().date_naive();
    let date = match parse_return_date(return_date, today) {
        Ok(date) => date,
        Err(msg) => bail!(msg),
    };

    let message = app
        .api()
        .borrow_book(id, date)
        .await
        .map_err(|e| anyhow!("Failed to borrow book: {}", e.user_message()))?;

    info!(book_id = id, %date, "Book borrowed");
    println!(
        "{}",
        message.unwrap_or_else(|| format!("Book borrowed. Please return it by {}.", date))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_row_truncates_long_fields() {
        let book = Book {
            id: Some("b1".to_string()),
            title: Some("A Very Long Title That Certainly Will Not Fit In The Column".to_string()),
            author: Some("Ann".to_string()),
            description: None,
            genre: None,
            publication_date: None,
            image: None,
        };
        let row = book_row(&book);
        assert!(row.starts_with("b1"));
        assert!(row.contains("A Very Long Title That Certainly ..."));
        assert!(row.contains("Ann"));
    }
}
