use anyhow::{anyhow, bail, Result};
use elibrary_core::models::{BookPatch, NewBook};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::app::App;
use crate::routes::BookForm;

/// Maximum concurrent delete requests when removing several books
const MAX_CONCURRENT_REQUESTS: usize = 4;

fn require(value: String, field: &str) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{} is required", field);
    }
    Ok(value)
}

fn new_book(form: BookForm) -> Result<NewBook> {
    Ok(NewBook {
        title: require(form.title, "Title")?,
        author: require(form.author, "Author")?,
        description: require(form.description, "Description")?,
        genre: require(form.genre, "Genre")?,
        publication_date: form.published,
        image: form.image.unwrap_or_default(),
    })
}

pub async fn add(app: &mut App, form: BookForm) -> Result<()> {
    let book = new_book(form)?;
    let created = app
        .api()
        .create_book(&book)
        .await
        .map_err(|e| anyhow!("Failed to add book: {}", e.user_message()))?;

    info!(title = %book.title, "Book added");
    match created.and_then(|b| b.id) {
        Some(id) => println!("Book added successfully! ({})", id),
        None => println!("Book added successfully!"),
    }
    Ok(())
}

pub async fn edit(app: &mut App, id: &str, patch: BookPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to change; pass at least one field to update");
    }
    app.api()
        .update_book(id, &patch)
        .await
        .map_err(|e| anyhow!("Failed to update book: {}", e.user_message()))?;

    info!(book_id = id, "Book updated");
    println!("Book updated.");
    Ok(())
}

pub async fn remove(app: &mut App, ids: Vec<String>) -> Result<()> {
    if ids.is_empty() {
        bail!("No book ids given");
    }

    let api = app.api();
    let results: Vec<(String, Result<(), String>)> = stream::iter(ids)
        .map(|id| {
            let api = api.clone();
            async move {
                let result = api.delete_book(&id).await.map_err(|e| e.user_message());
                (id, result)
            }
        })
        .buffer_unordered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

    let mut failed = 0;
    for (id, result) in results {
        match result {
            Ok(()) => println!("Removed {}", id),
            Err(msg) => {
                warn!(book_id = %id, error = %msg, "Failed to remove book");
                println!("Could not remove {}: {}", id, msg);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} book(s) could not be removed", failed);
    }
    Ok(())
}
