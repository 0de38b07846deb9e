use anyhow::{anyhow, bail, Result};
use elibrary_core::api::ApiError;
use tracing::{debug, info, warn};

use crate::app::App;

use super::validation::is_valid_email;

pub fn who_am_i(app: &App) {
    let session = app.snapshot();
    match session.identity {
        Some(identity) => println!("{} <{}> ({})", identity.name, identity.email, identity.role),
        None => println!("Not signed in"),
    }
}

/// Turn an API failure into a message, re-checking the session when the
/// server says our token is no longer good.
async fn api_failure(app: &App, what: &str, e: ApiError) -> anyhow::Error {
    if e.is_unauthorized() {
        warn!(error = %e, "Token rejected during {}", what);
        if let Err(e) = app.session().rehydrate().await {
            debug!(error = %e, "Session re-check after rejected token left it logged out");
        }
        return anyhow!("Your session has expired. Please sign in again.");
    }
    anyhow!("Failed to {}: {}", what, e.user_message())
}

pub async fn show(app: &mut App) -> Result<()> {
    let profile = match app.api().get_profile().await {
        Ok(profile) => profile,
        Err(e) => return Err(api_failure(app, "fetch user data", e).await),
    };

    let identity = &profile.identity;
    println!("{}", identity.name);
    println!("{}", identity.email);
    println!();

    if profile.borrowed_books.is_empty() {
        println!("You haven't borrowed any books yet.");
        return Ok(());
    }

    println!("Borrowed books:");
    for book in &profile.borrowed_books {
        println!(
            "  {}  {}  (borrowed {}, due {})",
            book.id.as_deref().unwrap_or("-"),
            book.display_title(),
            book.display_borrow_date(),
            book.display_return_date(),
        );
    }
    Ok(())
}

pub async fn return_book(app: &mut App, id: &str) -> Result<()> {
    let message = match app.api().return_book(id).await {
        Ok(message) => message,
        Err(e) => return Err(api_failure(app, "return book", e).await),
    };
    info!(book_id = id, "Book returned");
    println!("{}", message.unwrap_or_else(|| "Book returned.".to_string()));
    Ok(())
}

pub async fn update(app: &mut App, name: Option<String>, email: Option<String>) -> Result<()> {
    let Some(current) = app.snapshot().identity else {
        bail!("Not signed in");
    };

    let name = name
        .map(|n| n.trim().to_string())
        .unwrap_or_else(|| current.name.clone());
    let email = email
        .map(|e| e.trim().to_string())
        .unwrap_or_else(|| current.email.clone());

    if name.is_empty() {
        bail!("Name cannot be empty");
    }
    if !is_valid_email(&email) {
        bail!("Invalid email format");
    }
    if name == current.name && email == current.email {
        println!("Nothing to update.");
        return Ok(());
    }

    if let Err(e) = app.api().update_profile(&current.id, &name, &email).await {
        return Err(api_failure(app, "update profile", e).await);
    }
    println!("Profile updated successfully");

    // Pick up the canonical identity after the change
    if let Err(e) = app.session().rehydrate().await {
        warn!(error = %e, "Session re-check after profile update failed");
    }
    Ok(())
}

pub async fn delete(app: &mut App, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Deleting your account cannot be undone. Re-run with --yes to confirm.");
    }
    let Some(current) = app.snapshot().identity else {
        bail!("Not signed in");
    };

    if let Err(e) = app.api().delete_account(&current.id).await {
        return Err(api_failure(app, "delete account", e).await);
    }

    info!(user_id = %current.id, "Account deleted");
    app.session().logout().await;
    println!("Account deleted successfully");
    Ok(())
}
