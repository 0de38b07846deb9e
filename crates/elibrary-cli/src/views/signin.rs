use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use crate::app::App;

use super::validation::{is_valid_email, is_valid_password, PASSWORD_RULES};

/// Maximum length for typed email input
const MAX_EMAIL_LENGTH: usize = 254;

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn prompt_email(app: &App, email: Option<String>) -> Result<String> {
    if let Some(email) = email {
        return Ok(email.trim().to_string());
    }
    match app.config.last_email.as_deref() {
        Some(last) => {
            let typed = prompt_line(&format!("Email [{}]: ", last))?;
            Ok(if typed.is_empty() { last.to_string() } else { typed })
        }
        None => prompt_line("Email: "),
    }
}

fn prompt_password(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

fn check_credentials(email: &str, password: &str) -> Result<()> {
    if email.len() > MAX_EMAIL_LENGTH || !is_valid_email(email) {
        bail!("Invalid email format");
    }
    if !is_valid_password(password) {
        bail!(PASSWORD_RULES);
    }
    Ok(())
}

pub async fn sign_in(app: &mut App, email: Option<String>, password: Option<String>) -> Result<()> {
    if let Some(name) = app.snapshot().user_name() {
        println!("Already signed in as {}. Run `elibrary signout` to switch accounts.", name);
        return Ok(());
    }

    let email = prompt_email(app, email)?;
    let password = prompt_password(password)?;
    check_credentials(&email, &password)?;

    let result = app.session().login(&email, &password).await;
    match result {
        Ok(response) => {
            app.config.last_email = Some(email);
            app.save_config();

            let greeting = response.message.unwrap_or_else(|| {
                let name = app.snapshot().user_name().unwrap_or("reader").to_string();
                format!("Welcome, {}!", name)
            });
            println!("{}", greeting);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sign-in failed");
            bail!(e.user_message())
        }
    }
}

pub async fn sign_up(
    app: &mut App,
    name: String,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("Name is required");
    }
    let email = match email {
        Some(email) => email.trim().to_string(),
        None => prompt_line("Email: ")?,
    };
    let password = prompt_password(password)?;
    check_credentials(&email, &password)?;

    let message = app
        .api()
        .register(&name, &email, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    info!("Account registered");
    app.config.last_email = Some(email);
    app.save_config();
    println!(
        "{}",
        message.unwrap_or_else(|| "Account created. You can now sign in.".to_string())
    );
    Ok(())
}

pub async fn sign_out(app: &mut App) -> Result<()> {
    let was_signed_in = app.snapshot().is_authenticated;
    app.session().logout().await;
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}
