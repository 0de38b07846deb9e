//! Application wiring for the E-Library client.
//!
//! This module contains the `App` struct that owns configuration and the
//! session gate, and routes each requested screen through the gate before
//! handing it to its view.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use elibrary_core::api::ApiClient;
use elibrary_core::auth::{Outcome, Session, SessionGate, SessionStore};
use elibrary_core::config::Config;
use tracing::{debug, info, warn};

use crate::routes::Route;
use crate::views;

pub struct App {
    pub config: Config,
    pub gate: SessionGate,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.base_url();
        debug!(base_url = %base_url, storage = ?config.token_storage(), "Creating app");

        let api = ApiClient::new(&base_url)?;
        let store = Arc::new(SessionStore::new(api, config.token_store()?));

        Ok(Self {
            config,
            gate: SessionGate::new(store),
        })
    }

    pub fn session(&self) -> &SessionStore {
        self.gate.store()
    }

    /// Current session state
    pub fn snapshot(&self) -> Session {
        self.session().snapshot()
    }

    /// API client carrying the current credential
    pub fn api(&self) -> ApiClient {
        self.session().authorized_client()
    }

    /// Show `route`, once the session has settled and the route is allowed.
    ///
    /// A signed-out user at a terminal is taken through sign-in first and
    /// the route is retried once.
    pub async fn navigate(&mut self, route: Route) -> Result<()> {
        let interactive = io::stdin().is_terminal();
        match plan(self.settle(route).await, interactive) {
            Step::Render(route) => self.show(route).await,
            Step::SignInThen { sign_in, then } => {
                warn!(route = then.name(), "Not signed in, redirecting to sign-in");
                println!("Sign in to continue to '{}'.", then.name());
                self.render(sign_in).await?;
                match self.gate.guard(then).await {
                    Outcome::Render(route) => self.show(route).await,
                    other => bail!(refusal(&other)),
                }
            }
            Step::Refuse(message) => bail!(message),
        }
    }

    /// Resolve `route`, waiting out a running session check
    async fn settle(&self, route: Route) -> Outcome<Route> {
        match self.gate.resolve(route) {
            Outcome::Loading(route) => {
                show_loading();
                self.gate.guard(route).await
            }
            outcome => outcome,
        }
    }

    async fn show(&mut self, route: Route) -> Result<()> {
        info!(route = route.name(), "Rendering");
        self.render(route).await
    }

    async fn render(&mut self, route: Route) -> Result<()> {
        match route {
            Route::SignIn { email, password } => views::signin::sign_in(self, email, password).await,
            Route::SignUp {
                name,
                email,
                password,
            } => views::signin::sign_up(self, name, email, password).await,
            Route::SignOut => views::signin::sign_out(self).await,
            Route::WhoAmI => {
                views::profile::who_am_i(self);
                Ok(())
            }
            Route::Books => views::books::list(self).await,
            Route::BookDetail(id) => views::books::detail(self, &id).await,
            Route::Borrow {
                book_id,
                return_date,
            } => views::books::borrow(self, &book_id, &return_date).await,
            Route::Return(id) => views::profile::return_book(self, &id).await,
            Route::Profile => views::profile::show(self).await,
            Route::UpdateProfile { name, email } => views::profile::update(self, name, email).await,
            Route::DeleteAccount { confirmed } => views::profile::delete(self, confirmed).await,
            Route::AddBook(form) => views::manage::add(self, form).await,
            Route::EditBook { book_id, patch } => views::manage::edit(self, &book_id, patch).await,
            Route::RemoveBooks(ids) => views::manage::remove(self, ids).await,
        }
    }

    /// Persist config changes; failures are logged, never fatal
    pub fn save_config(&self) {
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

/// What `navigate` does with a resolved route
#[derive(Debug)]
enum Step {
    Render(Route),
    SignInThen { sign_in: Route, then: Route },
    Refuse(String),
}

fn plan(outcome: Outcome<Route>, interactive: bool) -> Step {
    match outcome {
        Outcome::Render(route) => Step::Render(route),
        Outcome::Redirect { to, from } if interactive => Step::SignInThen { sign_in: to, then: from },
        other => Step::Refuse(refusal(&other)),
    }
}

fn refusal(outcome: &Outcome<Route>) -> String {
    match outcome {
        Outcome::Redirect { from, .. } => format!(
            "You need to sign in to use '{}'. Run `elibrary signin` first.",
            from.name()
        ),
        Outcome::Forbidden(route) => {
            format!("'{}' is only available to administrators.", route.name())
        }
        // guard() never hands back Loading
        Outcome::Loading(route) => format!("Session still loading for '{}'", route.name()),
        Outcome::Render(route) => format!("'{}' cannot be shown", route.name()),
    }
}

/// Neutral loading indicator shown while the session check runs
fn show_loading() {
    let mut stderr = io::stderr();
    if stderr.is_terminal() {
        let _ = writeln!(stderr, "Checking session...");
    }
}
