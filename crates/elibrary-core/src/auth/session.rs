use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, LoginResponse};
use crate::models::UserIdentity;

use super::{Credential, SessionError, TokenStore};

/// Shown when the server gives no reason for a failed login
const GENERIC_LOGIN_FAILURE: &str = "Login failed. Please try again.";

/// Shown when login succeeded but the follow-up identity check did not
const LOGIN_NOT_VERIFIED: &str = "Signed in, but your account details could not be loaded.";

/// Current authentication state.
///
/// `identity` is `Some` exactly when `is_authenticated` is true, and an
/// authenticated session always carries a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub credential: Option<Credential>,
    pub identity: Option<UserIdentity>,
    pub rehydrating: bool,
}

impl Session {
    /// State at process start: nothing known yet, check pending.
    fn pending() -> Self {
        Self {
            is_authenticated: false,
            credential: None,
            identity: None,
            rehydrating: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.identity
            .as_ref()
            .map(|i| i.role.is_admin())
            .unwrap_or(false)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    fn sign_in(&mut self, credential: Credential, identity: UserIdentity) {
        self.is_authenticated = true;
        self.credential = Some(credential);
        self.identity = Some(identity);
    }

    fn sign_out(&mut self) {
        self.is_authenticated = false;
        self.credential = None;
        self.identity = None;
    }
}

/// Raises `rehydrating` for its lifetime; lowering happens on every exit
/// path, including cancellation of the surrounding future.
struct RehydratingFlag<'a> {
    state: &'a watch::Sender<Session>,
}

impl<'a> RehydratingFlag<'a> {
    fn raise(state: &'a watch::Sender<Session>) -> Self {
        state.send_modify(|s| s.rehydrating = true);
        Self { state }
    }
}

impl Drop for RehydratingFlag<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.rehydrating = false);
    }
}

/// Resets the local session when dropped, whether or not the remote
/// logout call finished.
struct LocalReset<'a> {
    store: &'a SessionStore,
}

impl Drop for LocalReset<'_> {
    fn drop(&mut self) {
        self.store.discard_credential();
        self.store.state.send_modify(Session::sign_out);
        // A rehydrate queued behind this logout must not adopt a result
        // from before it
        self.store.forget_last_outcome();
        info!("Signed out");
    }
}

/// Owner of the session state and the only writer of the stored token.
///
/// Shared with views through an `Arc`. Rehydrate, login and logout are
/// serialised: at most one of them talks to the server at a time, and a
/// rehydrate requested while another is running adopts that run's outcome.
pub struct SessionStore {
    api: ApiClient,
    tokens: Box<dyn TokenStore>,
    state: watch::Sender<Session>,
    /// Serialises rehydrate, login and logout
    ops: tokio::sync::Mutex<()>,
    /// Number of rehydrate runs that have finished
    completed: AtomicU64,
    last_outcome: Mutex<Option<Result<UserIdentity, SessionError>>>,
}

impl SessionStore {
    pub fn new(api: ApiClient, tokens: Box<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::pending());
        Self {
            api: api.anonymous(),
            tokens,
            state,
            ops: tokio::sync::Mutex::new(()),
            completed: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// API client carrying the current credential, or none when logged out
    pub fn authorized_client(&self) -> ApiClient {
        match self.state.borrow().credential.clone() {
            Some(token) => self.api.with_token(token),
            None => self.api.anonymous(),
        }
    }

    // ========================================================================
    // Rehydrate
    // ========================================================================

    /// Re-derive the session from the stored token.
    ///
    /// Every error leaves the session logged out; a rejected or malformed
    /// check also deletes the stored token. A call made while another
    /// rehydrate is running waits for it and returns the same outcome
    /// without contacting the server, unless a logout ran in between.
    pub async fn rehydrate(&self) -> Result<UserIdentity, SessionError> {
        let seen = self.completed.load(Ordering::Acquire);
        let _ops = self.ops.lock().await;

        if self.completed.load(Ordering::Acquire) != seen {
            if let Some(outcome) = self.last_outcome() {
                debug!("Rehydrate joined a check that finished while waiting");
                return outcome;
            }
        }

        self.rehydrate_locked().await
    }

    /// Body of `rehydrate`; the caller holds `ops`.
    async fn rehydrate_locked(&self) -> Result<UserIdentity, SessionError> {
        let _flag = RehydratingFlag::raise(&self.state);
        debug!("Rehydrating session");

        let outcome = match self.check_stored_token().await {
            Ok((token, identity)) => {
                info!(user_id = %identity.id, role = %identity.role, "Session restored");
                let restored = identity.clone();
                self.state.send_modify(|s| s.sign_in(token, restored));
                Ok(identity)
            }
            Err(SessionError::NoCredential) => {
                debug!("No stored credential");
                self.state.send_modify(Session::sign_out);
                Err(SessionError::NoCredential)
            }
            Err(e) => {
                warn!(error = %e, "Stored credential not usable, discarding");
                self.discard_credential();
                self.state.send_modify(Session::sign_out);
                Err(e)
            }
        };

        self.set_last_outcome(outcome.clone());
        self.completed.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn check_stored_token(&self) -> Result<(Credential, UserIdentity), SessionError> {
        let token = match self.tokens.load() {
            Ok(Some(token)) => token,
            Ok(None) => return Err(SessionError::NoCredential),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                return Err(SessionError::NoCredential);
            }
        };

        match self.api.with_token(token.clone()).get_user().await {
            Ok(Some(record)) => record
                .into_identity()
                .map(|identity| (token, identity))
                .ok_or(SessionError::MalformedIdentity),
            Ok(None) => Err(SessionError::MalformedIdentity),
            Err(e) => {
                debug!(error = %e, transport = e.is_transport(), "Identity check failed");
                Err(SessionError::Unauthenticated)
            }
        }
    }

    // ========================================================================
    // Login / logout
    // ========================================================================

    /// Sign in and persist the returned token, then re-check the identity
    /// against `/users/getUser`.
    ///
    /// On failure the session is left logged out and the error carries the
    /// server's message when it sent one.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, SessionError> {
        let _ops = self.ops.lock().await;

        let response = match self.api.login(email, password).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(SessionError::LoginRejected(login_failure_message(&e)));
            }
        };

        let token = Credential::new(response.token.clone());
        if let Err(e) = self.tokens.save(&token) {
            error!(error = %e, "Failed to persist credential");
            return Err(SessionError::LoginRejected(
                "Signed in, but the session could not be saved.".to_string(),
            ));
        }

        if let Some(identity) = response.user.clone() {
            self.state.send_modify(|s| s.sign_in(token, identity));
        }

        match self.rehydrate_locked().await {
            Ok(identity) => {
                info!(user_id = %identity.id, "Login successful");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Post-login identity check failed");
                Err(SessionError::LoginRejected(LOGIN_NOT_VERIFIED.to_string()))
            }
        }
    }

    /// Tell the server we are leaving, then clear the local session.
    ///
    /// The remote call is best effort; the local reset always happens once
    /// it has settled. If this future is dropped before the call settles,
    /// the local reset runs at that point instead, and the server may still
    /// see the request afterwards.
    pub async fn logout(&self) {
        let _ops = self.ops.lock().await;
        let client = self.authorized_client();
        let reset = LocalReset { store: self };

        if let Err(e) = client.logout().await {
            let err = SessionError::NetworkFailure(e.to_string());
            warn!(error = %err, "Logout request failed, clearing local session anyway");
        }

        drop(reset);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn discard_credential(&self) {
        if let Err(e) = self.tokens.clear() {
            error!(error = %e, "Failed to delete stored credential");
        }
    }

    fn last_outcome(&self) -> Option<Result<UserIdentity, SessionError>> {
        self.last_outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn forget_last_outcome(&self) {
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn set_last_outcome(&self, outcome: Result<UserIdentity, SessionError>) {
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(outcome);
    }
}

fn login_failure_message(e: &ApiError) -> String {
    match e {
        ApiError::Rejected { message, .. } => message.clone(),
        ApiError::NetworkError(_) => e.user_message(),
        _ => GENERIC_LOGIN_FAILURE.to_string(),
    }
}
