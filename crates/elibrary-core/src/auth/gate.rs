use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use super::{Session, SessionStore};

/// Where the gate is in its startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Nothing has asked for the session yet
    Idle,
    /// A rehydrate is running; routed content must not render
    Rehydrating,
    /// The session is settled, authenticated or not
    Ready,
}

/// A route that may need a signed-in user.
pub trait Guarded: Sized {
    fn requires_auth(&self) -> bool;

    fn requires_admin(&self) -> bool {
        false
    }

    /// Route unauthenticated users are sent to
    fn sign_in() -> Self;
}

/// What the view layer should show for a requested route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// Show the loading indicator; the route is handed back for a retry
    Loading(R),
    Render(R),
    Redirect { to: R, from: R },
    /// Signed in, but without the role the route needs
    Forbidden(R),
}

/// Blocks routed content until the session is settled and decides what
/// each route may render.
///
/// A failed rehydrate still opens the gate; the user simply lands logged out.
pub struct SessionGate {
    store: Arc<SessionStore>,
    started: AtomicBool,
    opened: OnceCell<()>,
}

impl SessionGate {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            started: AtomicBool::new(false),
            opened: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn phase(&self) -> GatePhase {
        Self::phase_of(self.started.load(Ordering::Acquire), &self.store.snapshot())
    }

    fn phase_of(started: bool, session: &Session) -> GatePhase {
        if !started {
            GatePhase::Idle
        } else if session.rehydrating {
            GatePhase::Rehydrating
        } else {
            GatePhase::Ready
        }
    }

    /// Run the startup rehydrate. Only the first call contacts the server;
    /// later and concurrent calls wait for that same run.
    pub async fn open(&self) {
        self.opened
            .get_or_init(|| async {
                self.started.store(true, Ordering::Release);
                if let Err(e) = self.store.rehydrate().await {
                    debug!(error = %e, "Startup rehydrate left session logged out");
                }
            })
            .await;
    }

    /// Wait until the phase is `Ready`, opening the gate if needed.
    pub async fn ready(&self) -> Session {
        self.open().await;
        let mut rx = self.store.subscribe();
        let settled = rx.wait_for(|s| !s.rehydrating).await.map(|s| s.clone());
        match settled {
            Ok(session) => session,
            // Sender lives in the store we hold, so this is only reachable in teardown
            Err(_) => self.store.snapshot(),
        }
    }

    /// Decide what to show for `route` right now, without waiting.
    pub fn resolve<R: Guarded>(&self, route: R) -> Outcome<R> {
        let session = self.store.snapshot();
        match Self::phase_of(self.started.load(Ordering::Acquire), &session) {
            GatePhase::Idle | GatePhase::Rehydrating => Outcome::Loading(route),
            GatePhase::Ready => Self::check(route, &session),
        }
    }

    /// Wait for the session to settle, then resolve `route`.
    pub async fn guard<R: Guarded>(&self, route: R) -> Outcome<R> {
        let mut route = route;
        loop {
            self.ready().await;
            match self.resolve(route) {
                // A re-check started between ready() and resolve(); wait again
                Outcome::Loading(r) => route = r,
                outcome => return outcome,
            }
        }
    }

    fn check<R: Guarded>(route: R, session: &Session) -> Outcome<R> {
        if !route.requires_auth() && !route.requires_admin() {
            return Outcome::Render(route);
        }
        if !session.is_authenticated {
            debug!("Protected route requested without a session, redirecting");
            return Outcome::Redirect {
                to: R::sign_in(),
                from: route,
            };
        }
        if route.requires_admin() && !session.is_admin() {
            return Outcome::Forbidden(route);
        }
        Outcome::Render(route)
    }
}
