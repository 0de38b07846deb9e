//! Authentication module for the client-side session lifecycle.
//!
//! This module provides:
//! - `SessionStore`: owns the session state and runs rehydrate, login and logout
//! - `SessionGate`: holds views back until the session is settled and
//!   resolves protected routes
//! - `TokenStore`: durable storage for the single bearer token
//!
//! A session starts out rehydrating. The gate runs the first rehydrate,
//! after which the session is either authenticated (token and identity
//! present) or logged out (no token, no identity).

pub mod credentials;
pub mod error;
pub mod gate;
pub mod session;

pub use credentials::{
    Credential, FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageError, TokenStore,
};
pub use error::SessionError;
pub use gate::{GatePhase, Guarded, Outcome, SessionGate};
pub use session::{Session, SessionStore};
