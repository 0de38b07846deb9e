//! Core library for the E-Library client.
//!
//! This crate contains everything a front end needs to talk to the
//! library service:
//!
//! - `api`: REST client for books, circulation and user profile endpoints
//! - `auth`: session store, session gate and durable bearer-token storage
//! - `models`: book, user and borrow records
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{
    Credential, GatePhase, Guarded, Outcome, Session, SessionError, SessionGate, SessionStore,
    TokenStore,
};
pub use config::Config;
