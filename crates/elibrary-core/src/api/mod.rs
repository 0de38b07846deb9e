//! REST API client module for the library service.
//!
//! This module provides the `ApiClient` for communicating with the
//! library API to read the catalog, borrow and return books, and manage
//! the signed-in user's profile.
//!
//! The API uses bearer token authentication; the token is obtained from
//! `POST /users/login` and handed to the client by the session store.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse, DEFAULT_BASE_URL};
pub use error::ApiError;
