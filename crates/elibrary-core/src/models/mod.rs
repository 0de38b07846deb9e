//! Data models for library entities.
//!
//! This module contains the data structures exchanged with the library
//! service:
//!
//! - `Book`, `NewBook`, `BookPatch`: catalog records and mutations
//! - `UserIdentity`, `Role`: the validated signed-in user
//! - `UserRecord`, `UserProfile`, `BorrowedBook`: profile and circulation data
//! - `Envelope`: the `{ success, message, data }` wrapper every response uses

pub mod book;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use book::{Book, BookPatch, BorrowRequest, NewBook};
pub use user::{BorrowedBook, Role, UserIdentity, UserProfile, UserRecord};

/// Response wrapper used by every endpoint of the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Ids arrive as Mongo object id strings, but tolerate plain numbers too.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}
