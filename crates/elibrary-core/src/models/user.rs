use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{format_date, format_optional};

/// Role the service assigns to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Member,
    Other(String),
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "member" | "user" => Role::Member,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully populated identity for the signed-in user.
///
/// Only built through `UserRecord::into_identity`, which rejects records
/// with any field missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// User payload as the service sends it (`/users/getUser`, login `user`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "_id", deserialize_with = "super::deserialize_id", default)]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "borrowedBooks", default)]
    pub borrowed_books: Vec<BorrowedBook>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl UserRecord {
    /// Validate the record, returning `None` if any identity field is absent.
    pub fn into_identity(self) -> Option<UserIdentity> {
        Some(UserIdentity {
            id: non_blank(self.id)?,
            name: non_blank(self.name)?,
            email: non_blank(self.email)?,
            role: Role::from(non_blank(self.role)?),
        })
    }

    pub fn into_profile(mut self) -> Option<UserProfile> {
        let borrowed_books = std::mem::take(&mut self.borrowed_books);
        Some(UserProfile {
            identity: self.into_identity()?,
            borrowed_books,
        })
    }
}

/// Identity plus circulation data, as shown on the profile view.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub identity: UserIdentity,
    pub borrowed_books: Vec<BorrowedBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowedBook {
    #[serde(alias = "_id", deserialize_with = "super::deserialize_id", default)]
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "borrowDate")]
    pub borrow_date: Option<String>,
    #[serde(rename = "returnDate")]
    pub return_date: Option<String>,
}

impl BorrowedBook {
    pub fn display_title(&self) -> String {
        format_optional(&self.title, "Untitled")
    }

    pub fn display_borrow_date(&self) -> String {
        self.borrow_date
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn display_return_date(&self) -> String {
        self.return_date
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_string() {
        assert_eq!(Role::from("admin".to_string()), Role::Admin);
        assert_eq!(Role::from("Admin".to_string()), Role::Admin);
        assert_eq!(Role::from("member".to_string()), Role::Member);
        assert_eq!(Role::from("user".to_string()), Role::Member);
        assert_eq!(
            Role::from("librarian".to_string()),
            Role::Other("librarian".to_string())
        );
        assert!(Role::Admin.is_admin());
        assert!(!Role::Member.is_admin());
    }

    #[test]
    fn test_complete_record_becomes_identity() {
        let json = r#"{"id":"u1","name":"Ann","email":"a@x.com","role":"member"}"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        let identity = record.into_identity().unwrap();
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.name, "Ann");
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.role, Role::Member);
    }

    #[test]
    fn test_mongo_id_alias() {
        let json = r#"{"_id":"abc","name":"Ann","email":"a@x.com","role":"admin"}"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.into_identity().unwrap().id, "abc");
    }

    #[test]
    fn test_incomplete_record_is_rejected() {
        let missing_role = r#"{"id":"u1","name":"Ann","email":"a@x.com"}"#;
        let blank_name = r#"{"id":"u1","name":"  ","email":"a@x.com","role":"member"}"#;
        for json in [missing_role, blank_name, "{}"] {
            let record: UserRecord = serde_json::from_str(json).unwrap();
            assert!(record.into_identity().is_none(), "accepted {}", json);
        }
    }

    #[test]
    fn test_profile_keeps_borrowed_books() {
        let json = r#"{"id":"u1","name":"Ann","email":"a@x.com","role":"member","borrowedBooks":[{"_id":"b1","title":"Dune","borrowDate":"2026-10-01T00:00:00.000Z","returnDate":"2026-10-15T00:00:00.000Z"}]}"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        let profile = record.into_profile().unwrap();
        assert_eq!(profile.identity.name, "Ann");
        assert_eq!(profile.borrowed_books.len(), 1);
        let book = &profile.borrowed_books[0];
        assert_eq!(book.id.as_deref(), Some("b1"));
        assert_eq!(book.display_borrow_date(), "Oct 01, 2026");
        assert_eq!(book.display_return_date(), "Oct 15, 2026");
    }
}
