use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::{format_date, format_optional};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    #[serde(alias = "_id", deserialize_with = "super::deserialize_id", default)]
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "publicationDate")]
    pub publication_date: Option<String>,
    pub image: Option<String>,
}

impl Book {
    pub fn display_title(&self) -> String {
        format_optional(&self.title, "Untitled")
    }

    pub fn display_author(&self) -> String {
        format_optional(&self.author, "Unknown author")
    }

    pub fn display_publication_date(&self) -> String {
        self.publication_date
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Body for `POST /books`.
#[derive(Debug, Clone, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    #[serde(rename = "publicationDate")]
    pub publication_date: NaiveDate,
    /// URL of an already-hosted cover image; empty when there is none
    pub image: String,
}

/// Body for `PATCH /books/:id`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "publicationDate", skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.description.is_none()
            && self.genre.is_none()
            && self.publication_date.is_none()
            && self.image.is_none()
    }
}

/// Body for `POST /books/:id/borrow`.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowRequest {
    #[serde(rename = "returnDate")]
    pub return_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_with_mongo_id() {
        let json = r#"{"_id":"65f1c0a2e4b0a1b2c3d4e5f6","title":"Dune","author":"Frank Herbert","genre":"Science Fiction","publicationDate":"1965-08-01T00:00:00.000Z","image":"https://img.example/dune.jpg"}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.id.as_deref(), Some("65f1c0a2e4b0a1b2c3d4e5f6"));
        assert_eq!(book.display_title(), "Dune");
        assert_eq!(book.display_publication_date(), "Aug 01, 1965");
        assert!(book.description.is_none());
    }

    #[test]
    fn test_book_display_defaults() {
        let book: Book = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(book.id.as_deref(), Some("7"));
        assert_eq!(book.display_title(), "Untitled");
        assert_eq!(book.display_author(), "Unknown author");
        assert_eq!(book.display_publication_date(), "Unknown");
    }

    #[test]
    fn test_book_patch_skips_unset_fields() {
        let patch = BookPatch {
            genre: Some("Fantasy".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "genre": "Fantasy" }));
        assert!(BookPatch::default().is_empty());
    }

    #[test]
    fn test_borrow_request_date_format() {
        let req = BorrowRequest {
            return_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "returnDate": "2026-11-02" }));
    }
}
