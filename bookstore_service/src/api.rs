use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// A book as stored in the repository
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Payload used to create a book.
/// When `id` is omitted the repository assigns one.
/// Title and author are optional here so that missing values are reported as validation errors
pub struct BookDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Struct representing a patch to a book. Fields that are not specified keep their current value
pub struct BookDetailsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Query parameters of the search endpoint, title takes precedence when both are given
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct DeleteAllBooksResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Body returned with every error status
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    /// Reason phrase of the status code
    pub error: String,
    pub message: String,
    /// Path of the request that failed
    pub path: String,
    /// Per field violations, only present for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(status: u16, error: &str, message: String, path: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            error: error.to_string(),
            message,
            path: path.to_string(),
            validation_errors: None,
        }
    }

    pub fn with_validation_errors(mut self, validation_errors: Vec<String>) -> Self {
        self.validation_errors = Some(validation_errors);
        self
    }
}
