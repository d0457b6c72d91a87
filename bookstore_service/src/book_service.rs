use std::sync::Arc;

use crate::api::{Book, BookDetails, BookDetailsPatch, BookId, SearchQuery};
use crate::books_repository::{BookRepository, BookRepositoryError, NewBook};

const VALIDATION_FAILED: &str = "Validation failed";
const TITLE_MANDATORY: &str = "title: Title is mandatory";
const AUTHOR_MANDATORY: &str = "author: Author is mandatory";

#[derive(thiserror::Error, Debug)]
pub enum BookServiceError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        violations: Vec<String>,
    },

    #[error("Book not found with ID: {0}")]
    NotFound(BookId),

    #[error("Book already exists with ID: {0}")]
    AlreadyExists(BookId),

    #[error("Unexpected failure {0}")]
    Unexpected(#[from] BookRepositoryError),
}

impl BookServiceError {
    fn validation_failed(violations: Vec<String>) -> Self {
        Self::InvalidInput {
            message: VALIDATION_FAILED.to_string(),
            violations,
        }
    }
}

/// Business rules on top of a [`BookRepository`].
///
/// Every check-then-act sequence (duplicate id on create, read-then-write on update,
/// existence check on delete) runs as separate repository calls without a lock,
/// so concurrent requests on the same id may race. A concurrent duplicate create ends up as
/// a storage failure and a book deleted between the read and write of an update as `NotFound`.
#[derive(Clone)]
pub struct BookService {
    books_repository: Arc<dyn BookRepository + Send + Sync>,
}

/// Trims the value, `None` if it was missing or blank
fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Trims a field that has to be present, records a violation otherwise
fn required_field(
    value: Option<&str>,
    violation: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    let value = trimmed(value);
    if value.is_none() {
        violations.push(violation.to_string());
    }
    value
}

/// Trims a field that may be omitted, present but blank is a violation
fn optional_field(
    value: Option<&str>,
    violation: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    let value = value?;
    required_field(Some(value), violation, violations)
}

impl BookService {
    pub fn new(books_repository: Arc<dyn BookRepository + Send + Sync>) -> Self {
        Self { books_repository }
    }

    /// Lists all books ordered by id
    pub async fn list_all(&self) -> Result<Vec<Book>, BookServiceError> {
        tracing::debug!("Retrieving all books");
        let books = self.books_repository.find_all().await?;
        tracing::info!("Retrieved {} books", books.len());
        Ok(books)
    }

    pub async fn get_by_id(&self, book_id: BookId) -> Result<Book, BookServiceError> {
        tracing::debug!("Retrieving book with ID: {}", book_id);
        self.books_repository
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Book not found with ID: {}", book_id);
                BookServiceError::NotFound(book_id)
            })
    }

    pub async fn exists_by_id(&self, book_id: BookId) -> Result<bool, BookServiceError> {
        Ok(self.books_repository.exists_by_id(book_id).await?)
    }

    /// Validates and stores a new book.
    /// Title and author are trimmed, a caller supplied id must not be taken yet
    pub async fn create(&self, details: BookDetails) -> Result<Book, BookServiceError> {
        tracing::debug!("Creating new book: {:?}", details.title);

        let mut violations = vec![];
        let title = required_field(details.title.as_deref(), TITLE_MANDATORY, &mut violations);
        let author = required_field(details.author.as_deref(), AUTHOR_MANDATORY, &mut violations);
        let (Some(title), Some(author)) = (title, author) else {
            tracing::warn!("Rejected book creation: {:?}", violations);
            return Err(BookServiceError::validation_failed(violations));
        };

        if let Some(book_id) = details.id {
            if self.books_repository.exists_by_id(book_id).await? {
                tracing::warn!("Book with ID {} already exists", book_id);
                return Err(BookServiceError::AlreadyExists(book_id));
            }
        }

        let book = self
            .books_repository
            .insert(NewBook {
                id: details.id,
                title,
                author,
            })
            .await?;
        tracing::info!(book_id = book.id, "Book created successfully: {}", book.title);
        Ok(book)
    }

    /// Merges the patch into the stored book. Fields missing from the patch stay unchanged,
    /// provided fields are trimmed and must not be blank
    pub async fn update(
        &self,
        book_id: BookId,
        patch: BookDetailsPatch,
    ) -> Result<Book, BookServiceError> {
        tracing::debug!("Updating book with ID: {}", book_id);

        let mut violations = vec![];
        let title = optional_field(patch.title.as_deref(), TITLE_MANDATORY, &mut violations);
        let author = optional_field(patch.author.as_deref(), AUTHOR_MANDATORY, &mut violations);
        if !violations.is_empty() {
            tracing::warn!("Rejected update of book {}: {:?}", book_id, violations);
            return Err(BookServiceError::validation_failed(violations));
        }

        let existing = self.get_by_id(book_id).await?;
        if title.is_none() && author.is_none() {
            return Ok(existing);
        }

        let merged = Book {
            id: existing.id,
            title: title.unwrap_or(existing.title),
            author: author.unwrap_or(existing.author),
        };
        let updated = self
            .books_repository
            .update(merged)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Book with ID {} disappeared during update", book_id);
                BookServiceError::NotFound(book_id)
            })?;
        tracing::info!(book_id = book_id, "Book updated successfully: {}", updated.title);
        Ok(updated)
    }

    pub async fn delete(&self, book_id: BookId) -> Result<(), BookServiceError> {
        tracing::debug!("Deleting book with ID: {}", book_id);
        if !self.books_repository.exists_by_id(book_id).await? {
            tracing::warn!("Book not found with ID: {}", book_id);
            return Err(BookServiceError::NotFound(book_id));
        }
        self.books_repository.delete_by_id(book_id).await?;
        tracing::info!("Book deleted successfully with ID: {}", book_id);
        Ok(())
    }

    /// Removes every book, returns how many were removed
    pub async fn delete_all(&self) -> Result<u64, BookServiceError> {
        tracing::debug!("Deleting all books");
        let deleted = self.books_repository.delete_all().await?;
        tracing::info!("Deleted {} books", deleted);
        Ok(deleted)
    }

    pub async fn search_by_title(&self, title: &str) -> Result<Vec<Book>, BookServiceError> {
        let Some(title) = trimmed(Some(title)) else {
            return Err(Self::missing_search_criteria());
        };
        tracing::debug!("Searching books by title: {}", title);
        let books = self.books_repository.find_by_title_contains(&title).await?;
        tracing::info!("Found {} books with title containing: {}", books.len(), title);
        Ok(books)
    }

    pub async fn search_by_author(&self, author: &str) -> Result<Vec<Book>, BookServiceError> {
        let Some(author) = trimmed(Some(author)) else {
            return Err(Self::missing_search_criteria());
        };
        tracing::debug!("Searching books by author: {}", author);
        let books = self.books_repository.find_by_author_contains(&author).await?;
        tracing::info!("Found {} books with author containing: {}", books.len(), author);
        Ok(books)
    }

    /// Searches by title when it is given, otherwise by author
    pub async fn search(&self, query: SearchQuery) -> Result<Vec<Book>, BookServiceError> {
        if let Some(title) = trimmed(query.title.as_deref()) {
            self.search_by_title(&title).await
        } else if let Some(author) = trimmed(query.author.as_deref()) {
            self.search_by_author(&author).await
        } else {
            Err(Self::missing_search_criteria())
        }
    }

    fn missing_search_criteria() -> BookServiceError {
        tracing::warn!("Search called without valid parameters");
        BookServiceError::InvalidInput {
            message: "Search requires a non-blank 'title' or 'author' parameter".to_string(),
            violations: vec![],
        }
    }
}
