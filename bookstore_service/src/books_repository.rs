pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookId};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Book that was validated but not yet stored
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewBook {
    /// Id requested by the caller, repository assigns the next free one when `None`
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
}

/// Data access for the `book` table.
/// Implementations know nothing about validation, absence of rows is reported through
/// `Option`/`bool` results and never as an error.
#[async_trait::async_trait]
pub trait BookRepository {
    /// Lists all books ordered by id
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError>;
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError>;
    async fn exists_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError>;
    /// Stores a new book, returns it with the id it was stored under
    async fn insert(&self, book: NewBook) -> Result<Book, BookRepositoryError>;
    /// Overwrites title and author of the book with the same id.
    /// Returns `None` if there is no such book
    async fn update(&self, book: Book) -> Result<Option<Book>, BookRepositoryError>;
    /// Returns true if a book was deleted
    async fn delete_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError>;
    /// Returns number of deleted books
    async fn delete_all(&self) -> Result<u64, BookRepositoryError>;
    /// Case insensitive substring search on title, ordered by id
    async fn find_by_title_contains(&self, text: &str) -> Result<Vec<Book>, BookRepositoryError>;
    /// Case insensitive substring search on author, ordered by id
    async fn find_by_author_contains(&self, text: &str)
        -> Result<Vec<Book>, BookRepositoryError>;
}
