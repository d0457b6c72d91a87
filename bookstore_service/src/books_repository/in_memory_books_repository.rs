use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::api::{Book, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError, NewBook};

pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI64,
    books: parking_lot::RwLock<BTreeMap<BookId, Book>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicI64::new(1),
            books: Default::default(),
        }
    }
}

impl InMemoryBookRepository {
    fn find_matching(&self, text: &str, field: impl Fn(&Book) -> &str) -> Vec<Book> {
        let needle = text.to_lowercase();
        self.books
            .read()
            .values()
            .filter(|book| field(book).to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self.books.read().values().cloned().collect())
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError> {
        Ok(self.books.read().get(&book_id).cloned())
    }

    async fn exists_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError> {
        Ok(self.books.read().contains_key(&book_id))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let id = match book.id {
            Some(id) if locked_books.contains_key(&id) => {
                return Err(BookRepositoryError::Other(format!(
                    "Duplicate key, book {} already stored",
                    id
                )));
            }
            Some(id) => {
                // keep generated ids ahead of the ones chosen by callers
                self.book_sequence_generator
                    .fetch_max(id.saturating_add(1), Ordering::Relaxed);
                id
            }
            None => loop {
                let candidate = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
                if !locked_books.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let stored = Book {
            id,
            title: book.title,
            author: book.author,
        };
        locked_books.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: Book) -> Result<Option<Book>, BookRepositoryError> {
        let mut locked_books = self.books.write();
        Ok(locked_books.get_mut(&book.id).map(|stored| {
            *stored = book;
            stored.clone()
        }))
    }

    async fn delete_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError> {
        Ok(self.books.write().remove(&book_id).is_some())
    }

    async fn delete_all(&self) -> Result<u64, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let count = locked_books.len() as u64;
        locked_books.clear();
        Ok(count)
    }

    async fn find_by_title_contains(&self, text: &str) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self.find_matching(text, |book| book.title.as_str()))
    }

    async fn find_by_author_contains(
        &self,
        text: &str,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self.find_matching(text, |book| book.author.as_str()))
    }
}

#[cfg(test)]
mod in_memory_book_repository_tests {
    use crate::api::Book;
    use crate::books_repository::{BookRepository, InMemoryBookRepository, NewBook};

    fn new_book(id: Option<i64>, title: &str, author: &str) -> NewBook {
        NewBook {
            id,
            title: title.to_string(),
            author: author.to_string(),
        }
    }

    #[tokio::test]
    /// Tests if insert and find_by_id work correctly
    async fn test_insert_book_and_get_it() {
        let repo = InMemoryBookRepository::default();

        let not_existing_book_id = 20000;
        assert_eq!(repo.find_by_id(not_existing_book_id).await.unwrap(), None);
        assert!(!repo.exists_by_id(not_existing_book_id).await.unwrap());

        let stored = repo
            .insert(new_book(None, "Dune", "Frank Herbert"))
            .await
            .expect("Failed to add book");

        assert_eq!(stored.title, "Dune");
        assert_eq!(stored.author, "Frank Herbert");
        assert!(repo.exists_by_id(stored.id).await.unwrap());
        assert_eq!(
            repo.find_by_id(stored.id).await.unwrap(),
            Some(stored.clone())
        );
    }

    #[tokio::test]
    /// Generated ids must skip the ones callers already picked
    async fn test_generated_ids_do_not_collide_with_explicit_ids() {
        let repo = InMemoryBookRepository::default();

        let explicit = repo
            .insert(new_book(Some(1), "explicit", "a"))
            .await
            .unwrap();
        let generated = repo.insert(new_book(None, "generated", "b")).await.unwrap();
        assert_eq!(explicit.id, 1);
        assert_eq!(generated.id, 2);

        let far_ahead = repo
            .insert(new_book(Some(100), "far ahead", "c"))
            .await
            .unwrap();
        let next = repo.insert(new_book(None, "next", "d")).await.unwrap();
        assert_eq!(far_ahead.id, 100);
        assert_eq!(next.id, 101);

        let duplicate = repo.insert(new_book(Some(100), "duplicate", "e")).await;
        assert!(duplicate.is_err());
        assert_eq!(repo.find_by_id(100).await.unwrap().unwrap().title, "far ahead");
    }

    #[tokio::test]
    /// Listing and searching return books ordered by id whatever the insertion order
    async fn test_list_and_search_are_ordered_by_id() {
        let repo = InMemoryBookRepository::default();
        assert_eq!(repo.find_all().await.unwrap(), vec![]);

        repo.insert(new_book(Some(30), "The Great Gatsby", "F. Scott Fitzgerald"))
            .await
            .unwrap();
        repo.insert(new_book(Some(10), "Gatsby Revisited", "Someone Else"))
            .await
            .unwrap();
        repo.insert(new_book(Some(20), "Clean Code", "Robert C. Martin"))
            .await
            .unwrap();

        let ids: Vec<_> = repo.find_all().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        let ids: Vec<_> = repo
            .find_by_title_contains("gATSBY")
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![10, 30]);

        let by_author = repo.find_by_author_contains("martin").await.unwrap();
        assert_eq!(
            by_author,
            vec![Book {
                id: 20,
                title: "Clean Code".to_string(),
                author: "Robert C. Martin".to_string(),
            }]
        );

        assert_eq!(repo.find_by_author_contains("tolkien").await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = InMemoryBookRepository::default();

        let missing = repo
            .update(Book {
                id: 2000,
                title: "x".to_string(),
                author: "y".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(missing, None);

        let stored = repo.insert(new_book(None, "Dune", "Frank Herbert")).await.unwrap();
        let updated = repo
            .update(Book {
                title: "Dune Messiah".to_string(),
                ..stored.clone()
            })
            .await
            .unwrap()
            .expect("Book should exist");
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(repo.find_by_id(stored.id).await.unwrap(), Some(updated));

        assert!(repo.delete_by_id(stored.id).await.unwrap());
        // deleting again is not an error at this layer
        assert!(!repo.delete_by_id(stored.id).await.unwrap());

        repo.insert(new_book(None, "a", "b")).await.unwrap();
        repo.insert(new_book(None, "c", "d")).await.unwrap();
        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.delete_all().await.unwrap(), 0);
        assert_eq!(repo.find_all().await.unwrap(), vec![]);
    }
}
