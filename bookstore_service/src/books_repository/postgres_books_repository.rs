use anyhow::Context;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{Book, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError, NewBook};

pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}/{}",
            config.username, config.password, config.hostname, config.dbname
        );
        tracing::info!(
            hostname = %config.hostname,
            username = %config.username,
            dbname = %config.dbname,
            "Connecting to postgres"
        );
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS book (
            id              BIGSERIAL PRIMARY KEY,
            title           TEXT NOT NULL,
            author          TEXT NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup table")?;
        Ok(Self { client })
    }

    async fn query_books(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Book>, BookRepositoryError> {
        let stmt: Statement = self.client.prepare(query).await?;
        let rows = self.client.query(&stmt, params).await?;
        rows.iter().map(book_from_row).collect()
    }
}

/// Maps a row selected as `id, title, author` into a book
fn book_from_row(row: &Row) -> Result<Book, BookRepositoryError> {
    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
    })
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books("SELECT id, title, author FROM book ORDER BY id", &[])
            .await
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, title, author FROM book WHERE id = ($1)")
            .await?;

        let row = self.client.query_opt(&stmt, &[&book_id]).await?;
        row.as_ref().map(book_from_row).transpose()
    }

    async fn exists_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT COUNT(*) FROM book WHERE id = ($1)")
            .await?;

        let count: i64 = self.client.query_one(&stmt, &[&book_id]).await?.try_get(0)?;
        Ok(count > 0)
    }

    async fn insert(&self, book: NewBook) -> Result<Book, BookRepositoryError> {
        let rows = match book.id {
            Some(book_id) => {
                let stmt: Statement = self
                    .client
                    .prepare(
                        "INSERT INTO book (id, title, author) VALUES ($1, $2, $3) RETURNING id, title, author",
                    )
                    .await?;
                let rows = self
                    .client
                    .query(&stmt, &[&book_id, &book.title, &book.author])
                    .await?;

                // explicit ids bypass the sequence, move it past them but never back
                let stmt: Statement = self
                    .client
                    .prepare(
                        "SELECT setval('book_id_seq', GREATEST($1::BIGINT, (SELECT last_value FROM book_id_seq)))",
                    )
                    .await?;
                self.client.execute(&stmt, &[&book_id]).await?;
                rows
            }
            None => {
                let stmt: Statement = self
                    .client
                    .prepare(
                        "INSERT INTO book (title, author) VALUES ($1, $2) RETURNING id, title, author",
                    )
                    .await?;
                self.client
                    .query(&stmt, &[&book.title, &book.author])
                    .await?
            }
        };

        rows.first()
            .map(book_from_row)
            .ok_or_else(|| BookRepositoryError::Other("Id not returned".to_string()))?
    }

    async fn update(&self, book: Book) -> Result<Option<Book>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("UPDATE book SET title = ($1), author = ($2) WHERE id = ($3) RETURNING id, title, author")
            .await?;

        let row = self
            .client
            .query_opt(&stmt, &[&book.title, &book.author, &book.id])
            .await?;
        row.as_ref().map(book_from_row).transpose()
    }

    async fn delete_by_id(&self, book_id: BookId) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM book WHERE id = ($1)")
            .await?;

        Ok(self.client.execute(&stmt, &[&book_id]).await? > 0)
    }

    async fn delete_all(&self) -> Result<u64, BookRepositoryError> {
        Ok(self.client.execute("DELETE FROM book", &[]).await?)
    }

    async fn find_by_title_contains(&self, text: &str) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books(
            "SELECT id, title, author FROM book WHERE strpos(lower(title), lower($1)) > 0 ORDER BY id",
            &[&text],
        )
        .await
    }

    async fn find_by_author_contains(
        &self,
        text: &str,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        self.query_books(
            "SELECT id, title, author FROM book WHERE strpos(lower(author), lower($1)) > 0 ORDER BY id",
            &[&text],
        )
        .await
    }
}

#[cfg(all(test, feature = "postgres_tests"))]
mod postgres_book_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::api::Book;
    use crate::books_repository::{BookRepository, NewBook};

    async fn start_postgres_container_and_init_repo() -> (
        ContainerAsync<GenericImage>,
        crate::books_repository::PostgresBooksRepository,
    ) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = crate::books_repository::PostgresBooksRepository::init(
                crate::books_repository::PostgresBooksRepositoryConfig {
                    hostname: "127.0.0.1".to_string(),
                    username: "postgres".to_string(),
                    password: "postgres".to_string(),
                    dbname: "postgres".to_string(),
                },
            )
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn new_book(id: Option<i64>, title: &str, author: &str) -> NewBook {
        NewBook {
            id,
            title: title.to_string(),
            author: author.to_string(),
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests insert, lookups and the sequence handling of explicit ids
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_insert_book_and_get_it() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let not_existing_book_id = 20000;
        assert_eq!(repo.find_by_id(not_existing_book_id).await.unwrap(), None);
        assert!(!repo.exists_by_id(not_existing_book_id).await.unwrap());

        let generated = repo
            .insert(new_book(None, "Dune", "Frank Herbert"))
            .await
            .expect("Failed to add book");
        assert_eq!(
            repo.find_by_id(generated.id).await.unwrap(),
            Some(generated.clone())
        );
        assert!(repo.exists_by_id(generated.id).await.unwrap());

        let explicit = repo
            .insert(new_book(Some(500), "Explicit", "Someone"))
            .await
            .expect("Failed to add book with explicit id");
        assert_eq!(explicit.id, 500);

        let after_explicit = repo
            .insert(new_book(None, "Next", "Someone"))
            .await
            .expect("Failed to add book");
        assert!(after_explicit.id > 500);

        // a smaller explicit id after the highest generated one was deleted keeps the sequence where it is
        assert!(repo.delete_by_id(after_explicit.id).await.unwrap());
        repo.insert(new_book(Some(7), "Small", "Someone"))
            .await
            .expect("Failed to add book with small explicit id");
        let after_small = repo
            .insert(new_book(None, "Later", "Someone"))
            .await
            .expect("Failed to add book");
        assert!(after_small.id > after_explicit.id);

        // primary key violation stays a plain storage failure at this layer
        assert!(repo
            .insert(new_book(Some(500), "Duplicate", "Someone"))
            .await
            .is_err());
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests ordering and case insensitive search
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_list_and_search_books() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        assert_eq!(repo.find_all().await.unwrap(), vec![]);

        repo.insert(new_book(Some(30), "The Great Gatsby", "F. Scott Fitzgerald"))
            .await
            .unwrap();
        repo.insert(new_book(Some(10), "Gatsby 100%_off", "Someone Else"))
            .await
            .unwrap();
        repo.insert(new_book(Some(20), "Clean Code", "Robert C. Martin"))
            .await
            .unwrap();

        let ids: Vec<_> = repo.find_all().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        let ids: Vec<_> = repo
            .find_by_title_contains("gatsby")
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![10, 30]);

        // LIKE wildcards in the search text are matched literally
        let ids: Vec<_> = repo
            .find_by_title_contains("%_")
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![10]);

        assert_eq!(
            repo.find_by_author_contains("MARTIN").await.unwrap(),
            vec![Book {
                id: 20,
                title: "Clean Code".to_string(),
                author: "Robert C. Martin".to_string(),
            }]
        );
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests update and both deletes
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_update_and_delete_books() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let missing = repo
            .update(Book {
                id: 2000,
                title: "x".to_string(),
                author: "y".to_string(),
            })
            .await
            .expect("Failed to update");
        assert_eq!(missing, None);

        let stored = repo
            .insert(new_book(None, "Dune", "Frank Herbert"))
            .await
            .unwrap();
        let updated = repo
            .update(Book {
                title: "Dune Messiah".to_string(),
                ..stored.clone()
            })
            .await
            .unwrap()
            .expect("Book should be updated");
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(repo.find_by_id(stored.id).await.unwrap(), Some(updated));

        assert!(repo.delete_by_id(stored.id).await.unwrap());
        assert!(!repo.delete_by_id(stored.id).await.unwrap());

        repo.insert(new_book(None, "a", "b")).await.unwrap();
        repo.insert(new_book(None, "c", "d")).await.unwrap();
        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.delete_all().await.unwrap(), 0);
    }
}
