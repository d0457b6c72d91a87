use anyhow::{bail, Context};
use reqwest::header::LOCATION;
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    Book, BookDetails, BookDetailsPatch, BookId, DeleteAllBooksResponse, ErrorResponse,
    SearchQuery,
};

pub struct BookstoreClient {
    url: String,
    client: ClientWithMiddleware,
}

/// Turns a non success response into an error carrying the server message
async fn failure(action: &str, response: Response) -> anyhow::Error {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(error) => anyhow::anyhow!("Failed to {} ({}): {}", action, status, error.message),
        Err(_) => anyhow::anyhow!("Failed to {} ({})", action, status),
    }
}

impl BookstoreClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::build(url, None)
    }

    /// Client retrying transient failures (connection errors, 5xx, 429) with exponential backoff
    pub fn with_retries(url: &str, max_retries: u32) -> anyhow::Result<Self> {
        Self::build(url, Some(max_retries))
    }

    fn build(url: &str, max_retries: Option<u32>) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let mut builder = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default());
        if let Some(max_retries) = max_retries {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client: builder.build(),
        })
    }

    /// Calls POST /api/books endpoint
    /// Returns the stored book, its id is also checked against the location header
    pub async fn add_book(&self, book_details: BookDetails) -> anyhow::Result<Book> {
        let response = self
            .client
            .post(format!("{}/api/books", self.url))
            .json(&book_details)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure("add book", response).await);
        }

        let location_id: BookId = response
            .headers()
            .get(LOCATION)
            .context("No location header")?
            .to_str()
            .context("Failed to convert header to str")?
            .strip_prefix("/api/books/")
            .context("Invalid location header")?
            .parse()
            .context("Failed to parse book id")?;

        let book: Book = response.json().await?;
        if book.id != location_id {
            bail!(
                "Location header points to book {} but book {} was returned",
                location_id,
                book.id
            )
        }
        Ok(book)
    }

    /// Calls GET /api/books/{book_id} endpoint
    /// Returns None if book was not in the repository
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Err(failure("get book", response).await)
        }
    }

    /// Calls GET /api/books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/api/books", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(failure("list books", response).await)
        }
    }

    /// Calls PUT /api/books/{book_id} endpoint
    pub async fn update_book(
        &self,
        book_id: BookId,
        patch: BookDetailsPatch,
    ) -> anyhow::Result<Book> {
        let response = self
            .client
            .put(format!("{}/api/books/{}", self.url, book_id))
            .json(&patch)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(failure("update book", response).await)
        }
    }

    /// Calls DELETE /api/books/{book_id} endpoint
    /// Returns true if deleted and false if there was no such book
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            Err(failure("delete book", response).await)
        }
    }

    /// Calls DELETE /api/books endpoint
    /// Returns number of deleted books
    pub async fn delete_all_books(&self) -> anyhow::Result<u64> {
        let response = self
            .client
            .delete(format!("{}/api/books", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            let deleted: DeleteAllBooksResponse = response.json().await?;
            Ok(deleted.deleted)
        } else {
            Err(failure("delete all books", response).await)
        }
    }

    /// Calls GET /api/books/search endpoint
    pub async fn search_books(&self, query: &SearchQuery) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/api/books/search", self.url))
            .query(query)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(failure("search books", response).await)
        }
    }
}
