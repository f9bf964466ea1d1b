//! Owner-scoped book operations.
//!
//! Every operation validates its raw input before touching the store, and
//! every store call is scoped to the caller's user id. Update and delete are
//! check-then-act without a transaction.

use std::sync::Arc;

use bookshelf_authz::Identity;
use bookshelf_http::AppError;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::models::Book;
use super::store::{BookFilter, BookStore, StoreError};
use super::validation::{self, ValidationError};

#[derive(Error, Debug)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("book {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(e) => {
                let details = e
                    .issues
                    .iter()
                    .filter_map(|issue| serde_json::to_value(issue).ok())
                    .collect();
                AppError::validation(details, e.message)
            }
            BookError::NotFound(_) => AppError::not_found("Book not found"),
            BookError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<Book>, BookError> {
        let books = self
            .store
            .select(&BookFilter::owned_by(&identity.user_id))
            .await?;
        tracing::debug!(user_id = %identity.user_id, count = books.len(), "listed books");
        Ok(books)
    }

    /// Absent and foreign-owned books both come back as `None`.
    pub async fn get(&self, identity: &Identity, id: &str) -> Result<Option<Book>, BookError> {
        let id = validation::parse_book_id(id)?;
        self.find_owned(identity, id).await
    }

    pub async fn create(&self, identity: &Identity, body: &Value) -> Result<Book, BookError> {
        let new_book = validation::parse_new_book(body)?;
        let book = new_book.into_book(Uuid::new_v4(), identity.user_id.clone());

        self.store.insert(&book).await?;
        tracing::info!(user_id = %identity.user_id, book_id = %book.id, "book created");
        Ok(book)
    }

    pub async fn update(&self, identity: &Identity, id: &str, body: &Value) -> Result<(), BookError> {
        let id = validation::parse_book_id(id)?;
        let changes = validation::parse_book_changes(body)?;

        if self.find_owned(identity, id).await?.is_none() {
            return Err(BookError::NotFound(id));
        }
        if changes.is_empty() {
            return Ok(());
        }

        let filter = BookFilter::owned_by(&identity.user_id).with_id(id);
        self.store.update(&filter, &changes).await?;
        tracing::info!(user_id = %identity.user_id, book_id = %id, "book updated");
        Ok(())
    }

    pub async fn delete(&self, identity: &Identity, id: &str) -> Result<(), BookError> {
        let id = validation::parse_book_id(id)?;

        if self.find_owned(identity, id).await?.is_none() {
            return Err(BookError::NotFound(id));
        }

        let filter = BookFilter::owned_by(&identity.user_id).with_id(id);
        self.store.delete(&filter).await?;
        tracing::info!(user_id = %identity.user_id, book_id = %id, "book deleted");
        Ok(())
    }

    async fn find_owned(&self, identity: &Identity, id: Uuid) -> Result<Option<Book>, BookError> {
        let filter = BookFilter::owned_by(&identity.user_id).with_id(id);
        Ok(self.store.select(&filter).await?.into_iter().next())
    }
}
