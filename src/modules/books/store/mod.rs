//! Storage seam for the books module.

mod memory;
mod sqlite;

pub use memory::InMemoryBookStore;
pub use sqlite::SqliteBookStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Book, BookChanges};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("book {0} already exists")]
    Duplicate(Uuid),

    #[error("stored row {id} is corrupt: {reason}")]
    CorruptRow { id: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row filter. Always scoped to an owner; optionally narrowed to one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    pub user_id: String,
    pub id: Option<Uuid>,
}

impl BookFilter {
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn matches(&self, book: &Book) -> bool {
        book.user_id == self.user_id && self.id.map_or(true, |id| book.id == id)
    }
}

/// Narrow relational interface the book service needs.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Rows matching the filter, in insertion order
    async fn select(&self, filter: &BookFilter) -> StoreResult<Vec<Book>>;

    /// Insert a new row
    ///
    /// # Errors
    /// [`StoreError::Duplicate`] if the id is taken
    async fn insert(&self, book: &Book) -> StoreResult<()>;

    /// Apply the supplied fields to matching rows; returns rows matched.
    /// Empty changes write nothing.
    async fn update(&self, filter: &BookFilter, changes: &BookChanges) -> StoreResult<u64>;

    /// Remove matching rows; returns rows removed
    async fn delete(&self, filter: &BookFilter) -> StoreResult<u64>;
}
