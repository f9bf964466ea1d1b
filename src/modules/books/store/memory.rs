use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookFilter, BookStore, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookChanges};

/// In-process [`BookStore`] for tests and the `memory` storage backend.
///
/// Rows keep insertion order. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryBookStore {
    rows: RwLock<Vec<Book>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows across every owner.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn select(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|b| filter.matches(b)).cloned().collect())
    }

    async fn insert(&self, book: &Book) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|b| b.id == book.id) {
            return Err(StoreError::Duplicate(book.id));
        }
        rows.push(book.clone());
        Ok(())
    }

    async fn update(&self, filter: &BookFilter, changes: &BookChanges) -> StoreResult<u64> {
        let mut rows = self.rows.write().await;
        let mut matched = 0;
        for book in rows.iter_mut().filter(|b| filter.matches(b)) {
            changes.apply_to(book);
            matched += 1;
        }
        Ok(matched)
    }

    async fn delete(&self, filter: &BookFilter) -> StoreResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|b| !filter.matches(b));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn book(user_id: &str) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "Emma".to_string(),
            author: "Austen".to_string(),
            genre: "Classic".to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn scoped_operations_ignore_other_owners() {
        let store = InMemoryBookStore::new();
        let mine = book("u1");
        let theirs = book("u2");
        store.insert(&mine).await.unwrap();
        store.insert(&theirs).await.unwrap();

        let foreign = BookFilter::owned_by("u1").with_id(theirs.id);
        let changes = BookChanges {
            genre: Some("Romance".to_string()),
            ..Default::default()
        };
        assert_eq!(store.update(&foreign, &changes).await.unwrap(), 0);
        assert_eq!(store.delete(&foreign).await.unwrap(), 0);
        assert_eq!(store.len().await, 2);

        let listed = store.select(&BookFilter::owned_by("u2")).await.unwrap();
        assert_eq!(listed, vec![theirs]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryBookStore::new();
        let mine = book("u1");
        store.insert(&mine).await.unwrap();
        assert!(matches!(
            store.insert(&mine).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn select_follows_insertion_order() {
        let store = InMemoryBookStore::new();
        assert!(store.is_empty().await);

        let books: Vec<Book> = (0..5).map(|_| book("u1")).collect();
        for b in &books {
            store.insert(b).await.unwrap();
        }
        assert_eq!(store.select(&BookFilter::owned_by("u1")).await.unwrap(), books);

        store.delete(&BookFilter::owned_by("u1")).await.unwrap();
        assert!(store.is_empty().await);
    }
}
