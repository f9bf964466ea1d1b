use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{BookFilter, BookStore, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookChanges};

/// Ids are stored as hyphenated TEXT.
#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: String,
    title: String,
    author: String,
    genre: String,
    user_id: String,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| StoreError::CorruptRow {
            id: row.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Book {
            id,
            title: row.title,
            author: row.author,
            genre: row.genre,
            user_id: row.user_id,
        })
    }
}

/// SQLite implementation of [`BookStore`]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, filter: &BookFilter) {
    builder
        .push(" WHERE user_id = ")
        .push_bind(filter.user_id.clone());
    if let Some(id) = filter.id {
        builder.push(" AND id = ").push_bind(id.to_string());
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn select(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
        let mut builder = QueryBuilder::new("SELECT id, title, author, genre, user_id FROM books");
        push_scope(&mut builder, filter);
        builder.push(" ORDER BY rowid");

        let rows = builder
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn insert(&self, book: &Book) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO books (id, title, author, genre, user_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(book.id.to_string())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(book.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, filter: &BookFilter, changes: &BookChanges) -> StoreResult<u64> {
        if changes.is_empty() {
            return Ok(self.select(filter).await?.len() as u64);
        }

        let mut builder = QueryBuilder::new("UPDATE books SET ");
        {
            let mut assignments = builder.separated(", ");
            for (column, value) in [
                ("title = ", &changes.title),
                ("author = ", &changes.author),
                ("genre = ", &changes.genre),
            ] {
                if let Some(value) = value {
                    assignments.push(column);
                    assignments.push_bind_unseparated(value.clone());
                }
            }
        }
        push_scope(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, filter: &BookFilter) -> StoreResult<u64> {
        let mut builder = QueryBuilder::new("DELETE FROM books");
        push_scope(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
