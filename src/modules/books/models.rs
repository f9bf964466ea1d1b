use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A book owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier, minted at creation
    pub id: Uuid,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Genre of the book
    pub genre: String,
    /// Owner; always taken from the authenticated caller
    pub user_id: String,
}

/// Validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
}

impl NewBook {
    pub fn into_book(self, id: Uuid, user_id: impl Into<String>) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            user_id: user_id.into(),
        }
    }
}

/// Validated partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.genre.is_none()
    }

    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(genre) = &self.genre {
            book.genre = genre.clone();
        }
    }
}
