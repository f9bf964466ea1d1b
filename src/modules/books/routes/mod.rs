use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use bookshelf_authz::{require_identity, Identity, TokenVerifier};
use bookshelf_http::AppError;
use serde::Serialize;

use super::models::Book;
use super::service::{BookError, BookService};
use super::validation;

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

/// `{}` when the book is absent.
#[derive(Debug, Serialize)]
pub struct BookEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

const HEALTH_SEGMENT: &str = "health";

/// Books routes. Everything except `GET /health` requires a bearer token.
pub fn router(service: Arc<BookService>, verifier: Arc<TokenVerifier>) -> Router {
    // `/health` shadows `/{id}`, so its writes are routed like any other id.
    let health = get(health_check).merge(
        put(update_health)
            .delete(delete_health)
            .route_layer(middleware::from_fn_with_state(verifier.clone(), require_identity)),
    );

    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .route_layer(middleware::from_fn_with_state(verifier, require_identity))
        .route(&format!("/{HEALTH_SEGMENT}"), health)
        .with_state(service)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn update_health(
    service: State<Arc<BookService>>,
    identity: Identity,
    body: Bytes,
) -> Result<Json<MessageBody>, AppError> {
    update_book(service, identity, Path(HEALTH_SEGMENT.to_string()), body).await
}

async fn delete_health(
    service: State<Arc<BookService>>,
    identity: Identity,
) -> Result<Json<MessageBody>, AppError> {
    delete_book(service, identity, Path(HEALTH_SEGMENT.to_string())).await
}

async fn list_books(
    State(service): State<Arc<BookService>>,
    identity: Identity,
) -> Result<Json<BookList>, AppError> {
    let books = service.list(&identity).await?;
    Ok(Json(BookList { books }))
}

async fn get_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = service.get(&identity, &id).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn create_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let body = validation::parse_json_body(&body).map_err(BookError::from)?;
    service.create(&identity, &body).await?;
    Ok(StatusCode::CREATED)
}

async fn update_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageBody>, AppError> {
    // Route params are checked before the body
    validation::parse_book_id(&id).map_err(BookError::from)?;
    let body = validation::parse_json_body(&body).map_err(BookError::from)?;
    service.update(&identity, &id, &body).await?;
    Ok(Json(MessageBody {
        message: "Book updated successfully",
    }))
}

async fn delete_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    service.delete(&identity, &id).await?;
    Ok(Json(MessageBody {
        message: "Book deleted successfully",
    }))
}
