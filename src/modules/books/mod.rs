pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_authz::TokenVerifier;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use service::BookService;

/// Per-user book collection mounted at `/api/books`
pub struct BooksModule {
    service: Arc<BookService>,
    verifier: Arc<TokenVerifier>,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>, verifier: Arc<TokenVerifier>) -> Self {
        Self { service, verifier }
    }

    /// Schema for the `books` relation.
    pub fn schema_migrations() -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id      TEXT PRIMARY KEY NOT NULL,
                    title   TEXT NOT NULL,
                    author  TEXT NOT NULL,
                    genre   TEXT NOT NULL,
                    user_id TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS books_user_id_idx ON books (user_id);
                "#,
        }]
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.storage.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone(), self.verifier.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let message = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Message" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        });
        let secured = json!([{ "bearerAuth": [] }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the caller's books",
                        "tags": ["Books"],
                        "security": secured,
                        "responses": {
                            "200": {
                                "description": "Books owned by the caller",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "books": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Book" }
                                                }
                                            },
                                            "required": ["books"]
                                        }
                                    }
                                }
                            },
                            "401": error("Missing or invalid token")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": secured,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Created" },
                            "400": error("Invalid body"),
                            "401": error("Missing or invalid token")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get one of the caller's books",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "`book` is omitted when absent",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "book": { "$ref": "#/components/schemas/Book" }
                                            }
                                        }
                                    }
                                }
                            },
                            "400": error("Invalid id"),
                            "401": error("Missing or invalid token")
                        }
                    },
                    "put": {
                        "summary": "Partially update a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": [id_param],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": message("Updated"),
                            "400": error("Invalid id or body"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": [id_param],
                        "responses": {
                            "200": message("Deleted"),
                            "400": error("Invalid id"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "user_id": { "type": "string" }
                        },
                        "required": ["id", "title", "author", "genre", "user_id"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1 },
                            "author": { "type": "string", "minLength": 1 },
                            "genre": { "type": "string", "minLength": 1 }
                        },
                        "required": ["title", "author", "genre"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1 },
                            "author": { "type": "string", "minLength": 1 },
                            "genre": { "type": "string", "minLength": 1 }
                        }
                    },
                    "Message": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        Self::schema_migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
