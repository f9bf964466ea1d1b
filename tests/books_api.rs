use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bookshelf::App;
use bookshelf_authz::TokenIssuer;
use bookshelf_kernel::settings::{DatabaseSettings, Settings, StorageBackend, StorageSettings};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    issuer: TokenIssuer,
}

impl TestApp {
    async fn with_backend(backend: StorageBackend) -> Self {
        let settings = Settings {
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                ..Default::default()
            },
            storage: StorageSettings { backend },
            ..Default::default()
        };
        let issuer = TokenIssuer::from_settings(&settings.auth);
        let app = App::bootstrap(settings).await.expect("bootstrap");

        Self {
            router: app.router(),
            issuer,
        }
    }

    async fn new() -> Self {
        Self::with_backend(StorageBackend::Sqlite).await
    }

    async fn call(&self, user: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.issuer.issue(user).unwrap();
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

async fn dune_lifecycle(app: &TestApp) {
    let (status, body) = app
        .call(
            "U1",
            "POST",
            "/api/books",
            Some(json!({ "title": "Dune", "author": "Herbert", "genre": "SciFi" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, Value::Null);

    let (status, body) = app.call("U1", "GET", "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Dune");
    assert_eq!(books[0]["author"], "Herbert");
    assert_eq!(books[0]["genre"], "SciFi");
    assert_eq!(books[0]["user_id"], "U1");
    let id = books[0]["id"].as_str().unwrap().to_string();
    let item = format!("/api/books/{id}");

    let (_, body) = app.call("U2", "GET", "/api/books", None).await;
    assert_eq!(body, json!({ "books": [] }));
    let (status, body) = app.call("U2", "GET", &item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = app
        .call("U1", "PUT", &item, Some(json!({ "title": "Dune Messiah" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");

    let (_, body) = app.call("U1", "GET", &item, None).await;
    assert_eq!(body["book"]["title"], "Dune Messiah");
    assert_eq!(body["book"]["author"], "Herbert");
    assert_eq!(body["book"]["genre"], "SciFi");

    let (status, body) = app.call("U2", "DELETE", &item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");

    let (status, body) = app.call("U1", "DELETE", &item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");

    let (status, body) = app.call("U1", "GET", &item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = app.call("U1", "DELETE", &item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dune_lifecycle_on_sqlite() {
    dune_lifecycle(&TestApp::new().await).await;
}

#[tokio::test]
async fn dune_lifecycle_on_memory_backend() {
    dune_lifecycle(&TestApp::with_backend(StorageBackend::Memory).await).await;
}

#[tokio::test]
async fn empty_update_is_a_successful_no_op() {
    let app = TestApp::new().await;
    app.call(
        "U1",
        "POST",
        "/api/books",
        Some(json!({ "title": "Emma", "author": "Austen", "genre": "Classic" })),
    )
    .await;
    let (_, body) = app.call("U1", "GET", "/api/books", None).await;
    let item = format!("/api/books/{}", body["books"][0]["id"].as_str().unwrap());

    let (status, _) = app.call("U1", "PUT", &item, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call("U1", "GET", &item, None).await;
    assert_eq!(body["book"]["title"], "Emma");
    assert_eq!(body["book"]["genre"], "Classic");
}

#[tokio::test]
async fn invalid_create_body_lists_every_field() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call("U1", "POST", "/api/books", Some(json!({ "title": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["title", "author", "genre"]);

    let (_, body) = app.call("U1", "GET", "/api/books", None).await;
    assert_eq!(body, json!({ "books": [] }));
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/api/books").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn ambient_endpoints_are_public() {
    let app = TestApp::new().await;
    for uri in ["/healthz", "/api/books/health", "/docs/openapi.json"] {
        let response = app
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn openapi_document_includes_books_paths() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let spec: Value = serde_json::from_slice(&bytes).unwrap();

    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"]["/api/books/{id}"]["put"].is_object());
    assert!(spec["components"]["schemas"]["Book"].is_object());
}
