pub mod books;

use std::sync::Arc;

use bookshelf_authz::TokenVerifier;
use bookshelf_db::Database;
use bookshelf_kernel::{
    settings::{Settings, StorageBackend},
    ModuleRegistry,
};

use books::service::BookService;
use books::store::{BookStore, InMemoryBookStore, SqliteBookStore};

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings, db: &Database) {
    let store: Arc<dyn BookStore> = match settings.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteBookStore::new(db.pool().clone())),
        StorageBackend::Memory => Arc::new(InMemoryBookStore::new()),
    };
    let verifier = Arc::new(TokenVerifier::from_settings(&settings.auth));

    registry.register(Arc::new(books::BooksModule::new(
        Arc::new(BookService::new(store)),
        verifier,
    )));
}
