//! Application wiring shared by the server binary and the CLI.

use anyhow::Context;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A bootstrapped application: database open, migrations applied, modules
/// initialized.
pub struct App {
    pub settings: Settings,
    pub db: Database,
    pub registry: ModuleRegistry,
}

impl App {
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database.pool_config())
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &settings, &db);

        registry.apply_migrations(&db).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_all(&ctx).await?;

        tracing::info!(modules = registry.len(), "bookshelf bootstrap complete");
        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules and serve until a shutdown signal arrives.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        self.registry.start_all(&ctx).await?;

        let served = bookshelf_http::start_server(
            &self.registry,
            &self.settings,
            bookshelf_http::shutdown_signal(),
        )
        .await;

        self.registry.stop_all().await?;
        self.db.close().await;
        served
    }
}

/// Apply pending migrations without serving; returns how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database.pool_config())
        .await
        .context("failed to open database")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, &db);
    let applied = registry.apply_migrations(&db).await?;

    db.close().await;
    Ok(applied)
}
