//! Router assembly and shared application state.

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::document::{self, BoardConfig};
use crate::settings::SettingsStore;
use crate::store::TaskStore;
use crate::watch::ChangeNotifier;

pub struct AppState {
    pub config: Config,
    pub store: TaskStore,
    pub settings: SettingsStore,
    pub notifier: Arc<ChangeNotifier>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    seed_document(&config.document_path).await?;

    let store = TaskStore::new(config.document_path.clone());
    let settings = SettingsStore::new(&config.data_dir).await;
    let notifier = ChangeNotifier::new();
    notifier.watch(config.document_path.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        store,
        settings,
        notifier,
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .nest("/api/tasks", super::tasks::routes())
        .nest("/api/settings", super::settings::routes())
        .route("/api/events", get(super::events::events_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Write an empty board with the default front matter when the document
/// does not exist yet, so a first launch starts from a valid file.
async fn seed_document(path: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, document::serialize(&BoardConfig::default(), &[])).await?;
    tracing::info!(path = %path.display(), "created new task document");
    Ok(())
}
