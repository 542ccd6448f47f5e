//! API endpoints for the automation settings.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};

use crate::settings::Settings;

use super::routes::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

/// GET /api/settings
async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.get().await)
}

/// PUT /api/settings
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Settings>,
) -> Result<Json<Settings>, (StatusCode, String)> {
    state
        .settings
        .update(req.clone())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(req))
}
