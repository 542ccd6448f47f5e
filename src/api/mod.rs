//! HTTP API for the task board.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/tasks` - The whole board (labels + tasks)
//! - `POST /api/tasks` - Create a task
//! - `PATCH /api/tasks/{id}` - Partially update a task (may fire automation)
//! - `DELETE /api/tasks/{id}` - Delete a task
//! - `GET /api/settings` - Get the automation settings
//! - `PUT /api/settings` - Replace the automation settings
//! - `GET /api/events` - WebSocket pushing a `refresh` frame per document
//!   change

mod events;
mod routes;
mod settings;
mod tasks;

pub use routes::{serve, AppState};
