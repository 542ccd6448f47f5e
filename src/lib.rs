//! # taskdeck
//!
//! Local task board backed by a single plain-text document.
//!
//! All task state lives in one human-editable file: a fenced front-matter
//! header declaring the allowed status and severity labels, followed by one
//! separator-delimited block per task. The server keeps a browser UI and an
//! external automation worker synchronized with that file.
//!
//! ## Modules
//! - `document`: text ⇄ task-record mapping (parse, serialize, targeted
//!   field patch) with round-trip fidelity
//! - `store`: CRUD over the document as read-modify-write persistence
//! - `automation`: status-transition trigger that launches a detached worker
//! - `watch`: change notifier (metadata poll + broadcast refresh signal)
//! - `settings`: persisted automation settings
//! - `api`: thin HTTP/WebSocket surface for the browser UI
//!
//! ## Concurrency model
//!
//! One logical writer. Every mutation re-reads the document and rewrites it
//! whole, so concurrent writers are last-writer-wins; there is no lock and
//! no transaction. External edits are picked up by a notify-only watcher
//! that broadcasts a content-less refresh signal. The automation worker is
//! fully detached after spawn: nothing awaits it, nothing can cancel it,
//! and its lifecycle is visible only in its log file.

pub mod api;
pub mod automation;
pub mod config;
pub mod document;
pub mod settings;
pub mod store;
pub mod watch;

pub use config::Config;
pub use document::{Board, BoardConfig, Task};
pub use settings::{Settings, SettingsStore};
pub use store::{StoreError, TaskStore};
