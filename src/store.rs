//! File-backed task store.
//!
//! Every operation is one full read-parse-mutate-write over the task
//! document. There is no locking and no isolation: the tool assumes a
//! single logical writer, and concurrent mutations are last-writer-wins
//! (see the crate docs and the tests at the bottom of this file).
//!
//! Writes pick the narrowest serialization that fits: an update touching
//! only severity/status goes through [`document::patch_field_lines`] so no
//! unrelated block is reformatted; anything else rewrites the document via
//! [`document::serialize`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::document::{self, Board, Task, DEFAULT_STATUS};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task document not found at {0}")]
    DocumentMissing(PathBuf),

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("{0}")]
    Validation(String),

    #[error("document io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Partial field update for [`TaskStore::update`]. `None` leaves a field as
/// it was.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

/// Fields for [`TaskStore::create`]. Only the title is required; the rest
/// fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

/// Pre- and post-mutation snapshots of a successful [`TaskStore::update`],
/// consumed by the automation trigger to detect status transitions.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub before: Task,
    pub after: Task,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the document.
    pub async fn read(&self) -> Result<Board, StoreError> {
        Ok(document::parse(&self.read_text().await?))
    }

    /// Merge `patch` over the task with `id` and persist the result.
    pub async fn update(&self, id: u64, patch: TaskPatch) -> Result<UpdateOutcome, StoreError> {
        let text = self.read_text().await?;
        let board = document::parse(&text);
        let before = board
            .find(id)
            .cloned()
            .ok_or(StoreError::TaskNotFound(id))?;

        let mut after = before.clone();
        if let Some(title) = patch.title {
            after.title = title;
        }
        if let Some(severity) = patch.severity {
            after.severity = severity;
        }
        if let Some(status) = patch.status {
            after.status = status;
        }
        if let Some(description) = patch.description {
            after.description = description;
        }

        // Label-only changes go through the targeted patch; if the block has
        // no labeled lines to rewrite, fall back to a full serialize.
        let labels_only = after.title == before.title && after.description == before.description;
        let updated = labels_only
            .then(|| document::patch_field_lines(&text, &[&after]))
            .flatten()
            .unwrap_or_else(|| {
                let tasks: Vec<Task> = board
                    .tasks
                    .iter()
                    .map(|t| if t.id == id { after.clone() } else { t.clone() })
                    .collect();
                document::serialize(&board.config, &tasks)
            });

        self.write_text(&updated).await?;
        tracing::debug!(id, labels_only, "updated task");
        Ok(UpdateOutcome { before, after })
    }

    /// Append a new task. The id is `max(existing ids) + 1`, never a reused
    /// one; severity and status fall back to the configured defaults.
    pub async fn create(&self, fields: NewTask) -> Result<Task, StoreError> {
        let title = fields.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation(
                "title must not be blank".to_string(),
            ));
        }

        // A store without a document yet starts from an empty default board.
        let board = match self.read().await {
            Ok(board) => board,
            Err(StoreError::DocumentMissing(_)) => Board::default(),
            Err(e) => return Err(e),
        };

        let task = Task {
            id: board.next_id(),
            title,
            severity: fields
                .severity
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| board.config.default_severity()),
            status: fields
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            description: fields.description.unwrap_or_default(),
        };

        let mut tasks = board.tasks;
        tasks.push(task.clone());
        self.write_text(&document::serialize(&board.config, &tasks))
            .await?;
        tracing::info!(id = task.id, "created task");
        Ok(task)
    }

    /// Remove the task's block. Remaining ids are untouched, so the id set
    /// keeps a gap where the task was.
    pub async fn delete(&self, id: u64) -> Result<(), StoreError> {
        let board = self.read().await?;
        if board.find(id).is_none() {
            return Err(StoreError::TaskNotFound(id));
        }
        let tasks: Vec<Task> = board.tasks.into_iter().filter(|t| t.id != id).collect();
        self.write_text(&document::serialize(&board.config, &tasks))
            .await?;
        tracing::info!(id, "deleted task");
        Ok(())
    }

    async fn read_text(&self) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::DocumentMissing(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_text(&self, text: &str) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = "---
statuses: Backlog, To Do, In Progress, Done
severities: Low, Medium, High
---
1. First task

    Severity: High
    Status: Backlog

    Original description.
---
6. Sixth task

    Severity: Low
    Status: To Do
";

    fn store_with(doc: &str) -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.txt");
        std::fs::write(&path, doc).unwrap();
        (dir, TaskStore::new(path))
    }

    fn block_of(text: &str, id: u64) -> String {
        let prefix = format!("{id}. ");
        text.split("---\n")
            .find(|b| b.starts_with(&prefix))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn read_missing_document_is_document_missing() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("absent.txt"));
        assert!(matches!(
            store.read().await,
            Err(StoreError::DocumentMissing(_))
        ));
    }

    #[tokio::test]
    async fn update_unknown_id_leaves_document_untouched() {
        let (_dir, store) = store_with(DOC);
        let err = store
            .update(42, TaskPatch::default())
            .await
            .expect_err("unknown id");
        assert!(matches!(err, StoreError::TaskNotFound(42)));
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, DOC);
    }

    #[tokio::test]
    async fn update_status_only_uses_targeted_patch() {
        let (_dir, store) = store_with(DOC);
        let outcome = store
            .update(
                6,
                TaskPatch {
                    status: Some("In Progress".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.before.status, "To Do");
        assert_eq!(outcome.after.status, "In Progress");

        let text = std::fs::read_to_string(store.path()).unwrap();
        // The other task's block is byte-identical.
        assert_eq!(block_of(&text, 1), block_of(DOC, 1));
        assert!(text.contains("    Status: In Progress\n"));
    }

    #[tokio::test]
    async fn update_title_rewrites_the_full_document() {
        let (_dir, store) = store_with(DOC);
        let outcome = store
            .update(
                1,
                TaskPatch {
                    title: Some("Renamed task".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.after.title, "Renamed task");
        let board = store.read().await.unwrap();
        assert_eq!(board.find(1).unwrap().title, "Renamed task");
        assert_eq!(board.find(1).unwrap().description, "Original description.");
    }

    #[tokio::test]
    async fn sequential_updates_do_not_disturb_other_blocks() {
        let (_dir, store) = store_with(DOC);

        let pre = std::fs::read_to_string(store.path()).unwrap();
        store
            .update(
                1,
                TaskPatch {
                    status: Some("To Do".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let mid = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(block_of(&mid, 6), block_of(&pre, 6));

        store
            .update(
                6,
                TaskPatch {
                    status: Some("Done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let post = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(block_of(&post, 1), block_of(&mid, 1));
    }

    #[tokio::test]
    async fn create_blank_title_is_rejected_without_writing() {
        let (_dir, store) = store_with(DOC);
        let err = store
            .create(NewTask {
                title: "   ".to_string(),
                ..Default::default()
            })
            .await
            .expect_err("blank title");
        assert!(matches!(err, StoreError::Validation(_)));
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, DOC);
    }

    #[tokio::test]
    async fn create_assigns_next_id_and_defaults() {
        let (_dir, store) = store_with(DOC);
        let task = store
            .create(NewTask {
                title: "Ship v2".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.status, "Backlog");
        assert_eq!(task.severity, "Medium");

        let board = store.read().await.unwrap();
        assert_eq!(board.tasks.len(), 3);
        assert_eq!(board.find(7).unwrap().title, "Ship v2");
    }

    #[tokio::test]
    async fn create_prefers_the_configured_medium_spelling() {
        let doc = "---\nstatuses: Open, Closed\nseverities: Trivial, MEDIUM, Severe\n---\n";
        let (_dir, store) = store_with(doc);
        let task = store
            .create(NewTask {
                title: "Labels".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.severity, "MEDIUM");
    }

    #[tokio::test]
    async fn create_on_missing_document_starts_a_fresh_board() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.txt"));
        let task = store
            .create(NewTask {
                title: "Genesis".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(task.id, 1);
        let board = store.read().await.unwrap();
        assert_eq!(board.tasks.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_block_and_keeps_ids() {
        let (_dir, store) = store_with(DOC);
        store.delete(1).await.unwrap();
        let board = store.read().await.unwrap();
        assert_eq!(board.tasks.len(), 1);
        assert_eq!(board.tasks[0].id, 6);

        // Ids are not reused after deletion: the next create fills no gap.
        let task = store
            .create(NewTask {
                title: "After delete".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(task.id, 7);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let (_dir, store) = store_with(DOC);
        assert!(matches!(
            store.delete(404).await,
            Err(StoreError::TaskNotFound(404))
        ));
    }

    /// Documents the accepted limitation: mutations are read-modify-write
    /// with no lock, so a writer working from a stale read silently
    /// overwrites a mutation that landed in between. Last writer wins.
    #[tokio::test]
    async fn concurrent_writers_are_last_writer_wins() {
        let (_dir, store) = store_with(DOC);

        let stale = store.read().await.unwrap();
        store
            .update(
                1,
                TaskPatch {
                    status: Some("Done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A second writer persists its stale snapshot wholesale.
        let text = document::serialize(&stale.config, &stale.tasks);
        std::fs::write(store.path(), text).unwrap();

        let board = store.read().await.unwrap();
        assert_eq!(board.find(1).unwrap().status, "Backlog");
    }
}
