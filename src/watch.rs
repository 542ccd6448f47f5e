//! Document change notifications.
//!
//! A background task polls the document's modification time and broadcasts
//! a content-less refresh signal whenever it changes, no matter which actor
//! wrote the file (the store, a text editor, the worker). Subscribers
//! re-read through the store; the watcher never reads the document body.
//!
//! Broadcast is fire-and-forget: sends never block, a lagged subscriber
//! skips ahead to the latest signal, and a disconnected one just drops out.
//! The subscriber set starts empty and lives for the process lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct ChangeNotifier {
    tx: broadcast::Sender<()>,
}

impl ChangeNotifier {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(32);
        Arc::new(Self { tx })
    }

    /// Start the poll loop for `path`. Runs until process exit; a missing
    /// file simply reads as "no stamp" until it appears.
    pub fn watch(self: &Arc<Self>, path: PathBuf) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            let mut last = stamp(&path).await;
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                let current = stamp(&path).await;
                if current != last {
                    last = current;
                    tracing::debug!(path = %path.display(), "document changed, broadcasting refresh");
                    notifier.notify();
                }
            }
        });
    }

    /// Subscribe to refresh signals.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast one refresh signal. A send with no live subscribers is
    /// not an error.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }
}

/// Change stamp for the document: mtime plus length, metadata only. The
/// length guards against filesystems with coarse mtime granularity.
async fn stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    Some((modified, meta.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn notify_reaches_all_subscribers() {
        let notifier = ChangeNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        notifier.notify();
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_fine() {
        let notifier = ChangeNotifier::new();
        notifier.notify();
    }

    #[tokio::test]
    async fn slow_subscribers_never_block_the_sender() {
        let notifier = ChangeNotifier::new();
        let _idle = notifier.subscribe();
        // Far more signals than the channel buffers; sends stay non-blocking.
        for _ in 0..100 {
            notifier.notify();
        }
    }

    #[tokio::test]
    async fn watcher_emits_refresh_when_the_file_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.txt");
        std::fs::write(&path, "1. Before\n").unwrap();

        let notifier = ChangeNotifier::new();
        let mut refreshes = notifier.subscribe();
        notifier.watch(path.clone());

        // Let the watcher record the initial mtime before modifying.
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "1. After\n").unwrap();

        timeout(Duration::from_secs(3), refreshes.recv())
            .await
            .expect("refresh within the poll window")
            .expect("channel open");
    }
}
