//! Bounded work queue of documents waiting to be summarized.
//!
//! Producers (the directory watcher, the CLI) submit [`DocumentReady`]
//! events into a bounded channel. A single dispatcher drains it and runs at
//! most `workers` documents at once, each in its own task. A failing
//! document is logged and counted; it never stops the dispatcher or its
//! siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info};

use crate::app::{App, Processed};
use crate::config::QueueConfig;
use crate::error::{Error, Result};

/// A file that is ready to be summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReady {
    pub path: PathBuf,
    pub detected_at: DateTime<Utc>,
}

impl DocumentReady {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            detected_at: Utc::now(),
        }
    }
}

/// Something that can process one queued document.
#[async_trait]
pub trait DocumentHandler: Send + Sync + 'static {
    async fn handle(&self, path: &Path) -> Result<Processed>;
}

#[async_trait]
impl DocumentHandler for App {
    async fn handle(&self, path: &Path) -> Result<Processed> {
        self.process_path(path).await
    }
}

/// Outcome counts once the queue has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl QueueStats {
    fn record(&mut self, outcome: std::result::Result<bool, JoinError>) {
        match outcome {
            Ok(true) => self.succeeded = self.succeeded.saturating_add(1),
            Ok(false) => self.failed = self.failed.saturating_add(1),
            Err(e) => {
                error!(error = %e, "Document task aborted");
                self.failed = self.failed.saturating_add(1);
            }
        }
    }
}

/// Producer side of the queue. Cloneable; the dispatcher stops once every
/// clone is dropped and the backlog is drained.
#[derive(Debug, Clone)]
pub struct DocumentQueue {
    tx: mpsc::Sender<DocumentReady>,
}

impl DocumentQueue {
    /// Enqueue `path`, waiting while the backlog is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the dispatcher has stopped.
    pub async fn submit(&self, path: impl Into<PathBuf>) -> Result<()> {
        let event = DocumentReady::new(path);
        debug!(path = %event.path.display(), "Document queued");
        self.tx.send(event).await.map_err(|_| Error::QueueClosed)
    }

    /// Enqueue from a non-async context such as a file watcher callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the dispatcher has stopped.
    pub fn blocking_submit(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.tx
            .blocking_send(DocumentReady::new(path))
            .map_err(|_| Error::QueueClosed)
    }

    /// A queue with no dispatcher, for inspecting what producers submit.
    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<DocumentReady>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

/// Consumer side: the running dispatcher task.
#[derive(Debug)]
pub struct Dispatcher {
    handle: JoinHandle<QueueStats>,
}

impl Dispatcher {
    /// Wait for the backlog to drain after every producer is dropped.
    pub async fn finish(self) -> QueueStats {
        self.handle.await.unwrap_or_else(|e| {
            error!(error = %e, "Dispatcher task failed");
            QueueStats::default()
        })
    }

    /// Stop accepting new work; in-flight documents are abandoned.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Start a dispatcher for `handler`.
pub fn start<H: DocumentHandler>(handler: Arc<H>, config: &QueueConfig) -> (DocumentQueue, Dispatcher) {
    let (tx, rx) = mpsc::channel(config.backlog.max(1));
    let handle = tokio::spawn(dispatch(rx, handler, config.clone()));
    (DocumentQueue { tx }, Dispatcher { handle })
}

async fn dispatch<H: DocumentHandler>(
    mut rx: mpsc::Receiver<DocumentReady>,
    handler: Arc<H>,
    config: QueueConfig,
) -> QueueStats {
    let permits = Arc::new(Semaphore::new(config.workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut stats = QueueStats::default();

    info!(workers = config.workers, backlog = config.backlog, "Document queue started");

    while let Some(event) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };

        let handler = Arc::clone(&handler);
        let settle_delay = config.settle_delay;
        tasks.spawn(async move {
            let _permit = permit;
            tokio::time::sleep(settle_delay).await;
            run_one(handler.as_ref(), &event).await
        });

        while let Some(outcome) = tasks.try_join_next() {
            stats.record(outcome);
        }
    }

    while let Some(outcome) = tasks.join_next().await {
        stats.record(outcome);
    }

    info!(succeeded = stats.succeeded, failed = stats.failed, "Document queue drained");
    stats
}

async fn run_one<H: DocumentHandler>(handler: &H, event: &DocumentReady) -> bool {
    let waited_ms = (Utc::now() - event.detected_at).num_milliseconds();
    info!(path = %event.path.display(), waited_ms, "Processing document");

    match handler.handle(&event.path).await {
        Ok(processed) => {
            info!(
                file_name = %processed.document_name,
                record = %processed.record_path.display(),
                chunks = processed.chunks,
                degraded = processed.degraded,
                "Document processed"
            );
            true
        }
        Err(e) => {
            error!(path = %event.path.display(), error = %e, "Document processing failed");
            false
        }
    }
}
