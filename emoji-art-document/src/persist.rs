//! Fire-and-forget persistence of document snapshots.
//!
//! Each document owns one [`Persister`]. Intents hand it encoded snapshots
//! and return immediately; a spawned worker writes them in order on the
//! blocking pool. When snapshots queue up faster than they can be written,
//! only the newest is written. Failures are logged and dropped.

use std::sync::Arc;

use emoji_art_core::Storage;
use tokio::sync::{mpsc, oneshot};

enum Request {
    Write(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Handle to a document's persistence worker.
#[derive(Debug, Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<Request>,
}

impl Persister {
    /// Spawn a worker writing to `storage`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(storage: Arc<dyn Storage>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(storage, rx));
        Self { tx }
    }

    /// Queue a snapshot for writing.
    pub fn write(&self, bytes: Vec<u8>) {
        if self.tx.send(Request::Write(bytes)).is_err() {
            tracing::warn!("Persistence worker stopped; snapshot dropped");
        }
    }

    /// Wait until every snapshot queued before this call has been written
    /// (or has failed).
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Request::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(storage: Arc<dyn Storage>, mut rx: mpsc::UnboundedReceiver<Request>) {
    while let Some(request) = rx.recv().await {
        match request {
            Request::Write(mut bytes) => {
                let mut flushes = Vec::new();
                while let Ok(next) = rx.try_recv() {
                    match next {
                        Request::Write(newer) => bytes = newer,
                        Request::Flush(done) => {
                            flushes.push(done);
                            break;
                        }
                    }
                }
                write(&storage, bytes).await;
                for done in flushes {
                    let _ = done.send(());
                }
            }
            Request::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!(location = %storage.location(), "Persistence worker finished");
}

async fn write(storage: &Arc<dyn Storage>, bytes: Vec<u8>) {
    let storage = Arc::clone(storage);
    let location = storage.location();
    match tokio::task::spawn_blocking(move || storage.write(&bytes)).await {
        Ok(Ok(())) => tracing::trace!(%location, "Persisted document"),
        Ok(Err(e)) => tracing::warn!(%location, "Failed to persist document: {e}"),
        Err(e) => tracing::warn!(%location, "Persistence task failed: {e}"),
    }
}
