use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

/// Publishes that are still in flight. The lock is only held to add or
/// take handles, never while joining them.
#[derive(Debug, Default)]
pub struct InFlight {
    handles: Mutex<Vec<JoinHandle<()>>>,
    aborts: Mutex<Vec<AbortHandle>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn track(&self, handle: JoinHandle<()>) {
        {
            let mut aborts = self.aborts.lock().await;
            aborts.retain(|h| !h.is_finished());
            aborts.push(handle.abort_handle());
        }
        self.handles.lock().await.push(handle);
    }

    pub async fn len(&self) -> usize {
        self.aborts
            .lock()
            .await
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Waits until no tracked publish is left, including ones tracked while
    /// waiting.
    pub async fn wait(&self) {
        loop {
            let handles = std::mem::take(&mut *self.handles.lock().await);
            if handles.is_empty() {
                return;
            }
            debug!("Waiting for {} dumps", handles.len());
            for result in join_all(handles).await {
                match result {
                    Err(e) if e.is_cancelled() => debug!("Dump task aborted"),
                    Err(e) => warn!("Dump task ended abnormally: {}", e),
                    Ok(()) => {}
                }
            }
        }
    }

    /// Aborts every tracked publish, including ones a pending `wait` is
    /// joining.
    pub async fn shutdown(&self) {
        for handle in std::mem::take(&mut *self.aborts.lock().await) {
            handle.abort();
        }
        let handles = std::mem::take(&mut *self.handles.lock().await);
        join_all(handles).await;
    }
}
