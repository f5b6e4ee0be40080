use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::TranslationResult;

/// Callback invoked for every translation result while attached
pub type ResultCallback = Box<dyn Fn(TranslationResult) + Send + Sync>;

struct SinkInner {
    callback: Mutex<Option<ResultCallback>>,
    terminated: AtomicBool,
}

/// Where an adapter delivers its results
///
/// Cloned into the adapter's worker; the owning [`Subscription`] detaches it on
/// stop. Detaching waits for an in-flight delivery, so nothing reaches the
/// callback once `detach` has returned.
#[derive(Clone)]
pub struct ResultSink {
    inner: Arc<SinkInner>,
}

impl ResultSink {
    pub fn new(callback: ResultCallback) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                callback: Mutex::new(Some(callback)),
                terminated: AtomicBool::new(false),
            }),
        }
    }

    fn callback(&self) -> MutexGuard<'_, Option<ResultCallback>> {
        self.inner
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver a result. Returns false if the sink was already detached.
    pub fn emit(&self, result: TranslationResult) -> bool {
        let callback = self.callback();
        match callback.as_ref() {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                debug!("Dropping late result for call {}", result.call_id);
                false
            }
        }
    }

    pub fn detach(&self) {
        self.callback().take();
    }

    pub fn is_attached(&self) -> bool {
        self.callback().is_some()
    }

    /// Adapter-side signal that the speech session has ended for good
    pub fn terminate(&self) {
        self.inner.terminated.store(true, Ordering::SeqCst);
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }
}

/// Scoped handle to a running speech session
///
/// Returned by `TranslationAdapter::start`. Stopping (or dropping) it detaches
/// the result callback before the worker is halted.
pub struct Subscription {
    sink: ResultSink,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the adapter's worker. The worker receives a shutdown signal and
    /// should return promptly once it fires.
    pub fn spawn<F, Fut>(sink: ResultSink, worker: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(worker(shutdown_rx));

        Self {
            sink,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.sink.is_terminated()
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }

    /// Detach the callback and halt the worker, aborting it after `timeout`.
    /// Calling this more than once is a no-op.
    pub async fn stop(&mut self, timeout: Duration) {
        self.sink.detach();

        if let Some(shutdown) = self.shutdown.take() {
            // Worker may already have exited
            let _ = shutdown.send(());
        }

        let Some(mut task) = self.task.take() else {
            return;
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => debug!("Speech worker stopped"),
            Ok(Err(e)) if e.is_cancelled() => debug!("Speech worker was cancelled"),
            Ok(Err(e)) => warn!("Speech worker panicked: {}", e),
            Err(_) => {
                warn!("Speech worker did not stop within {:?}, aborting", timeout);
                task.abort();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.sink.detach();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
