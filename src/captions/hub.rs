use futures::stream::{self, Stream};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{CaptionPublisher, CaptionScope};
use crate::message::TranslationMessage;

/// Broadcast hub for captions
#[derive(Debug, Clone)]
pub struct CaptionHub {
    tx: broadcast::Sender<TranslationMessage>,
    scope: CaptionScope,
}

impl CaptionHub {
    pub fn new(capacity: usize, scope: CaptionScope) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, scope }
    }

    pub fn scope(&self) -> CaptionScope {
        self.scope
    }

    /// Register an observer. `call_id` narrows delivery only when the hub is
    /// scoped per call.
    pub fn subscribe(&self, call_id: Option<String>) -> CaptionObserver {
        let filter = match self.scope {
            CaptionScope::All => None,
            CaptionScope::Call => call_id,
        };

        debug!("Caption observer subscribed (filter={:?})", filter);

        CaptionObserver {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl CaptionPublisher for CaptionHub {
    fn publish(&self, caption: TranslationMessage) {
        // No observers connected is not an error
        if let Ok(count) = self.tx.send(caption) {
            debug!("Caption delivered to {} observers", count);
        }
    }
}

/// One observer's view of the caption stream
#[derive(Debug)]
pub struct CaptionObserver {
    rx: broadcast::Receiver<TranslationMessage>,
    filter: Option<String>,
}

impl CaptionObserver {
    /// Next caption for this observer, or `None` once the hub is gone
    pub async fn next(&mut self) -> Option<TranslationMessage> {
        loop {
            match self.rx.recv().await {
                Ok(caption) => {
                    if self.accepts(&caption) {
                        return Some(caption);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Caption observer lagged, skipped {} captions", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, caption: &TranslationMessage) -> bool {
        self.filter
            .as_deref()
            .map_or(true, |call_id| caption.uuid == call_id)
    }

    pub fn into_stream(self) -> impl Stream<Item = TranslationMessage> {
        stream::unfold(self, |mut observer| async move {
            observer.next().await.map(|caption| (caption, observer))
        })
    }
}
