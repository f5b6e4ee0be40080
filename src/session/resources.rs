use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::translation::{
    audio_input, AdapterFactory, AudioInputReader, AudioInputWriter, ResultCallback, ResultSink,
    StartRequest, Subscription, TranslationAdapter,
};

/// Producer side of the outbound audio queue (held by the result callback)
pub type OutboundSender = mpsc::UnboundedSender<Vec<u8>>;

/// Per-connection resources: one adapter, its audio input stream, its result
/// subscription and the outbound audio queue
///
/// Everything is allocated by [`acquire`](Self::acquire) before the handshake,
/// and [`release`](Self::release) tears it down once, tolerating a session
/// whose adapter never started.
pub struct SessionResources {
    adapter: Option<Box<dyn TranslationAdapter>>,
    audio_writer: Option<AudioInputWriter>,
    audio_reader: Option<AudioInputReader>,
    outbound_tx: Option<OutboundSender>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    subscription: Option<Subscription>,
    stop_timeout: Duration,
    released: bool,
}

impl SessionResources {
    pub fn acquire(factory: &dyn AdapterFactory, stop_timeout: Duration) -> Self {
        let adapter = factory.create();
        let (audio_writer, audio_reader) = audio_input();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        debug!("Acquired session resources ({} adapter)", adapter.name());

        Self {
            adapter: Some(adapter),
            audio_writer: Some(audio_writer),
            audio_reader: Some(audio_reader),
            outbound_tx: Some(outbound_tx),
            outbound_rx: Some(outbound_rx),
            subscription: None,
            stop_timeout,
            released: false,
        }
    }

    /// Handle for enqueuing synthesized audio
    pub fn outbound_sender(&self) -> Result<OutboundSender, RelayError> {
        self.outbound_tx
            .clone()
            .ok_or_else(|| RelayError::AdapterInternal("session already released".to_string()))
    }

    /// Start the adapter, wiring its results to `on_result`
    pub async fn start(
        &mut self,
        request: &StartRequest,
        on_result: ResultCallback,
    ) -> Result<(), RelayError> {
        let adapter = self
            .adapter
            .as_mut()
            .ok_or_else(|| RelayError::AdapterInternal("session already released".to_string()))?;

        let audio = self
            .audio_reader
            .take()
            .ok_or_else(|| RelayError::AdapterInternal("speech session already started".to_string()))?;

        info!(
            "Starting {} speech session for call {} ({} -> {})",
            adapter.name(),
            request.call_id,
            request.languages.spoken,
            request.languages.translated
        );

        let subscription = adapter
            .start(request, audio, ResultSink::new(on_result))
            .await?;

        self.subscription = Some(subscription);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Forward caller audio to the adapter (non-blocking)
    pub fn push_audio(&self, chunk: Vec<u8>) {
        if let Some(writer) = &self.audio_writer {
            writer.push(chunk);
        }
    }

    /// Next synthesized buffer waiting to be framed, if any
    pub fn next_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbound_rx.as_mut()?.try_recv().ok()
    }

    /// Whether the adapter has signalled the end of the speech session
    pub fn adapter_terminated(&self) -> bool {
        self.subscription
            .as_ref()
            .map_or(false, Subscription::is_terminated)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop the adapter, then drop the streams it was using. Returns how many
    /// synthesized buffers were still queued. Later calls return 0.
    pub async fn release(&mut self) -> usize {
        if self.released {
            debug!("Session resources already released");
            return 0;
        }
        self.released = true;

        // Stop recognition before its streams go away
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop(self.stop_timeout).await;
        }

        self.audio_writer.take();
        self.audio_reader.take();
        self.outbound_tx.take();

        let mut discarded = 0;
        if let Some(mut outbound) = self.outbound_rx.take() {
            outbound.close();
            while outbound.try_recv().is_ok() {
                discarded += 1;
            }
        }

        self.adapter.take();

        if discarded > 0 {
            info!("Discarded {} queued synthesized buffers", discarded);
        }
        debug!("Session resources released");

        discarded
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if !self.released {
            warn!("Session resources dropped without release");
        }
    }
}
