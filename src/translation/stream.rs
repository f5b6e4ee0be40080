use tokio::sync::mpsc;
use tracing::debug;

/// Create the push stream that carries caller audio into a speech adapter
///
/// The stream exists before the adapter is started so the session can hand the
/// reader to `start` once the handshake names the languages.
pub fn audio_input() -> (AudioInputWriter, AudioInputReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AudioInputWriter { tx }, AudioInputReader { rx })
}

/// Write half of the audio input stream (held by the relay loop)
#[derive(Debug, Clone)]
pub struct AudioInputWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl AudioInputWriter {
    /// Queue raw PCM for recognition. Never blocks and never fails; audio pushed
    /// after the adapter has gone away is discarded.
    pub fn push(&self, chunk: Vec<u8>) {
        if let Err(e) = self.tx.send(chunk) {
            debug!("Audio input closed, discarding {} bytes", e.0.len());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Read half of the audio input stream (handed to the adapter)
#[derive(Debug)]
pub struct AudioInputReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl AudioInputReader {
    /// Next chunk of caller audio, or `None` once every writer is gone
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}
