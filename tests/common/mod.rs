// Test doubles shared by the integration tests
//
// - FakeSocket: inbound messages scripted through a channel, outbound frames
//   and the close frame recorded for assertions
// - FakeFactory / FakeAdapter: in-process speech adapter whose results are
//   emitted by the test itself

#![allow(dead_code)]

use async_trait::async_trait;
use call_translator::audio::WireFrame;
use call_translator::error::RelayError;
use call_translator::session::{AudioSocket, CloseReason, Inbound};
use call_translator::translation::{
    AdapterFactory, AudioInputReader, ResultSink, StartRequest, Subscription, TranslationAdapter,
    TranslationResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Socket
// ============================================================================

#[derive(Clone, Default)]
pub struct SocketLog {
    pub frames: Arc<Mutex<Vec<(Vec<u8>, bool)>>>,
    pub closed: Arc<Mutex<Option<Option<CloseReason>>>>,
}

impl SocketLog {
    pub fn frames(&self) -> Vec<(Vec<u8>, bool)> {
        self.frames.lock().unwrap().clone()
    }

    pub fn close_code(&self) -> Option<u16> {
        self.closed
            .lock()
            .unwrap()
            .clone()
            .flatten()
            .map(|reason| reason.code)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.lock().unwrap().is_some()
    }
}

pub struct FakeSocket {
    inbound: mpsc::UnboundedReceiver<Result<Inbound, RelayError>>,
    log: SocketLog,
}

/// Test side of a fake socket
pub struct Peer {
    tx: mpsc::UnboundedSender<Result<Inbound, RelayError>>,
    pub log: SocketLog,
}

impl Peer {
    pub fn send(&self, message: Inbound) {
        self.tx.send(Ok(message)).unwrap();
    }

    pub fn handshake(&self, call_id: &str) {
        self.send(Inbound::Text(format!(
            r#"{{"UUID":"{}","LanguageSpoken":"en-US","LanguageTranslated":"es-MX"}}"#,
            call_id
        )));
    }

    pub fn audio(&self, bytes: Vec<u8>) {
        self.send(Inbound::Binary(bytes));
    }

    pub fn close(&self, code: u16, reason: &str) {
        self.send(Inbound::Close(Some(CloseReason::new(code, reason))));
    }

    pub fn fail(&self, error: RelayError) {
        self.tx.send(Err(error)).unwrap();
    }
}

pub fn fake_socket() -> (FakeSocket, Peer) {
    let (tx, inbound) = mpsc::unbounded_channel();
    let log = SocketLog::default();
    (
        FakeSocket {
            inbound,
            log: log.clone(),
        },
        Peer { tx, log },
    )
}

#[async_trait]
impl AudioSocket for FakeSocket {
    async fn recv(&mut self) -> Result<Inbound, RelayError> {
        match self.inbound.recv().await {
            Some(message) => message,
            None => Ok(Inbound::Close(None)),
        }
    }

    async fn send_frame(&mut self, frame: &WireFrame<'_>) -> Result<(), RelayError> {
        self.log
            .frames
            .lock()
            .unwrap()
            .push((frame.chunk.to_vec(), frame.is_final));
        Ok(())
    }

    async fn close(&mut self, reason: Option<CloseReason>) -> Result<(), RelayError> {
        *self.log.closed.lock().unwrap() = Some(reason);
        Ok(())
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Observation point for one fake adapter instance
#[derive(Default)]
pub struct AdapterProbe {
    pub sink: Mutex<Option<ResultSink>>,
    pub request: Mutex<Option<StartRequest>>,
    pub audio: Mutex<Vec<Vec<u8>>>,
    pub started: Notify,
    pub start_calls: AtomicUsize,
    pub stopped: AtomicBool,
}

impl AdapterProbe {
    pub async fn wait_started(&self) {
        tokio::time::timeout(WAIT, self.started.notified())
            .await
            .expect("adapter was never started");
    }

    pub fn emit(&self, text: &str, audio: Vec<u8>) -> bool {
        let request = self.request().expect("not started");
        let sink = self.sink.lock().unwrap().clone().expect("not started");
        sink.emit(TranslationResult {
            call_id: request.call_id,
            language_spoken: request.languages.spoken,
            language_translated: request.languages.translated,
            text: text.to_string(),
            audio,
        })
    }

    pub fn terminate(&self) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.terminate();
        }
    }

    pub fn request(&self) -> Option<StartRequest> {
        self.request.lock().unwrap().clone()
    }

    pub fn audio(&self) -> Vec<Vec<u8>> {
        self.audio.lock().unwrap().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct FakeAdapter {
    probe: Arc<AdapterProbe>,
    fail_with: Option<RelayError>,
}

#[async_trait]
impl TranslationAdapter for FakeAdapter {
    async fn start(
        &mut self,
        request: &StartRequest,
        mut audio: AudioInputReader,
        sink: ResultSink,
    ) -> Result<Subscription, RelayError> {
        self.probe.start_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(e) = self.fail_with.clone() {
            return Err(e);
        }

        *self.probe.request.lock().unwrap() = Some(request.clone());
        *self.probe.sink.lock().unwrap() = Some(sink.clone());

        let probe = Arc::clone(&self.probe);
        let subscription = Subscription::spawn(sink, move |mut shutdown| async move {
            loop {
                tokio::select! {
                    biased;
                    chunk = audio.recv() => match chunk {
                        Some(chunk) => {
                            probe.audio.lock().unwrap().push(chunk);
                        }
                        None => {
                            let _ = (&mut shutdown).await;
                            break;
                        }
                    },
                    _ = &mut shutdown => break,
                }
            }
            probe.stopped.store(true, Ordering::SeqCst);
        });

        self.probe.started.notify_one();
        Ok(subscription)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub probes: Mutex<Vec<Arc<AdapterProbe>>>,
    pub fail_with: Option<RelayError>,
}

impl FakeFactory {
    pub fn failing(error: RelayError) -> Self {
        Self {
            probes: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn probe(&self, index: usize) -> Arc<AdapterProbe> {
        Arc::clone(&self.probes.lock().unwrap()[index])
    }

    pub fn created(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

impl AdapterFactory for FakeFactory {
    fn create(&self) -> Box<dyn TranslationAdapter> {
        let probe = Arc::new(AdapterProbe::default());
        self.probes.lock().unwrap().push(Arc::clone(&probe));
        Box::new(FakeAdapter {
            probe,
            fail_with: self.fail_with.clone(),
        })
    }
}
