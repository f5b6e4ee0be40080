use async_trait::async_trait;
use futures::stream::StreamExt;
use tracing::{debug, error, info, warn};

use super::client::NatsClient;
use super::messages::TranslationResultMessage;
use crate::config::SpeechConfig;
use crate::error::RelayError;
use crate::translation::{
    AdapterFactory, AudioInputReader, LanguagePair, ResultSink, StartRequest, Subscription,
    TranslationAdapter,
};

/// Speech adapter backed by a translation worker on a NATS bus
///
/// Caller audio is published as base64 frames; the worker answers with one
/// result message per utterance carrying the translated text and the
/// synthesized audio.
pub struct NatsTranslationAdapter {
    config: SpeechConfig,
}

impl NatsTranslationAdapter {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TranslationAdapter for NatsTranslationAdapter {
    async fn start(
        &mut self,
        request: &StartRequest,
        mut audio: AudioInputReader,
        sink: ResultSink,
    ) -> Result<Subscription, RelayError> {
        let credentials = self.config.credentials()?;
        request.languages.validate(&self.config.supported_languages)?;

        let client = NatsClient::connect(&self.config.nats_url, &credentials, request.call_id.clone())
            .await
            .map_err(|e| RelayError::Configuration(format!("{:#}", e)))?;

        debug!(
            "Call {} publishes audio on {} and listens on {}",
            request.call_id,
            client.subjects().audio,
            client.subjects().results
        );

        // Subscribe before asking for the session so no early result is missed
        let mut results = client
            .subscribe_results()
            .await
            .map_err(|e| RelayError::AdapterInternal(format!("{:#}", e)))?;

        client
            .publish_session_start(request)
            .await
            .map_err(|e| RelayError::AdapterInternal(format!("{:#}", e)))?;

        let call_id = request.call_id.clone();
        let languages = request.languages.clone();
        let sample_rate = request.sample_rate;
        let worker_sink = sink.clone();

        Ok(Subscription::spawn(sink, move |mut shutdown| async move {
            info!("Speech worker started for call {}", call_id);

            let mut sequence: u32 = 0;
            let mut audio_open = true;

            loop {
                tokio::select! {
                    _ = &mut shutdown => break,

                    chunk = audio.recv(), if audio_open => match chunk {
                        Some(pcm) => {
                            if let Err(e) = client
                                .publish_audio_frame(&pcm, sample_rate, sequence, false)
                                .await
                            {
                                error!("Failed to publish audio frame: {:#}", e);
                            }
                            sequence = sequence.wrapping_add(1);
                        }
                        None => audio_open = false,
                    },

                    msg = results.next() => match msg {
                        Some(msg) => {
                            handle_result(&msg.payload, &call_id, &languages, &worker_sink);
                            if worker_sink.is_terminated() {
                                info!("Speech worker ended session for call {}", call_id);
                                break;
                            }
                        }
                        None => {
                            warn!("Result subscription closed for call {}", call_id);
                            worker_sink.terminate();
                            break;
                        }
                    },
                }
            }

            audio.close();

            if let Err(e) = client
                .publish_audio_frame(&[], sample_rate, sequence, true)
                .await
            {
                error!("Failed to send final frame: {:#}", e);
            }

            if let Err(e) = client.publish_session_stop().await {
                error!("Failed to stop speech session: {:#}", e);
            }

            if let Err(e) = client.close().await {
                warn!("{:#}", e);
            }

            info!("Speech worker stopped for call {}", call_id);
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Decode one worker message and deliver it. Worker failures are logged; the
/// session carries on unless the worker marked the message terminal.
fn handle_result(payload: &[u8], call_id: &str, languages: &LanguagePair, sink: &ResultSink) {
    let message = match serde_json::from_slice::<TranslationResultMessage>(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(
                "{}",
                RelayError::AdapterInternal(format!("unparseable result message: {}", e))
            );
            return;
        }
    };

    if message.session_id != call_id {
        warn!("Ignoring result for call {}", message.session_id);
        return;
    }

    let terminal = message.terminal;

    match message.into_result(languages) {
        Ok(result) => {
            info!("Recognized: {}", result.text);
            sink.emit(result);
        }
        Err(e) if terminal => info!("Final worker message: {}", e),
        Err(e) => warn!("{}", e),
    }

    if terminal {
        sink.terminate();
    }
}

/// Creates one NATS adapter per connection
pub struct NatsAdapterFactory {
    config: SpeechConfig,
}

impl NatsAdapterFactory {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }
}

impl AdapterFactory for NatsAdapterFactory {
    fn create(&self) -> Box<dyn TranslationAdapter> {
        Box::new(NatsTranslationAdapter::new(self.config.clone()))
    }
}
