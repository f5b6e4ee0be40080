use anyhow::{Context, Result};
use async_nats::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{AudioFrameMessage, SessionStartMessage, SessionStopMessage};
use crate::config::SpeechCredentials;
use crate::translation::StartRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// NATS subjects used by one call on the speech bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects {
    pub start: String,
    pub stop: String,
    pub audio: String,
    pub results: String,
}

impl Subjects {
    pub fn new(region: &str, call_id: &str) -> Self {
        let prefix = format!("speech.{}", region);
        let call = subject_token(call_id);

        Self {
            start: format!("{}.session.start", prefix),
            stop: format!("{}.session.stop", prefix),
            audio: format!("{}.audio.{}", prefix, call),
            results: format!("{}.result.{}", prefix, call),
        }
    }
}

/// Make a call id safe to use as a single subject token
fn subject_token(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

pub struct NatsClient {
    client: Client,
    call_id: String,
    subjects: Subjects,
}

impl NatsClient {
    /// Connect to the speech bus, authenticating with the subscription key
    pub async fn connect(url: &str, credentials: &SpeechCredentials, call_id: String) -> Result<Self> {
        info!("Connecting to speech bus at {} (region {})", url, credentials.region);

        let client = async_nats::ConnectOptions::with_token(credentials.subscription_key.clone())
            .connection_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to speech bus");

        let subjects = Subjects::new(&credentials.region, &call_id);

        Ok(Self {
            client,
            call_id,
            subjects,
        })
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    pub async fn publish_session_start(&self, request: &StartRequest) -> Result<()> {
        let message = SessionStartMessage::new(request);

        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(self.subjects.start.clone(), payload.into())
            .await
            .context("Failed to publish session start")?;

        info!(
            "Requested speech session for {} ({} -> {})",
            self.call_id, message.source_language, message.target_language
        );

        Ok(())
    }

    /// Publish caller audio to the speech worker
    pub async fn publish_audio_frame(
        &self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let message = AudioFrameMessage::new(&self.call_id, pcm_bytes, sample_rate, sequence, is_final);

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(self.subjects.audio.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (sequence={}, bytes={}, final={})",
            self.subjects.audio,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to this call's translation results
    pub async fn subscribe_results(&self) -> Result<async_nats::Subscriber> {
        info!("Subscribing to results on {}", self.subjects.results);

        let subscriber = self
            .client
            .subscribe(self.subjects.results.clone())
            .await
            .context("Failed to subscribe to translation results")?;

        Ok(subscriber)
    }

    pub async fn publish_session_stop(&self) -> Result<()> {
        let message = SessionStopMessage::new(&self.call_id);

        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(self.subjects.stop.clone(), payload.into())
            .await
            .context("Failed to publish session stop")?;

        Ok(())
    }

    /// Flush pending publishes before the connection is dropped
    pub async fn close(self) -> Result<()> {
        info!("Closing speech bus connection for {}", self.call_id);
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_are_scoped_by_region_and_call() {
        let subjects = Subjects::new("westus", "call-1");

        assert_eq!(subjects.start, "speech.westus.session.start");
        assert_eq!(subjects.stop, "speech.westus.session.stop");
        assert_eq!(subjects.audio, "speech.westus.audio.call-1");
        assert_eq!(subjects.results, "speech.westus.result.call-1");
    }

    #[test]
    fn test_call_id_cannot_escape_its_token() {
        let subjects = Subjects::new("westus", "a.b *>");
        assert_eq!(subjects.results, "speech.westus.result.a_b___");
    }
}
