use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::RemainderPolicy;
use crate::captions::CaptionScope;
use crate::error::RelayError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SpeechConfig,
    pub relay: RelayConfig,
    pub captions: CaptionConfig,
    pub call: CallDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Host advertised to the telephony platform; the request Host header is used when unset
    pub public_host: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "call-translator".to_string(),
            http: HttpConfig::default(),
            public_host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub subscription_key: Option<String>,
    pub region: Option<String>,
    pub nats_url: String,
    pub supported_languages: Vec<String>,
    pub stop_timeout_ms: u64,
}

/// Validated speech service credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCredentials {
    pub subscription_key: String,
    pub region: String,
}

impl SpeechConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Both the subscription key and the region are required to open a session
    pub fn credentials(&self) -> Result<SpeechCredentials, RelayError> {
        let subscription_key = non_blank(&self.subscription_key)
            .ok_or_else(|| RelayError::Configuration("subscription key is not set".to_string()))?;
        let region = non_blank(&self.region)
            .ok_or_else(|| RelayError::Configuration("region is not set".to_string()))?;

        if !region.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RelayError::Configuration(format!("invalid region {:?}", region)));
        }

        Ok(SpeechCredentials {
            subscription_key: subscription_key.to_string(),
            region: region.to_ascii_lowercase(),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            region: None,
            nats_url: "nats://localhost:4222".to_string(),
            supported_languages: [
                "en-US", "en-GB", "es-ES", "es-MX", "fr-FR", "de-DE", "it-IT", "pt-BR", "ja-JP",
                "zh-CN",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            stop_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Size of each outbound wire frame in bytes (640 = 20ms of 16kHz 16-bit mono)
    pub frame_size: usize,
    pub remainder: RemainderPolicy,
    pub sample_rate: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            frame_size: crate::audio::DEFAULT_FRAME_SIZE,
            remainder: RemainderPolicy::default(),
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub scope: CaptionScope,
    /// Captions buffered per observer before a slow observer starts skipping
    pub capacity: usize,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            scope: CaptionScope::default(),
            capacity: 256,
        }
    }
}

/// Languages the answer webhook hands to the telephony platform
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallDefaults {
    pub language_spoken: String,
    pub language_translated: String,
}

impl Default for CallDefaults {
    fn default() -> Self {
        Self {
            language_spoken: "en-US".to_string(),
            language_translated: "es-MX".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CALL_TRANSLATOR").separator("__"))
            .set_override_option("speech.subscription_key", std::env::var("SUBSCRIPTION_KEY").ok())?
            .set_override_option("speech.region", std::env::var("REGION").ok())?
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
