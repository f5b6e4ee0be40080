use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::captions::CaptionHub;
use crate::config::Config;
use crate::error::RelayError;
use crate::session::RelaySettings;
use crate::translation::AdapterFactory;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Builds one speech adapter per audio socket
    pub adapters: Arc<dyn AdapterFactory>,

    /// Caption fan-out shared by every session
    pub captions: Arc<CaptionHub>,

    pub relay: RelaySettings,

    /// Audio sockets currently being served
    pub active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config, adapters: Arc<dyn AdapterFactory>) -> Result<Self, RelayError> {
        let relay = RelaySettings::from_config(&config)?;
        let captions = Arc::new(CaptionHub::new(
            config.captions.capacity,
            config.captions.scope,
        ));

        Ok(Self {
            config: Arc::new(config),
            adapters,
            captions,
            relay,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }
}
