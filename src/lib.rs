pub mod audio;
pub mod captions;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod nats;
pub mod session;
pub mod translation;

pub use audio::{FrameCodec, Frames, RemainderPolicy, WireFrame};
pub use captions::{CaptionHub, CaptionObserver, CaptionPublisher, CaptionScope};
pub use config::Config;
pub use error::RelayError;
pub use http::{create_router, AppState};
pub use message::TranslationMessage;
pub use nats::{NatsAdapterFactory, NatsClient, NatsTranslationAdapter};
pub use session::{AudioRelay, AudioSocket, RelaySettings, RelayState, SessionResources, SessionStats};
pub use translation::{
    AdapterFactory, LanguagePair, ResultSink, StartRequest, Subscription, TranslationAdapter,
    TranslationResult,
};
