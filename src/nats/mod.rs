pub mod adapter;
pub mod client;
pub mod messages;

pub use adapter::{NatsAdapterFactory, NatsTranslationAdapter};
pub use client::{NatsClient, Subjects};
pub use messages::{
    AudioFrameMessage, SessionStartMessage, SessionStopMessage, TranslationResultMessage,
};
