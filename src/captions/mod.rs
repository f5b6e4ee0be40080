//! Caption fan-out to browser observers
//!
//! Every relay session pushes the text of each translation result through a
//! [`CaptionPublisher`]. The [`CaptionHub`] implementation broadcasts to any
//! number of observers (the `/captions` event stream) without ever waiting on
//! them.

mod hub;

pub use hub::{CaptionHub, CaptionObserver};

use serde::{Deserialize, Serialize};

use crate::message::TranslationMessage;

/// Event name observers listen for
pub const CAPTION_EVENT: &str = "receiveTranslation";

/// Which captions an observer receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionScope {
    /// Every observer receives every call's captions
    #[default]
    All,
    /// Observers that name a call id receive only that call's captions
    Call,
}

/// Fire-and-forget caption sink shared by all sessions
pub trait CaptionPublisher: Send + Sync {
    fn publish(&self, caption: TranslationMessage);
}
