// Wire framing for synthesized audio
//
// Synthesized speech comes back from the speech service as one PCM buffer per
// utterance. The telephony socket expects fixed-size binary frames (640 bytes =
// 20ms of 16kHz 16-bit mono), so each buffer is cut into frames before it is
// written out. What happens to a trailing partial frame is an explicit policy.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::error::RelayError;

/// 20ms of 16kHz, 16-bit, mono PCM
pub const DEFAULT_FRAME_SIZE: usize = 640;

/// What to do with the bytes left over after the last full frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Never transmit the partial tail
    #[default]
    Drop,
    /// Zero-pad the tail up to a full frame (silence)
    Pad,
    /// Transmit the tail as a shorter final frame
    Short,
}

/// One frame ready for the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame<'a> {
    pub chunk: Cow<'a, [u8]>,
    /// True on the last frame produced for the source buffer
    pub is_final: bool,
}

impl WireFrame<'_> {
    pub fn len(&self) -> usize {
        self.chunk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }
}

/// Splits PCM buffers into fixed-size wire frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    frame_size: usize,
    policy: RemainderPolicy,
}

impl FrameCodec {
    pub fn new(frame_size: usize, policy: RemainderPolicy) -> Result<Self, RelayError> {
        if frame_size == 0 {
            return Err(RelayError::Configuration(
                "frame size must be greater than zero".to_string(),
            ));
        }

        Ok(Self { frame_size, policy })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Lazily frame `buffer`. The returned iterator can be cloned to restart it.
    pub fn frames<'a>(&self, buffer: &'a [u8]) -> Frames<'a> {
        Frames {
            buffer,
            frame_size: self.frame_size,
            policy: self.policy,
            offset: 0,
        }
    }

    /// Bytes of `len` that will never reach the wire under this policy
    pub fn dropped_bytes(&self, len: usize) -> usize {
        match self.policy {
            RemainderPolicy::Drop => len % self.frame_size,
            RemainderPolicy::Pad | RemainderPolicy::Short => 0,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            policy: RemainderPolicy::default(),
        }
    }
}

/// Iterator over the wire frames of one buffer
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    buffer: &'a [u8],
    frame_size: usize,
    policy: RemainderPolicy,
    offset: usize,
}

impl Frames<'_> {
    fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    fn emits_tail(&self) -> bool {
        self.policy != RemainderPolicy::Drop
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = WireFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }

        if remaining >= self.frame_size {
            let start = self.offset;
            self.offset += self.frame_size;

            let rest = self.remaining();
            let is_final = rest == 0 || (rest < self.frame_size && !self.emits_tail());

            return Some(WireFrame {
                chunk: Cow::Borrowed(&self.buffer[start..self.offset]),
                is_final,
            });
        }

        let tail = &self.buffer[self.offset..];
        self.offset = self.buffer.len();

        match self.policy {
            RemainderPolicy::Drop => None,
            RemainderPolicy::Short => Some(WireFrame {
                chunk: Cow::Borrowed(tail),
                is_final: true,
            }),
            RemainderPolicy::Pad => {
                let mut padded = Vec::with_capacity(self.frame_size);
                padded.extend_from_slice(tail);
                padded.resize(self.frame_size, 0);
                Some(WireFrame {
                    chunk: Cow::Owned(padded),
                    is_final: true,
                })
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        let full = remaining / self.frame_size;
        let tail = usize::from(remaining % self.frame_size != 0 && self.emits_tail());
        (full + tail, Some(full + tail))
    }
}

impl ExactSizeIterator for Frames<'_> {}
