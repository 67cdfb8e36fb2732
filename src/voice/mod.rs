//! Speech input and output
//!
//! The session only sees [`SpeechInput`] and [`SpeechOutput`]. Microphone and
//! speaker adapters record and play through `cpal`; STT and TTS go to hosted
//! providers. [`ConsoleSpeech`] stands in for both on a terminal.

mod capture;
mod console;
mod listener;
mod playback;
mod speaker;
mod stt;
mod tts;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use console::{ConsoleNamer, ConsoleSpeech};
pub use listener::MicrophoneListener;
pub use playback::{AudioPlayback, DecodedAudio, PLAYBACK_SAMPLE_RATE, decode_mp3, resample};
pub use speaker::Speaker;
pub use stt::{SpeechToText, SttProvider};
pub use tts::{TextToSpeech, TtsProvider};

/// Source of transcribed user speech
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Listen for up to `window` and return the transcript
    ///
    /// An empty string means nothing was said.
    ///
    /// # Errors
    ///
    /// Returns error if recording or recognition fails
    async fn listen(&self, window: Duration) -> Result<String>;
}

/// Sink for spoken replies
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}
