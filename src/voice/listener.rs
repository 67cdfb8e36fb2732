//! Microphone-backed speech input

use std::time::Duration;

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
use super::stt::SpeechToText;
use super::SpeechInput;
use crate::{Error, Result};

/// RMS level below which a recording counts as silence
const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Records a fixed window and transcribes it
pub struct MicrophoneListener {
    stt: SpeechToText,
    silence_threshold: f32,
}

impl MicrophoneListener {
    #[must_use]
    pub const fn new(stt: SpeechToText) -> Self {
        Self {
            stt,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
        }
    }

    /// Recordings quieter than this skip transcription
    #[must_use]
    pub const fn with_silence_threshold(mut self, threshold: f32) -> Self {
        self.silence_threshold = threshold;
        self
    }
}

#[async_trait]
impl SpeechInput for MicrophoneListener {
    async fn listen(&self, window: Duration) -> Result<String> {
        let samples = tokio::task::spawn_blocking(move || AudioCapture::new()?.record(window))
            .await
            .map_err(|e| Error::Audio(format!("recording task failed: {e}")))??;

        let level = rms(&samples);
        if level < self.silence_threshold {
            tracing::debug!(level, "silence, skipping transcription");
            return Ok(String::new());
        }

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        self.stt.transcribe(&wav).await
    }
}
