//! Speaker-backed speech output

use async_trait::async_trait;

use super::playback::{AudioPlayback, decode_mp3};
use super::tts::TextToSpeech;
use super::SpeechOutput;
use crate::{Error, Result};

/// Synthesizes each utterance and plays it to completion
pub struct Speaker {
    tts: TextToSpeech,
}

impl Speaker {
    #[must_use]
    pub const fn new(tts: TextToSpeech) -> Self {
        Self { tts }
    }
}

#[async_trait]
impl SpeechOutput for Speaker {
    async fn speak(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let audio = self.tts.synthesize(text).await?;
        tokio::task::spawn_blocking(move || {
            let decoded = decode_mp3(&audio)?;
            AudioPlayback::with_sample_rate(decoded.sample_rate)?.play(decoded.samples)
        })
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
