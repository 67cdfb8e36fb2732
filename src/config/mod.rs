//! Configuration management for Mobsir
//!
//! Every setting resolves env > TOML file > default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::command::{CommandVocabulary, Vocabularies};
use crate::perception::PerceptionTimeouts;
use crate::prompts::Prompts;
use crate::session::DEFAULT_LISTEN_WINDOW;
use crate::voice::{SttProvider, TtsProvider};
use crate::{Error, Result};

use self::file::MobsirConfigFile;

/// Default inference server
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8008";

/// Default frame-grab command
pub const DEFAULT_CAMERA_COMMAND: &[&str] =
    &["fswebcam", "-q", "--no-banner", "-r", "1280x720", "{output}"];

/// Mobsir configuration
#[derive(Debug)]
pub struct Config {
    /// Listening window per turn
    pub listen_window: Duration,

    /// Command phrase lists
    pub vocabularies: Vocabularies,

    /// Spoken phrases
    pub prompts: Prompts,

    /// Model server configuration
    pub perception: PerceptionConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Model server configuration
#[derive(Debug, Clone)]
pub struct PerceptionConfig {
    pub server_url: String,
    /// Language the captioner writes in
    pub source_language: String,
    pub face_model: String,
    pub timeouts: PerceptionTimeouts,
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Program and arguments; `{output}` marks the image path
    pub command: Vec<String>,
    pub countdown: Duration,
    /// Where explore pictures go
    pub capture_dir: PathBuf,
    /// Family gallery, one portrait per person
    pub family_dir: PathBuf,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// Spoken language; also the translation target
    pub language: String,

    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_multilingual_v2")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

impl Config {
    /// Load configuration from the environment and a config file
    ///
    /// With `path`, that file must exist and parse. Without, the standard
    /// location is used when present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit file cannot be loaded or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::parse_config_file(path)?,
            None => file::load_config_file(),
        };
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range or a vocabulary is empty
    pub fn resolve<E>(fc: MobsirConfigFile, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let env_f64 = |key: &str| -> Result<Option<f64>> {
            env(key)
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|e| Error::Config(format!("{key}: {e}")))
                })
                .transpose()
        };

        // Session (env > toml > default)
        let listen_window = match env_f64("MOBSIR_LISTEN_SECONDS")?.or(fc.session.listen_seconds) {
            Some(secs) => seconds("listen_seconds", secs)?,
            None => DEFAULT_LISTEN_WINDOW,
        };

        // Vocabularies (toml > default)
        let defaults = Vocabularies::default();
        let vocabularies = Vocabularies {
            wake: vocabulary("wake", fc.commands.wake, defaults.wake)?,
            explore: vocabulary("explore", fc.commands.explore, defaults.explore)?,
            photo: vocabulary("photo", fc.commands.photo, defaults.photo)?,
            exit: vocabulary("exit", fc.commands.exit, defaults.exit)?,
        };

        // Perception (env > toml > default)
        let default_timeouts = PerceptionTimeouts::default();
        let perception_file = fc.perception;
        let timeout = |name: &str, value: Option<f64>, default: Duration| {
            value.map_or(Ok(default), |secs| seconds(name, secs))
        };
        let perception = PerceptionConfig {
            server_url: env("MOBSIR_PERCEPTION_URL")
                .or(perception_file.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            source_language: perception_file
                .source_language
                .unwrap_or_else(|| "en".to_string()),
            face_model: perception_file
                .face_model
                .unwrap_or_else(|| "ArcFace".to_string()),
            timeouts: PerceptionTimeouts {
                caption: timeout(
                    "caption_timeout_seconds",
                    perception_file.caption_timeout_seconds,
                    default_timeouts.caption,
                )?,
                translate: timeout(
                    "translate_timeout_seconds",
                    perception_file.translate_timeout_seconds,
                    default_timeouts.translate,
                )?,
                faces: timeout(
                    "faces_timeout_seconds",
                    perception_file.faces_timeout_seconds,
                    default_timeouts.faces,
                )?,
                capture: timeout(
                    "capture_timeout_seconds",
                    perception_file.capture_timeout_seconds,
                    default_timeouts.capture,
                )?,
            },
        };

        // Camera (env > toml > default)
        let command = env("MOBSIR_CAMERA_COMMAND")
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .or(fc.camera.command)
            .unwrap_or_else(|| DEFAULT_CAMERA_COMMAND.iter().map(ToString::to_string).collect());
        if command.first().is_none_or(|p: &String| p.trim().is_empty()) {
            return Err(Error::Config("camera command is empty".to_string()));
        }
        // Zero is allowed: no countdown
        let countdown = match fc.camera.countdown_seconds {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::Config(format!("countdown_seconds: {e}")))?,
            None => Duration::from_secs(3),
        };
        let camera = CameraConfig {
            command,
            countdown,
            capture_dir: env("MOBSIR_CAPTURE_DIR")
                .or(fc.camera.capture_dir)
                .map_or_else(|| PathBuf::from("captured_images"), PathBuf::from),
            family_dir: env("MOBSIR_FAMILY_DIR")
                .or(fc.camera.family_dir)
                .map_or_else(|| PathBuf::from("family"), PathBuf::from),
        };

        // Voice (env > toml > default)
        let voice_file = fc.voice;
        let tts_speed = voice_file.tts_speed.unwrap_or(1.0);
        if !(0.25..=4.0).contains(&tts_speed) {
            return Err(Error::Config(format!(
                "tts_speed must be between 0.25 and 4.0, got {tts_speed}"
            )));
        }
        let tts_provider: TtsProvider = voice_file
            .tts_provider
            .as_deref()
            .unwrap_or("openai")
            .parse()?;
        let voice = VoiceConfig {
            stt_provider: voice_file
                .stt_provider
                .as_deref()
                .unwrap_or("whisper")
                .parse()?,
            stt_model: env("MOBSIR_STT_MODEL")
                .or(voice_file.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            language: voice_file.language.unwrap_or_else(|| "ar".to_string()),
            tts_provider,
            tts_model: env("MOBSIR_TTS_MODEL")
                .or(voice_file.tts_model)
                .unwrap_or_else(|| default_tts_model(tts_provider).to_string()),
            tts_voice: env("MOBSIR_TTS_VOICE")
                .or(voice_file.tts_voice)
                .unwrap_or_else(|| default_tts_voice(tts_provider).to_string()),
            tts_speed,
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: secret(env("OPENAI_API_KEY").or(fc.api_keys.openai)),
            deepgram: secret(env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram)),
            elevenlabs: secret(env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs)),
        };

        fc.prompts.validate()?;

        Ok(Self {
            listen_window,
            vocabularies,
            prompts: fc.prompts,
            perception,
            camera,
            voice,
            api_keys,
        })
    }

    /// Key for the configured STT provider
    #[must_use]
    pub const fn stt_key(&self) -> Option<&SecretString> {
        match self.voice.stt_provider {
            SttProvider::Whisper => self.api_keys.openai.as_ref(),
            SttProvider::Deepgram => self.api_keys.deepgram.as_ref(),
        }
    }

    /// Key for the configured TTS provider
    #[must_use]
    pub const fn tts_key(&self) -> Option<&SecretString> {
        match self.voice.tts_provider {
            TtsProvider::OpenAI => self.api_keys.openai.as_ref(),
            TtsProvider::ElevenLabs => self.api_keys.elevenlabs.as_ref(),
        }
    }
}

const fn default_tts_model(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAI => "tts-1",
        TtsProvider::ElevenLabs => "eleven_multilingual_v2",
    }
}

/// Voice names are provider specific; `ElevenLabs` takes a voice ID
const fn default_tts_voice(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAI => "alloy",
        TtsProvider::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
    }
}

/// Positive, finite seconds to a duration
fn seconds(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(Error::Config(format!("{name} must be positive, got {secs}")));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| Error::Config(format!("{name}: {e}")))
}

/// Vocabulary from an override list, refusing lists that normalize to nothing
fn vocabulary(
    name: &str,
    phrases: Option<Vec<String>>,
    default: CommandVocabulary,
) -> Result<CommandVocabulary> {
    let Some(phrases) = phrases else {
        return Ok(default);
    };

    let vocabulary = CommandVocabulary::new(phrases);
    if vocabulary.is_empty() {
        return Err(Error::Config(format!("{name} vocabulary is empty")));
    }
    Ok(vocabulary)
}

fn secret(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}
