//! TOML configuration file loading
//!
//! Supports `~/.config/mobsir/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::prompts::Prompts;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MobsirConfigFile {
    pub session: SessionFileConfig,
    /// Phrase lists replacing the built-in vocabularies
    pub commands: CommandsFileConfig,
    pub perception: PerceptionFileConfig,
    pub camera: CameraFileConfig,
    pub voice: VoiceFileConfig,
    pub api_keys: ApiKeysFileConfig,
    /// Spoken phrases; unset entries keep their defaults
    pub prompts: Prompts,
}

/// Conversation loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Listening window per turn, in seconds
    pub listen_seconds: Option<f64>,
}

/// Command phrase lists
#[derive(Debug, Default, Deserialize)]
pub struct CommandsFileConfig {
    pub wake: Option<Vec<String>>,
    pub explore: Option<Vec<String>>,
    pub photo: Option<Vec<String>>,
    pub exit: Option<Vec<String>>,
}

/// Model server configuration
#[derive(Debug, Default, Deserialize)]
pub struct PerceptionFileConfig {
    /// Base URL of the inference server
    pub server_url: Option<String>,
    /// Language captions are produced in (e.g. "en")
    pub source_language: Option<String>,
    /// Face-embedding model name passed to the server
    pub face_model: Option<String>,
    pub caption_timeout_seconds: Option<f64>,
    pub translate_timeout_seconds: Option<f64>,
    pub faces_timeout_seconds: Option<f64>,
    pub capture_timeout_seconds: Option<f64>,
}

/// Camera configuration
#[derive(Debug, Default, Deserialize)]
pub struct CameraFileConfig {
    /// Frame-grab command line; `{output}` is replaced by the image path
    pub command: Option<Vec<String>>,
    pub countdown_seconds: Option<f64>,
    pub capture_dir: Option<String>,
    pub family_dir: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// "whisper" or "deepgram"
    pub stt_provider: Option<String>,
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,
    /// Spoken language, ISO 639-1 (e.g. "ar")
    pub language: Option<String>,
    /// "openai" or "elevenlabs"
    pub tts_provider: Option<String>,
    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,
    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,
    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Parse a config file, failing on any read or syntax error
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn parse_config_file(path: &Path) -> Result<MobsirConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `MobsirConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MobsirConfigFile {
    let Some(path) = config_file_path() else {
        return MobsirConfigFile::default();
    };

    if !path.exists() {
        return MobsirConfigFile::default();
    }

    parse_config_file(&path).unwrap_or_else(|e| {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to load config file, using defaults"
        );
        MobsirConfigFile::default()
    })
}

/// Return the config file path: `~/.config/mobsir/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mobsir").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file() {
        let config: MobsirConfigFile = toml::from_str(
            r#"
            [session]
            listen_seconds = 4.5

            [commands]
            exit = ["وداعا"]

            [prompts]
            farewell = "مع السلامة"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.listen_seconds, Some(4.5));
        assert_eq!(config.commands.exit, Some(vec!["وداعا".to_string()]));
        assert!(config.commands.wake.is_none());
        assert_eq!(config.prompts.farewell, "مع السلامة");
        assert_eq!(config.prompts.menu, Prompts::default().menu);
    }

    #[test]
    fn test_parse_reports_bad_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\nlisten_seconds = ").unwrap();
        assert!(matches!(
            parse_config_file(&path),
            Err(crate::Error::Toml(_))
        ));
        assert!(matches!(
            parse_config_file(&dir.path().join("missing.toml")),
            Err(crate::Error::Io(_))
        ));
    }
}
