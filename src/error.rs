//! Error types for Mobsir

use thiserror::Error;

/// Result type alias for Mobsir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside collaborators and adapters
///
/// The session never sees these directly: the perception gateway classifies
/// them into [`crate::perception::PerceptionFailure`] or
/// [`crate::perception::CaptureFailure`] first.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Camera error
    #[error("camera error: {0}")]
    Camera(String),

    /// Model-backed service error (captioning, translation, faces)
    #[error("model error: {0}")]
    Model(String),

    /// Input rejected before or by a model
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation cancelled by the operator
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
