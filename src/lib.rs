//! Mobsir - voice-driven assistant for blind and low-vision users
//!
//! The user talks in Arabic; Mobsir answers by taking pictures, describing
//! them and telling who from the family is in them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Speech In / Speech Out                  │
//! │   Microphone + STT  │  TTS + Speaker  │  Console    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Session                          │
//! │   Normalize  │  Classify  │  Transitions  │  Flows  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Perception Gateway                     │
//! │   Camera  │  Caption  │  Translate  │  Faces        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod enhance;
pub mod error;
pub mod normalize;
pub mod perception;
pub mod prompts;
pub mod session;
pub mod voice;

pub use command::{CommandKind, CommandVocabulary, Vocabularies, classify};
pub use config::Config;
pub use enhance::{CaptionEnhancer, EnhancedCaption};
pub use error::{Error, Result};
pub use normalize::{NormalizedUtterance, normalize};
pub use perception::{
    CaptureFailure, CaptureMode, CapturedImage, PerceptionFailure, PerceptionGateway,
    PerceptionOutcome, PerceptionTimeouts,
};
pub use prompts::Prompts;
pub use session::{Phase, Session, SessionBuilder};
