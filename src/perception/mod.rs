//! Perception gateway
//!
//! Uniform access to the model-backed collaborators (captioning, translation,
//! face recognition) and the camera. Collaborators report faults as
//! [`crate::Error`]; the gateway turns every fault, timeout or panic into a
//! typed [`PerceptionFailure`] / [`CaptureFailure`] so nothing opaque reaches
//! the session. Retries are the caller's business.

pub mod family;
pub mod providers;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::FutureExt;
use thiserror::Error;

use crate::{Error, Result};

/// Which kind of picture the camera should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    /// Named portrait stored in the family gallery
    Family,
    /// Timestamped scene picture for description
    Explore,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Family => f.write_str("family"),
            Self::Explore => f.write_str("explore"),
        }
    }
}

/// A picture written to disk by the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Where the image was stored
    pub path: PathBuf,
    /// When the frame was grabbed
    pub captured_at: DateTime<Local>,
    /// Mode that produced it
    pub mode: CaptureMode,
}

impl CapturedImage {
    /// Create an image handle stamped with the current time
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: CaptureMode) -> Self {
        Self {
            path: path.into(),
            captured_at: Local::now(),
            mode,
        }
    }
}

/// Classified failure of a perception call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerceptionFailure {
    /// The model or its server failed
    #[error("model error: {0}")]
    ModelError(String),

    /// No answer within the call's time budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The input was rejected
    #[error("invalid input: {0}")]
    InputInvalid(String),
}

impl PerceptionFailure {
    /// Classify a collaborator error
    #[must_use]
    pub fn classify(err: &Error, budget: Duration) -> Self {
        match err {
            Error::Http(e) if e.is_timeout() => Self::Timeout(budget),
            Error::Http(e) if e.status().is_some_and(|s| s.is_client_error()) => {
                Self::InputInvalid(e.to_string())
            }
            Error::InvalidInput(msg) => Self::InputInvalid(msg.clone()),
            Error::Io(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData
                ) =>
            {
                Self::InputInvalid(e.to_string())
            }
            other => Self::ModelError(other.to_string()),
        }
    }
}

/// Result of a caption, translation or face-recognition call
pub type PerceptionOutcome<T> = std::result::Result<T, PerceptionFailure>;

/// Why the camera produced no picture
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureFailure {
    /// Camera missing, busy or returned no frame
    #[error("camera unavailable: {0}")]
    Device(String),

    /// Frame grabbed but could not be stored
    #[error("storage failed: {0}")]
    Storage(String),

    /// Operator abandoned the capture
    #[error("capture cancelled: {0}")]
    Cancelled(String),

    /// Capture did not finish within its budget
    #[error("capture timed out after {0:?}")]
    Timeout(Duration),
}

impl From<&Error> for CaptureFailure {
    fn from(err: &Error) -> Self {
        match err {
            Error::Io(e) => Self::Storage(e.to_string()),
            Error::Cancelled(msg) | Error::InvalidInput(msg) => Self::Cancelled(msg.clone()),
            other => Self::Device(other.to_string()),
        }
    }
}

/// Result of a capture request
pub type CaptureResult = std::result::Result<CapturedImage, CaptureFailure>;

/// Image captioning model
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Describe the image in one sentence
    ///
    /// # Errors
    ///
    /// Returns error if the model fails or rejects the image
    async fn caption(&self, image: &CapturedImage) -> Result<String>;
}

/// Machine translation model
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the spoken language
    ///
    /// # Errors
    ///
    /// Returns error if the model fails
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Face recognition against the family gallery
#[async_trait]
pub trait FaceRecognizer: Send + Sync {
    /// Names of known people present in the image
    ///
    /// # Errors
    ///
    /// Returns error if recognition cannot run at all
    async fn recognize(&self, image: &CapturedImage) -> Result<Vec<String>>;
}

/// Camera capture and persistence
#[async_trait]
pub trait Camera: Send + Sync {
    /// Take and store a picture
    ///
    /// # Errors
    ///
    /// Returns error if no image could be produced
    async fn capture(&self, mode: CaptureMode) -> Result<CapturedImage>;
}

/// Time budget for each perception call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptionTimeouts {
    pub caption: Duration,
    pub translate: Duration,
    pub faces: Duration,
    /// Covers the countdown and, in family mode, naming by the operator
    pub capture: Duration,
}

impl Default for PerceptionTimeouts {
    fn default() -> Self {
        Self {
            caption: Duration::from_secs(60),
            translate: Duration::from_secs(30),
            faces: Duration::from_secs(60),
            capture: Duration::from_secs(120),
        }
    }
}

/// Typed front for all perception collaborators
///
/// Stateless between calls; every call may be repeated freely.
#[derive(Clone)]
pub struct PerceptionGateway {
    captioner: Arc<dyn Captioner>,
    translator: Arc<dyn Translator>,
    faces: Arc<dyn FaceRecognizer>,
    camera: Arc<dyn Camera>,
    timeouts: PerceptionTimeouts,
}

impl PerceptionGateway {
    /// Create a gateway with default time budgets
    #[must_use]
    pub fn new(
        captioner: Arc<dyn Captioner>,
        translator: Arc<dyn Translator>,
        faces: Arc<dyn FaceRecognizer>,
        camera: Arc<dyn Camera>,
    ) -> Self {
        Self {
            captioner,
            translator,
            faces,
            camera,
            timeouts: PerceptionTimeouts::default(),
        }
    }

    /// Override the time budgets
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: PerceptionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Configured time budgets
    #[must_use]
    pub const fn timeouts(&self) -> PerceptionTimeouts {
        self.timeouts
    }

    /// Caption an image
    pub async fn caption(&self, image: &CapturedImage) -> PerceptionOutcome<String> {
        let budget = self.timeouts.caption;
        let caption = settle("caption", budget, self.captioner.caption(image)).await?;

        let caption = caption.trim();
        if caption.is_empty() {
            tracing::warn!(path = %image.path.display(), "captioner returned no text");
            return Err(PerceptionFailure::ModelError("empty caption".to_string()));
        }

        Ok(caption.to_string())
    }

    /// Translate text
    pub async fn translate(&self, text: &str) -> PerceptionOutcome<String> {
        if text.trim().is_empty() {
            return Err(PerceptionFailure::InputInvalid(
                "nothing to translate".to_string(),
            ));
        }

        let budget = self.timeouts.translate;
        let translated = settle("translate", budget, self.translator.translate(text)).await?;

        let translated = translated.trim();
        if translated.is_empty() {
            return Err(PerceptionFailure::ModelError(
                "empty translation".to_string(),
            ));
        }

        Ok(translated.to_string())
    }

    /// Recognize family members in an image
    ///
    /// Names come back in recognizer order with blanks and repeats removed.
    pub async fn recognize_faces(&self, image: &CapturedImage) -> PerceptionOutcome<Vec<String>> {
        let budget = self.timeouts.faces;
        let names = settle("recognize_faces", budget, self.faces.recognize(image)).await?;
        Ok(distinct_names(names))
    }

    /// Capture a picture
    pub async fn capture(&self, mode: CaptureMode) -> CaptureResult {
        let budget = self.timeouts.capture;
        let started = Instant::now();

        match bounded(budget, self.camera.capture(mode)).await {
            Bounded::Done(Ok(image)) => {
                tracing::info!(
                    %mode,
                    path = %image.path.display(),
                    elapsed_ms = elapsed_ms(started),
                    "image captured"
                );
                Ok(image)
            }
            Bounded::Done(Err(e)) => {
                tracing::warn!(%mode, error = %e, "capture failed");
                Err(CaptureFailure::from(&e))
            }
            Bounded::TimedOut => {
                tracing::warn!(%mode, ?budget, "capture timed out");
                Err(CaptureFailure::Timeout(budget))
            }
            Bounded::Panicked(msg) => {
                tracing::error!(%mode, panic = %msg, "camera panicked");
                Err(CaptureFailure::Device(msg))
            }
        }
    }
}

/// Remove blank and repeated names, keeping first-seen order
#[must_use]
pub fn distinct_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

enum Bounded<T> {
    Done(Result<T>),
    TimedOut,
    Panicked(String),
}

async fn bounded<T, F>(budget: Duration, call: F) -> Bounded<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, AssertUnwindSafe(call).catch_unwind()).await {
        Ok(Ok(result)) => Bounded::Done(result),
        Ok(Err(payload)) => Bounded::Panicked(panic_message(payload.as_ref())),
        Err(_) => Bounded::TimedOut,
    }
}

/// Run one model call under its budget and classify the outcome
async fn settle<T, F>(call: &'static str, budget: Duration, fut: F) -> PerceptionOutcome<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    tracing::debug!(call, "perception call started");

    let outcome = match bounded(budget, fut).await {
        Bounded::Done(Ok(value)) => Ok(value),
        Bounded::Done(Err(e)) => Err(PerceptionFailure::classify(&e, budget)),
        Bounded::TimedOut => Err(PerceptionFailure::Timeout(budget)),
        Bounded::Panicked(msg) => Err(PerceptionFailure::ModelError(format!("panicked: {msg}"))),
    };

    match &outcome {
        Ok(_) => tracing::debug!(call, elapsed_ms = elapsed_ms(started), "perception call done"),
        Err(failure) => tracing::warn!(
            call,
            elapsed_ms = elapsed_ms(started),
            error = %failure,
            "perception call failed"
        ),
    }

    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
