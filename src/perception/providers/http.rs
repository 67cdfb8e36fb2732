//! HTTP inference server client
//!
//! Talks JSON to a local model server hosting the captioning, translation and
//! face-verification models. Images travel base64-encoded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::perception::{CapturedImage, Captioner, FaceRecognizer, Translator, family};
use crate::{Error, Result};

/// Client for the model server
pub struct HttpPerceptionClient {
    client: Client,
    base_url: String,
    source_language: String,
    target_language: String,
    face_model: String,
    family_dir: PathBuf,
}

impl HttpPerceptionClient {
    /// Create a client for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is empty or the HTTP client cannot be built
    pub fn new(base_url: &str, family_dir: PathBuf) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("perception server URL required".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url,
            source_language: "en".to_string(),
            target_language: "ar".to_string(),
            face_model: "ArcFace".to_string(),
            family_dir,
        })
    }

    /// Set the translation direction
    #[must_use]
    pub fn with_languages(mut self, source: &str, target: &str) -> Self {
        self.source_language = source.to_string();
        self.target_language = target.to_string();
        self
    }

    /// Set the face-embedding model name passed to the server
    #[must_use]
    pub fn with_face_model(mut self, model: &str) -> Self {
        self.face_model = model.to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "model server request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, url = %url, "model server error");
            return Err(if status.is_client_error() {
                Error::InvalidInput(format!("{status}: {body}"))
            } else {
                Error::Model(format!("{status}: {body}"))
            });
        }

        Ok(response.json().await?)
    }

    async fn verify(&self, reference: &Path, candidate: &str) -> Result<bool> {
        let request = VerifyRequest {
            reference: encode_image(reference).await?,
            candidate,
            model: &self.face_model,
        };
        let response: VerifyResponse = self.post_json("verify", &request).await?;
        Ok(response.verified)
    }
}

#[async_trait]
impl Captioner for HttpPerceptionClient {
    async fn caption(&self, image: &CapturedImage) -> Result<String> {
        let request = CaptionRequest {
            image: encode_image(&image.path).await?,
            mime_type: mime_type(&image.path),
        };

        let response: CaptionResponse = self.post_json("caption", &request).await?;
        tracing::info!(caption = %response.caption, "image captioned");
        Ok(response.caption)
    }
}

#[async_trait]
impl Translator for HttpPerceptionClient {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = TranslateRequest {
            text,
            source: &self.source_language,
            target: &self.target_language,
        };

        let response: TranslateResponse = self.post_json("translate", &request).await?;
        tracing::debug!(translation = %response.translation, "text translated");
        Ok(response.translation)
    }
}

#[async_trait]
impl FaceRecognizer for HttpPerceptionClient {
    async fn recognize(&self, image: &CapturedImage) -> Result<Vec<String>> {
        let members = family::gallery(&self.family_dir)?;
        if members.is_empty() {
            tracing::info!(dir = %self.family_dir.display(), "family gallery is empty");
            return Ok(Vec::new());
        }

        let candidate = encode_image(&image.path).await?;
        let mut found = Vec::new();
        let mut failures = 0usize;

        // One reference failing must not hide the others
        for member in &members {
            match self.verify(&member.path, &candidate).await {
                Ok(true) => found.push(member.name.clone()),
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    tracing::warn!(name = %member.name, error = %e, "face verification failed");
                }
            }
        }

        if failures == members.len() {
            return Err(Error::Model(format!(
                "face verification failed for all {failures} references"
            )));
        }

        tracing::info!(found = ?found, checked = members.len(), "faces verified");
        Ok(found)
    }
}

/// Read and base64-encode an image
async fn encode_image(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        return Err(Error::InvalidInput(format!(
            "empty image: {}",
            path.display()
        )));
    }
    Ok(base64::engine::general_purpose::STANDARD.encode(data))
}

/// MIME type from the file extension, defaulting to PNG
fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[derive(Serialize)]
struct CaptionRequest {
    image: String,
    mime_type: &'static str,
}

#[derive(Deserialize)]
struct CaptionResponse {
    caption: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translation: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    reference: String,
    candidate: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    verified: bool,
}
