//! The conversation loop
//!
//! One session owns the [`SessionState`] and drives everything sequentially:
//! listen, normalize, classify, react. Flows are built from gateway outcomes
//! and every branch ends in something spoken, so no collaborator failure can
//! end the session. Only the exit phrase does.

mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use state::{Phase, Reaction, SessionState, transition};

use crate::command::{CommandKind, Vocabularies};
use crate::enhance::CaptionEnhancer;
use crate::normalize::{NormalizedUtterance, normalize};
use crate::perception::{CaptureMode, PerceptionGateway};
use crate::prompts::Prompts;
use crate::voice::{SpeechInput, SpeechOutput};
use crate::Result;

/// Default listening window per turn
pub const DEFAULT_LISTEN_WINDOW: Duration = Duration::from_secs(3);

/// Builder for [`Session`]
pub struct SessionBuilder {
    gateway: PerceptionGateway,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    vocabularies: Vocabularies,
    prompts: Prompts,
    enhancer: Option<CaptionEnhancer>,
    listen_window: Duration,
}

impl SessionBuilder {
    /// Replace the command vocabularies
    #[must_use]
    pub fn vocabularies(mut self, vocabularies: Vocabularies) -> Self {
        self.vocabularies = vocabularies;
        self
    }

    /// Replace the spoken phrases
    #[must_use]
    pub fn prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the caption enhancer
    #[must_use]
    pub fn enhancer(mut self, enhancer: CaptionEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// How long each turn listens
    #[must_use]
    pub const fn listen_window(mut self, window: Duration) -> Self {
        self.listen_window = window;
        self
    }

    /// Build the session
    ///
    /// # Errors
    ///
    /// Returns error if the default enhancer cannot be built
    pub fn build(self) -> Result<Session> {
        let enhancer = match self.enhancer {
            Some(enhancer) => enhancer,
            None => CaptionEnhancer::new(self.prompts.clone())?,
        };

        Ok(Session {
            state: SessionState::default(),
            gateway: self.gateway,
            input: self.input,
            output: self.output,
            vocabularies: self.vocabularies,
            prompts: self.prompts,
            enhancer,
            listen_window: self.listen_window,
        })
    }
}

/// A single conversation with the user
pub struct Session {
    state: SessionState,
    gateway: PerceptionGateway,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    vocabularies: Vocabularies,
    prompts: Prompts,
    enhancer: CaptionEnhancer,
    listen_window: Duration,
}

impl Session {
    /// Start building a session with default vocabularies and prompts
    #[must_use]
    pub fn builder(
        gateway: PerceptionGateway,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> SessionBuilder {
        SessionBuilder {
            gateway,
            input,
            output,
            vocabularies: Vocabularies::default(),
            prompts: Prompts::default(),
            enhancer: None,
            listen_window: DEFAULT_LISTEN_WINDOW,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Run until the user says goodbye
    pub async fn run(&mut self) -> Phase {
        self.run_until(std::future::pending()).await
    }

    /// Run until the user says goodbye or `shutdown` resolves
    ///
    /// Shutdown is only observed while listening; a flow that has started
    /// always finishes and speaks its result first.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Phase
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(window_ms = self.listen_window.as_millis(), "session started");
        self.say(&self.prompts.greeting).await;

        let mut turns = 0u64;
        while !self.state.is_terminated() {
            let heard = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(turns, phase = %self.phase(), "shutdown requested");
                    break;
                }
                heard = self.listen() => heard,
            };

            turns += 1;
            let kind = match self.phase() {
                Phase::AwaitingCommand => self.vocabularies.classify_awake(&heard),
                _ => self.vocabularies.classify(&heard),
            };
            tracing::info!(turn = turns, heard = %heard, %kind, phase = %self.phase(), "heard");
            self.handle(kind).await;
        }

        tracing::info!(turns, phase = %self.phase(), "session ended");
        self.phase()
    }

    /// Listen for one utterance; recognizer faults count as silence
    pub async fn listen(&self) -> NormalizedUtterance {
        match self.input.listen(self.listen_window).await {
            Ok(text) => normalize(&text),
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition failed, treating as silence");
                NormalizedUtterance::default()
            }
        }
    }

    /// Apply one classified command and return the new phase
    pub async fn handle(&mut self, kind: CommandKind) -> Phase {
        let (reaction, next) = self.state.react(kind);
        tracing::debug!(%kind, ?reaction, "reacting");

        match reaction {
            Reaction::Silent => {}
            Reaction::Menu => self.say(&self.prompts.menu).await,
            Reaction::NotHeard => self.say(&self.prompts.not_heard).await,
            Reaction::NotUnderstood => self.say(&self.prompts.not_understood).await,
            Reaction::Photo => self.photo_flow().await,
            Reaction::Explore => self.explore_flow().await,
            Reaction::Farewell => self.say(&self.prompts.farewell).await,
        }

        self.state.apply(next);
        self.phase()
    }

    /// Take a family picture and say who is in it
    async fn photo_flow(&self) {
        let image = match self.gateway.capture(CaptureMode::Family).await {
            Ok(image) => image,
            Err(failure) => {
                tracing::warn!(error = %failure, "photo flow: capture failed");
                self.say(&self.prompts.capture_error).await;
                return;
            }
        };

        self.say(&self.prompts.photo_saved).await;

        match self.gateway.recognize_faces(&image).await {
            Ok(names) if !names.is_empty() => {
                tracing::info!(names = ?names, "photo flow: family recognized");
                self.say(&self.prompts.family_found(&names)).await;
            }
            Ok(_) => self.say(&self.prompts.no_family).await,
            Err(failure) => {
                tracing::warn!(error = %failure, "photo flow: recognition failed");
                self.say(&self.prompts.no_family).await;
            }
        }
    }

    /// Take a scene picture and describe it in the user's language
    async fn explore_flow(&self) {
        let image = match self.gateway.capture(CaptureMode::Explore).await {
            Ok(image) => image,
            Err(failure) => {
                tracing::warn!(error = %failure, "explore flow: capture failed");
                self.say(&self.prompts.capture_error).await;
                return;
            }
        };

        self.say(&self.prompts.describing).await;

        let caption = match self.gateway.caption(&image).await {
            Ok(caption) => caption,
            Err(failure) => {
                tracing::warn!(error = %failure, "explore flow: captioning failed");
                self.say(&self.prompts.caption_error).await;
                return;
            }
        };

        let enhanced = self.enhancer.enhance(&caption, &image, &self.gateway).await;

        let description = match self.gateway.translate(&enhanced.text).await {
            Ok(translated) => translated,
            Err(failure) => {
                tracing::warn!(error = %failure, "explore flow: translation failed, speaking untranslated caption");
                enhanced.text.clone()
            }
        };

        self.say(&description).await;

        if !enhanced.names.is_empty() {
            self.say(&self.prompts.family_addendum(&enhanced.names)).await;
        }
    }

    /// Speak, logging instead of failing
    async fn say(&self, text: &str) {
        tracing::info!(text = %text, "speaking");
        if let Err(e) = self.output.speak(text).await {
            tracing::warn!(error = %e, "speech output failed");
        }
    }
}
