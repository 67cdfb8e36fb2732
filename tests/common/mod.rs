//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use mobsir::perception::{Camera, Captioner, FaceRecognizer, Translator};
use mobsir::voice::{SpeechInput, SpeechOutput};
use mobsir::{
    CaptureMode, CapturedImage, Error, PerceptionGateway, PerceptionTimeouts, Result, Session,
};

/// What a fake collaborator does when called
#[derive(Debug, Clone)]
pub enum Script<T> {
    Reply(T),
    Fail,
    Hang,
}

async fn play<T: Clone>(script: &Script<T>, what: &str) -> Result<T> {
    match script {
        Script::Reply(value) => Ok(value.clone()),
        Script::Fail => Err(Error::Model(format!("{what} unavailable"))),
        Script::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(Error::Model(format!("{what} hung")))
        }
    }
}

/// Speech input replaying a fixed list of transcripts
///
/// `Err` entries simulate recognizer faults. Once the script runs out every
/// listen blocks forever and [`ScriptedInput::exhausted`] resolves.
pub struct ScriptedInput {
    lines: Mutex<VecDeque<Result<String>>>,
    listens: AtomicUsize,
    done: Arc<Notify>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(lines.into_iter().map(|l| Ok(l.into())))
    }

    pub fn with_results<I>(lines: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Arc::new(Self {
            lines: Mutex::new(lines.into_iter().collect()),
            listens: AtomicUsize::new(0),
            done: Arc::new(Notify::new()),
        })
    }

    /// Resolves once every scripted line has been heard
    pub fn exhausted(&self) -> impl Future<Output = ()> + use<> {
        let done = Arc::clone(&self.done);
        async move { done.notified().await }
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechInput for ScriptedInput {
    async fn listen(&self, _window: Duration) -> Result<String> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        let next = self.lines.lock().unwrap().pop_front();
        match next {
            Some(line) => line,
            None => {
                self.done.notify_one();
                std::future::pending().await
            }
        }
    }
}

/// Speech output remembering everything said
#[derive(Default)]
pub struct RecordingOutput {
    spoken: Mutex<Vec<String>>,
    broken: bool,
}

impl RecordingOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records attempts but fails every one
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::default(),
            broken: true,
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for RecordingOutput {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.broken {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        Ok(())
    }
}

pub struct FakeCaptioner {
    pub script: Script<String>,
    calls: AtomicUsize,
}

impl FakeCaptioner {
    pub fn new(script: Script<String>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Captioner for FakeCaptioner {
    async fn caption(&self, _image: &CapturedImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        play(&self.script, "captioner").await
    }
}

pub struct FakeTranslator {
    pub script: Script<String>,
    inputs: Mutex<Vec<String>>,
}

impl FakeTranslator {
    pub fn new(script: Script<String>) -> Arc<Self> {
        Arc::new(Self {
            script,
            inputs: Mutex::default(),
        })
    }

    /// Texts passed to `translate`, in call order
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        self.inputs.lock().unwrap().push(text.to_string());
        play(&self.script, "translator").await
    }
}

pub struct FakeFaces {
    pub script: Script<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeFaces {
    pub fn new(script: Script<Vec<String>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn names(names: &[&str]) -> Arc<Self> {
        Self::new(Script::Reply(
            names.iter().map(|n| (*n).to_string()).collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceRecognizer for FakeFaces {
    async fn recognize(&self, _image: &CapturedImage) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        play(&self.script, "face recognizer").await
    }
}

pub struct FakeCamera {
    pub script: Script<PathBuf>,
    modes: Mutex<Vec<CaptureMode>>,
}

impl FakeCamera {
    pub fn working() -> Arc<Self> {
        Self::new(Script::Reply(PathBuf::from("captured_images/image_test.png")))
    }

    pub fn new(script: Script<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            script,
            modes: Mutex::default(),
        })
    }

    pub fn modes(&self) -> Vec<CaptureMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn capture(&self, mode: CaptureMode) -> Result<CapturedImage> {
        self.modes.lock().unwrap().push(mode);
        let path = play(&self.script, "camera").await?;
        Ok(CapturedImage::new(path, mode))
    }
}

/// Every collaborator of a session, kept for inspection
pub struct Rig {
    pub captioner: Arc<FakeCaptioner>,
    pub translator: Arc<FakeTranslator>,
    pub faces: Arc<FakeFaces>,
    pub camera: Arc<FakeCamera>,
    pub output: Arc<RecordingOutput>,
}

impl Rig {
    /// Working collaborators: caption "a dog in a park", no family
    pub fn new() -> Self {
        Self {
            captioner: FakeCaptioner::new(Script::Reply("a dog in a park".to_string())),
            translator: FakeTranslator::new(Script::Reply("كلب في حديقة".to_string())),
            faces: FakeFaces::names(&[]),
            camera: FakeCamera::working(),
            output: RecordingOutput::new(),
        }
    }

    /// Gateway over the fakes with short time budgets
    pub fn gateway(&self) -> PerceptionGateway {
        PerceptionGateway::new(
            self.captioner.clone(),
            self.translator.clone(),
            self.faces.clone(),
            self.camera.clone(),
        )
        .with_timeouts(PerceptionTimeouts {
            caption: Duration::from_millis(100),
            translate: Duration::from_millis(100),
            faces: Duration::from_millis(100),
            capture: Duration::from_millis(100),
        })
    }

    /// Session over the fakes listening to `input`
    pub fn session(&self, input: Arc<ScriptedInput>) -> Session {
        Session::builder(self.gateway(), input, self.output.clone())
            .listen_window(Duration::from_millis(10))
            .build()
            .expect("failed to build session")
    }

    pub fn spoken(&self) -> Vec<String> {
        self.output.spoken()
    }
}
