//! Camera backed by an external frame-grab command
//!
//! The command (e.g. `fswebcam -q --no-banner {output}`) writes one frame to
//! the path substituted for `{output}`. Explore pictures are timestamped;
//! family pictures are named by the operator and moved into the gallery.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tempfile::TempPath;

use crate::perception::{Camera, CaptureMode, CapturedImage, family};
use crate::{Error, Result};

/// Placeholder replaced by the output path in the command arguments
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Attempts the operator gets to enter a usable, unused name
const MAX_NAME_ATTEMPTS: usize = 5;

/// Asks the operator what to call a new family portrait
pub trait FamilyNamer: Send + Sync {
    /// Return the raw name typed by the operator
    ///
    /// # Errors
    ///
    /// Returns error if the operator aborts or no terminal is available
    fn ask(&self) -> Result<String>;
}

/// Interactive terminal prompt
pub struct PromptNamer;

impl FamilyNamer for PromptNamer {
    fn ask(&self) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt("اسم الصورة (بدون امتداد)")
            .interact_text()
            .map_err(|e| Error::Cancelled(e.to_string()))
    }
}

/// Ask until the namer yields a clean name not already in the gallery
///
/// # Errors
///
/// Returns error if the namer fails or no acceptable name is given
pub fn choose_family_name(namer: &dyn FamilyNamer, family_dir: &Path) -> Result<String> {
    choose_family_name_until(namer, family_dir, &AtomicBool::new(false))
}

/// Like [`choose_family_name`], giving up once `abandoned` is set
///
/// A prompt already on screen cannot be interrupted; its answer is dropped
/// and no further attempt is made.
fn choose_family_name_until(
    namer: &dyn FamilyNamer,
    family_dir: &Path,
    abandoned: &AtomicBool,
) -> Result<String> {
    let check = || {
        if abandoned.load(Ordering::SeqCst) {
            return Err(Error::Cancelled("capture abandoned".to_string()));
        }
        Ok(())
    };

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        check()?;
        let raw = namer.ask()?;
        check()?;

        let Some(name) = family::sanitize_name(&raw) else {
            tracing::warn!(attempt, raw = %raw, "name has no letters or digits");
            continue;
        };

        if family::is_enrolled(family_dir, &name) {
            tracing::warn!(attempt, name = %name, "name already enrolled");
            continue;
        }

        return Ok(name);
    }

    Err(Error::Cancelled(format!(
        "no usable name after {MAX_NAME_ATTEMPTS} attempts"
    )))
}

/// Sets the flag when dropped
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Camera driven by an external command
pub struct CommandCamera {
    command: Vec<String>,
    countdown: Duration,
    capture_dir: PathBuf,
    family_dir: PathBuf,
    namer: Arc<dyn FamilyNamer>,
    /// One naming prompt on the terminal at a time
    prompt_turn: Arc<Mutex<()>>,
}

impl CommandCamera {
    /// Create a camera from a command line
    ///
    /// # Errors
    ///
    /// Returns error if the command line is empty
    pub fn new(command: Vec<String>, capture_dir: PathBuf, family_dir: PathBuf) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(Error::Config("camera command required".to_string()));
        }

        Ok(Self {
            command,
            countdown: Duration::from_secs(3),
            capture_dir,
            family_dir,
            namer: Arc::new(PromptNamer),
            prompt_turn: Arc::new(Mutex::new(())),
        })
    }

    /// Delay between the request and the frame grab
    #[must_use]
    pub fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = countdown;
        self
    }

    /// Replace the interactive namer
    #[must_use]
    pub fn with_namer(mut self, namer: Arc<dyn FamilyNamer>) -> Self {
        self.namer = namer;
        self
    }

    /// Arguments with the output path substituted
    fn arguments(&self, output: &Path) -> Vec<String> {
        let output = output.display().to_string();
        let mut args: Vec<String> = self.command[1..]
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect();

        if !self.command[1..].iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            args.push(output);
        }

        args
    }

    /// Run the command and check a frame landed at `output`
    async fn grab(&self, output: &Path) -> Result<()> {
        let program = which::which(&self.command[0])
            .map_err(|e| Error::Camera(format!("{}: {e}", self.command[0])))?;

        let result = tokio::process::Command::new(&program)
            .args(self.arguments(output))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Camera(format!("failed to run {}: {e}", program.display())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Camera(format!(
                "{} exited with {}: {}",
                program.display(),
                result.status,
                stderr.trim()
            )));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(Error::Camera("no frame written".to_string())),
        }
    }

    async fn capture_family(&self) -> Result<CapturedImage> {
        // Removed on drop, so a failed or abandoned capture leaves nothing behind
        let pending = tempfile::Builder::new()
            .prefix("pending_")
            .suffix(".png")
            .tempfile_in(&self.capture_dir)?
            .into_temp_path();
        self.grab(&pending).await?;
        tokio::fs::create_dir_all(&self.family_dir).await?;

        let abandoned = Arc::new(AtomicBool::new(false));
        let _abandon = AbandonOnDrop(Arc::clone(&abandoned));

        let namer = Arc::clone(&self.namer);
        let family_dir = self.family_dir.clone();
        let prompt_turn = Arc::clone(&self.prompt_turn);
        let name = tokio::task::spawn_blocking(move || {
            let _turn = prompt_turn.lock().unwrap_or_else(PoisonError::into_inner);
            choose_family_name_until(namer.as_ref(), &family_dir, &abandoned)
        })
        .await
        .map_err(|e| Error::Camera(format!("naming task failed: {e}")))??;

        let portrait = family::portrait_path(&self.family_dir, &name);
        store_portrait(pending, &portrait).await?;
        tracing::info!(name = %name, path = %portrait.display(), "family portrait saved");

        Ok(CapturedImage::new(portrait, CaptureMode::Family))
    }
}

/// Move a pending frame into the gallery
///
/// Falls back to copying when the rename fails, e.g. across filesystems.
async fn store_portrait(pending: TempPath, portrait: &Path) -> Result<()> {
    match pending.persist(portrait) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = %e.error, "rename failed, copying frame into gallery");
            tokio::fs::copy(&e.path, portrait).await?;
            Ok(())
        }
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&self, mode: CaptureMode) -> Result<CapturedImage> {
        tracing::info!(%mode, countdown_secs = self.countdown.as_secs(), "capturing after countdown");
        tokio::time::sleep(self.countdown).await;

        tokio::fs::create_dir_all(&self.capture_dir).await?;

        match mode {
            CaptureMode::Explore => {
                let stamp = Local::now().format("%Y%m%d_%H%M%S");
                let path = self.capture_dir.join(format!("image_{stamp}.png"));
                self.grab(&path).await?;
                Ok(CapturedImage::new(path, mode))
            }
            CaptureMode::Family => self.capture_family().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedNamer(Mutex<Vec<&'static str>>);

    impl FamilyNamer for ScriptedNamer {
        fn ask(&self) -> Result<String> {
            let mut names = self.0.lock().unwrap();
            if names.is_empty() {
                return Err(Error::Cancelled("no more names".to_string()));
            }
            Ok(names.remove(0).to_string())
        }
    }

    #[test]
    fn test_arguments_substitute_output() {
        let camera = CommandCamera::new(
            vec!["fswebcam".into(), "-q".into(), "--save={output}".into()],
            PathBuf::from("captured"),
            PathBuf::from("family"),
        )
        .unwrap();
        assert_eq!(
            camera.arguments(Path::new("captured/a.png")),
            vec!["-q".to_string(), "--save=captured/a.png".to_string()]
        );
    }

    #[test]
    fn test_arguments_append_output_without_placeholder() {
        let camera = CommandCamera::new(
            vec!["grab".into(), "-n1".into()],
            PathBuf::from("captured"),
            PathBuf::from("family"),
        )
        .unwrap();
        assert_eq!(
            camera.arguments(Path::new("x.png")),
            vec!["-n1".to_string(), "x.png".to_string()]
        );
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandCamera::new(Vec::new(), PathBuf::new(), PathBuf::new()).is_err());
        assert!(CommandCamera::new(vec![" ".into()], PathBuf::new(), PathBuf::new()).is_err());
    }

    #[test]
    fn test_choose_name_skips_invalid_and_taken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Omar.png"), b"png").unwrap();

        let namer = ScriptedNamer(Mutex::new(vec!["", "!!", "Omar", "سارة"]));
        assert_eq!(choose_family_name(&namer, dir.path()).unwrap(), "سارة");
    }

    #[test]
    fn test_choose_name_stops_once_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ScriptedNamer(Mutex::new(vec!["سارة"]));
        let abandoned = AtomicBool::new(true);

        assert!(matches!(
            choose_family_name_until(&namer, dir.path(), &abandoned),
            Err(Error::Cancelled(_))
        ));
        // Never asked
        assert_eq!(namer.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_portrait_moves_frame() {
        let capture = tempfile::tempdir().unwrap();
        // Often a different filesystem from the temp dir, which forces the copy path
        let gallery = tempfile::tempdir_in(".").unwrap();

        let pending = tempfile::Builder::new()
            .prefix("pending_")
            .tempfile_in(capture.path())
            .unwrap()
            .into_temp_path();
        std::fs::write(&pending, b"frame").unwrap();

        let portrait = gallery.path().join("سارة.png");
        store_portrait(pending, &portrait).await.unwrap();

        assert_eq!(std::fs::read(&portrait).unwrap(), b"frame");
        assert_eq!(std::fs::read_dir(capture.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_choose_name_propagates_abort() {
        let dir = tempfile::tempdir().unwrap();
        let namer = ScriptedNamer(Mutex::new(vec!["??"]));
        assert!(matches!(
            choose_family_name(&namer, dir.path()),
            Err(Error::Cancelled(_))
        ));
    }
}
