//! Terminal stand-in for the microphone and speaker

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::{Mutex, mpsc};

use super::{SpeechInput, SpeechOutput};
use crate::perception::providers::FamilyNamer;
use crate::{Error, Result};

/// Reads utterances as lines and prints replies
///
/// Typing has no deadline, so the listen window only paces the loop once the
/// input is exhausted; after that every listen is silence.
///
/// Lines arrive through a channel fed by a reader of their own, so dropping a
/// pending listen (e.g. on Ctrl-C) never leaves the process waiting on the
/// terminal.
pub struct ConsoleSpeech<W> {
    lines: Mutex<mpsc::Receiver<String>>,
    output: Mutex<W>,
    closed: AtomicBool,
}

impl ConsoleSpeech<Stdout> {
    /// Console on the process's stdin and stdout
    ///
    /// Stdin is read on a detached thread, which does not hold up exit.
    #[must_use]
    pub fn stdio() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self::from_lines(rx, tokio::io::stdout())
    }
}

impl<W> ConsoleSpeech<W> {
    /// Console over any line source; must be called inside a Tokio runtime
    #[must_use]
    pub fn new<R>(input: R, output: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = input.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        Self::from_lines(rx, output)
    }

    fn from_lines(lines: mpsc::Receiver<String>, output: W) -> Self {
        Self {
            lines: Mutex::new(lines),
            output: Mutex::new(output),
            closed: AtomicBool::new(false),
        }
    }

    /// Take back the writer, e.g. to inspect what was said
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<W> ConsoleSpeech<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Print `prompt` and wait for the next line; `None` once input is closed
    async fn read_line(&self, prompt: &str) -> Result<Option<String>> {
        if self.closed.load(Ordering::Relaxed) {
            return Ok(None);
        }

        {
            let mut output = self.output.lock().await;
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;
        }

        let line = self.lines.lock().await.recv().await;
        if line.is_none() {
            tracing::info!("console input closed");
            self.closed.store(true, Ordering::Relaxed);
        }

        Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
    }
}

#[async_trait]
impl<W> SpeechInput for ConsoleSpeech<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn listen(&self, window: Duration) -> Result<String> {
        if let Some(line) = self.read_line("> ").await? {
            return Ok(line);
        }

        tokio::time::sleep(window).await;
        Ok(String::new())
    }
}

#[async_trait]
impl<W> SpeechOutput for ConsoleSpeech<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn speak(&self, text: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        output.write_all(format!("مبصر: {text}\n").as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

/// Asks for family names on the console the session talks through
///
/// Keeps a single reader on the terminal in console mode. Must be called
/// from a blocking task inside the runtime, as the camera does.
pub struct ConsoleNamer<W> {
    console: Arc<ConsoleSpeech<W>>,
}

impl<W> ConsoleNamer<W> {
    #[must_use]
    pub const fn new(console: Arc<ConsoleSpeech<W>>) -> Self {
        Self { console }
    }
}

impl<W> FamilyNamer for ConsoleNamer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn ask(&self) -> Result<String> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Cancelled(format!("no runtime for console prompt: {e}")))?;

        handle
            .block_on(self.console.read_line("اسم الصورة (بدون امتداد): "))?
            .ok_or_else(|| Error::Cancelled("console input closed".to_string()))
    }
}
