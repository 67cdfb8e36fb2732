use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use mobsir::perception::family;
use mobsir::perception::providers::{CommandCamera, FamilyNamer, HttpPerceptionClient};
use mobsir::voice::{
    AudioCapture, AudioPlayback, ConsoleNamer, ConsoleSpeech, MicrophoneListener, SpeechInput, SpeechOutput,
    SpeechToText, Speaker, TextToSpeech, rms,
};
use mobsir::{Config, PerceptionGateway, Session, normalize};

/// Mobsir - voice assistant that describes what the camera sees
#[derive(Parser)]
#[command(name = "mobsir", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/mobsir/config.toml)
    #[arg(short, long, env = "MOBSIR_CONFIG")]
    config: Option<PathBuf>,

    /// Type and read instead of speaking and listening
    #[arg(long, env = "MOBSIR_CONSOLE")]
    console: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "مرحبا! هذا اختبار لنظام تحويل النص إلى كلام.")]
        text: String,
    },
    /// Show how an utterance would be understood
    Classify {
        /// Transcribed utterance
        text: String,
    },
    /// List enrolled family members
    Family,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,mobsir=info",
        1 => "info,mobsir=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&Config::load(config_path)?, &text).await,
            Command::Classify { text } => classify(&Config::load(config_path)?, &text),
            Command::Family => list_family(&Config::load(config_path)?),
        };
    }

    let config = Config::load(config_path)?;
    tracing::debug!(?config, "loaded configuration");

    let input: Arc<dyn SpeechInput>;
    let output: Arc<dyn SpeechOutput>;
    let mut namer: Option<Arc<dyn FamilyNamer>> = None;
    if cli.console {
        // Family names are typed into the same console as commands
        let console = Arc::new(ConsoleSpeech::stdio());
        namer = Some(Arc::new(ConsoleNamer::new(console.clone())));
        input = console.clone();
        output = console;
    } else {
        input = Arc::new(build_listener(&config)?);
        output = Arc::new(build_speaker(&config)?);
    }

    let gateway = build_gateway(&config, namer)?;

    let mut session = Session::builder(gateway, input, output)
        .vocabularies(config.vocabularies.clone())
        .prompts(config.prompts.clone())
        .listen_window(config.listen_window)
        .build()?;

    tracing::info!(
        console = cli.console,
        server = %config.perception.server_url,
        "mobsir ready"
    );

    session
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

fn build_gateway(
    config: &Config,
    namer: Option<Arc<dyn FamilyNamer>>,
) -> anyhow::Result<PerceptionGateway> {
    let client = Arc::new(
        HttpPerceptionClient::new(
            &config.perception.server_url,
            config.camera.family_dir.clone(),
        )?
        .with_languages(&config.perception.source_language, &config.voice.language)
        .with_face_model(&config.perception.face_model),
    );

    let mut camera = CommandCamera::new(
        config.camera.command.clone(),
        config.camera.capture_dir.clone(),
        config.camera.family_dir.clone(),
    )?
    .with_countdown(config.camera.countdown);
    if let Some(namer) = namer {
        camera = camera.with_namer(namer);
    }

    Ok(PerceptionGateway::new(
        client.clone(),
        client.clone(),
        client,
        Arc::new(camera),
    )
    .with_timeouts(config.perception.timeouts))
}

fn build_listener(config: &Config) -> anyhow::Result<MicrophoneListener> {
    let key = config
        .stt_key()
        .ok_or_else(|| anyhow::anyhow!("no API key for {:?} STT", config.voice.stt_provider))?;

    let stt = SpeechToText::new(
        config.voice.stt_provider,
        owned(key),
        config.voice.stt_model.clone(),
        config.voice.language.clone(),
    )?;
    Ok(MicrophoneListener::new(stt))
}

fn build_tts(config: &Config) -> anyhow::Result<TextToSpeech> {
    let key = config
        .tts_key()
        .ok_or_else(|| anyhow::anyhow!("no API key for {:?} TTS", config.voice.tts_provider))?;

    Ok(TextToSpeech::new(
        config.voice.tts_provider,
        owned(key),
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
    )?)
}

fn build_speaker(config: &Config) -> anyhow::Result<Speaker> {
    Ok(Speaker::new(build_tts(config)?))
}

fn owned(key: &SecretString) -> SecretString {
    SecretString::from(key.expose_secret().to_string())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let levels = tokio::task::spawn_blocking(move || -> mobsir::Result<Vec<(f32, f32)>> {
        let capture = AudioCapture::new()?;
        println!("Sample rate: {} Hz", capture.sample_rate());
        println!("---");

        let mut levels = Vec::new();
        for i in 0..duration {
            let samples = capture.record(Duration::from_secs(1))?;
            let energy = rms(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            // Visual meter
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);
            println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);

            levels.push((energy, peak));
        }
        Ok(levels)
    })
    .await??;

    println!("\n---");
    if levels.iter().any(|(energy, _)| *energy > 0.01) {
        println!("Your mic is working!");
    } else {
        println!("RMS stayed near 0, check:");
        println!("  1. Is your mic plugged in?");
        println!("  2. Run: pactl info | grep 'Default Source'");
        println!("  3. Run: arecord -l (to list devices)");
    }

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = mobsir::voice::PLAYBACK_SAMPLE_RATE;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If not, run: pactl list sinks short");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = build_tts(config)?;
    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&mp3_data)).await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Print the normalized form and command kind of an utterance
fn classify(config: &Config, text: &str) -> anyhow::Result<()> {
    let utterance = normalize(text);
    let kind = config.vocabularies.classify(&utterance);
    println!("normalized: {utterance}");
    println!("command:    {kind}");
    Ok(())
}

/// List family portraits
fn list_family(config: &Config) -> anyhow::Result<()> {
    let dir = &config.camera.family_dir;
    let members = family::gallery(dir)?;

    if members.is_empty() {
        println!("No family members enrolled in {}", dir.display());
        return Ok(());
    }

    println!("{} family member(s) in {}:", members.len(), dir.display());
    for member in members {
        println!("  {:<20} {}", member.name, member.path.display());
    }
    Ok(())
}
