use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sightline::announce::{AnnouncementManager, VoicePreference};
use sightline::speech::{MicRecognizer, Speaker, SpeechEngine, SpeechOutput, TextToSpeech};
use sightline::vision::{FrameSource, HttpDetector, ObjectDetector, SnapshotCamera};
use sightline::{Config, Pipeline};

/// Sightline - perception-to-speech assistant pipeline
#[derive(Parser)]
#[command(name = "sightline", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SIGHTLINE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice commands (camera and announcements only)
    #[arg(long, env = "SIGHTLINE_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test speech output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the announcement system.")]
        text: String,
    },
    /// Run one detection against the configured camera and detector
    TestDetect,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,sightline=info",
        1 => "info,sightline=debug",
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
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::TestDetect => test_detect(&config).await,
        };
    }

    tracing::info!(disable_voice = cli.disable_voice, "starting sightline");

    let camera: Arc<dyn FrameSource> = Arc::new(SnapshotCamera::new(
        config.services.camera_url.clone(),
        Duration::from_millis(config.services.camera_poll_ms),
    ));
    let detector: Arc<dyn ObjectDetector> = Arc::new(HttpDetector::new(
        config.services.detector_url.clone(),
        config.services.detector_api_key.clone(),
    )?);

    let engine = build_engine(&config)?;
    let announcer = Arc::new(AnnouncementManager::new(
        engine,
        VoicePreference::default(),
        config.perception.min_announce_interval(),
    ));

    let recognizer: Option<Arc<dyn sightline::speech::SpeechRecognizer>> = if cli.disable_voice {
        tracing::warn!("voice commands disabled");
        None
    } else {
        match MicRecognizer::new(
            config.speech.api_base_url.clone(),
            config.speech.api_key.clone(),
            config.speech.stt_model.clone(),
        ) {
            Ok(recognizer) => Some(Arc::new(recognizer)),
            Err(e) => {
                tracing::warn!(error = %e, "recognition unavailable, voice commands disabled");
                None
            }
        }
    };

    let pipeline = Arc::new(Pipeline::new(
        camera,
        detector,
        recognizer,
        announcer,
        config.perception.clone(),
    ));

    let pipeline_signal = Arc::clone(&pipeline);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            pipeline_signal.shutdown();
        }
    });

    pipeline.run().await?;
    Ok(())
}

/// Build the TTS + playback engine from configuration
fn build_engine(config: &Config) -> anyhow::Result<Arc<dyn SpeechOutput>> {
    let tts = TextToSpeech::new(
        config.speech.api_base_url.clone(),
        config.speech.api_key.clone(),
        config.speech.tts_model.clone(),
        config.speech.tts_speed,
    )?;
    let speaker = Speaker::new()?;
    Ok(Arc::new(SpeechEngine::new(tts, speaker)))
}

/// Speak a test phrase through the configured engine
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    println!("Speaking: {text}");
    engine.speak(text, None).await?;

    // Playback is fire-and-forget; give it time to finish
    tokio::time::sleep(Duration::from_secs(10)).await;
    Ok(())
}

/// Fetch one frame and print the detections
async fn test_detect(config: &Config) -> anyhow::Result<()> {
    let camera = SnapshotCamera::new(
        config.services.camera_url.clone(),
        Duration::from_millis(config.services.camera_poll_ms),
    );
    let detector = HttpDetector::new(
        config.services.detector_url.clone(),
        config.services.detector_api_key.clone(),
    )?;

    camera.start().await?;
    let frame = camera
        .current_frame()
        .ok_or_else(|| anyhow::anyhow!("no frame captured"))?;
    camera.stop();

    println!("Frame: {}x{}", frame.width, frame.height);
    for detection in detector.detect(&frame).await? {
        println!(
            "  {} ({:.0}%) at x={:.0} y={:.0} {}x{}",
            detection.label,
            detection.confidence * 100.0,
            detection.rect.x,
            detection.rect.y,
            detection.rect.width,
            detection.rect.height,
        );
    }

    Ok(())
}
