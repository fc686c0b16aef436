use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use voicelink::capture::{CaptureFormat, CaptureSession, CpalDevice};
use voicelink::playback::{PlaybackQueue, RodioSink};
use voicelink::session::{GestureEvent, GestureMode, SessionController, UiEvent};
use voicelink::transport::TransportFactory;
use voicelink::Config;

#[derive(Debug, Parser)]
#[command(name = "voicelink", about = "Real-time voice assistant client")]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Transport strategy: "upload" or "stream" (overrides config)
    #[arg(short, long)]
    mode: Option<String>,

    /// Gesture mode: "toggle" or "hold"
    #[arg(short, long, default_value = "toggle")]
    gesture: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicelink=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.transport.mode = mode;
    }

    let gesture_mode = match cli.gesture.as_str() {
        "toggle" => GestureMode::Toggle,
        "hold" => GestureMode::Hold,
        other => anyhow::bail!("unknown gesture mode: {}", other),
    };

    // Session identity: generated once, stable for the process lifetime.
    let session_id = uuid::Uuid::new_v4().to_string();

    info!("voicelink session {}", session_id);
    info!(
        "Transport: {} / gesture: {:?}",
        config.transport.mode, gesture_mode
    );

    let device = CpalDevice::new(CaptureFormat::new(
        config.capture.sample_rate,
        config.capture.channels,
    ));
    let capture = CaptureSession::new(Box::new(device), config.capture.clone());

    let sink = std::sync::Arc::new(RodioSink::new()?);
    let (queue, playback_updates) = PlaybackQueue::new(sink, config.playback.queue_capacity);

    let transport = TransportFactory::create(&config, &session_id)?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiEvent>(64);
    let mut controller = SessionController::new(
        session_id,
        transport,
        capture,
        queue,
        playback_updates,
        gesture_mode,
        ui_tx,
    );

    controller.start().await?;

    let ui_task = tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            match event {
                UiEvent::Connection(state) => info!("connection: {}", state),
                UiEvent::Status(text) => info!("status: {}", text),
                UiEvent::Transcript(text) => println!("you said: {}", text),
                UiEvent::AssistantText { text, last } => {
                    if last {
                        println!("assistant: {}", text);
                    } else {
                        print!("\rassistant: {}", text);
                        std::io::Write::flush(&mut std::io::stdout()).ok();
                    }
                }
                UiEvent::Vad(speech) => info!("vad: {}", if speech { "speech" } else { "silence" }),
                UiEvent::Playback(update) => info!("playback: {:?}", update),
                UiEvent::Error(message) => eprintln!("error: {}", message),
            }
        }
    });

    println!("Press Enter to start/stop recording, Ctrl-D to quit.");

    // In hold mode the first Enter presses, the next releases; in toggle
    // mode every Enter toggles. Both drive the same state machine.
    let mut pressed = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(_)) = lines.next_line().await {
        let event = match gesture_mode {
            GestureMode::Toggle => GestureEvent::Toggled,
            GestureMode::Hold => {
                pressed = !pressed;
                if pressed {
                    GestureEvent::Pressed
                } else {
                    GestureEvent::Released
                }
            }
        };
        controller.gesture(event).await?;
    }

    controller.shutdown().await?;
    let stats = controller.stats();

    // Dropping the controller releases the last UI sender so the printer
    // task can finish.
    drop(controller);
    let _ = ui_task.await;

    info!(
        "Session {} finished: {} turns sent, {} clips discarded, {:.1}s",
        stats.session_id, stats.turns_sent, stats.clips_discarded, stats.duration_secs
    );

    Ok(())
}
