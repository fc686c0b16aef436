use crate::capture::{CaptureSession, ClipOutcome};
use crate::error::{ClientError, Result};
use crate::playback::{PlaybackHandle, PlaybackQueue, PlaybackUpdate};
use crate::protocol::ProtocolMessage;
use crate::session::gesture::{GestureAdapter, GestureEvent, GestureMode, Intent};
use crate::transport::{ConnectionState, TransportChannel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events surfaced to the user-facing layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Connection state transition
    Connection(ConnectionState),
    /// Engine status line
    Status(String),
    /// Recognized transcript of the user's utterance
    Transcript(String),
    /// Assistant text, incremental; `last` marks the final revision
    AssistantText { text: String, last: bool },
    /// Remote voice-activity toggle
    Vad(bool),
    /// Playback progress
    Playback(PlaybackUpdate),
    /// Surfaced failure (transport, device, connection)
    Error(String),
}

/// Point-in-time session statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub turns_sent: usize,
    pub clips_discarded: usize,
    pub is_recording: bool,
    pub connection: String,
}

/// Top-level orchestrator.
///
/// Wires user gestures to the capture session, routes the single inbound
/// message stream to the playback queue and UI events, and owns the
/// session identity and connection-driven capture gate. All collaborators
/// are injected; the controller holds the only references.
pub struct SessionController {
    session_id: String,
    transport: Box<dyn TransportChannel>,
    capture: CaptureSession,
    queue: Option<PlaybackQueue>,
    playback: Option<PlaybackHandle>,
    playback_updates: Option<mpsc::Receiver<PlaybackUpdate>>,
    adapter: GestureAdapter,
    ui_tx: mpsc::Sender<UiEvent>,
    /// Capture is gated on an Open connection only for the streamed
    /// transport; upload turns are self-contained.
    gate_capture: bool,
    started_at: DateTime<Utc>,
    turns_sent: usize,
    clips_discarded: usize,
    dispatch: Option<JoinHandle<()>>,
    update_pipe: Option<JoinHandle<()>>,
    status_pipe: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(
        session_id: String,
        transport: Box<dyn TransportChannel>,
        capture: CaptureSession,
        queue: PlaybackQueue,
        playback_updates: mpsc::Receiver<PlaybackUpdate>,
        gesture_mode: GestureMode,
        ui_tx: mpsc::Sender<UiEvent>,
    ) -> Self {
        let gate_capture = transport.name() == "stream";
        let playback = queue.handle();

        Self {
            session_id,
            transport,
            capture,
            queue: Some(queue),
            playback: Some(playback),
            playback_updates: Some(playback_updates),
            adapter: GestureAdapter::new(gesture_mode),
            ui_tx,
            gate_capture,
            started_at: Utc::now(),
            turns_sent: 0,
            clips_discarded: 0,
            dispatch: None,
            update_pipe: None,
            status_pipe: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Open the transport and start routing inbound messages.
    pub async fn start(&mut self) -> Result<()> {
        info!(
            "Starting session {} ({} transport)",
            self.session_id,
            self.transport.name()
        );

        let inbound = self.transport.open().await?;

        let playback = self
            .playback
            .clone()
            .ok_or_else(|| ClientError::Config("controller already shut down".to_string()))?;
        let ui = self.ui_tx.clone();
        self.dispatch = Some(tokio::spawn(dispatch_messages(inbound, playback, ui)));

        if let Some(mut updates) = self.playback_updates.take() {
            let ui = self.ui_tx.clone();
            self.update_pipe = Some(tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    let _ = ui.send(UiEvent::Playback(update)).await;
                }
            }));
        }

        let mut connection = self.transport.connection();
        let ui = self.ui_tx.clone();
        self.status_pipe = Some(tokio::spawn(async move {
            let mut last = *connection.borrow();
            let _ = ui.send(UiEvent::Connection(last)).await;
            while connection.changed().await.is_ok() {
                let state = *connection.borrow();
                if state != last {
                    last = state;
                    let _ = ui.send(UiEvent::Connection(state)).await;
                }
            }
        }));

        Ok(())
    }

    /// Handle one user input event. Press/hold, toggle, and key-hold all
    /// resolve through the same adapter to start/stop semantics.
    pub async fn gesture(&mut self, event: GestureEvent) -> Result<()> {
        match self.adapter.resolve(event) {
            Intent::Ignore => Ok(()),
            Intent::Start => self.begin_turn().await,
            Intent::Stop => self.finish_turn().await,
        }
    }

    async fn begin_turn(&mut self) -> Result<()> {
        if self.gate_capture && *self.transport.connection().borrow() != ConnectionState::Open {
            self.adapter.reset();
            let _ = self
                .ui_tx
                .send(UiEvent::Status(
                    "assistant not connected; capture disabled".to_string(),
                ))
                .await;
            return Ok(());
        }

        match self.capture.start().await {
            Ok(()) => {
                let _ = self.ui_tx.send(UiEvent::Status("recording".to_string())).await;
                Ok(())
            }
            Err(e @ ClientError::DeviceUnavailable(_)) => {
                // Recoverable: the next gesture retries device acquisition.
                self.adapter.reset();
                let _ = self.ui_tx.send(UiEvent::Error(e.to_string())).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn finish_turn(&mut self) -> Result<()> {
        match self.capture.stop().await? {
            None => Ok(()),
            Some(ClipOutcome::Discarded(reason)) => {
                self.clips_discarded += 1;
                debug!("Turn dropped: {}", reason);
                let _ = self.ui_tx.send(UiEvent::Status("ready".to_string())).await;
                Ok(())
            }
            Some(ClipOutcome::Ready(clip)) => {
                let _ = self
                    .ui_tx
                    .send(UiEvent::Status("waiting for reply".to_string()))
                    .await;

                match self.transport.send_clip(&clip).await {
                    Ok(()) => {
                        self.turns_sent += 1;
                        Ok(())
                    }
                    Err(e) => {
                        // Surfaced, not retried; the user decides to retry
                        // the turn or wait for reconnection.
                        warn!("Turn transmission failed: {}", e);
                        let _ = self.ui_tx.send(UiEvent::Error(e.to_string())).await;
                        Ok(())
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStats {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            turns_sent: self.turns_sent,
            clips_discarded: self.clips_discarded,
            is_recording: self.capture.is_recording(),
            connection: self.transport.connection().borrow().to_string(),
        }
    }

    /// Deterministic teardown: release the device, close the transport,
    /// and drain playback. Safe to call once at end of session.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down session {}", self.session_id);

        if self.capture.is_recording() {
            // The in-flight recording is dropped; releasing the device is
            // what matters here.
            let _ = self.capture.stop().await;
        }

        self.transport.close().await?;

        if let Some(task) = self.dispatch.take() {
            let _ = task.await;
        }

        // Last enqueue handle goes away so the queue can drain and stop.
        self.playback.take();
        if let Some(queue) = self.queue.take() {
            queue.shutdown().await;
        }
        if let Some(task) = self.update_pipe.take() {
            let _ = task.await;
        }
        if let Some(task) = self.status_pipe.take() {
            task.abort();
        }

        let _ = self
            .ui_tx
            .send(UiEvent::Status("session closed".to_string()))
            .await;

        Ok(())
    }
}

/// Route the single inbound message stream to typed handlers. Audio goes
/// to the playback queue; text, VAD, and errors go to the UI; control and
/// debug notices are logged. VAD routing never waits on playback.
async fn dispatch_messages(
    mut inbound: mpsc::Receiver<ProtocolMessage>,
    playback: PlaybackHandle,
    ui: mpsc::Sender<UiEvent>,
) {
    while let Some(message) = inbound.recv().await {
        match message {
            ProtocolMessage::AudioFrame(bytes) => {
                if let Err(e) = playback.enqueue(bytes).await {
                    warn!("Failed to enqueue assistant audio: {}", e);
                }
            }
            ProtocolMessage::Transcript(text) => {
                let _ = ui.send(UiEvent::Transcript(text)).await;
            }
            ProtocolMessage::TextDelta { text, last } => {
                let _ = ui.send(UiEvent::AssistantText { text, last }).await;
            }
            ProtocolMessage::VadStatus(speech) => {
                let _ = ui.send(UiEvent::Vad(speech)).await;
            }
            ProtocolMessage::ErrorNotice(message) => {
                let _ = ui.send(UiEvent::Error(message)).await;
            }
            ProtocolMessage::DebugNotice(message) => {
                debug!("Protocol notice: {}", message);
            }
            ProtocolMessage::ProcessControl => {
                debug!("Control ping");
            }
        }
    }
    debug!("Inbound dispatch finished");
}
