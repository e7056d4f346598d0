//! One live recognition session per speaker role
//!
//! Owns the session handle, a bounded audio-frame queue feeding it, and a
//! receive task forwarding finalized transcripts to the transcript store
//! and the coordinator's sink.

use super::service::{RecognitionParams, SessionEvent, SpeechService, SpeechSession};
use crate::transcript::{Speaker, TranscriptStore};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives `(role, text)` for every finalized transcript fragment
pub type TranscriptSink = Arc<dyn Fn(Speaker, &str) + Send + Sync>;

/// Lifecycle of one channel's session. Driven only by explicit
/// connect/stop calls, apart from unrecoverable session errors which move
/// it to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

pub struct ChannelStreamer {
    role: Speaker,
    state: Arc<Mutex<SessionState>>,
    session: Option<Arc<dyn SpeechSession>>,
    audio_tx: Option<mpsc::Sender<Vec<u8>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelStreamer {
    pub fn new(role: Speaker) -> Self {
        Self {
            role,
            state: Arc::new(Mutex::new(SessionState::Disconnected)),
            session: None,
            audio_tx: None,
            tasks: Vec::new(),
        }
    }

    pub fn role(&self) -> Speaker {
        self.role
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Open the session and start the receive and audio-pump tasks.
    /// A failure here is fatal to this streamer and propagates.
    pub async fn connect(
        &mut self,
        service: &dyn SpeechService,
        params: RecognitionParams,
        store: TranscriptStore,
        sink: TranscriptSink,
        queue_size: usize,
        cancel: CancellationToken,
    ) -> Result<()> {
        *self.state.lock() = SessionState::Connecting;

        let (session, mut events) = match service.connect(params).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.lock() = SessionState::Disconnected;
                return Err(e);
            }
        };
        let session: Arc<dyn SpeechSession> = Arc::from(session);
        *self.state.lock() = SessionState::Connected;
        info!(role = %self.role, "transcription session connected");

        let role = self.role;
        let state = Arc::clone(&self.state);
        let recv_cancel = cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = recv_cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(SessionEvent::Transcript(text)) => {
                            if text.trim().is_empty() {
                                continue;
                            }
                            debug!(role = %role, "transcript: {text}");
                            store.add_message(role, &text);
                            (sink)(role, &text);
                        }
                        Some(SessionEvent::Closed { reason }) => {
                            warn!(
                                role = %role,
                                "transcription session closed by remote: {}",
                                reason.as_deref().unwrap_or("no reason given")
                            );
                            *state.lock() = SessionState::Disconnected;
                            break;
                        }
                        None => break,
                    }
                }
            }
        }));

        let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(queue_size);
        let pump_session = Arc::clone(&session);
        let pump_role = self.role;
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = audio_rx.recv() => match frame {
                        Some(frame) => {
                            if let Err(e) = pump_session.send_audio(&frame) {
                                warn!(role = %pump_role, "audio send failed, stopping pump: {e}");
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }));

        self.session = Some(session);
        self.audio_tx = Some(audio_tx);
        Ok(())
    }

    /// Queue one audio frame. Dropped silently when not connected or when
    /// the queue is full; backpressure never blocks the caller.
    pub fn send_audio(&self, frame: Vec<u8>) {
        if !self.is_connected() {
            return;
        }
        if let Some(tx) = &self.audio_tx {
            if let Err(e) = tx.try_send(frame) {
                debug!(role = %self.role, "audio frame dropped: {e}");
            }
        }
    }

    /// Stop the session, waiting at most `grace` for a clean close.
    /// Safe to call at any lifecycle point; never propagates an error.
    pub async fn stop(&mut self, grace: Duration) {
        *self.state.lock() = SessionState::Closing;
        self.audio_tx = None;

        if let Some(session) = self.session.take() {
            match tokio::time::timeout(grace, session.stop()).await {
                Ok(Ok(())) => debug!(role = %self.role, "session stopped cleanly"),
                Ok(Err(e)) => warn!(role = %self.role, "graceful session stop failed: {e}"),
                Err(_) => warn!(role = %self.role, "session stop timed out, disposing anyway"),
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        *self.state.lock() = SessionState::Disconnected;
    }
}
