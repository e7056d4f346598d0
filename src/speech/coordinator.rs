//! Dual-channel transcription coordinator
//!
//! Owns exactly two live sessions, `Me` and `Companion`, behind a single
//! start/stop/push/read surface. Startup is all-or-nothing: a partially
//! started pair is unwound before the failure propagates.

use super::buffers::{QuestionAccumulator, TextAccumulator};
use super::service::{RecognitionParams, SpeechService};
use super::streamer::{ChannelStreamer, TranscriptSink};
use crate::config::EngineConfig;
use crate::transcript::{Speaker, TranscriptStore};
use crate::{KibitzError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct TranscriptionCoordinator {
    service: Arc<dyn SpeechService>,
    store: TranscriptStore,
    // Held only for map access, never across an await
    streamers: Mutex<HashMap<Speaker, ChannelStreamer>>,
    new_text: TextAccumulator,
    questions: QuestionAccumulator,
    cancel: Mutex<CancellationToken>,
    stop_grace: Duration,
    audio_queue_size: usize,
}

impl TranscriptionCoordinator {
    pub fn new(
        service: Arc<dyn SpeechService>,
        store: TranscriptStore,
        config: &EngineConfig,
    ) -> Self {
        Self {
            service,
            store,
            streamers: Mutex::new(HashMap::new()),
            new_text: TextAccumulator::new(),
            questions: QuestionAccumulator::new(),
            cancel: Mutex::new(CancellationToken::new()),
            stop_grace: config.stop_grace,
            audio_queue_size: config.audio_queue_size,
        }
    }

    /// True iff at least one channel session is connected
    pub fn is_running(&self) -> bool {
        self.streamers.lock().values().any(|s| s.is_connected())
    }

    /// Connect both channels. No-op when already running; on any failure
    /// every channel already started is stopped before the error returns.
    pub async fn start(&self, language: &str) -> Result<()> {
        if self.is_running() {
            debug!("transcription already running, ignoring start");
            return Ok(());
        }

        // Dispose leftovers from a session that died without a stop call
        let stale: Vec<ChannelStreamer> = {
            let mut streamers = self.streamers.lock();
            streamers.drain().map(|(_, s)| s).collect()
        };
        for mut streamer in stale {
            streamer.stop(self.stop_grace).await;
        }

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        let sink = self.transcript_sink();

        let mut connected: Vec<ChannelStreamer> = Vec::new();
        for role in Speaker::both() {
            let mut streamer = ChannelStreamer::new(role);
            let result = streamer
                .connect(
                    self.service.as_ref(),
                    RecognitionParams::for_language(language),
                    self.store.clone(),
                    Arc::clone(&sink),
                    self.audio_queue_size,
                    cancel.clone(),
                )
                .await;

            if let Err(e) = result {
                error!(role = %role, "failed to start transcription channel: {e}");
                for mut started in connected {
                    started.stop(self.stop_grace).await;
                }
                cancel.cancel();
                return Err(KibitzError::SessionStart(format!("{role} channel: {e}")));
            }
            connected.push(streamer);
        }

        let mut streamers = self.streamers.lock();
        for streamer in connected {
            streamers.insert(streamer.role(), streamer);
        }
        info!(language, "dual-channel transcription started");
        Ok(())
    }

    /// Stop both channels with a bounded grace period. Never hangs and
    /// never propagates an error.
    pub async fn stop(&self) {
        self.cancel.lock().cancel();

        let streamers: Vec<ChannelStreamer> = {
            let mut map = self.streamers.lock();
            map.drain().map(|(_, s)| s).collect()
        };
        for mut streamer in streamers {
            streamer.stop(self.stop_grace).await;
        }
        info!("audio sessions stopped");
    }

    /// Route one raw PCM chunk to a role's session. Silently dropped when
    /// that role has no registered streamer (e.g. stop in progress).
    pub fn push_audio(&self, role: Speaker, frame: Vec<u8>) {
        if let Some(streamer) = self.streamers.lock().get(&role) {
            streamer.send_audio(frame);
        }
    }

    /// Destructive read of everything buffered since the last call
    pub fn pop_new_text(&self) -> String {
        self.new_text.pop()
    }

    /// Take the first complete question buffered from the companion
    /// channel, if one has terminated with `?`
    pub fn take_complete_question(&self) -> Option<String> {
        self.questions.take_complete_question()
    }

    /// Clear the transcript store. Active sessions keep running.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn transcript_sink(&self) -> TranscriptSink {
        let new_text = self.new_text.clone();
        let questions = self.questions.clone();
        Arc::new(move |role, text| {
            // Only the counterpart's speech can trigger auto-answering;
            // the local user's own words never feed these buffers.
            if role == Speaker::Companion {
                new_text.push(text);
                questions.push(text);
            }
        })
    }
}
