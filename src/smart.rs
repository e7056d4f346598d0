//! Smart mode: the continuous listen-detect-answer loop
//!
//! One loop runs per attached client session. Each tick drains the
//! coordinator's new-text buffer into a rolling tail-capped buffer; once
//! enough text has accumulated the orchestrator is asked whether the
//! companion posed an addressed question, and a hit streams the answer
//! back chunk by chunk while audio keeps flowing. Only external
//! cancellation ends the loop; provider trouble is reported and survived.

use crate::config::EngineConfig;
use crate::orchestrator::Orchestrator;
use crate::speech::TranscriptionCoordinator;
use crate::vision::VisualContextStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events streamed to the attached client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SmartEvent {
    /// The loop is up and listening
    Listening,
    /// An addressed question was detected in the companion's speech
    QuestionDetected { request_id: Uuid, question: String },
    /// One fragment of the streamed answer
    AnswerChunk { request_id: Uuid, text: String },
    /// The answer stream finished
    AnswerComplete { request_id: Uuid },
    /// A transient failure; the loop keeps listening
    Error { message: String },
    /// The loop ended after cancellation
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Listening,
    Detected,
    Answering,
}

pub struct SmartModeLoop {
    orchestrator: Arc<Orchestrator>,
    coordinator: Arc<TranscriptionCoordinator>,
    visual: VisualContextStore,
    tick: Duration,
    buffer_cap: usize,
    detect_min_chars: usize,
}

impl SmartModeLoop {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        coordinator: Arc<TranscriptionCoordinator>,
        visual: VisualContextStore,
        config: &EngineConfig,
    ) -> Self {
        Self {
            orchestrator,
            coordinator,
            visual,
            tick: config.smart_tick,
            buffer_cap: config.smart_buffer_cap,
            detect_min_chars: config.detect_min_chars,
        }
    }

    /// Run until `cancel` fires or the event receiver goes away.
    /// `connection_id` selects the visual context attached to answers.
    pub async fn run(
        &self,
        model: &str,
        connection_id: &str,
        events: mpsc::Sender<SmartEvent>,
        cancel: CancellationToken,
    ) {
        info!(connection_id, model, "smart mode started");
        if events.send(SmartEvent::Listening).await.is_err() {
            return;
        }

        let mut buffer = String::new();
        let mut state = LoopState::Listening;
        debug!(?state, "entering poll loop");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.tick) => {}
            }

            let fresh = self.coordinator.pop_new_text();
            if !fresh.is_empty() {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(&fresh);
                self.trim_buffer(&mut buffer);
            }

            if buffer.len() < self.detect_min_chars {
                continue;
            }

            let Some(question) = self.orchestrator.detect_question(model, &buffer).await else {
                // Unanswered fragments stay buffered and compound into a
                // fuller question on a later tick
                continue;
            };

            state = LoopState::Detected;
            let request_id = Uuid::new_v4();
            debug!(?state, %request_id, "question detected: {question}");
            if events
                .send(SmartEvent::QuestionDetected {
                    request_id,
                    question: question.clone(),
                })
                .await
                .is_err()
            {
                return;
            }

            state = LoopState::Answering;
            debug!(?state, %request_id, "streaming answer");
            if !self
                .answer(model, connection_id, &question, request_id, &events, &cancel)
                .await
            {
                return;
            }

            // The detected question consumed the buffered speech
            buffer.clear();
            state = LoopState::Listening;
            debug!(?state, "back to listening");

            if cancel.is_cancelled() {
                break;
            }
        }

        let _ = events.send(SmartEvent::Stopped).await;
        info!(connection_id, "smart mode stopped");
    }

    /// Stream one answer. Returns false when the event channel is gone and
    /// the whole loop should end.
    async fn answer(
        &self,
        model: &str,
        connection_id: &str,
        question: &str,
        request_id: Uuid,
        events: &mpsc::Sender<SmartEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        use futures::StreamExt;

        let image = self.visual.latest(connection_id);
        let mut stream = match self
            .orchestrator
            .stream_request(model, question, image.as_ref())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%request_id, "answer stream failed to start: {e}");
                return events
                    .send(SmartEvent::Error {
                        message: e.user_message(),
                    })
                    .await
                    .is_ok();
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Dropping the stream aborts the provider read
                    return true;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(text)) => {
                        if events
                            .send(SmartEvent::AnswerChunk { request_id, text })
                            .await
                            .is_err()
                        {
                            return false;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%request_id, "answer stream failed mid-way: {e}");
                        return events
                            .send(SmartEvent::Error {
                                message: e.user_message(),
                            })
                            .await
                            .is_ok();
                    }
                    None => {
                        return events
                            .send(SmartEvent::AnswerComplete { request_id })
                            .await
                            .is_ok();
                    }
                }
            }
        }
    }

    /// Keep only the tail once the rolling buffer exceeds the cap
    fn trim_buffer(&self, buffer: &mut String) {
        if buffer.len() <= self.buffer_cap {
            return;
        }
        let mut cut = buffer.len() - self.buffer_cap;
        while !buffer.is_char_boundary(cut) {
            cut += 1;
        }
        buffer.drain(..cut);
    }
}
