//! Request orchestration
//!
//! Turns a logical model identifier plus caller intent into a provider
//! call: capture guard, archival check, model resolution, prompt assembly,
//! then a single-shot or streamed response. Also hosts the best-effort
//! question detector used by the smart-mode loop.

use crate::config::EngineConfig;
use crate::latency::LatencyMonitor;
use crate::llm::{ChatMessage, PromptBuilder, ProviderRegistry, RequestKind, TokenStream};
use crate::speech::TranscriptionCoordinator;
use crate::transcript::{ArchivalPolicy, Message, TranscriptStore};
use crate::vision::ImageAttachment;
use crate::Result;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Stable status string returned for provider-backed actions attempted
/// before audio capture has started
pub const NOT_RUNNING_STATUS: &str = "Audio capture is not running.";

const DETECTOR_PROMPT: &str = "You are a semantic detector. Your task is to analyze the \
    user's speech buffer together with the recent conversation context. Check if the buffer \
    contains a COMPLETE, addressed question that requires an answer. If a distinct question \
    is present, extract and output ONLY the question text. If the text is incomplete, just \
    conversational filler, or does not contain a question, output 'NO'.";

/// Result of a one-shot request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Capture is off; carries no provider output
    NotRunning,
    /// The provider's response text (possibly empty)
    Answer(String),
}

impl Outcome {
    /// Collapse to the text a client should see
    pub fn into_text(self) -> String {
        match self {
            Outcome::NotRunning => NOT_RUNNING_STATUS.to_string(),
            Outcome::Answer(text) => text,
        }
    }
}

pub struct Orchestrator {
    registry: ProviderRegistry,
    prompts: Arc<dyn PromptBuilder>,
    archival: ArchivalPolicy,
    coordinator: Arc<TranscriptionCoordinator>,
    store: TranscriptStore,
    latency: LatencyMonitor,
    detect_min_chars: usize,
    history_limit: usize,
    history_max_age: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: ProviderRegistry,
        prompts: Arc<dyn PromptBuilder>,
        archival: ArchivalPolicy,
        coordinator: Arc<TranscriptionCoordinator>,
        store: TranscriptStore,
        latency: LatencyMonitor,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            prompts,
            archival,
            coordinator,
            store,
            latency,
            detect_min_chars: config.detect_min_chars,
            history_limit: config.history_limit,
            history_max_age: config.history_max_age,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn latency(&self) -> &LatencyMonitor {
        &self.latency
    }

    /// One-shot request with an explicit instruction
    pub async fn process_request(
        &self,
        model: &str,
        instruction: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Outcome> {
        self.run_single_shot(
            model,
            RequestKind::Message {
                instruction: instruction.to_string(),
            },
            image,
        )
        .await
    }

    /// One-shot request suggesting the next reply for the local user
    pub async fn process_assist(
        &self,
        model: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Outcome> {
        self.run_single_shot(model, RequestKind::Assist, image).await
    }

    /// One-shot request proposing a follow-up question
    pub async fn process_followup(
        &self,
        model: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Outcome> {
        self.run_single_shot(model, RequestKind::Followup, image).await
    }

    async fn run_single_shot(
        &self,
        model: &str,
        kind: RequestKind,
        image: Option<&ImageAttachment>,
    ) -> Result<Outcome> {
        let (provider, id) = self.registry.resolve(model)?;
        if !self.coordinator.is_running() {
            return Ok(Outcome::NotRunning);
        }

        self.archival.check_and_archive().await;

        let messages = self
            .prompts
            .build_request(&kind, &self.store.formatted_log(), image.is_some());

        info!(model = %id, "generating response");
        let started = Instant::now();
        let response = provider.generate(&messages, &id.variant, image).await?;
        self.latency.record(started.elapsed().as_millis() as u64);

        Ok(Outcome::Answer(response))
    }

    /// Streamed request. An unknown model fails before any stream exists;
    /// with capture off the stream carries the single status chunk.
    /// Dropping the returned stream aborts the provider read.
    pub async fn stream_request(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<TokenStream> {
        let (provider, id) = self.registry.resolve(model)?;
        if !self.coordinator.is_running() {
            let status = async_stream::stream! {
                yield Ok::<_, crate::KibitzError>(NOT_RUNNING_STATUS.to_string());
            };
            return Ok(Box::pin(status));
        }

        let messages = vec![
            ChatMessage::system(self.prompts.system_prompt()),
            ChatMessage::user(prompt),
        ];

        info!(model = %id, "starting response stream");
        provider.stream(&messages, &id.variant, image).await
    }

    /// Best-effort question detection over the buffered companion speech.
    /// Never fails: trivial input, resolution failures, and provider errors
    /// all collapse to `None`. False negatives are safe here; the loop will
    /// look again with a fuller buffer.
    pub async fn detect_question(&self, model: &str, transcript_buffer: &str) -> Option<String> {
        let buffer = transcript_buffer.trim();
        if buffer.len() < self.detect_min_chars {
            return None;
        }

        let (provider, id) = match self.registry.resolve(model) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("question detection skipped: {e}");
                return None;
            }
        };

        let history = self
            .store
            .recent_messages(self.history_limit, self.history_max_age);
        let messages = build_detection_messages(&history, buffer);

        match provider.generate(&messages, &id.variant, None).await {
            Ok(reply) => interpret_detection_reply(&reply),
            Err(e) => {
                debug!("question detection failed: {e}");
                None
            }
        }
    }
}

fn build_detection_messages(history: &[Message], buffer: &str) -> Vec<ChatMessage> {
    let mut user = String::new();
    if !history.is_empty() {
        let _ = writeln!(user, "--- RECENT CONVERSATION ---");
        for message in history {
            let _ = writeln!(
                user,
                "[{} {}]: {}",
                message.speaker.label(),
                message.timestamp.format("%H:%M:%S"),
                message.text
            );
        }
    }
    let _ = writeln!(user, "--- CURRENT SPEECH BUFFER ---");
    let _ = write!(user, "{buffer}");

    vec![ChatMessage::system(DETECTOR_PROMPT), ChatMessage::user(user)]
}

fn interpret_detection_reply(reply: &str) -> Option<String> {
    let reply = reply.trim();
    if reply.is_empty() || reply.eq_ignore_ascii_case("NO") || reply.contains("NO.") {
        return None;
    }
    Some(reply.to_string())
}
