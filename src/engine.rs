//! Engine facade
//!
//! Wires the store, dual-channel coordinator, orchestrator, and visual
//! context together behind the surface a transport host consumes: capture
//! lifecycle, audio push, one-shot requests, response streams, and
//! smart-mode sessions.

use crate::config::EngineConfig;
use crate::latency::LatencyMonitor;
use crate::llm::{PromptBuilder, Provider, ProviderRegistry, Summarizer, TokenStream};
use crate::orchestrator::{Orchestrator, Outcome};
use crate::smart::{SmartEvent, SmartModeLoop};
use crate::speech::{SpeechService, TranscriptionCoordinator};
use crate::transcript::{ArchivalPolicy, Speaker, TranscriptStore};
use crate::vision::{ImageAttachment, VisualContextStore};
use crate::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Engine {
    config: EngineConfig,
    store: TranscriptStore,
    coordinator: Arc<TranscriptionCoordinator>,
    orchestrator: Arc<Orchestrator>,
    visual: VisualContextStore,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        speech: Arc<dyn SpeechService>,
        summarizer: Arc<dyn Summarizer>,
        prompts: Arc<dyn PromptBuilder>,
        providers: Vec<Arc<dyn Provider>>,
    ) -> Self {
        let store = TranscriptStore::with_merge_window(config.merge_window);
        let coordinator = Arc::new(TranscriptionCoordinator::new(
            speech,
            store.clone(),
            &config,
        ));

        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }

        let orchestrator = Arc::new(Orchestrator::new(
            registry,
            prompts,
            ArchivalPolicy::new(store.clone(), summarizer, &config),
            Arc::clone(&coordinator),
            store.clone(),
            LatencyMonitor::new(),
            &config,
        ));

        Self {
            config,
            store,
            coordinator,
            orchestrator,
            visual: VisualContextStore::new(),
        }
    }

    /// Start dual-channel audio capture
    pub async fn start_capture(&self, language: &str) -> Result<()> {
        self.coordinator.start(language).await
    }

    /// Stop capture and reset the transcript, matching the explicit
    /// stop-capture control action
    pub async fn stop_capture(&self) {
        self.coordinator.stop().await;
        self.coordinator.clear();
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.is_running()
    }

    /// Route one raw PCM frame to a speaker's channel
    pub fn push_audio(&self, role: Speaker, frame: Vec<u8>) {
        self.coordinator.push_audio(role, frame);
    }

    /// One-shot message request
    pub async fn send_message(
        &self,
        model: &str,
        instruction: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<Outcome> {
        self.orchestrator.process_request(model, instruction, image).await
    }

    /// Suggest the next reply for the local user
    pub async fn assist(&self, model: &str, image: Option<&ImageAttachment>) -> Result<Outcome> {
        self.orchestrator.process_assist(model, image).await
    }

    /// Propose a follow-up question
    pub async fn followup(&self, model: &str, image: Option<&ImageAttachment>) -> Result<Outcome> {
        self.orchestrator.process_followup(model, image).await
    }

    /// Streamed response for an explicit prompt
    pub async fn stream_message(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<TokenStream> {
        self.orchestrator.stream_request(model, prompt, image).await
    }

    /// Record the most recent screenshot for a connection
    pub fn attach_visual_context(&self, connection_id: &str, image: ImageAttachment) {
        self.visual.update(connection_id, image);
    }

    /// Forget per-connection state after transport teardown
    pub fn connection_closed(&self, connection_id: &str) {
        self.visual.forget(connection_id);
    }

    /// Spawn a smart-mode session for an attached client. The loop runs
    /// until the returned session is stopped or shut down.
    pub fn start_smart_session(&self, model: &str, connection_id: &str) -> SmartSession {
        let (events_tx, events_rx) = mpsc::channel(self.config.event_queue_size);
        let cancel = CancellationToken::new();

        let smart = SmartModeLoop::new(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.coordinator),
            self.visual.clone(),
            &self.config,
        );
        let task = {
            let model = model.to_string();
            let connection_id = connection_id.to_string();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                smart.run(&model, &connection_id, events_tx, cancel).await;
            })
        };

        info!(connection_id, model, "smart session attached");
        SmartSession {
            connection_id: connection_id.to_string(),
            events: events_rx,
            cancel,
            task,
            visual: self.visual.clone(),
        }
    }

    /// Destructive read of companion speech buffered since the last call.
    /// The smart-mode loop is the primary consumer; a transport polling
    /// this directly competes with any attached smart session.
    pub fn pop_new_text(&self) -> String {
        self.coordinator.pop_new_text()
    }

    /// Take the first complete buffered companion question, if any
    pub fn take_complete_question(&self) -> Option<String> {
        self.coordinator.take_complete_question()
    }

    /// Handle to the shared transcript store
    pub fn transcript(&self) -> &TranscriptStore {
        &self.store
    }

    /// The canonical formatted conversation log
    pub fn formatted_log(&self) -> String {
        self.store.formatted_log()
    }

    /// Names of the registered providers, for the model-list endpoint
    pub fn provider_names(&self) -> Vec<String> {
        self.orchestrator.registry().provider_names()
    }

    /// Rolling average latency of recent one-shot requests
    pub fn average_latency_ms(&self) -> f64 {
        self.orchestrator.latency().average_ms()
    }
}

/// One attached smart-mode client session
pub struct SmartSession {
    connection_id: String,
    events: mpsc::Receiver<SmartEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    visual: VisualContextStore,
}

impl SmartSession {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Next outbound event; `None` once the loop has ended
    pub async fn next_event(&mut self) -> Option<SmartEvent> {
        self.events.recv().await
    }

    /// Signal the loop to stop; events already emitted remain readable
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the loop, wait for it to exit, and clear the connection's
    /// visual context
    pub async fn shutdown(self) {
        let SmartSession {
            connection_id,
            events,
            cancel,
            task,
            visual,
        } = self;

        cancel.cancel();
        // Unblock any in-flight send before joining the loop
        drop(events);
        let _ = task.await;
        visual.forget(&connection_id);
    }
}
