//! Scripted collaborators shared by the integration suite

#![allow(dead_code)]

use async_trait::async_trait;
use kibitz::config::EngineConfig;
use kibitz::engine::Engine;
use kibitz::llm::{ChatMessage, PersonaPromptBuilder, Provider, Summarizer, TokenStream};
use kibitz::speech::{RecognitionParams, SessionEvent, SpeechService, SpeechSession};
use kibitz::vision::ImageAttachment;
use kibitz::{KibitzError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Test handle onto one mock recognition session
#[derive(Clone)]
pub struct SessionHandle {
    pub events: mpsc::Sender<SessionEvent>,
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
    pub stopped: Arc<AtomicBool>,
}

impl SessionHandle {
    pub async fn transcript(&self, text: &str) {
        self.events
            .send(SessionEvent::Transcript(text.to_string()))
            .await
            .expect("session receiver alive");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct MockSession {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    stopped: Arc<AtomicBool>,
}

#[async_trait]
impl SpeechSession for MockSession {
    fn send_audio(&self, frame: &[u8]) -> Result<()> {
        self.frames.lock().push(frame.to_vec());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one session per connect call, in call order. The coordinator
/// brings channels up in `Speaker::both()` order, so handle 0 is `Me` and
/// handle 1 is `Companion`.
#[derive(Default)]
pub struct MockSpeechService {
    state: Mutex<ServiceState>,
}

#[derive(Default)]
struct ServiceState {
    handles: Vec<SessionHandle>,
    fail_at: Option<usize>,
    connects: usize,
}

impl MockSpeechService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse the `index`-th connect attempt (0-based)
    pub fn failing_at(index: usize) -> Arc<Self> {
        let service = Arc::new(Self::default());
        service.state.lock().fail_at = Some(index);
        service
    }

    pub fn me(&self) -> SessionHandle {
        self.handle(0)
    }

    pub fn companion(&self) -> SessionHandle {
        self.handle(1)
    }

    pub fn handle(&self, index: usize) -> SessionHandle {
        self.state.lock().handles[index].clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }
}

#[async_trait]
impl SpeechService for MockSpeechService {
    async fn connect(
        &self,
        _params: RecognitionParams,
    ) -> Result<(Box<dyn SpeechSession>, mpsc::Receiver<SessionEvent>)> {
        let mut state = self.state.lock();
        let index = state.connects;
        state.connects += 1;
        if state.fail_at == Some(index) {
            return Err(KibitzError::Upstream("connect refused".into()));
        }

        let (tx, rx) = mpsc::channel(32);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let stopped = Arc::new(AtomicBool::new(false));
        state.handles.push(SessionHandle {
            events: tx,
            frames: Arc::clone(&frames),
            stopped: Arc::clone(&stopped),
        });
        Ok((Box::new(MockSession { frames, stopped }), rx))
    }
}

/// Provider with scripted single-shot replies and stream scripts.
/// Unscripted `generate` calls answer `"NO"`, which keeps an idling
/// detection loop quiet.
pub struct MockProvider {
    name: String,
    replies: Mutex<VecDeque<Result<String>>>,
    streams: Mutex<VecDeque<Vec<Result<String>>>>,
    generate_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_stream_had_image: AtomicBool,
}

impl MockProvider {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            generate_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_stream_had_image: AtomicBool::new(false),
        })
    }

    pub fn push_reply(&self, text: &str) {
        self.replies.lock().push_back(Ok(text.to_string()));
    }

    pub fn push_reply_error(&self) {
        self.replies
            .lock()
            .push_back(Err(KibitzError::Upstream("provider down".into())));
    }

    pub fn push_stream(&self, chunks: &[&str]) {
        self.streams
            .lock()
            .push_back(chunks.iter().map(|c| Ok(c.to_string())).collect());
    }

    pub fn push_stream_error(&self) {
        self.streams
            .lock()
            .push_back(vec![Err(KibitzError::Upstream("stream broke".into()))]);
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }

    pub fn last_stream_had_image(&self) -> bool {
        self.last_stream_had_image.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _variant: &str,
        _image: Option<&ImageAttachment>,
    ) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = messages.last().map(|m| m.content.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("NO".to_string()))
    }

    async fn stream(
        &self,
        _messages: &[ChatMessage],
        _variant: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.last_stream_had_image.store(image.is_some(), Ordering::SeqCst);
        let chunks = self.streams.lock().pop_front().unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Summarizer with a settable reply; empty by default
#[derive(Default)]
pub struct MockSummarizer {
    reply: Mutex<String>,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reply(&self, text: &str) {
        *self.reply.lock() = text.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.lock().clone())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub speech: Arc<MockSpeechService>,
    pub provider: Arc<MockProvider>,
    pub summarizer: Arc<MockSummarizer>,
}

/// Initialize test logging once; respects `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build an engine wired to fresh mocks. The provider registers as
/// `"mock"`, so requests address it as `"mock <variant>"`.
pub fn harness(config: EngineConfig) -> Harness {
    init_tracing();
    let speech = MockSpeechService::new();
    let provider = MockProvider::named("mock");
    let summarizer = MockSummarizer::new();

    let providers: Vec<Arc<dyn Provider>> = vec![provider.clone()];
    let engine = Engine::new(
        config,
        speech.clone(),
        summarizer.clone(),
        Arc::new(PersonaPromptBuilder::new(
            "You are a live meeting assistant.",
            "Software engineer, prefers concise answers.",
        )),
        providers,
    );

    Harness {
        engine,
        speech,
        provider,
        summarizer,
    }
}

/// Config tuned for fast test ticks
pub fn fast_config() -> EngineConfig {
    EngineConfig::default()
        .with_smart_tick(std::time::Duration::from_millis(10))
        .with_stop_grace(std::time::Duration::from_millis(100))
}

/// Give spawned tasks a moment to propagate events
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
}
