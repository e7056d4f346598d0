use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Recognition parameters for one live session
#[derive(Debug, Clone)]
pub struct RecognitionParams {
    pub language: String,
    /// Raw PCM encoding label understood by the service
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Punctuation/number formatting on the service side
    pub smart_format: bool,
    /// The engine consumes finalized transcripts only
    pub interim_results: bool,
}

impl RecognitionParams {
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            encoding: "linear16".to_string(),
            sample_rate: 16_000,
            channels: 1,
            smart_format: true,
            interim_results: false,
        }
    }
}

/// Events delivered by a live recognition session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One finalized transcript fragment
    Transcript(String),
    /// The remote side closed the session; no more transcripts will arrive
    Closed { reason: Option<String> },
}

/// One open streaming-recognition session
#[async_trait]
pub trait SpeechSession: Send + Sync {
    /// Forward one binary audio frame. Must not block; frames sent while
    /// the session is closing may be silently dropped.
    fn send_audio(&self, frame: &[u8]) -> Result<()>;

    /// Request graceful termination. Safe to call in any state.
    async fn stop(&self) -> Result<()>;
}

/// The external speech-transcription service boundary
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Open one streaming session. The returned receiver yields finalized
    /// transcripts and closes when the session ends.
    async fn connect(
        &self,
        params: RecognitionParams,
    ) -> Result<(Box<dyn SpeechSession>, mpsc::Receiver<SessionEvent>)>;
}
