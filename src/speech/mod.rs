//! Live speech capture: the external recognition-service boundary, the
//! per-role channel streamers, and the dual-channel coordinator that owns
//! them plus the shared text accumulators.

pub mod buffers;
pub mod coordinator;
pub mod service;
pub mod streamer;

pub use buffers::{QuestionAccumulator, TextAccumulator};
pub use coordinator::TranscriptionCoordinator;
pub use service::{RecognitionParams, SessionEvent, SpeechService, SpeechSession};
pub use streamer::{ChannelStreamer, SessionState};
