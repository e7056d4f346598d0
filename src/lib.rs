pub mod config;
pub mod engine;
pub mod latency;
pub mod llm;
pub mod orchestrator;
pub mod smart;
pub mod speech;
pub mod transcript;
pub mod vision;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum KibitzError {
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("session start failed: {0}")]
    SessionStart(String),

    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error("stream aborted: {0}")]
    StreamAbort(String),

    #[error("channel error: {0}")]
    Channel(String),
}

impl KibitzError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A bad model name needs a corrected request, not a retry
            KibitzError::ModelNotFound(_) => false,
            // Capture can be restarted explicitly
            KibitzError::SessionStart(_) => true,
            // Provider/summarizer/speech-service hiccups are typically transient
            KibitzError::Upstream(_) => true,
            KibitzError::StreamAbort(_) => true,
            KibitzError::Channel(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            KibitzError::ModelNotFound(model) => {
                format!("Model '{}' is not available.", model)
            }
            KibitzError::SessionStart(_) => {
                "Could not start audio capture. Please try again.".to_string()
            }
            KibitzError::Upstream(_) => {
                "The AI service did not respond. Please try again.".to_string()
            }
            KibitzError::StreamAbort(_) => {
                "The response stream was interrupted.".to_string()
            }
            KibitzError::Channel(_) => {
                "Internal communication error. Please restart the session.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, KibitzError>;
