use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed two-channel speaker model: the local user and the remote
/// counterpart being listened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Me,
    Companion,
}

impl Speaker {
    /// Label used in formatted transcripts
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Me => "Me",
            Speaker::Companion => "Companion",
        }
    }

    /// Both roles, in the order channels are brought up
    pub fn both() -> [Speaker; 2] {
        [Speaker::Me, Speaker::Companion]
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One transcript entry. Text is appended in place when consecutive
/// fragments from the same speaker merge into a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub speaker: Speaker,
    pub text: String,
}

impl Message {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            speaker,
            text: text.into(),
        }
    }
}

/// A compacted block of older messages. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedSummary {
    pub archived_at: DateTime<Utc>,
    pub text: String,
}

impl ArchivedSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            archived_at: Utc::now(),
            text: text.into(),
        }
    }
}
