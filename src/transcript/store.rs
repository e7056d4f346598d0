//! The authoritative, thread-safe record of the conversation
//!
//! Speech-to-text engines emit many short finalized fragments per utterance;
//! the store merges consecutive fragments from one speaker into a single
//! turn while the speaker keeps talking, and starts a new entry once they
//! pause or the turn changes.

use super::types::{ArchivedSummary, Message, Speaker};
use chrono::Utc;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct State {
    messages: Vec<Message>,
    archives: Vec<ArchivedSummary>,
}

/// Shared transcript store. Cloning yields another handle to the same
/// underlying state. All operations take a single coarse lock; none of
/// them performs I/O while holding it.
#[derive(Clone)]
pub struct TranscriptStore {
    state: Arc<Mutex<State>>,
    merge_window: chrono::Duration,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::with_merge_window(Duration::from_secs(5))
    }

    /// Create a store with a custom turn-merge window
    pub fn with_merge_window(window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            merge_window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::seconds(5)),
        }
    }

    /// Append transcribed text for a speaker, merging into the previous
    /// message when it is the same speaker within the merge window.
    /// Empty or whitespace-only text is ignored.
    pub fn add_message(&self, speaker: Speaker, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let now = Utc::now();
        let mut state = self.state.lock();

        match state.messages.last_mut() {
            Some(last) if last.speaker == speaker && now - last.timestamp < self.merge_window => {
                last.text.push(' ');
                last.text.push_str(text);
                last.timestamp = now;
            }
            _ => {
                state.messages.push(Message {
                    timestamp: now,
                    speaker,
                    text: text.to_string(),
                });
            }
        }
    }

    /// Snapshot of the retained messages
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// Snapshot of the archived summaries
    pub fn archives(&self) -> Vec<ArchivedSummary> {
        self.state.lock().archives.clone()
    }

    /// The last `limit` messages no older than `max_age`, in insertion order
    pub fn recent_messages(&self, limit: usize, max_age: Duration) -> Vec<Message> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::minutes(15));
        let state = self.state.lock();
        let recent: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.timestamp >= cutoff)
            .cloned()
            .collect();
        let skip = recent.len().saturating_sub(limit);
        recent.into_iter().skip(skip).collect()
    }

    /// Render archives (oldest first) followed by retained messages as the
    /// canonical text blob handed to prompt assembly.
    pub fn formatted_log(&self) -> String {
        let state = self.state.lock();
        let mut log = String::new();

        for archive in &state.archives {
            let _ = writeln!(
                log,
                "[ARCHIVE {}]: {}",
                archive.archived_at.format("%H:%M:%S"),
                archive.text
            );
        }

        for message in &state.messages {
            let _ = writeln!(
                log,
                "[{} {}]: {}",
                message.speaker.label(),
                message.timestamp.format("%H:%M:%S"),
                message.text
            );
        }

        log
    }

    /// Append an archived summary stamped with the current time.
    /// Empty or whitespace-only summaries are ignored.
    pub fn archive_context(&self, summary: &str) {
        if summary.trim().is_empty() {
            return;
        }
        self.state.lock().archives.push(ArchivedSummary {
            archived_at: Utc::now(),
            text: summary.to_string(),
        });
    }

    /// Drop all but the most recent `keep` messages
    pub fn compact_history(&self, keep: usize) {
        let mut state = self.state.lock();
        let len = state.messages.len();
        if len > keep {
            state.messages.drain(..len - keep);
        }
    }

    /// Archive `summary` and compact to `keep` messages in one lock scope,
    /// but only if the store still holds at least `threshold` messages.
    /// Returns whether the archive was applied. Two concurrent archival
    /// checks can both observe an over-threshold store; the recheck here
    /// makes exactly one of them win.
    pub fn archive_and_compact(&self, summary: &str, keep: usize, threshold: usize) -> bool {
        if summary.trim().is_empty() {
            return false;
        }

        let mut state = self.state.lock();
        let len = state.messages.len();
        if len < threshold {
            return false;
        }

        state.archives.push(ArchivedSummary {
            archived_at: Utc::now(),
            text: summary.to_string(),
        });
        if len > keep {
            state.messages.drain(..len - keep);
        }
        true
    }

    /// Empty both the retained messages and the archives
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.messages.clear();
        state.archives.clear();
    }

    /// Number of retained messages
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}
