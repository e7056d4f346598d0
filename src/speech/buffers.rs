//! Shared text accumulators fed by the transcription callbacks
//!
//! Both are caches, not the source of truth; the transcript store is.
//! Appends and drains copy-then-clear under a single lock acquisition, so
//! an append racing a drain lands wholly before or wholly after it.

use parking_lot::Mutex;
use std::sync::Arc;

/// Space-joined accumulator drained destructively by the smart-mode loop
#[derive(Clone, Default)]
pub struct TextAccumulator {
    inner: Arc<Mutex<String>>,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment; blank fragments are ignored
    pub fn push(&self, fragment: &str) {
        if fragment.trim().is_empty() {
            return;
        }
        let mut buffer = self.inner.lock();
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(fragment);
    }

    /// Destructive read: return the trimmed contents exactly once and
    /// clear the buffer. Empty string when nothing is pending.
    pub fn pop(&self) -> String {
        let mut buffer = self.inner.lock();
        if buffer.is_empty() {
            return String::new();
        }
        let text = buffer.trim().to_string();
        buffer.clear();
        text
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Accumulator scanned for a sentence-terminating `?`
#[derive(Clone, Default)]
pub struct QuestionAccumulator {
    inner: Arc<Mutex<String>>,
}

impl QuestionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment; blank fragments are ignored
    pub fn push(&self, fragment: &str) {
        if fragment.trim().is_empty() {
            return;
        }
        let mut buffer = self.inner.lock();
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(fragment);
    }

    /// If the buffer contains a `?`, return everything up to and including
    /// the first one (trimmed) and clear the buffer; otherwise leave the
    /// buffer intact for future appends.
    pub fn take_complete_question(&self) -> Option<String> {
        let mut buffer = self.inner.lock();
        let index = buffer.find('?')?;
        let question = buffer[..=index].trim().to_string();
        buffer.clear();
        Some(question)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
