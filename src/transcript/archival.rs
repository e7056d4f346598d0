//! Archival policy: bound unbounded growth of the context handed to the
//! language model
//!
//! Runs synchronously before every orchestrated request. Below the
//! threshold it is a cheap count check; above it, everything but the most
//! recent messages is summarized through the external summarizer and the
//! store is compacted.

use super::store::TranscriptStore;
use super::types::Message;
use crate::config::EngineConfig;
use crate::llm::Summarizer;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ArchivalPolicy {
    store: TranscriptStore,
    summarizer: Arc<dyn Summarizer>,
    threshold: usize,
    keep_recent: usize,
}

impl ArchivalPolicy {
    pub fn new(store: TranscriptStore, summarizer: Arc<dyn Summarizer>, config: &EngineConfig) -> Self {
        Self {
            store,
            summarizer,
            threshold: config.archive_threshold,
            keep_recent: config.keep_recent,
        }
    }

    /// Summarize and compact older history once the store crosses the
    /// threshold. Never fails: an unavailable or empty summary skips the
    /// cycle and leaves every message in place for the next check.
    pub async fn check_and_archive(&self) {
        let messages = self.store.messages();
        if messages.len() < self.threshold {
            return;
        }

        let cut = messages.len() - self.keep_recent;
        let blob = build_summary_blob(&messages[..cut]);

        // No store lock is held across this call.
        let summary = match self.summarizer.summarize(&blob).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("context summarization failed, skipping archival cycle: {e}");
                return;
            }
        };

        if summary.trim().is_empty() {
            debug!("summarizer returned nothing, keeping history as-is");
            return;
        }

        if self
            .store
            .archive_and_compact(&summary, self.keep_recent, self.threshold)
        {
            info!(
                archived = cut,
                retained = self.keep_recent,
                "compacted transcript history"
            );
        } else {
            debug!("another archival check compacted first, discarding summary");
        }
    }
}

fn build_summary_blob(messages: &[Message]) -> String {
    let mut blob = String::from("FULL CONVERSATION LOG FOR SUMMARIZATION:\n");
    for message in messages {
        let _ = writeln!(blob, "[{}]: {}", message.speaker.label(), message.text);
    }
    blob
}
