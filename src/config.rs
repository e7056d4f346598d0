//! Engine configuration
//!
//! Every timing, threshold, and cap the engine uses lives here as a named
//! field so tests can tune them instead of patching magic numbers.

use std::time::Duration;

/// Configuration for the conversation engine
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Window within which consecutive fragments from the same speaker are
    /// merged into one transcript message
    pub merge_window: Duration,

    /// Message count at which older history is summarized and compacted
    pub archive_threshold: usize,

    /// Messages retained after a compaction
    pub keep_recent: usize,

    /// Minimum buffered length before question detection is attempted
    pub detect_min_chars: usize,

    /// Number of recent messages included in the detection prompt
    pub history_limit: usize,

    /// Maximum age of messages included in the detection prompt
    pub history_max_age: Duration,

    /// Poll interval of the smart-mode loop
    pub smart_tick: Duration,

    /// Cap on the smart-mode rolling buffer; only the tail is kept
    pub smart_buffer_cap: usize,

    /// Grace period granted to a streamer when stopping a session
    pub stop_grace: Duration,

    /// Bound of the per-channel audio frame queue
    pub audio_queue_size: usize,

    /// Bound of the smart-mode event channel
    pub event_queue_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            merge_window: Duration::from_secs(5),
            archive_threshold: 30,
            keep_recent: 10,
            detect_min_chars: 10,
            history_limit: 6,
            history_max_age: Duration::from_secs(15 * 60),
            smart_tick: Duration::from_millis(300),
            smart_buffer_cap: 4000,
            stop_grace: Duration::from_secs(2),
            audio_queue_size: 256,
            event_queue_size: 64,
        }
    }
}

impl EngineConfig {
    /// Set the turn-merge window
    pub fn with_merge_window(mut self, window: Duration) -> Self {
        self.merge_window = window;
        self
    }

    /// Set the archival threshold and post-compaction keep count
    pub fn with_archival(mut self, threshold: usize, keep_recent: usize) -> Self {
        self.archive_threshold = threshold;
        self.keep_recent = keep_recent;
        self
    }

    /// Set the smart-mode poll interval
    pub fn with_smart_tick(mut self, tick: Duration) -> Self {
        self.smart_tick = tick;
        self
    }

    /// Set the smart-mode rolling buffer cap
    pub fn with_smart_buffer_cap(mut self, cap: usize) -> Self {
        self.smart_buffer_cap = cap;
        self
    }

    /// Set the minimum buffered length for detection
    pub fn with_detect_min_chars(mut self, min_chars: usize) -> Self {
        self.detect_min_chars = min_chars;
        self
    }

    /// Set the graceful-stop timeout for audio sessions
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}
