//! Visual context: one most-recent screenshot per client connection,
//! attached to provider requests when present.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A still image attached to a provider request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64-encoded image payload
    pub base64_data: String,
    /// MIME type, e.g. `image/png`
    pub media_type: String,
}

impl ImageAttachment {
    pub fn new(base64_data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            media_type: media_type.into(),
        }
    }

    pub fn png(base64_data: impl Into<String>) -> Self {
        Self::new(base64_data, "image/png")
    }
}

/// Per-connection registry of the latest screenshot. Updated by the
/// transport whenever a client uploads a capture; forgotten on teardown so
/// stale images never leak into another session.
#[derive(Clone, Default)]
pub struct VisualContextStore {
    inner: Arc<Mutex<HashMap<String, ImageAttachment>>>,
}

impl VisualContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored image for a connection
    pub fn update(&self, connection_id: &str, image: ImageAttachment) {
        debug!(connection_id, "visual context updated");
        self.inner.lock().insert(connection_id.to_string(), image);
    }

    /// The most recent image for a connection, if any
    pub fn latest(&self, connection_id: &str) -> Option<ImageAttachment> {
        self.inner.lock().get(connection_id).cloned()
    }

    /// Drop the image associated with a connection
    pub fn forget(&self, connection_id: &str) {
        if self.inner.lock().remove(connection_id).is_some() {
            debug!(connection_id, "visual context cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
