use crate::Result;
use async_trait::async_trait;

/// External summarizer used by the archival policy to compress older
/// transcript history into a short neutral summary.
///
/// Implementations must tolerate large transcript blobs and must not fail
/// on empty input; the caller treats an empty summary as "skip this
/// archival cycle".
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String>;
}
