use super::chat::ChatMessage;
use crate::vision::ImageAttachment;
use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A lazily-produced, single-pass sequence of response fragments.
/// Terminated by end-of-stream; a mid-stream provider failure arrives as
/// an `Err` item. Dropping the stream must abort the underlying network
/// read, not merely stop consuming it.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One named language-model vendor. Concrete HTTP clients live outside the
/// engine; the orchestrator only routes to them through this trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name matched exactly during model resolution
    fn name(&self) -> &str;

    /// Single-shot completion
    async fn generate(
        &self,
        messages: &[ChatMessage],
        variant: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String>;

    /// Token-by-token completion
    async fn stream(
        &self,
        messages: &[ChatMessage],
        variant: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<TokenStream>;
}
