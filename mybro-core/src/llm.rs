//! The seam between the companion and whatever generates text.

use async_trait::async_trait;
use gemini::{Gemini, Request};
use thiserror::Error;
use tracing::debug;

/// Errors from a language model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Gemini(#[from] gemini::Error),

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// Callback that receives reply text as it streams in.
pub type OnDelta<'f> = dyn for<'a> FnMut(&'a str) + Send + 'f;

/// Anything that can turn a request into reply text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: Request) -> Result<String, LlmError>;

    /// Like [`complete`](Self::complete), reporting text as it arrives.
    ///
    /// The default hands the whole reply to `on_delta` at once.
    async fn complete_streaming(
        &self,
        request: Request,
        on_delta: &mut OnDelta<'_>,
    ) -> Result<String, LlmError> {
        let text = self.complete(request).await?;
        on_delta(&text);
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for Gemini {
    async fn complete(&self, request: Request) -> Result<String, LlmError> {
        let response = Gemini::complete(self, request).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish = ?response.finish_reason,
            "Completion finished"
        );
        non_empty(response.text)
    }

    async fn complete_streaming(
        &self,
        request: Request,
        on_delta: &mut OnDelta<'_>,
    ) -> Result<String, LlmError> {
        let response = self.stream_text(request, |delta| on_delta(delta)).await?;
        debug!(
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "Streamed completion finished"
        );
        non_empty(response.text)
    }
}

fn non_empty(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        Err(LlmError::EmptyReply)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(matches!(non_empty("  \n".into()), Err(LlmError::EmptyReply)));
        assert_eq!(non_empty("hi".into()).unwrap(), "hi");
    }

    #[test]
    fn test_error_conversion() {
        let err: LlmError = gemini::Error::NoApiKey.into();
        assert_eq!(err.to_string(), "API key not configured");
    }
}
