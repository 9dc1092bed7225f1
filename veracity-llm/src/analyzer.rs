use crate::model::AnalysisResult;
use crate::prompts::build_contents;
use crate::schema::analysis_schema;
use crate::traits::{GenerateConfig, GenerateRequest, StructuredProvider};
use crate::validate::parse_payload;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use veracity_common::{Result, VeracityError};

/// A message ready for analysis: trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    /// Trim `text`; blank input is refused before anything is sent.
    pub fn new(text: impl AsRef<str>) -> Result<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(VeracityError::EmptyInput);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs one analysis per call against a [`StructuredProvider`].
///
/// Holds only immutable state, so one analyzer can serve overlapping calls;
/// each call produces its own result.
#[derive(Clone)]
pub struct Analyzer {
    provider: Arc<dyn StructuredProvider>,
    schema: Arc<JsonValue>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("model", &self.provider.model_name())
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new(provider: Arc<dyn StructuredProvider>) -> Self {
        Self {
            provider,
            schema: Arc::new(analysis_schema()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// The request that [`analyze`](Self::analyze) would send for `message`.
    pub fn build_request(&self, message: &Message) -> GenerateRequest {
        GenerateRequest {
            model: self.provider.model_name().to_string(),
            contents: build_contents(message.as_str()),
            config: GenerateConfig::json(self.schema.as_ref().clone()),
        }
    }

    /// Analyze `message` with exactly one provider call.
    ///
    /// Fails with `Provider` on transport/provider errors and with
    /// `MalformedResponse` when the reply breaks the result contract.
    pub async fn analyze(&self, message: &Message) -> Result<AnalysisResult> {
        let started = Instant::now();
        let request = self.build_request(message);

        tracing::info!(
            model = %request.model,
            message_chars = message.as_str().chars().count(),
            "analysis.start"
        );
        tracing::debug!(message = %message, "analysis.message");

        let outcome = match self.provider.generate_structured(&request).await {
            Ok(payload) => parse_payload(&payload),
            Err(e) => Err(e),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => tracing::info!(
                verdict = %result.verdict(),
                confidence = result.confidence(),
                claims = result.claims().len(),
                sources = result.sources().len(),
                elapsed_ms,
                "analysis.complete"
            ),
            Err(e) => tracing::warn!(error = %e, elapsed_ms, "analysis.failed"),
        }
        outcome
    }

    /// Like [`analyze`](Self::analyze), but gives up as soon as `cancel` fires.
    ///
    /// The in-flight request future is dropped, which aborts the HTTP call.
    /// Other calls sharing this analyzer are unaffected.
    pub async fn analyze_cancellable(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("analysis.cancelled");
                Err(VeracityError::Cancelled)
            }
            outcome = self.analyze(message) => outcome,
        }
    }

    /// Convenience for callers holding raw text.
    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        let message = Message::new(text)?;
        self.analyze(&message).await
    }
}
