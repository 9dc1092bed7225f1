use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use veracity_common::Result;

/// MIME type requesting machine-parseable JSON instead of prose.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Provider-neutral description of one structured-output call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: String,
    pub config: GenerateConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateConfig {
    pub response_mime_type: String,
    pub response_schema: JsonValue,
}

impl GenerateConfig {
    pub fn json(schema: JsonValue) -> Self {
        Self {
            response_mime_type: JSON_MIME_TYPE.to_string(),
            response_schema: schema,
        }
    }
}

/// An inference backend that can answer with schema-constrained output.
#[async_trait]
pub trait StructuredProvider: Send + Sync {
    /// Send one request and return the raw text payload of the reply.
    ///
    /// Implementations make exactly one logical call and report transport or
    /// provider-side failures as [`veracity_common::VeracityError::Provider`].
    /// The payload is returned untouched; validating it is the caller's job.
    async fn generate_structured(&self, request: &GenerateRequest) -> Result<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
