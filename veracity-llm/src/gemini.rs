use crate::traits::{GenerateRequest, StructuredProvider};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use veracity_common::{Result, VeracityError};
use veracity_config::ProviderConfig;
use veracity_http::{Auth, HttpClient, HttpError, RequestOpts};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons meaning the provider refused to answer.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a JsonValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client in structured-output mode.
///
/// The API key travels in the `x-goog-api-key` header, never in the URL.
pub struct GeminiClient {
    http: HttpClient,
    api_key: HeaderValue,
    model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.http.base().as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for `model` at `endpoint` (e.g. `.../v1beta`).
    pub fn new(api_key: &str, model: &str, endpoint: &str) -> Result<Self> {
        let base = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let http = HttpClient::new(&base).map_err(|e| {
            VeracityError::Configuration(format!("invalid provider endpoint {endpoint:?}: {e}"))
        })?;
        let mut api_key = HeaderValue::from_str(api_key.trim()).map_err(|_| {
            VeracityError::Configuration(
                "API key contains characters not allowed in a header".into(),
            )
        })?;
        api_key.set_sensitive(true);

        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
        })
    }

    /// Build from provider settings, resolving the credential up front.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let key = config.credential()?;
        let mut client = Self::new(&key, &config.model, &config.endpoint)?;
        if let Some(timeout) = config.timeout() {
            client = client.with_timeout(timeout);
        }
        Ok(client.with_retries(config.retries))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.http = self.http.with_retries(retries);
        self
    }
}

fn http_to_veracity(e: HttpError) -> VeracityError {
    let message = match e.status() {
        Some(StatusCode::TOO_MANY_REQUESTS) => "Gemini rate limit exceeded".to_string(),
        Some(StatusCode::UNAUTHORIZED) => "Gemini rejected the API key".to_string(),
        Some(StatusCode::FORBIDDEN) => "Gemini API access forbidden".to_string(),
        Some(status) => format!("Gemini API error ({status})"),
        None => match &e {
            HttpError::Decode(..) => "Gemini returned an unreadable envelope".to_string(),
            _ => "Gemini request failed".to_string(),
        },
    };
    VeracityError::provider_with_source(message, e)
}

#[async_trait]
impl StructuredProvider for GeminiClient {
    async fn generate_structured(&self, request: &GenerateRequest) -> Result<String> {
        let path = format!("models/{}:generateContent", request.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: &request.contents,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: &request.config.response_mime_type,
                response_schema: &request.config.response_schema,
            },
        };
        let opts = RequestOpts {
            auth: Some(Auth::Header {
                name: HeaderName::from_static(API_KEY_HEADER),
                value: self.api_key.clone(),
            }),
            ..Default::default()
        };

        tracing::debug!(model = %request.model, "gemini.generate");

        let resp: GeminiResponse = self
            .http
            .post_json(&path, &body, opts)
            .await
            .map_err(http_to_veracity)?;

        if let Some(reason) = resp
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(VeracityError::provider(format!(
                "Gemini blocked the prompt: {reason}"
            )));
        }

        let candidate = resp
            .candidates
            .first()
            .ok_or_else(|| VeracityError::provider("No candidates returned from Gemini"))?;

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKED_FINISH_REASONS.contains(&reason) {
                return Err(VeracityError::provider(format!(
                    "Gemini withheld the answer: {reason}"
                )));
            }
        }

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| &c.parts)
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();

        tracing::debug!(
            model_version = ?resp.model_version,
            tokens_used = ?resp.usage_metadata.as_ref().and_then(|u| u.total_token_count),
            finish_reason = ?candidate.finish_reason,
            payload_len = text.len(),
            "gemini.response"
        );

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
