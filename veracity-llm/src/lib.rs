//! Misinformation and scam analysis through a structured-output LLM.
//!
//! This crate owns the contract between Veracity and the inference provider:
//!
//! - [`model`]: the [`AnalysisResult`] handed to presentation
//! - [`schema`]: the output schema sent with every request
//! - [`validate`]: turning untrusted provider output into an [`AnalysisResult`]
//! - [`traits::StructuredProvider`]: the provider seam, with [`gemini::GeminiClient`]
//!   as the concrete implementation
//! - [`analyzer::Analyzer`]: one validated analysis per call
//!
//! # Examples
//! ```no_run
//! use veracity_config::ProviderConfig;
//! use veracity_llm::{build_analyzer, Message};
//!
//! # #[tokio::main]
//! # async fn main() -> veracity_common::Result<()> {
//! let analyzer = build_analyzer(&ProviderConfig::default())?;
//! let result = analyzer
//!     .analyze(&Message::new("NASA confirmed a solar flare will hit tomorrow")?)
//!     .await?;
//! println!("{} ({:.0}%)", result.verdict(), result.confidence());
//! # Ok(())
//! # }
//! ```
pub mod analyzer;
pub mod gemini;
pub mod model;
pub mod prompts;
pub mod schema;
pub mod traits;
pub mod validate;

pub use analyzer::{Analyzer, Message};
pub use model::{AnalysisResult, Claim, ClaimStatus, Explanation, Reliability, Source, Verdict};
pub use validate::{parse_payload, validate};

use gemini::GeminiClient;
use std::sync::Arc;
use veracity_config::{ProviderConfig, ProviderKind};

/// Build an [`Analyzer`] for the configured provider.
///
/// A missing credential or unusable setting fails here with
/// `VeracityError::Configuration`, before any analysis is attempted.
pub fn build_analyzer(config: &ProviderConfig) -> veracity_common::Result<Analyzer> {
    match config.kind {
        ProviderKind::Gemini => {
            let client = GeminiClient::from_config(config)?;
            tracing::info!(model = %config.model, endpoint = %config.endpoint, "analyzer.ready");
            Ok(Analyzer::new(Arc::new(client)))
        }
    }
}
