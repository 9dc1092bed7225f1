//! The analysis result handed to presentation.
//!
//! Values of these types only come out of [`crate::validate`], so holding an
//! [`AnalysisResult`] means every invariant already holds: confidence within
//! `0..=100`, every enum inside its closed set, ids unique per collection.
//! Fields are read through accessors; nothing mutates a result after it is
//! built.

use serde::Serialize;
use std::fmt;

/// Lowest allowed confidence score.
pub const CONFIDENCE_MIN: f64 = 0.0;
/// Highest allowed confidence score.
pub const CONFIDENCE_MAX: f64 = 100.0;

/// Top-level outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Fake,
    Uncertain,
    Genuine,
}

impl Verdict {
    pub const VALUES: [&'static str; 3] = ["FAKE", "UNCERTAIN", "GENUINE"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fake => "FAKE",
            Verdict::Uncertain => "UNCERTAIN",
            Verdict::Genuine => "GENUINE",
        }
    }

    /// Exact, case-sensitive match against [`Self::VALUES`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FAKE" => Some(Verdict::Fake),
            "UNCERTAIN" => Some(Verdict::Uncertain),
            "GENUINE" => Some(Verdict::Genuine),
            _ => None,
        }
    }
}

/// Truth status of one extracted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClaimStatus {
    True,
    False,
    Misleading,
}

impl ClaimStatus {
    pub const VALUES: [&'static str; 3] = ["True", "False", "Misleading"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::True => "True",
            ClaimStatus::False => "False",
            ClaimStatus::Misleading => "Misleading",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "True" => Some(ClaimStatus::True),
            "False" => Some(ClaimStatus::False),
            "Misleading" => Some(ClaimStatus::Misleading),
            _ => None,
        }
    }
}

/// Trust classification of an evidence source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Reliability {
    Trusted,
    Unknown,
}

impl Reliability {
    pub const VALUES: [&'static str; 2] = ["Trusted", "Unknown"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reliability::Trusted => "Trusted",
            Reliability::Unknown => "Unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Trusted" => Some(Reliability::Trusted),
            "Unknown" => Some(Reliability::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One explanation card.
///
/// `icon` is kept verbatim; mapping it to a glyph (and falling back when the
/// name is unknown) is up to whoever renders the card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    id: String,
    icon: String,
    title: String,
    description: String,
}

impl Explanation {
    pub(crate) fn new(id: String, icon: String, title: String, description: String) -> Self {
        Self {
            id,
            icon,
            title,
            description,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn icon(&self) -> &str {
        &self.icon
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claim {
    id: String,
    text: String,
    status: ClaimStatus,
}

impl Claim {
    pub(crate) fn new(id: String, text: String, status: ClaimStatus) -> Self {
        Self { id, text, status }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn status(&self) -> ClaimStatus {
        self.status
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    id: String,
    title: String,
    url: String,
    reliability: Reliability,
}

impl Source {
    pub(crate) fn new(id: String, title: String, url: String, reliability: Reliability) -> Self {
        Self {
            id,
            title,
            url,
            reliability,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn reliability(&self) -> Reliability {
        self.reliability
    }
}

/// Validated outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    verdict: Verdict,
    confidence: f64,
    explanations: Vec<Explanation>,
    claims: Vec<Claim>,
    sources: Vec<Source>,
    risks: Vec<String>,
}

impl AnalysisResult {
    pub(crate) fn new(
        verdict: Verdict,
        confidence: f64,
        explanations: Vec<Explanation>,
        claims: Vec<Claim>,
        sources: Vec<Source>,
        risks: Vec<String>,
    ) -> Self {
        debug_assert!((CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&confidence));
        Self {
            verdict,
            confidence,
            explanations,
            claims,
            sources,
            risks,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }
    /// Score in `0..=100`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
    pub fn explanations(&self) -> &[Explanation] {
        &self.explanations
    }
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    pub fn risks(&self) -> &[String] {
        &self.risks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_sets_parse_only_their_own_spelling() {
        for raw in Verdict::VALUES {
            assert_eq!(Verdict::parse(raw).map(|v| v.as_str()), Some(raw));
        }
        for raw in ClaimStatus::VALUES {
            assert_eq!(ClaimStatus::parse(raw).map(|v| v.as_str()), Some(raw));
        }
        for raw in Reliability::VALUES {
            assert_eq!(Reliability::parse(raw).map(|v| v.as_str()), Some(raw));
        }

        assert_eq!(Verdict::parse("fake"), None);
        assert_eq!(ClaimStatus::parse("TRUE"), None);
        assert_eq!(Reliability::parse("Untrusted"), None);
    }

    #[test]
    fn serializes_with_wire_spelling() {
        let result = AnalysisResult::new(
            Verdict::Uncertain,
            55.5,
            vec![],
            vec![Claim::new("1".into(), "x".into(), ClaimStatus::Misleading)],
            vec![Source::new(
                "s".into(),
                "t".into(),
                "https://example.org".into(),
                Reliability::Trusted,
            )],
            vec!["urgency".into()],
        );
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["verdict"], "UNCERTAIN");
        assert_eq!(v["claims"][0]["status"], "Misleading");
        assert_eq!(v["sources"][0]["reliability"], "Trusted");
        assert_eq!(v["confidence"], 55.5);
    }
}
