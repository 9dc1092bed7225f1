//! Validation of untrusted provider output into an [`AnalysisResult`].
//!
//! The provider is asked for schema-constrained JSON, but nothing it returns
//! is trusted: every field is checked for presence, structural type, range
//! and closed-set membership before a result is built. Extra fields are
//! ignored. Any violation fails the whole payload with
//! [`VeracityError::MalformedResponse`] naming the offending path.

use crate::model::{
    AnalysisResult, Claim, ClaimStatus, Explanation, Reliability, Source, Verdict, CONFIDENCE_MAX,
    CONFIDENCE_MIN,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use veracity_common::{Result, VeracityError};

fn malformed(msg: String) -> VeracityError {
    VeracityError::MalformedResponse(msg)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object<'a>(v: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    v.as_object()
        .ok_or_else(|| malformed(format!("{path}: expected object, got {}", kind(v))))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    obj.get(key)
        .ok_or_else(|| malformed(format!("{path}: missing required field `{key}`")))
}

fn string_at(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    let v = field(obj, key, path)?;
    v.as_str()
        .map(str::to_owned)
        .ok_or_else(|| malformed(format!("{path}.{key}: expected string, got {}", kind(v))))
}

fn array_at<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Vec<Value>> {
    let v = field(obj, key, path)?;
    v.as_array()
        .ok_or_else(|| malformed(format!("{path}.{key}: expected array, got {}", kind(v))))
}

fn closed_at<T>(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
) -> Result<T> {
    let raw = string_at(obj, key, path)?;
    parse(&raw).ok_or_else(|| {
        malformed(format!(
            "{path}.{key}: {raw:?} is not one of {}",
            allowed.join(", ")
        ))
    })
}

fn confidence_at(obj: &Map<String, Value>, path: &str) -> Result<f64> {
    let v = field(obj, "confidence", path)?;
    let score = v.as_f64().ok_or_else(|| {
        malformed(format!("{path}.confidence: expected number, got {}", kind(v)))
    })?;
    if !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&score) {
        return Err(malformed(format!(
            "{path}.confidence: {score} outside {CONFIDENCE_MIN}..={CONFIDENCE_MAX}"
        )));
    }
    Ok(score)
}

/// Walk a sequence, validating each element and rejecting repeated ids.
fn items<T>(
    root: &Map<String, Value>,
    key: &str,
    parse_one: impl Fn(&Map<String, Value>, &str) -> Result<(String, T)>,
) -> Result<Vec<T>> {
    let mut seen = HashSet::new();
    array_at(root, key, "$")?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("$.{key}[{i}]");
            let (id, parsed) = parse_one(as_object(item, &path)?, &path)?;
            if !seen.insert(id.clone()) {
                return Err(malformed(format!("{path}.id: duplicate id {id:?}")));
            }
            Ok(parsed)
        })
        .collect()
}

fn explanation(obj: &Map<String, Value>, path: &str) -> Result<(String, Explanation)> {
    let id = string_at(obj, "id", path)?;
    let card = Explanation::new(
        id.clone(),
        string_at(obj, "icon", path)?,
        string_at(obj, "title", path)?,
        string_at(obj, "description", path)?,
    );
    Ok((id, card))
}

fn claim(obj: &Map<String, Value>, path: &str) -> Result<(String, Claim)> {
    let id = string_at(obj, "id", path)?;
    let text = string_at(obj, "text", path)?;
    let status = closed_at(obj, "status", path, ClaimStatus::parse, &ClaimStatus::VALUES)?;
    Ok((id.clone(), Claim::new(id, text, status)))
}

fn source(obj: &Map<String, Value>, path: &str) -> Result<(String, Source)> {
    let id = string_at(obj, "id", path)?;
    let title = string_at(obj, "title", path)?;
    let url = string_at(obj, "url", path)?;
    let reliability = closed_at(
        obj,
        "reliability",
        path,
        Reliability::parse,
        &Reliability::VALUES,
    )?;
    Ok((id.clone(), Source::new(id, title, url, reliability)))
}

/// Validate a decoded JSON value into an [`AnalysisResult`].
pub fn validate(raw: &Value) -> Result<AnalysisResult> {
    let root = as_object(raw, "$")?;

    let verdict = closed_at(root, "verdict", "$", Verdict::parse, &Verdict::VALUES)?;
    let confidence = confidence_at(root, "$")?;
    let explanations = items(root, "explanations", explanation)?;
    let claims = items(root, "claims", claim)?;
    let sources = items(root, "sources", source)?;
    let risks = array_at(root, "risks", "$")?
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.as_str().map(str::to_owned).ok_or_else(|| {
                malformed(format!("$.risks[{i}]: expected string, got {}", kind(r)))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AnalysisResult::new(
        verdict,
        confidence,
        explanations,
        claims,
        sources,
        risks,
    ))
}

/// Pull the JSON body out of a ```json fenced block, if the model added one.
fn extract_json_block(text: &str) -> Option<&str> {
    let re_fence = Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").ok()?;
    re_fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Decode the provider's text payload and validate it.
pub fn parse_payload(text: &str) -> Result<AnalysisResult> {
    let body = extract_json_block(text).unwrap_or(text).trim();
    if body.is_empty() {
        return Err(malformed("empty payload".into()));
    }
    let value: Value = serde_json::from_str(body).map_err(|e| {
        malformed(format!(
            "payload is not valid JSON (line {}, column {}): {e}",
            e.line(),
            e.column()
        ))
    })?;
    validate(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "verdict": "FAKE",
            "confidence": 92,
            "explanations": [
                {"id": "e1", "icon": "AlertTriangle", "title": "Urgency", "description": "Pushes to share now."},
                {"id": "e2", "icon": "Sparkles", "title": "Unverified", "description": "No NASA bulletin."}
            ],
            "claims": [
                {"id": "1", "text": "NASA confirmed a solar flare tomorrow", "status": "False"}
            ],
            "sources": [
                {"id": "s1", "title": "NASA Space Weather", "url": "https://www.nasa.gov", "reliability": "Trusted"}
            ],
            "risks": ["Urgency framing", "Chain-forward pattern"]
        })
    }

    fn expect_malformed(v: &Value, needle: &str) {
        match validate(v) {
            Err(VeracityError::MalformedResponse(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle:?}")
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_becomes_a_result() {
        let r = validate(&sample()).expect("valid");
        assert_eq!(r.verdict(), Verdict::Fake);
        assert_eq!(r.confidence(), 92.0);
        assert_eq!(r.explanations().len(), 2);
        assert_eq!(r.claims()[0].status(), ClaimStatus::False);
        assert_eq!(r.sources()[0].reliability(), Reliability::Trusted);
        assert_eq!(r.risks(), ["Urgency framing", "Chain-forward pattern"]);
    }

    #[test]
    fn unknown_icons_are_kept_verbatim() {
        let r = validate(&sample()).unwrap();
        assert_eq!(r.explanations()[1].icon(), "Sparkles");
    }

    #[test]
    fn order_is_preserved() {
        let r = validate(&sample()).unwrap();
        let ids: Vec<_> = r.explanations().iter().map(|e| e.id()).collect();
        assert_eq!(ids, ["e1", "e2"]);
    }

    #[test]
    fn empty_sequences_are_fine() {
        let mut v = sample();
        for key in ["explanations", "claims", "sources", "risks"] {
            v[key] = json!([]);
        }
        let r = validate(&v).unwrap();
        assert!(r.claims().is_empty() && r.risks().is_empty());
    }

    #[test]
    fn every_missing_root_field_is_rejected() {
        for key in crate::schema::ROOT_FIELDS {
            let mut v = sample();
            v.as_object_mut().unwrap().remove(key);
            expect_malformed(&v, key);
        }
    }

    #[test]
    fn missing_nested_fields_are_rejected() {
        let mut v = sample();
        v["claims"][0].as_object_mut().unwrap().remove("status");
        expect_malformed(&v, "$.claims[0]");

        let mut v = sample();
        v["sources"][0].as_object_mut().unwrap().remove("url");
        expect_malformed(&v, "url");

        let mut v = sample();
        v["explanations"][1].as_object_mut().unwrap().remove("icon");
        expect_malformed(&v, "$.explanations[1]");
    }

    #[test]
    fn null_never_stands_in_for_a_value() {
        let mut v = sample();
        v["verdict"] = Value::Null;
        expect_malformed(&v, "expected string, got null");
    }

    #[test]
    fn confidence_outside_range_is_rejected() {
        for bad in [json!(-0.5), json!(100.01), json!(250)] {
            let mut v = sample();
            v["confidence"] = bad;
            expect_malformed(&v, "confidence");
        }
        let mut v = sample();
        v["confidence"] = json!("92");
        expect_malformed(&v, "expected number");
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        for ok in [0, 100] {
            let mut v = sample();
            v["confidence"] = json!(ok);
            assert!(validate(&v).is_ok());
        }
    }

    #[test]
    fn out_of_set_enums_are_rejected() {
        let mut v = sample();
        v["verdict"] = json!("MAYBE");
        expect_malformed(&v, "MAYBE");

        let mut v = sample();
        v["claims"][0]["status"] = json!("Partly true");
        expect_malformed(&v, "Partly true");

        let mut v = sample();
        v["sources"][0]["reliability"] = json!("trusted");
        expect_malformed(&v, "reliability");
    }

    #[test]
    fn scalars_where_sequences_belong_are_rejected() {
        let mut v = sample();
        v["risks"] = json!("Urgency framing");
        expect_malformed(&v, "$.risks: expected array");

        let mut v = sample();
        v["claims"] = json!({"id": "1"});
        expect_malformed(&v, "expected array, got object");

        let mut v = sample();
        v["risks"] = json!(["ok", 3]);
        expect_malformed(&v, "$.risks[1]");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut v = sample();
        v["explanations"][1]["id"] = json!("e1");
        expect_malformed(&v, "$.explanations[1].id: duplicate id");

        for key in ["claims", "sources"] {
            let mut v = sample();
            let first = v[key][0].clone();
            v[key].as_array_mut().unwrap().push(first);
            expect_malformed(&v, &format!("$.{key}[1].id: duplicate id"));
        }
    }

    #[test]
    fn nested_fields_of_the_wrong_type_are_rejected() {
        let mut v = sample();
        v["claims"][0]["id"] = json!(1);
        expect_malformed(&v, "$.claims[0].id: expected string, got number");

        let mut v = sample();
        v["claims"][0]["text"] = json!(5);
        expect_malformed(&v, "$.claims[0].text: expected string, got number");

        let mut v = sample();
        v["sources"][0]["url"] = json!(["https://www.nasa.gov"]);
        expect_malformed(&v, "$.sources[0].url: expected string, got array");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut v = sample();
        v["model_version"] = json!("2026-01");
        v["claims"][0]["confidence"] = json!(0.3);
        assert!(validate(&v).is_ok());
    }

    #[test]
    fn non_object_root_is_rejected() {
        expect_malformed(&json!([1, 2]), "$: expected object");
    }

    #[test]
    fn payload_may_arrive_fenced() {
        let text = format!("```json\n{}\n```", sample());
        assert_eq!(parse_payload(&text).unwrap().verdict(), Verdict::Fake);
    }

    #[test]
    fn garbage_payloads_are_malformed_not_panics() {
        for text in ["", "   ", "{\"verdict\":", "Sure! Here is the analysis."] {
            assert!(matches!(
                parse_payload(text),
                Err(VeracityError::MalformedResponse(_))
            ));
        }
    }
}
