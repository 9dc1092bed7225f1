//! Output schema sent with every analysis request.
//!
//! Field names and enum lists come from [`crate::model`], so the schema the
//! provider sees and the checks [`crate::validate`] applies cannot drift
//! apart.

use crate::model::{ClaimStatus, Reliability, Verdict, CONFIDENCE_MAX, CONFIDENCE_MIN};
use serde_json::{json, Value};

pub const ROOT_FIELDS: [&str; 6] = [
    "verdict",
    "confidence",
    "explanations",
    "claims",
    "sources",
    "risks",
];
pub const EXPLANATION_FIELDS: [&str; 4] = ["id", "icon", "title", "description"];
pub const CLAIM_FIELDS: [&str; 3] = ["id", "text", "status"];
pub const SOURCE_FIELDS: [&str; 4] = ["id", "title", "url", "reliability"];

/// Icon names suggested to the model. Others are allowed through.
pub const SUGGESTED_ICONS: [&str; 4] = ["AlertTriangle", "Search", "Info", "ShieldOff"];

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn closed_string(values: &[&str]) -> Value {
    json!({
        "type": "STRING",
        "format": "enum",
        "enum": values,
        "description": format!("One of: {}", values.join(", ")),
    })
}

/// Build the structured-output schema for an [`crate::AnalysisResult`].
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "verdict": closed_string(&Verdict::VALUES),
            "confidence": {
                "type": "NUMBER",
                "minimum": CONFIDENCE_MIN,
                "maximum": CONFIDENCE_MAX,
                "description": "Confidence score from 0 to 100",
            },
            "explanations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string(),
                        "icon": {
                            "type": "STRING",
                            "description": format!(
                                "Icon name identifier (e.g. {})",
                                SUGGESTED_ICONS.join(", ")
                            ),
                        },
                        "title": string(),
                        "description": string(),
                    },
                    "required": EXPLANATION_FIELDS,
                },
            },
            "claims": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string(),
                        "text": string(),
                        "status": closed_string(&ClaimStatus::VALUES),
                    },
                    "required": CLAIM_FIELDS,
                },
            },
            "sources": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string(),
                        "title": string(),
                        "url": string(),
                        "reliability": closed_string(&Reliability::VALUES),
                    },
                    "required": SOURCE_FIELDS,
                },
            },
            "risks": {
                "type": "ARRAY",
                "items": string(),
            },
        },
        "required": ROOT_FIELDS,
        "propertyOrdering": ROOT_FIELDS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &Value) -> Vec<&str> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect()
    }

    #[test]
    fn every_root_field_is_required_and_described() {
        let schema = analysis_schema();
        assert_eq!(strings(&schema["required"]), ROOT_FIELDS);
        for field in ROOT_FIELDS {
            assert!(schema["properties"].get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn enum_lists_match_the_model() {
        let p = &analysis_schema()["properties"];
        assert_eq!(strings(&p["verdict"]["enum"]), Verdict::VALUES);
        assert_eq!(
            strings(&p["claims"]["items"]["properties"]["status"]["enum"]),
            ClaimStatus::VALUES
        );
        assert_eq!(
            strings(&p["sources"]["items"]["properties"]["reliability"]["enum"]),
            Reliability::VALUES
        );
    }

    #[test]
    fn nested_items_list_their_required_fields() {
        let p = &analysis_schema()["properties"];
        assert_eq!(strings(&p["explanations"]["items"]["required"]), EXPLANATION_FIELDS);
        assert_eq!(strings(&p["claims"]["items"]["required"]), CLAIM_FIELDS);
        assert_eq!(strings(&p["sources"]["items"]["required"]), SOURCE_FIELDS);
        assert_eq!(p["risks"]["items"]["type"], "STRING");
    }

    #[test]
    fn confidence_range_is_declared() {
        let c = &analysis_schema()["properties"]["confidence"];
        assert_eq!(c["type"], "NUMBER");
        assert_eq!(c["minimum"], 0.0);
        assert_eq!(c["maximum"], 100.0);
    }
}
