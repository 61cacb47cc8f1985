//! Intake of structured output from the upstream narrative extraction service.
//!
//! Extraction never writes facts on its own. It proposes [`CandidateFact`]s;
//! a caseworker confirms each one against at least one provenance record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use dignity_core::types::{ApproachWisdom, ProfileTrait, TraitStatus};
use dignity_core::{Fact, FactBody, FactId, FactKind, FactOrigin, RecipientId};

use crate::error::{Result, SupportError};

/// The fixed JSON shape returned by the extraction service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionResult {
    pub summary: String,
    pub key_issues: Vec<String>,
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
    pub recommended_actions: Vec<String>,
}

impl ExtractionResult {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| SupportError::InvalidInput(format!("malformed extraction result: {e}")))
    }
}

/// A proposed fact awaiting human confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateFact {
    pub id: FactId,
    pub recipient_id: RecipientId,
    pub body: FactBody,
}

impl CandidateFact {
    pub fn kind(&self) -> FactKind {
        self.body.kind()
    }

    /// The fact as it is stored once confirmed.
    pub fn into_fact(self) -> Fact {
        let mut fact = Fact::new(self.recipient_id, FactOrigin::Extraction, self.body);
        fact.id = self.id;
        fact
    }
}

fn trait_body(description: &str, context: &str) -> ProfileTrait {
    ProfileTrait {
        description: description.to_string(),
        context: context.to_string(),
        status: TraitStatus::Current,
    }
}

/// Turn an extraction result into candidates. Blank and repeated entries are
/// skipped.
pub fn candidates(recipient_id: RecipientId, result: &ExtractionResult) -> Vec<CandidateFact> {
    let context = result.summary.trim();
    let groups: [(&[String], fn(&str, &str) -> FactBody); 4] = [
        (result.strengths.as_slice(), |d, c| FactBody::Strength(trait_body(d, c))),
        (result.key_issues.as_slice(), |d, c| FactBody::Challenge(trait_body(d, c))),
        (result.risks.as_slice(), |d, c| {
            FactBody::TriggerSituation(ApproachWisdom {
                description: d.to_string(),
                reason: c.to_string(),
                risk_level: None,
                consequence: None,
            })
        }),
        (result.recommended_actions.as_slice(), |d, c| {
            FactBody::SupportGoal(trait_body(d, c))
        }),
    ];

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (items, build) in groups {
        for item in items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let body = build(item, context);
            if seen.insert((body.kind(), item.to_string())) {
                out.push(CandidateFact {
                    id: FactId::new(),
                    recipient_id,
                    body,
                });
            }
        }
    }
    tracing::debug!(
        recipient_id = %recipient_id,
        candidates = out.len(),
        "Extraction candidates prepared"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionResult {
        ExtractionResult::from_json(
            r#"{
                "summary": "定期訪問",
                "key_issues": ["金銭管理が難しい", "  "],
                "strengths": ["料理が得意", "料理が得意"],
                "risks": ["受給日に長男が来訪する"],
                "recommended_actions": ["日常生活自立支援事業の利用を提案"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn each_list_maps_to_its_fact_kind() {
        let rid = RecipientId::new();
        let kinds: Vec<FactKind> = candidates(rid, &sample()).iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FactKind::Strength,
                FactKind::Challenge,
                FactKind::TriggerSituation,
                FactKind::SupportGoal,
            ]
        );
    }

    #[test]
    fn confirmed_candidate_keeps_id_and_extraction_origin() {
        let rid = RecipientId::new();
        let candidate = candidates(rid, &sample()).remove(0);
        let id = candidate.id;
        let fact = candidate.into_fact();
        assert_eq!(fact.id, id);
        assert_eq!(fact.origin, FactOrigin::Extraction);
        assert_eq!(fact.recipient_id, rid);
        assert_eq!(fact.body.headline(), "料理が得意");
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let result = ExtractionResult::from_json(r#"{"summary": "電話連絡のみ"}"#).unwrap();
        assert!(candidates(RecipientId::new(), &result).is_empty());
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = ExtractionResult::from_json("not json").unwrap_err();
        assert!(matches!(err, SupportError::InvalidInput(_)));
    }
}
