//! Similar-case matching by indicator overlap.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dignity_core::{CasePattern, FactBody, FactKind, RecipientId};
use dignity_graph::{GraphRepository, StoredFact};

use crate::error::Result;

/// A case pattern ranked against a recipient's risk signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternMatch {
    pub pattern_name: String,
    /// Number of pattern indicators present in the recipient's signal set.
    pub overlap: usize,
    pub matched_indicators: Vec<String>,
    pub successful_cases: u32,
    pub recommended_interventions: Vec<String>,
    pub related_services: Vec<String>,
}

/// Risk signals of a recipient: every economic risk type, plus the money
/// pattern tags when money management is flagged as needing support.
pub fn target_signals(facts: &[StoredFact]) -> BTreeSet<String> {
    let mut signals = BTreeSet::new();
    for stored in facts {
        match &stored.fact.body {
            FactBody::EconomicRisk(risk) => {
                signals.insert(risk.risk_type.clone());
            }
            FactBody::MoneyManagementStatus(money) if money.capability.is_at_risk() => {
                signals.extend(money.signal_tags());
            }
            _ => {}
        }
    }
    signals.retain(|s| !s.trim().is_empty());
    signals
}

/// Score and order patterns: overlap desc, successful cases desc, name asc.
/// Patterns with no overlap are dropped.
pub fn rank(
    patterns: Vec<CasePattern>,
    signals: &BTreeSet<String>,
    limit: Option<usize>,
) -> Vec<PatternMatch> {
    let mut matches: Vec<PatternMatch> = patterns
        .into_iter()
        .filter_map(|p| {
            let indicators: BTreeSet<&String> = p.indicators.iter().collect();
            let matched: Vec<String> = indicators
                .into_iter()
                .filter(|i| signals.contains(*i))
                .cloned()
                .collect();
            if matched.is_empty() {
                return None;
            }
            Some(PatternMatch {
                pattern_name: p.pattern_name,
                overlap: matched.len(),
                matched_indicators: matched,
                successful_cases: p.successful_cases,
                recommended_interventions: p.recommended_interventions,
                related_services: p.related_services,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        (Reverse(a.overlap), Reverse(a.successful_cases), &a.pattern_name).cmp(&(
            Reverse(b.overlap),
            Reverse(b.successful_cases),
            &b.pattern_name,
        ))
    });
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    matches
}

/// Ranks stored case patterns for a recipient. Performs no writes.
pub struct CaseMatcher {
    repo: Arc<dyn GraphRepository>,
}

impl CaseMatcher {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo }
    }

    /// Top `limit` matches (all when `None`). No signals yields an empty list.
    pub async fn similar_cases(
        &self,
        recipient_id: RecipientId,
        limit: Option<usize>,
    ) -> Result<Vec<PatternMatch>> {
        let facts = self
            .repo
            .get_facts(
                recipient_id,
                &[FactKind::EconomicRisk, FactKind::MoneyManagementStatus],
            )
            .await?;
        let signals = target_signals(&facts);
        if signals.is_empty() {
            tracing::debug!(recipient_id = %recipient_id, "No risk signals; skipping pattern lookup");
            return Ok(Vec::new());
        }

        let patterns = self.repo.find_patterns(&signals).await?;
        let ranked = rank(patterns, &signals, limit);
        tracing::info!(
            recipient_id = %recipient_id,
            signals = signals.len(),
            matches = ranked.len(),
            "Similar cases ranked"
        );
        Ok(ranked)
    }
}
