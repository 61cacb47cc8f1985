//! Financial safety summary and collaboration history.
//!
//! The summary gathers everything money-related a caseworker should see
//! before a visit. Like the briefing it fails as a whole when any part of it
//! cannot be read.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use dignity_core::{FactBody, FactId, FactKind, RecipientId};
use dignity_graph::{GraphRepository, StoredFact};

use crate::briefing::{by_recency, by_risk_then_recency, by_severity, dedup, tiered, TieredFact};
use crate::error::{Result, SupportError};
use crate::matcher::{CaseMatcher, PatternMatch};
use crate::reliability::{classify_fact, ReliabilityTier};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Collaborations shown in the financial safety summary.
pub const RECENT_COLLABORATIONS: usize = 3;

/// One multi-agency contact, flattened for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationEntry {
    pub fact_id: FactId,
    pub tier: ReliabilityTier,
    pub date: NaiveDate,
    pub collaboration_type: String,
    pub participants: Vec<String>,
    pub organizations: Vec<String>,
    pub decisions: Vec<String>,
    pub next_actions: Vec<String>,
}

impl CollaborationEntry {
    fn from_stored(stored: StoredFact) -> Option<Self> {
        let tier = classify_fact(&stored);
        match stored.fact.body {
            FactBody::CollaborationRecord(c) => Some(Self {
                fact_id: stored.fact.id,
                tier,
                date: c.date,
                collaboration_type: c.collaboration_type,
                participants: c.participants,
                organizations: c.organizations,
                decisions: c.decisions,
                next_actions: c.next_actions,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSafetySummary {
    pub recipient_id: RecipientId,
    pub recipient_name: String,
    pub generated_at: DateTime<Utc>,
    pub money_management: Vec<TieredFact>,
    /// Active economic risks, most severe first.
    pub active_risks: Vec<TieredFact>,
    pub daily_life_support: Vec<TieredFact>,
    pub matched_patterns: Vec<PatternMatch>,
    pub recent_collaborations: Vec<CollaborationEntry>,
}

pub struct FinancialSafetyReader {
    repo: Arc<dyn GraphRepository>,
    matcher: CaseMatcher,
}

impl FinancialSafetyReader {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self {
            matcher: CaseMatcher::new(repo.clone()),
            repo,
        }
    }

    async fn fetch(&self, recipient_id: RecipientId, kind: FactKind) -> Result<Vec<StoredFact>> {
        Ok(self.repo.get_facts(recipient_id, &[kind]).await?)
    }

    /// Collaboration records, latest meeting first.
    pub async fn collaboration_history(
        &self,
        recipient_id: RecipientId,
        limit: Option<usize>,
    ) -> Result<Vec<CollaborationEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let records = self
            .repo
            .get_collaboration_history(recipient_id, limit)
            .await?;
        Ok(entries(records))
    }

    pub async fn summary(&self, recipient_id: RecipientId) -> Result<FinancialSafetySummary> {
        let recipient = self.repo.get_recipient(recipient_id).await?;

        let fetched = tokio::try_join!(
            self.fetch(recipient_id, FactKind::MoneyManagementStatus),
            async {
                self.repo
                    .get_active_risks(recipient_id)
                    .await
                    .map_err(SupportError::from)
            },
            self.fetch(recipient_id, FactKind::DailyLifeSupportService),
            self.matcher.similar_cases(recipient_id, None),
            self.collaboration_history(recipient_id, Some(RECENT_COLLABORATIONS)),
        );
        let (money, risks, daily_life, patterns, collaborations) = match fetched {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    error = %e,
                    "Financial safety summary aborted: a required part could not be read"
                );
                return Err(e);
            }
        };

        tracing::info!(
            recipient_id = %recipient_id,
            active_risks = risks.len(),
            patterns = patterns.len(),
            "Financial safety summary assembled"
        );
        Ok(FinancialSafetySummary {
            recipient_id,
            recipient_name: recipient.name,
            generated_at: Utc::now(),
            money_management: tiered(dedup(by_risk_then_recency(money))),
            active_risks: tiered(dedup(by_severity(risks))),
            daily_life_support: tiered(dedup(by_recency(daily_life))),
            matched_patterns: patterns,
            recent_collaborations: collaborations,
        })
    }
}

fn entries(records: Vec<StoredFact>) -> Vec<CollaborationEntry> {
    records
        .into_iter()
        .filter_map(CollaborationEntry::from_stored)
        .collect()
}
