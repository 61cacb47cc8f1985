//! The safety-ordered briefing read before contacting a recipient.
//!
//! Section order is fixed: must-avoid approaches, active economic risks,
//! mental health, triggers, effective approaches. Every section is fetched
//! before anything is returned; if any fetch fails the whole briefing fails,
//! so a caller can never receive a briefing that silently lacks a section.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dignity_core::{Fact, FactBody, FactKind, RecipientId, RiskLevel};
use dignity_graph::{GraphRepository, StoredFact};

use crate::error::Result;
use crate::reliability::{classify_fact, ReliabilityTier};

/// A fact together with its reliability tier, computed at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TieredFact {
    pub tier: ReliabilityTier,
    pub fact: Fact,
}

impl TieredFact {
    pub fn headline(&self) -> String {
        self.fact.body.headline()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BriefingSectionKind {
    MustAvoid,
    ActiveEconomicRisk,
    MentalHealth,
    Triggers,
    EffectiveApproaches,
}

impl BriefingSectionKind {
    pub const ORDER: [BriefingSectionKind; 5] = [
        Self::MustAvoid,
        Self::ActiveEconomicRisk,
        Self::MentalHealth,
        Self::Triggers,
        Self::EffectiveApproaches,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::MustAvoid => "避けるべき関わり方（must-avoid approaches）",
            Self::ActiveEconomicRisk => "経済的リスク（active economic risk）",
            Self::MentalHealth => "精神疾患の状況（mental health）",
            Self::Triggers => "注意が必要な状況（trigger situations）",
            Self::EffectiveApproaches => "効果的な関わり方（effective approaches）",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BriefingSection {
    pub kind: BriefingSectionKind,
    pub title: String,
    pub items: Vec<TieredFact>,
}

impl BriefingSection {
    fn new(kind: BriefingSectionKind, items: Vec<TieredFact>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Briefing {
    pub recipient_id: RecipientId,
    pub recipient_name: String,
    pub generated_at: DateTime<Utc>,
    /// Always five sections, in [`BriefingSectionKind::ORDER`].
    pub sections: Vec<BriefingSection>,
}

impl Briefing {
    pub fn section(&self, kind: BriefingSectionKind) -> &[TieredFact] {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }
}

/// Assembles briefings. Performs no writes.
pub struct BriefingEngine {
    repo: Arc<dyn GraphRepository>,
}

impl BriefingEngine {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo }
    }

    pub async fn briefing(&self, recipient_id: RecipientId) -> Result<Briefing> {
        let recipient = self.repo.get_recipient(recipient_id).await?;

        let fetched = tokio::try_join!(
            self.repo.get_facts(recipient_id, &[FactKind::NgApproach]),
            self.repo.get_active_risks(recipient_id),
            self.repo.get_facts(recipient_id, &[FactKind::MentalHealthStatus]),
            self.repo.get_facts(recipient_id, &[FactKind::TriggerSituation]),
            self.repo.get_facts(recipient_id, &[FactKind::EffectiveApproach]),
        );
        let (must_avoid, risks, mental, triggers, effective) = match fetched {
            Ok(sections) => sections,
            Err(e) => {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    error = %e,
                    "Briefing aborted: a required section could not be read"
                );
                return Err(e.into());
            }
        };

        let items = [
            by_risk_then_recency(must_avoid),
            by_severity(risks),
            by_recency(mental),
            by_risk_then_recency(triggers),
            by_recency(effective),
        ];
        let sections = BriefingSectionKind::ORDER
            .into_iter()
            .zip(items)
            .map(|(kind, facts)| BriefingSection::new(kind, tiered(dedup(facts))))
            .collect::<Vec<_>>();

        tracing::info!(
            recipient_id = %recipient_id,
            must_avoid = sections[0].items.len(),
            active_risks = sections[1].items.len(),
            "Briefing assembled"
        );
        Ok(Briefing {
            recipient_id,
            recipient_name: recipient.name,
            generated_at: Utc::now(),
            sections,
        })
    }
}

// ── Ordering helpers (shared with the handover) ─────────────────

fn risk_level(fact: &Fact) -> Option<RiskLevel> {
    match &fact.body {
        FactBody::NgApproach(a)
        | FactBody::EffectiveApproach(a)
        | FactBody::TriggerSituation(a)
        | FactBody::CriticalIncident(a) => a.risk_level,
        FactBody::EconomicRisk(r) => Some(r.severity),
        FactBody::MoneyManagementStatus(m) => Some(m.risk_level),
        _ => None,
    }
}

/// Highest risk level first (unset last), then most recent.
pub(crate) fn by_risk_then_recency(mut facts: Vec<StoredFact>) -> Vec<StoredFact> {
    facts.sort_by_key(|s| (Reverse(risk_level(&s.fact)), Reverse(s.fact.recorded_at)));
    facts
}

/// Highest severity first, then most recent.
pub(crate) fn by_severity(facts: Vec<StoredFact>) -> Vec<StoredFact> {
    by_risk_then_recency(facts)
}

pub(crate) fn by_recency(mut facts: Vec<StoredFact>) -> Vec<StoredFact> {
    facts.sort_by_key(|s| Reverse(s.fact.recorded_at));
    facts
}

/// Drop later facts sharing a (description, reason) key with an earlier one.
pub(crate) fn dedup(facts: Vec<StoredFact>) -> Vec<StoredFact> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|s| seen.insert(s.fact.body.dedup_key()))
        .collect()
}

pub(crate) fn tiered(facts: Vec<StoredFact>) -> Vec<TieredFact> {
    facts
        .into_iter()
        .map(|s| TieredFact {
            tier: classify_fact(&s),
            fact: s.fact,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use dignity_core::{FactOrigin, RiskStatus};
    use dignity_graph::{GraphError, InMemoryRepository};
    use crate::error::SupportError;

    #[tokio::test]
    async fn sections_are_fixed_and_empty_when_absent() {
        let (repo, rid, prov) = recipient_with_record().await;
        repo.append_fact(&ng_fact(rid, "就労を急かす", RiskLevel::High), &[prov])
            .await
            .unwrap();
        repo.append_fact(&effective_fact(rid, "ゆっくり話を聞く"), &[prov])
            .await
            .unwrap();

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        let kinds: Vec<_> = briefing.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, BriefingSectionKind::ORDER.to_vec());

        let must_avoid = briefing.section(BriefingSectionKind::MustAvoid);
        assert_eq!(must_avoid.len(), 1);
        assert_eq!(must_avoid[0].headline(), "就労を急かす");
        assert!(briefing.section(BriefingSectionKind::ActiveEconomicRisk).is_empty());
        assert_eq!(
            briefing.section(BriefingSectionKind::EffectiveApproaches)[0].headline(),
            "ゆっくり話を聞く"
        );
    }

    #[tokio::test]
    async fn must_avoid_sorted_by_risk_then_recency() {
        let (repo, rid, prov) = recipient_with_record().await;
        let mut low = ng_fact(rid, "電話での長話", RiskLevel::Low);
        low.recorded_at = at(2024, 6, 3);
        let mut high_old = ng_fact(rid, "就労を急かす", RiskLevel::High);
        high_old.recorded_at = at(2024, 1, 1);
        let mut high_new = ng_fact(rid, "大声で話す", RiskLevel::High);
        high_new.recorded_at = at(2024, 6, 1);
        for f in [&low, &high_old, &high_new] {
            repo.append_fact(f, &[prov]).await.unwrap();
        }

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        let order: Vec<String> = briefing
            .section(BriefingSectionKind::MustAvoid)
            .iter()
            .map(|t| t.headline())
            .collect();
        assert_eq!(order, vec!["大声で話す", "就労を急かす", "電話での長話"]);
    }

    #[tokio::test]
    async fn duplicates_collapse_to_first_ranked() {
        let (repo, rid, prov) = recipient_with_record().await;
        let mut older = ng_fact(rid, "就労を急かす", RiskLevel::High);
        older.recorded_at = at(2023, 1, 1);
        let newer = ng_fact(rid, "就労を急かす", RiskLevel::High);
        repo.append_fact(&older, &[prov]).await.unwrap();
        repo.append_fact(&newer, &[prov]).await.unwrap();

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        let items = briefing.section(BriefingSectionKind::MustAvoid);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fact.id, newer.id);
    }

    #[tokio::test]
    async fn only_active_risks_appear_by_severity() {
        let (repo, rid, _) = recipient_with_record().await;
        let medium = risk_fact(rid, "浪費", RiskLevel::Medium);
        let high = risk_fact(rid, "金銭搾取", RiskLevel::High);
        let resolved = risk_fact(rid, "詐欺被害", RiskLevel::High);
        for f in [&medium, &high, &resolved] {
            repo.append_fact(f, &[]).await.unwrap();
        }
        repo.transition_status(resolved.id, RiskStatus::Active, RiskStatus::Resolved)
            .await
            .unwrap();

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        let risks: Vec<String> = briefing
            .section(BriefingSectionKind::ActiveEconomicRisk)
            .iter()
            .map(|t| t.headline())
            .collect();
        assert_eq!(risks, vec!["金銭搾取", "浪費"]);
    }

    #[tokio::test]
    async fn same_type_risks_from_different_perpetrators_both_appear() {
        let (repo, rid, _) = recipient_with_record().await;
        let eldest = risk_by(rid, "金銭搾取", "長男", RiskLevel::High);
        let second = risk_by(rid, "金銭搾取", "次男", RiskLevel::Low);
        repo.append_fact(&eldest, &[]).await.unwrap();
        repo.append_fact(&second, &[]).await.unwrap();

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        let ids: Vec<_> = briefing
            .section(BriefingSectionKind::ActiveEconomicRisk)
            .iter()
            .map(|t| t.fact.id)
            .collect();
        assert_eq!(ids, vec![eldest.id, second.id]);
    }

    #[tokio::test]
    async fn items_carry_reliability_tier() {
        let (repo, rid, prov) = recipient_with_record().await;
        let collab = Fact::new(
            rid,
            FactOrigin::Collaboration,
            ng_fact(rid, "予告なしの訪問", RiskLevel::Medium).body,
        );
        repo.append_fact(&collab, &[prov]).await.unwrap();

        let briefing = BriefingEngine::new(repo).briefing(rid).await.unwrap();
        assert_eq!(
            briefing.section(BriefingSectionKind::MustAvoid)[0].tier,
            ReliabilityTier::Collaboration
        );
    }

    #[tokio::test]
    async fn any_unavailable_section_fails_the_whole_briefing() {
        for kind in [
            FactKind::NgApproach,
            FactKind::EconomicRisk,
            FactKind::MentalHealthStatus,
            FactKind::TriggerSituation,
            FactKind::EffectiveApproach,
        ] {
            let (repo, rid, prov) = recipient_with_record().await;
            repo.append_fact(&ng_fact(rid, "就労を急かす", RiskLevel::High), &[prov])
                .await
                .unwrap();
            repo.fail_kind(kind);

            let result = BriefingEngine::new(repo).briefing(rid).await;
            assert!(
                matches!(result, Err(SupportError::Graph(GraphError::Unavailable(_)))),
                "briefing returned despite {kind:?} being unavailable"
            );
        }
    }

    #[tokio::test]
    async fn unknown_recipient_is_not_found() {
        let repo = Arc::new(InMemoryRepository::new());
        let result = BriefingEngine::new(repo).briefing(RecipientId::new()).await;
        assert!(matches!(
            result,
            Err(SupportError::Graph(GraphError::NotFound { .. }))
        ));
    }
}
