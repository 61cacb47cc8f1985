//! Caseworker-to-caseworker handover document.
//!
//! Ten sections in a fixed order. Missing data leaves a section empty, it
//! never removes it, so downstream consumers can rely on the shape.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dignity_core::types::TraitStatus;
use dignity_core::{FactBody, FactKind, RecipientId};
use dignity_graph::{GraphRepository, StoredFact};

use crate::briefing::{
    by_recency, by_risk_then_recency, dedup, tiered, BriefingEngine, BriefingSectionKind,
    TieredFact,
};
use crate::error::Result;
use crate::matcher::{CaseMatcher, PatternMatch};

pub const SECTION_TITLES: [&str; 10] = [
    "避けるべき関わり方（must-avoid approaches）",
    "経済的リスク（active economic risk）",
    "精神疾患の状況（mental health）",
    "効果的な関わり方（effective approaches）",
    "本人の強み（strengths）",
    "金銭管理と日常生活自立支援（money management and daily-life support）",
    "連携機関（collaborating organizations）",
    "本人像（derived profile）",
    "現在の支援目標（current support goals）",
    "本人の申告による生活歴（self-reported, unverified）",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandoverSection {
    /// 1-based position.
    pub number: u8,
    pub title: String,
    pub entries: Vec<TieredFact>,
    /// Matching case patterns; only populated for the money-management section.
    #[serde(default)]
    pub related_patterns: Vec<PatternMatch>,
    /// Organizations named by the entries, first mention first. Only
    /// populated for the collaboration section.
    #[serde(default)]
    pub organizations: Vec<String>,
}

/// Section 7 lists collaborating organizations.
const COLLABORATION_SECTION: u8 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandoverDocument {
    pub recipient_id: RecipientId,
    pub recipient_name: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<HandoverSection>,
}

impl HandoverDocument {
    pub fn section(&self, number: u8) -> Option<&HandoverSection> {
        self.sections.iter().find(|s| s.number == number)
    }

    /// Markdown with the reliability tier inline on every entry.
    pub fn render_markdown(&self) -> String {
        let mut lines = vec![
            format!("# 引き継ぎ資料: {}", self.recipient_name),
            String::new(),
            format!(
                "_recipient {} / generated {}_",
                self.recipient_id,
                self.generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
        ];

        for section in &self.sections {
            lines.push(String::new());
            lines.push(format!("## {}. {}", section.number, section.title));
            lines.push(String::new());
            if section.entries.is_empty() {
                lines.push("- （記録なし）".to_string());
            }
            for entry in &section.entries {
                lines.push(entry_line(entry));
            }
            if !section.organizations.is_empty() {
                lines.push(String::new());
                lines.push(format!("関係機関: {}", section.organizations.join("、")));
            }
            if !section.related_patterns.is_empty() {
                lines.push(String::new());
                lines.push("### 類似ケースで有効だった介入".to_string());
                for pattern in &section.related_patterns {
                    lines.push(format!(
                        "- {}（{}件）: {}",
                        pattern.pattern_name,
                        pattern.successful_cases,
                        pattern.recommended_interventions.join("、")
                    ));
                }
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

fn entry_line(entry: &TieredFact) -> String {
    match &entry.fact.body {
        FactBody::CollaborationRecord(c) if !c.organizations.is_empty() => format!(
            "- [{}] {}（{}）",
            entry.tier,
            entry.headline(),
            c.organizations.join("、")
        ),
        _ => format!("- [{}] {}", entry.tier, entry.headline()),
    }
}

/// Distinct organization names across collaboration records and support organizations.
fn organizations(entries: &[TieredFact]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let mentioned: Vec<&String> = match &entry.fact.body {
            FactBody::CollaborationRecord(c) => c.organizations.iter().collect(),
            FactBody::SupportOrganization(o) => vec![&o.name],
            _ => Vec::new(),
        };
        for name in mentioned {
            if !name.trim().is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Composes the handover from the briefing, the case matcher and direct reads.
pub struct HandoverComposer {
    repo: Arc<dyn GraphRepository>,
    briefing: BriefingEngine,
    matcher: CaseMatcher,
}

impl HandoverComposer {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self {
            briefing: BriefingEngine::new(repo.clone()),
            matcher: CaseMatcher::new(repo.clone()),
            repo,
        }
    }

    async fn fetch(&self, recipient_id: RecipientId, kinds: &[FactKind]) -> Result<Vec<StoredFact>> {
        Ok(self.repo.get_facts(recipient_id, kinds).await?)
    }

    pub async fn handover(&self, recipient_id: RecipientId) -> Result<HandoverDocument> {
        let fetched = tokio::try_join!(
            self.briefing.briefing(recipient_id),
            self.fetch(recipient_id, &[FactKind::Strength]),
            self.fetch(
                recipient_id,
                &[FactKind::MoneyManagementStatus, FactKind::DailyLifeSupportService],
            ),
            self.fetch(
                recipient_id,
                &[FactKind::CollaborationRecord, FactKind::SupportOrganization],
            ),
            self.fetch(recipient_id, &[FactKind::Pattern, FactKind::Challenge]),
            self.fetch(recipient_id, &[FactKind::SupportGoal]),
            self.fetch(recipient_id, &[FactKind::DeclaredHistory]),
            self.matcher.similar_cases(recipient_id, None),
        );
        let (briefing, strengths, money, collaboration, profile, goals, history, patterns) =
            match fetched {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!(
                        recipient_id = %recipient_id,
                        error = %e,
                        "Handover aborted: a required section could not be read"
                    );
                    return Err(e);
                }
            };

        let current_goals = goals
            .into_iter()
            .filter(|s| matches!(&s.fact.body, FactBody::SupportGoal(t) if t.status == TraitStatus::Current))
            .collect();

        let from_briefing = |kind| briefing.section(kind).to_vec();
        let entries: [Vec<TieredFact>; 10] = [
            from_briefing(BriefingSectionKind::MustAvoid),
            from_briefing(BriefingSectionKind::ActiveEconomicRisk),
            from_briefing(BriefingSectionKind::MentalHealth),
            from_briefing(BriefingSectionKind::EffectiveApproaches),
            tiered(dedup(by_recency(strengths))),
            tiered(dedup(by_risk_then_recency(money))),
            tiered(dedup(by_recency(collaboration))),
            tiered(dedup(by_recency(profile))),
            tiered(dedup(by_recency(current_goals))),
            tiered(dedup(by_recency(history))),
        ];

        let mut patterns = Some(patterns);
        let sections = SECTION_TITLES
            .into_iter()
            .zip(entries)
            .zip(1u8..)
            .map(|((title, entries), number)| HandoverSection {
                number,
                title: title.to_string(),
                organizations: if number == COLLABORATION_SECTION {
                    organizations(&entries)
                } else {
                    Vec::new()
                },
                entries,
                related_patterns: if number == 6 {
                    patterns.take().unwrap_or_default()
                } else {
                    Vec::new()
                },
            })
            .collect::<Vec<_>>();

        tracing::info!(
            recipient_id = %recipient_id,
            entries = sections.iter().map(|s| s.entries.len()).sum::<usize>(),
            "Handover composed"
        );
        Ok(HandoverDocument {
            recipient_id,
            recipient_name: briefing.recipient_name,
            generated_at: Utc::now(),
            sections,
        })
    }
}
