//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use dignity_core::types::{ApproachWisdom, EconomicRisk, ProvenanceKind};
use dignity_core::{
    Fact, FactBody, FactId, FactOrigin, ProvenanceRecord, Recipient, RecipientId, RiskLevel,
    RiskStatus,
};
use dignity_graph::{GraphRepository, InMemoryRepository};

/// A fresh store holding one recipient and one home-visit record.
pub(crate) async fn recipient_with_record() -> (Arc<InMemoryRepository>, RecipientId, FactId) {
    let repo = Arc::new(InMemoryRepository::new());
    let recipient = Recipient::new("山田 太郎", NaiveDate::from_ymd_opt(2023, 4, 1));
    repo.create_recipient(&recipient).await.unwrap();
    let record = ProvenanceRecord::new(
        recipient.id,
        ProvenanceKind::HomeVisit,
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        "訪問時、就労の話題で表情が固くなった",
        "cw-1",
    );
    let prov = repo.append_provenance(&record).await.unwrap();
    (repo, recipient.id, prov)
}

/// A second record for the same recipient.
pub(crate) async fn another_record(repo: &InMemoryRepository, rid: RecipientId) -> FactId {
    let record = ProvenanceRecord::new(
        rid,
        ProvenanceKind::Interaction,
        NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
        "電話で近況を確認",
        "cw-2",
    );
    repo.append_provenance(&record).await.unwrap()
}

pub(crate) fn ng_fact(rid: RecipientId, description: &str, level: RiskLevel) -> Fact {
    Fact::new(
        rid,
        FactOrigin::Caseworker,
        FactBody::NgApproach(ApproachWisdom {
            description: description.to_string(),
            reason: "精神状態が悪化した".to_string(),
            risk_level: Some(level),
            consequence: None,
        }),
    )
}

pub(crate) fn effective_fact(rid: RecipientId, description: &str) -> Fact {
    Fact::new(
        rid,
        FactOrigin::Caseworker,
        FactBody::EffectiveApproach(ApproachWisdom {
            description: description.to_string(),
            reason: "面談時".to_string(),
            risk_level: None,
            consequence: None,
        }),
    )
}

pub(crate) fn risk_fact(rid: RecipientId, risk_type: &str, severity: RiskLevel) -> Fact {
    Fact::new(
        rid,
        FactOrigin::Caseworker,
        FactBody::EconomicRisk(EconomicRisk {
            risk_type: risk_type.to_string(),
            perpetrator: None,
            perpetrator_relationship: None,
            severity,
            status: RiskStatus::Active,
            discovered_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            description: format!("{risk_type}の疑い"),
            interventions: vec![],
        }),
    )
}

/// An active risk attributed to a named perpetrator.
pub(crate) fn risk_by(
    rid: RecipientId,
    risk_type: &str,
    perpetrator: &str,
    severity: RiskLevel,
) -> Fact {
    let mut fact = risk_fact(rid, risk_type, severity);
    if let FactBody::EconomicRisk(risk) = &mut fact.body {
        risk.perpetrator = Some(perpetrator.to_string());
    }
    fact
}

pub(crate) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}
