//! In-process repository over a typed adjacency structure.
//!
//! Nodes live in id-keyed maps; relationships live in a single adjacency
//! map keyed by `(source, edge_type)`. Writes take one lock, so appends for
//! the same recipient are serialized and compare-and-set transitions are
//! atomic.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use dignity_core::types::{Edge, FactKind, ProvenanceRecord, StatusChange};
use dignity_core::{
    CasePattern, EdgeType, Fact, FactBody, FactId, NodeId, Recipient, RecipientId, RiskStatus,
};

use crate::client::{GraphError, Result};
use crate::repository::{
    check_duplicate, check_transition, latest_collaborations, risk_status, validate_fact,
    Evidence, EvidenceKind, GraphRepository, StoredFact,
};

#[derive(Default)]
struct MemoryState {
    recipients: HashMap<RecipientId, Recipient>,
    provenance: HashMap<FactId, ProvenanceRecord>,
    facts: HashMap<FactId, Fact>,
    patterns: BTreeMap<String, CasePattern>,
    adjacency: HashMap<(NodeId, EdgeType), Vec<Edge>>,
    status_history: HashMap<FactId, Vec<StatusChange>>,
}

impl MemoryState {
    fn link(&mut self, source: NodeId, edge_type: EdgeType, target: NodeId) -> &mut Edge {
        let edges = self.adjacency.entry((source, edge_type)).or_default();
        edges.push(Edge::new(source, edge_type, target));
        let last = edges.len() - 1;
        &mut edges[last]
    }

    fn has_edge(&self, source: NodeId, edge_type: EdgeType, target: NodeId) -> bool {
        self.edges(source, edge_type).any(|e| e.target_id == target)
    }

    fn edges(&self, source: NodeId, edge_type: EdgeType) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .get(&(source, edge_type))
            .into_iter()
            .flatten()
    }

    fn require_recipient(&self, id: RecipientId) -> Result<&Recipient> {
        self.recipients
            .get(&id)
            .ok_or_else(|| GraphError::not_found("Recipient", id))
    }

    fn require_fact(&self, id: FactId) -> Result<&Fact> {
        self.facts
            .get(&id)
            .ok_or_else(|| GraphError::not_found("Fact", id))
    }

    fn require_provenance(&self, id: FactId, recipient_id: RecipientId) -> Result<&ProvenanceRecord> {
        self.provenance
            .get(&id)
            .filter(|p| p.recipient_id == recipient_id)
            .ok_or_else(|| GraphError::not_found("ProvenanceRecord", id))
    }

    fn evidence(&self, fact_id: FactId) -> Evidence {
        let node = NodeId::from(fact_id);
        let corroborating = self
            .edges(node, EdgeType::CorroboratedBy)
            .map(|e| FactId(e.target_id.0))
            .collect();
        let (resolved, unresolved): (Vec<&Edge>, Vec<&Edge>) = self
            .edges(node, EdgeType::ContradictedBy)
            .partition(|e| e.properties.resolved_at.is_some());
        Evidence {
            corroborating,
            contradicting: unresolved.iter().map(|e| FactId(e.target_id.0)).collect(),
            resolved_contradictions: resolved.len(),
        }
    }

    fn stored(&self, fact: &Fact) -> StoredFact {
        StoredFact {
            fact: fact.clone(),
            evidence: self.evidence(fact.id),
        }
    }

    /// Facts reachable from the recipient over the given kind's relationship.
    fn facts_of(&self, recipient_id: RecipientId, kind: FactKind) -> Vec<&Fact> {
        self.edges(recipient_id.into(), kind.relationship())
            .filter_map(|e| self.facts.get(&FactId(e.target_id.0)))
            .filter(|f| f.kind() == kind)
            .collect()
    }

    /// `POSES_RISK` between family members and risks naming them as perpetrator.
    fn link_perpetrators(&mut self, fact: &Fact) {
        let pairs: Vec<(NodeId, NodeId)> = match &fact.body {
            FactBody::EconomicRisk(risk) => {
                let Some(perpetrator) = risk.perpetrator.as_deref() else {
                    return;
                };
                self.facts_of(fact.recipient_id, FactKind::FamilyMember)
                    .into_iter()
                    .filter(|m| matches!(&m.body, FactBody::FamilyMember(c) if c.name == perpetrator))
                    .map(|m| (m.id.into(), fact.id.into()))
                    .collect()
            }
            FactBody::FamilyMember(member) => self
                .facts_of(fact.recipient_id, FactKind::EconomicRisk)
                .into_iter()
                .filter(|r| {
                    matches!(&r.body, FactBody::EconomicRisk(k) if k.perpetrator.as_deref() == Some(member.name.as_str()))
                })
                .map(|r| (fact.id.into(), r.id.into()))
                .collect(),
            _ => return,
        };
        for (member, risk) in pairs {
            self.link(member, EdgeType::PosesRisk, risk);
        }
    }

    /// `MITIGATED_BY` from every active risk to a newly added support service.
    fn link_mitigations(&mut self, fact: &Fact) {
        if fact.kind() != FactKind::DailyLifeSupportService {
            return;
        }
        let risks: Vec<NodeId> = self
            .facts_of(fact.recipient_id, FactKind::EconomicRisk)
            .into_iter()
            .filter(|r| risk_status(&r.body) == Some(RiskStatus::Active))
            .map(|r| r.id.into())
            .collect();
        for risk in risks {
            self.link(risk, EdgeType::MitigatedBy, fact.id.into());
        }
    }
}

/// Thread-safe in-memory [`GraphRepository`].
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
    failing_kinds: RwLock<HashSet<FactKind>>,
    unavailable: RwLock<bool>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads of `kind` fail with `Unavailable`.
    pub fn fail_kind(&self, kind: FactKind) {
        if let Ok(mut kinds) = self.failing_kinds.write() {
            kinds.insert(kind);
        }
    }

    /// Make every operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.write() {
            *flag = unavailable;
        }
    }

    fn check_available(&self, kinds: &[FactKind]) -> Result<()> {
        let down = self.unavailable.read().map(|f| *f).unwrap_or(true);
        if down {
            return Err(GraphError::Unavailable("store offline".to_string()));
        }
        let failing = self
            .failing_kinds
            .read()
            .map_err(|_| GraphError::Unavailable("fault table poisoned".to_string()))?;
        if let Some(kind) = kinds.iter().find(|k| failing.contains(k)) {
            return Err(GraphError::Unavailable(format!(
                "timed out reading {}",
                kind.label()
            )));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.check_available(&[])?;
        self.state
            .read()
            .map_err(|_| GraphError::Unavailable("state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.check_available(&[])?;
        self.state
            .write()
            .map_err(|_| GraphError::Unavailable("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl GraphRepository for InMemoryRepository {
    async fn create_recipient(&self, recipient: &Recipient) -> Result<()> {
        let mut state = self.write()?;
        if state.recipients.contains_key(&recipient.id) {
            return Err(GraphError::Conflict(format!(
                "recipient {} already exists",
                recipient.id
            )));
        }
        state.recipients.insert(recipient.id, recipient.clone());
        Ok(())
    }

    async fn get_recipient(&self, id: RecipientId) -> Result<Recipient> {
        self.read()?.require_recipient(id).cloned()
    }

    async fn append_provenance(&self, record: &ProvenanceRecord) -> Result<FactId> {
        let mut state = self.write()?;
        state.require_recipient(record.recipient_id)?;
        if state.provenance.contains_key(&record.id) || state.facts.contains_key(&record.id) {
            return Err(GraphError::Conflict(format!(
                "provenance id {} already exists",
                record.id
            )));
        }
        state.provenance.insert(record.id, record.clone());
        state.link(record.recipient_id.into(), EdgeType::HasRecord, record.id.into());
        Ok(record.id)
    }

    async fn get_facts(
        &self,
        recipient_id: RecipientId,
        kinds: &[FactKind],
    ) -> Result<Vec<StoredFact>> {
        let kinds: &[FactKind] = if kinds.is_empty() { &FactKind::ALL } else { kinds };
        self.check_available(kinds)?;
        let state = self.read()?;
        state.require_recipient(recipient_id)?;

        let mut facts: Vec<&Fact> = kinds
            .iter()
            .flat_map(|kind| state.facts_of(recipient_id, *kind))
            .collect();
        facts.sort_by_key(|f| f.recorded_at);
        Ok(facts.into_iter().map(|f| state.stored(f)).collect())
    }

    async fn get_collaboration_history(
        &self,
        recipient_id: RecipientId,
        limit: usize,
    ) -> Result<Vec<StoredFact>> {
        let facts = self
            .get_facts(recipient_id, &[FactKind::CollaborationRecord])
            .await?;
        Ok(latest_collaborations(facts, limit))
    }

    async fn get_active_risks(&self, recipient_id: RecipientId) -> Result<Vec<StoredFact>> {
        self.check_available(&[FactKind::EconomicRisk])?;
        let state = self.read()?;
        state.require_recipient(recipient_id)?;

        let mut risks: Vec<&Fact> = state
            .facts_of(recipient_id, FactKind::EconomicRisk)
            .into_iter()
            .filter(|f| risk_status(&f.body) == Some(RiskStatus::Active))
            .collect();
        risks.sort_by_key(|f| f.recorded_at);
        Ok(risks.into_iter().map(|f| state.stored(f)).collect())
    }

    async fn find_patterns(&self, indicators: &BTreeSet<String>) -> Result<Vec<CasePattern>> {
        let state = self.read()?;
        Ok(state
            .patterns
            .values()
            .filter(|p| p.indicators.iter().any(|i| indicators.contains(i)))
            .cloned()
            .collect())
    }

    async fn append_fact(&self, fact: &Fact, provenance_ids: &[FactId]) -> Result<FactId> {
        validate_fact(fact, provenance_ids)?;
        let mut state = self.write()?;
        state.require_recipient(fact.recipient_id)?;

        if let Some(existing) = state.facts.get(&fact.id) {
            return check_duplicate(existing, fact);
        }
        if state.provenance.contains_key(&fact.id) {
            return Err(GraphError::Conflict(format!(
                "id {} is already used by a provenance record",
                fact.id
            )));
        }
        for id in provenance_ids {
            state.require_provenance(*id, fact.recipient_id)?;
        }

        state.facts.insert(fact.id, fact.clone());
        state.link(
            fact.recipient_id.into(),
            fact.kind().relationship(),
            fact.id.into(),
        );
        let cited: BTreeSet<FactId> = provenance_ids.iter().copied().collect();
        for id in cited {
            state.link(fact.id.into(), EdgeType::CorroboratedBy, id.into());
        }
        state.link_perpetrators(fact);
        state.link_mitigations(fact);

        tracing::debug!(fact_id = %fact.id, kind = fact.kind().label(), "Fact appended");
        Ok(fact.id)
    }

    async fn transition_status(
        &self,
        fact_id: FactId,
        from: RiskStatus,
        to: RiskStatus,
    ) -> Result<()> {
        let mut state = self.write()?;
        let stored = risk_status(&state.require_fact(fact_id)?.body).ok_or_else(|| {
            GraphError::InvalidInput(format!("fact {fact_id} is not an EconomicRisk"))
        })?;
        check_transition(fact_id, stored, from, to)?;

        if let Some(FactBody::EconomicRisk(risk)) = state.facts.get_mut(&fact_id).map(|f| &mut f.body) {
            risk.status = to;
        }
        state.status_history.entry(fact_id).or_default().push(StatusChange {
            risk_id: fact_id,
            from,
            to,
            changed_at: Utc::now(),
        });
        Ok(())
    }

    async fn add_evidence(
        &self,
        fact_id: FactId,
        provenance_id: FactId,
        kind: EvidenceKind,
    ) -> Result<()> {
        let mut state = self.write()?;
        let recipient_id = state.require_fact(fact_id)?.recipient_id;
        state.require_provenance(provenance_id, recipient_id)?;

        let edge_type = match kind {
            EvidenceKind::Corroborates => EdgeType::CorroboratedBy,
            EvidenceKind::Contradicts => EdgeType::ContradictedBy,
        };
        if !state.has_edge(fact_id.into(), edge_type, provenance_id.into()) {
            state.link(fact_id.into(), edge_type, provenance_id.into());
        }
        Ok(())
    }

    async fn resolve_contradiction(&self, fact_id: FactId, provenance_id: FactId) -> Result<()> {
        let mut state = self.write()?;
        state.require_fact(fact_id)?;
        let target = NodeId::from(provenance_id);
        let edge = state
            .adjacency
            .get_mut(&(fact_id.into(), EdgeType::ContradictedBy))
            .and_then(|edges| edges.iter_mut().find(|e| e.target_id == target))
            .ok_or_else(|| {
                GraphError::not_found("Contradiction", format!("{fact_id} -> {provenance_id}"))
            })?;
        if edge.properties.resolved_at.is_none() {
            edge.properties.resolved_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn upsert_pattern(&self, pattern: &CasePattern) -> Result<()> {
        pattern.validate()?;
        let mut state = self.write()?;
        state
            .patterns
            .insert(pattern.pattern_name.clone(), pattern.clone());
        Ok(())
    }

    async fn link_pattern(
        &self,
        recipient_id: RecipientId,
        pattern_name: &str,
        linked_by: &str,
    ) -> Result<()> {
        let mut state = self.write()?;
        state.require_recipient(recipient_id)?;
        if !state.patterns.contains_key(pattern_name) {
            return Err(GraphError::not_found("CasePattern", pattern_name));
        }
        let target = CasePattern::node_id_for(pattern_name);
        if state.has_edge(recipient_id.into(), EdgeType::MatchesPattern, target) {
            return Ok(());
        }
        let edge = state.link(recipient_id.into(), EdgeType::MatchesPattern, target);
        edge.properties.linked_by = Some(linked_by.to_string());
        Ok(())
    }

    async fn status_history(&self, risk_id: FactId) -> Result<Vec<StatusChange>> {
        let state = self.read()?;
        state.require_fact(risk_id)?;
        Ok(state
            .status_history
            .get(&risk_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_nodes(&self, recipient_id: RecipientId) -> Result<usize> {
        let state = self.read()?;
        state.require_recipient(recipient_id)?;
        let facts = state
            .facts
            .values()
            .filter(|f| f.recipient_id == recipient_id)
            .count();
        let records = state
            .provenance
            .values()
            .filter(|p| p.recipient_id == recipient_id)
            .count();
        Ok(facts + records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dignity_core::types::{
        ApproachWisdom, DailyLifeSupportService, EconomicRisk, NetworkContact, ProvenanceKind,
    };
    use dignity_core::{FactOrigin, RiskLevel};
    use std::sync::Arc;

    async fn seeded() -> (InMemoryRepository, RecipientId, FactId) {
        let repo = InMemoryRepository::new();
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

    fn risk(perpetrator: Option<&str>) -> FactBody {
        FactBody::EconomicRisk(EconomicRisk {
            risk_type: "金銭搾取".to_string(),
            perpetrator: perpetrator.map(str::to_string),
            perpetrator_relationship: Some("長男".to_string()),
            severity: RiskLevel::High,
            status: RiskStatus::Active,
            discovered_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            description: "受給日直後に来訪".to_string(),
            interventions: vec![],
        })
    }

    fn ng(description: &str) -> FactBody {
        FactBody::NgApproach(ApproachWisdom {
            description: description.to_string(),
            reason: "うつ症状の悪化".to_string(),
            risk_level: Some(RiskLevel::High),
            consequence: None,
        })
    }

    #[tokio::test]
    async fn unknown_recipient_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_facts(RecipientId::new(), &[]).await.unwrap_err();
        assert!(matches!(err, GraphError::NotFound { kind, .. } if kind == "Recipient"));
    }

    #[tokio::test]
    async fn collaboration_history_is_newest_first() {
        use dignity_core::types::CollaborationRecord;

        let (repo, rid, prov) = seeded().await;
        for (day, kind) in [(3, "電話連絡"), (20, "ケース会議"), (11, "同行訪問")] {
            let fact = Fact::new(
                rid,
                FactOrigin::Collaboration,
                FactBody::CollaborationRecord(CollaborationRecord {
                    date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                    collaboration_type: kind.to_string(),
                    participants: vec![],
                    organizations: vec!["社会福祉協議会".to_string()],
                    decisions: vec![],
                    next_actions: vec![],
                }),
            );
            repo.append_fact(&fact, &[prov]).await.unwrap();
        }
        repo.append_fact(&Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす")), &[prov])
            .await
            .unwrap();

        let history = repo.get_collaboration_history(rid, 10).await.unwrap();
        let headlines: Vec<String> = history.iter().map(|s| s.fact.body.headline()).collect();
        assert_eq!(
            headlines,
            vec!["2024-06-20 ケース会議", "2024-06-11 同行訪問", "2024-06-03 電話連絡"]
        );
        assert_eq!(repo.get_collaboration_history(rid, 1).await.unwrap().len(), 1);

        repo.fail_kind(FactKind::CollaborationRecord);
        assert!(matches!(
            repo.get_collaboration_history(rid, 10).await,
            Err(GraphError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn appended_fact_is_corroborated_by_its_provenance() {
        let (repo, rid, prov) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす"));
        repo.append_fact(&fact, &[prov]).await.unwrap();

        let facts = repo.get_facts(rid, &[FactKind::NgApproach]).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].evidence.corroborating, vec![prov]);
        assert!(repo.get_facts(rid, &[FactKind::Strength]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provenance_from_another_recipient_is_rejected() {
        let (repo, _, prov) = seeded().await;
        let other = Recipient::new("佐藤 花子", None);
        repo.create_recipient(&other).await.unwrap();
        let fact = Fact::new(other.id, FactOrigin::Caseworker, ng("就労を急かす"));
        let err = repo.append_fact(&fact, &[prov]).await.unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
        assert_eq!(repo.count_nodes(other.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_does_not_create_a_second_node() {
        let (repo, rid, prov) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす"));
        let before = repo.count_nodes(rid).await.unwrap();

        assert_eq!(repo.append_fact(&fact, &[prov]).await.unwrap(), fact.id);
        assert_eq!(repo.append_fact(&fact, &[prov]).await.unwrap(), fact.id);
        assert_eq!(repo.count_nodes(rid).await.unwrap(), before + 1);

        let mut changed = fact.clone();
        changed.body = ng("大声で話す");
        assert!(matches!(
            repo.append_fact(&changed, &[prov]).await,
            Err(GraphError::Conflict(_))
        ));
        assert_eq!(repo.count_nodes(rid).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn concurrent_appends_both_persist() {
        let (repo, rid, prov) = seeded().await;
        let repo = Arc::new(repo);
        let before = repo.count_nodes(rid).await.unwrap();

        let a = Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす"));
        let b = Fact::new(rid, FactOrigin::Caseworker, ng("他の受給者と比較する"));
        let provs = [prov];
        let (ra, rb) = tokio::join!(repo.append_fact(&a, &provs), repo.append_fact(&b, &provs));
        assert_ne!(ra.unwrap(), rb.unwrap());
        assert_eq!(repo.count_nodes(rid).await.unwrap(), before + 2);
    }

    #[tokio::test]
    async fn status_moves_forward_and_is_recorded() {
        let (repo, rid, _) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, risk(None));
        repo.append_fact(&fact, &[]).await.unwrap();

        repo.transition_status(fact.id, RiskStatus::Active, RiskStatus::Monitoring)
            .await
            .unwrap();
        assert!(repo.get_active_risks(rid).await.unwrap().is_empty());

        let stale = repo
            .transition_status(fact.id, RiskStatus::Active, RiskStatus::Resolved)
            .await;
        assert!(matches!(stale, Err(GraphError::Conflict(_))));

        repo.transition_status(fact.id, RiskStatus::Monitoring, RiskStatus::Resolved)
            .await
            .unwrap();
        let back = repo
            .transition_status(fact.id, RiskStatus::Resolved, RiskStatus::Monitoring)
            .await;
        assert!(matches!(back, Err(GraphError::Conflict(_))));

        let history = repo.status_history(fact.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].to, RiskStatus::Resolved);
    }

    #[tokio::test]
    async fn concurrent_transitions_have_one_winner() {
        let (repo, rid, _) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, risk(None));
        repo.append_fact(&fact, &[]).await.unwrap();

        let (a, b) = tokio::join!(
            repo.transition_status(fact.id, RiskStatus::Active, RiskStatus::Monitoring),
            repo.transition_status(fact.id, RiskStatus::Active, RiskStatus::Resolved),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn transition_on_non_risk_is_invalid() {
        let (repo, rid, prov) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす"));
        repo.append_fact(&fact, &[prov]).await.unwrap();
        let err = repo
            .transition_status(fact.id, RiskStatus::Active, RiskStatus::Monitoring)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(matches!(
            repo.transition_status(FactId::new(), RiskStatus::Active, RiskStatus::Monitoring)
                .await,
            Err(GraphError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn family_member_perpetrator_poses_risk() {
        let (repo, rid, _) = seeded().await;
        let member = Fact::new(
            rid,
            FactOrigin::Caseworker,
            FactBody::FamilyMember(NetworkContact {
                name: "一郎".to_string(),
                relationship: "長男".to_string(),
                risk_flag: true,
            }),
        );
        repo.append_fact(&member, &[]).await.unwrap();
        let risk_fact = Fact::new(rid, FactOrigin::Caseworker, risk(Some("一郎")));
        repo.append_fact(&risk_fact, &[]).await.unwrap();

        let state = repo.state.read().unwrap();
        assert!(state.has_edge(member.id.into(), EdgeType::PosesRisk, risk_fact.id.into()));
    }

    #[tokio::test]
    async fn support_service_mitigates_active_risks() {
        let (repo, rid, _) = seeded().await;
        let risk_fact = Fact::new(rid, FactOrigin::Caseworker, risk(None));
        repo.append_fact(&risk_fact, &[]).await.unwrap();
        let service = Fact::new(
            rid,
            FactOrigin::Caseworker,
            FactBody::DailyLifeSupportService(DailyLifeSupportService {
                provider: "社会福祉協議会".to_string(),
                services: vec!["金銭管理".to_string()],
                status: "利用中".to_string(),
                specialist: None,
            }),
        );
        repo.append_fact(&service, &[]).await.unwrap();

        let state = repo.state.read().unwrap();
        assert!(state.has_edge(risk_fact.id.into(), EdgeType::MitigatedBy, service.id.into()));
    }

    #[tokio::test]
    async fn contradictions_are_kept_after_resolution() {
        let (repo, rid, prov) = seeded().await;
        let fact = Fact::new(rid, FactOrigin::Caseworker, ng("就労を急かす"));
        repo.append_fact(&fact, &[prov]).await.unwrap();
        repo.add_evidence(fact.id, prov, EvidenceKind::Contradicts)
            .await
            .unwrap();

        let facts = repo.get_facts(rid, &[FactKind::NgApproach]).await.unwrap();
        assert!(facts[0].evidence.has_unresolved_contradiction());

        repo.resolve_contradiction(fact.id, prov).await.unwrap();
        let facts = repo.get_facts(rid, &[FactKind::NgApproach]).await.unwrap();
        assert!(!facts[0].evidence.has_unresolved_contradiction());
        assert_eq!(facts[0].evidence.resolved_contradictions, 1);
    }

    #[tokio::test]
    async fn find_patterns_requires_shared_indicator() {
        let repo = InMemoryRepository::new();
        let pattern = CasePattern {
            pattern_name: "親族による経済的搾取".to_string(),
            description: String::new(),
            indicators: vec!["受給日直後に金銭がなくなる".to_string()],
            risk_factors: vec![],
            recommended_interventions: vec![],
            related_services: vec![],
            successful_cases: 3,
        };
        repo.upsert_pattern(&pattern).await.unwrap();

        let hit = BTreeSet::from(["受給日直後に金銭がなくなる".to_string()]);
        assert_eq!(repo.find_patterns(&hit).await.unwrap().len(), 1);
        assert!(repo.find_patterns(&BTreeSet::new()).await.unwrap().is_empty());

        let mut empty = pattern.clone();
        empty.indicators.clear();
        assert!(matches!(
            repo.upsert_pattern(&empty).await,
            Err(GraphError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn injected_faults_surface_as_unavailable() {
        let (repo, rid, _) = seeded().await;
        repo.fail_kind(FactKind::NgApproach);
        let err = repo.get_facts(rid, &[FactKind::NgApproach]).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(repo.get_facts(rid, &[FactKind::Strength]).await.is_ok());

        repo.set_unavailable(true);
        assert!(matches!(
            repo.get_recipient(rid).await,
            Err(GraphError::Unavailable(_))
        ));
    }
}
