//! The typed repository contract the decision-support layer reads and writes through.
//!
//! Two implementations exist: [`crate::GraphClient`] over Neo4j and
//! [`crate::InMemoryRepository`]. Both share the validation helpers below so
//! they reject exactly the same inputs.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dignity_core::types::{FactKind, FactOrigin, ProvenanceRecord, StatusChange};
use dignity_core::{CasePattern, Fact, FactBody, FactId, Recipient, RecipientId, RiskStatus};

use crate::client::{GraphError, Result};

/// Provenance edges attached to a fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Distinct provenance records linked by `CORROBORATED_BY`.
    pub corroborating: Vec<FactId>,
    /// Provenance records linked by an unresolved `CONTRADICTED_BY`.
    pub contradicting: Vec<FactId>,
    /// `CONTRADICTED_BY` edges that carry a resolution timestamp.
    pub resolved_contradictions: usize,
}

impl Evidence {
    pub fn has_unresolved_contradiction(&self) -> bool {
        !self.contradicting.is_empty()
    }

    pub fn distinct_corroborations(&self) -> usize {
        self.corroborating.iter().collect::<BTreeSet<_>>().len()
    }
}

/// A fact as read back from the graph, with its evidence edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFact {
    pub fact: Fact,
    pub evidence: Evidence,
}

/// Direction of a provenance edge added after the fact was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceKind {
    Corroborates,
    Contradicts,
}

#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Fails with `Conflict` if the id is already taken.
    async fn create_recipient(&self, recipient: &Recipient) -> Result<()>;

    async fn get_recipient(&self, id: RecipientId) -> Result<Recipient>;

    /// Store a primary observation. Duplicate ids fail with `Conflict`.
    async fn append_provenance(&self, record: &ProvenanceRecord) -> Result<FactId>;

    /// Facts of the given kinds, oldest first. An empty `kinds` slice selects every kind.
    async fn get_facts(&self, recipient_id: RecipientId, kinds: &[FactKind])
        -> Result<Vec<StoredFact>>;

    /// EconomicRisk facts whose current status is `Active`.
    async fn get_active_risks(&self, recipient_id: RecipientId) -> Result<Vec<StoredFact>>;

    /// CollaborationRecord facts, latest meeting date first, at most `limit`.
    async fn get_collaboration_history(&self, recipient_id: RecipientId, limit: usize)
        -> Result<Vec<StoredFact>>;

    /// Case patterns sharing at least one indicator with `indicators`.
    async fn find_patterns(&self, indicators: &BTreeSet<String>) -> Result<Vec<CasePattern>>;

    /// Append a fact citing the given provenance records.
    ///
    /// Re-appending an id with an identical body returns that id; with a
    /// different body it fails with `Conflict`.
    async fn append_fact(&self, fact: &Fact, provenance_ids: &[FactId]) -> Result<FactId>;

    /// Move an EconomicRisk forward. `Conflict` if the stored status is not
    /// `from` or the move is not strictly forward.
    async fn transition_status(&self, fact_id: FactId, from: RiskStatus, to: RiskStatus)
        -> Result<()>;

    async fn add_evidence(&self, fact_id: FactId, provenance_id: FactId, kind: EvidenceKind)
        -> Result<()>;

    /// Mark a contradiction resolved. The edge itself is kept.
    async fn resolve_contradiction(&self, fact_id: FactId, provenance_id: FactId) -> Result<()>;

    /// Create or replace a case pattern, keyed by its name.
    async fn upsert_pattern(&self, pattern: &CasePattern) -> Result<()>;

    async fn link_pattern(&self, recipient_id: RecipientId, pattern_name: &str, linked_by: &str)
        -> Result<()>;

    /// Status changes of a risk, oldest first.
    async fn status_history(&self, risk_id: FactId) -> Result<Vec<StatusChange>>;

    /// Fact and provenance nodes belonging to a recipient.
    async fn count_nodes(&self, recipient_id: RecipientId) -> Result<usize>;
}

#[async_trait]
impl GraphRepository for crate::GraphClient {
    async fn create_recipient(&self, recipient: &Recipient) -> Result<()> {
        self.insert_recipient(recipient).await
    }

    async fn get_recipient(&self, id: RecipientId) -> Result<Recipient> {
        self.fetch_recipient(id).await
    }

    async fn append_provenance(&self, record: &ProvenanceRecord) -> Result<FactId> {
        self.insert_provenance(record).await
    }

    async fn get_facts(
        &self,
        recipient_id: RecipientId,
        kinds: &[FactKind],
    ) -> Result<Vec<StoredFact>> {
        self.fetch_facts(recipient_id, kinds).await
    }

    async fn get_active_risks(&self, recipient_id: RecipientId) -> Result<Vec<StoredFact>> {
        self.fetch_active_risks(recipient_id).await
    }

    async fn get_collaboration_history(
        &self,
        recipient_id: RecipientId,
        limit: usize,
    ) -> Result<Vec<StoredFact>> {
        self.fetch_collaboration_history(recipient_id, limit).await
    }

    async fn find_patterns(&self, indicators: &BTreeSet<String>) -> Result<Vec<CasePattern>> {
        self.fetch_patterns(indicators).await
    }

    async fn append_fact(&self, fact: &Fact, provenance_ids: &[FactId]) -> Result<FactId> {
        self.insert_fact(fact, provenance_ids).await
    }

    async fn transition_status(
        &self,
        fact_id: FactId,
        from: RiskStatus,
        to: RiskStatus,
    ) -> Result<()> {
        self.update_risk_status(fact_id, from, to).await
    }

    async fn add_evidence(
        &self,
        fact_id: FactId,
        provenance_id: FactId,
        kind: EvidenceKind,
    ) -> Result<()> {
        self.link_evidence(fact_id, provenance_id, kind).await
    }

    async fn resolve_contradiction(&self, fact_id: FactId, provenance_id: FactId) -> Result<()> {
        self.mark_contradiction_resolved(fact_id, provenance_id).await
    }

    async fn upsert_pattern(&self, pattern: &CasePattern) -> Result<()> {
        self.merge_pattern(pattern).await
    }

    async fn link_pattern(
        &self,
        recipient_id: RecipientId,
        pattern_name: &str,
        linked_by: &str,
    ) -> Result<()> {
        self.link_recipient_pattern(recipient_id, pattern_name, linked_by)
            .await
    }

    async fn status_history(&self, risk_id: FactId) -> Result<Vec<StatusChange>> {
        self.fetch_status_history(risk_id).await
    }

    async fn count_nodes(&self, recipient_id: RecipientId) -> Result<usize> {
        self.count_recipient_nodes(recipient_id).await
    }
}

// ── Shared validation ────────────────────────────────────────────

/// Reject malformed facts before anything is written.
pub(crate) fn validate_fact(fact: &Fact, provenance_ids: &[FactId]) -> Result<()> {
    if fact.body.headline().trim().is_empty() {
        return Err(GraphError::InvalidInput(format!(
            "{} fact has no description",
            fact.kind().label()
        )));
    }
    if fact.kind().requires_provenance()
        && fact.origin != FactOrigin::SelfDeclared
        && provenance_ids.is_empty()
    {
        return Err(GraphError::InvalidInput(format!(
            "{} fact must cite at least one provenance record",
            fact.kind().label()
        )));
    }
    Ok(())
}

/// Compare-and-set check for a status transition.
pub(crate) fn check_transition(
    fact_id: FactId,
    stored: RiskStatus,
    from: RiskStatus,
    to: RiskStatus,
) -> Result<()> {
    if stored != from {
        return Err(GraphError::Conflict(format!(
            "risk {fact_id} is {stored}, expected {from}"
        )));
    }
    if !from.can_transition_to(to) {
        return Err(GraphError::Conflict(format!(
            "illegal status transition {from} -> {to} for risk {fact_id}"
        )));
    }
    Ok(())
}

/// Outcome of re-appending an id that already exists.
pub(crate) fn check_duplicate(existing: &Fact, incoming: &Fact) -> Result<FactId> {
    if existing.recipient_id == incoming.recipient_id
        && existing.origin == incoming.origin
        && existing.body == incoming.body
    {
        Ok(existing.id)
    } else {
        Err(GraphError::Conflict(format!(
            "fact id {} already exists with different content",
            incoming.id
        )))
    }
}

/// Order collaboration records by meeting date, newest first, and keep `limit`.
///
/// Records on the same date fall back to the time they were recorded.
pub(crate) fn latest_collaborations(mut facts: Vec<StoredFact>, limit: usize) -> Vec<StoredFact> {
    facts.retain(|s| matches!(s.fact.body, FactBody::CollaborationRecord(_)));
    facts.sort_by(|a, b| {
        let key = |s: &StoredFact| match &s.fact.body {
            FactBody::CollaborationRecord(c) => Some(c.date),
            _ => None,
        };
        key(b)
            .cmp(&key(a))
            .then_with(|| b.fact.recorded_at.cmp(&a.fact.recorded_at))
    });
    facts.truncate(limit);
    facts
}

pub(crate) fn risk_status(body: &FactBody) -> Option<RiskStatus> {
    match body {
        FactBody::EconomicRisk(r) => Some(r.status),
        _ => None,
    }
}
