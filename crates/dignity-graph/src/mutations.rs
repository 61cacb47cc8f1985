//! Write operations for the knowledge graph.
//!
//! Nothing here deletes. Facts and provenance are created once; state changes
//! are new edges, new `StatusChange` nodes, or superseding properties.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{query, Query};
use serde::Serialize;

use dignity_core::types::ProvenanceRecord;
use dignity_core::{CasePattern, Fact, FactBody, FactId, Recipient, RecipientId, RiskStatus};

use crate::client::{GraphClient, GraphError, Result};
use crate::repository::{check_duplicate, check_transition, risk_status, validate_fact, EvidenceKind};

/// Unique constraints and lookup indexes the repository relies on.
const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT recipient_id IF NOT EXISTS FOR (n:Recipient) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT fact_id IF NOT EXISTS FOR (n:Fact) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT provenance_id IF NOT EXISTS FOR (n:ProvenanceRecord) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT case_pattern_name IF NOT EXISTS FOR (n:CasePattern) REQUIRE n.patternName IS UNIQUE",
    "CREATE INDEX fact_recipient IF NOT EXISTS FOR (n:Fact) ON (n.recipientId)",
    "CREATE INDEX fact_kind IF NOT EXISTS FOR (n:Fact) ON (n.kind)",
    "CREATE INDEX risk_status IF NOT EXISTS FOR (n:EconomicRisk) ON (n.status)",
    "CREATE INDEX provenance_recipient IF NOT EXISTS FOR (n:ProvenanceRecord) ON (n.recipientId)",
];

impl GraphClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Create constraints and indexes. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            self.run(query(statement)).await?;
        }
        tracing::info!(statements = SCHEMA.len(), "Schema ensured");
        Ok(())
    }

    // ── Recipients & provenance ──────────────────────────────────

    pub async fn insert_recipient(&self, recipient: &Recipient) -> Result<()> {
        match self.fetch_recipient(recipient.id).await {
            Ok(_) => {
                return Err(GraphError::Conflict(format!(
                    "recipient {} already exists",
                    recipient.id
                )))
            }
            Err(GraphError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let q = query(
            "CREATE (:Recipient {id: $id, name: $name,
                                 protectionStartDate: $start_date, createdAt: $created_at})",
        )
        .param("id", recipient.id.to_string())
        .param("name", recipient.name.clone())
        .param(
            "start_date",
            recipient
                .protection_start_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        )
        .param("created_at", timestamp(recipient.created_at));

        self.run(q).await
    }

    pub async fn insert_provenance(&self, record: &ProvenanceRecord) -> Result<FactId> {
        self.fetch_recipient(record.recipient_id).await?;
        if self.provenance_owner(record.id).await?.is_some()
            || self.fetch_fact(record.id).await?.is_some()
        {
            return Err(GraphError::Conflict(format!(
                "provenance id {} already exists",
                record.id
            )));
        }

        let cypher = format!(
            "MATCH (r:Recipient {{id: $rid}})
             CREATE (p:ProvenanceRecord:{label} {{
                 id: $id, recipientId: $rid, date: $date, content: $content,
                 recordedBy: $recorded_by, reliabilityHint: $hint, createdAt: $created_at}})
             CREATE (r)-[:HAS_RECORD {{id: $edge_id, createdAt: $created_at}}]->(p)",
            label = record.kind.label()
        );
        let q = query(&cypher)
            .param("rid", record.recipient_id.to_string())
            .param("id", record.id.to_string())
            .param("date", record.date.format("%Y-%m-%d").to_string())
            .param("content", record.content.clone())
            .param("recorded_by", record.recorded_by.clone())
            .param("hint", record.reliability_hint.clone().unwrap_or_default())
            .param("created_at", timestamp(record.created_at))
            .param("edge_id", uuid::Uuid::new_v4().to_string());

        self.run(q).await?;
        Ok(record.id)
    }

    // ── Facts ────────────────────────────────────────────────────

    /// Create a fact node, its recipient edge, its provenance edges and any
    /// derived `POSES_RISK` / `MITIGATED_BY` edges in one transaction.
    pub async fn insert_fact(&self, fact: &Fact, provenance_ids: &[FactId]) -> Result<FactId> {
        validate_fact(fact, provenance_ids)?;
        self.fetch_recipient(fact.recipient_id).await?;

        if let Some(existing) = self.fetch_fact(fact.id).await? {
            return check_duplicate(&existing.fact, fact);
        }
        let cited: BTreeSet<FactId> = provenance_ids.iter().copied().collect();
        for id in &cited {
            if self.provenance_owner(*id).await? != Some(fact.recipient_id) {
                return Err(GraphError::not_found("ProvenanceRecord", id));
            }
        }

        let now = timestamp(Utc::now());
        let mut queries = vec![create_fact_query(fact, &now)?];
        if !cited.is_empty() {
            queries.push(
                query(
                    "MATCH (f:Fact {id: $id})
                     UNWIND $provenance AS pid
                     MATCH (p:ProvenanceRecord {id: pid})
                     MERGE (f)-[c:CORROBORATED_BY]->(p)
                     ON CREATE SET c.id = randomUUID(), c.createdAt = $now",
                )
                .param("id", fact.id.to_string())
                .param(
                    "provenance",
                    cited.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                )
                .param("now", now.clone()),
            );
        }
        queries.extend(derived_edge_queries(fact, &now));

        self.run_in_txn(queries).await.map_err(|e| match e {
            // Lost a race against a concurrent append of the same id.
            GraphError::Conflict(_) => {
                GraphError::Conflict(format!("fact id {} already exists", fact.id))
            }
            other => other,
        })?;

        tracing::debug!(fact_id = %fact.id, kind = fact.kind().label(), "Fact appended");
        Ok(fact.id)
    }

    /// Compare-and-set the status of an EconomicRisk.
    pub async fn update_risk_status(
        &self,
        fact_id: FactId,
        from: RiskStatus,
        to: RiskStatus,
    ) -> Result<()> {
        let existing = self
            .fetch_fact(fact_id)
            .await?
            .ok_or_else(|| GraphError::not_found("Fact", fact_id))?;
        let stored = risk_status(&existing.fact.body).ok_or_else(|| {
            GraphError::InvalidInput(format!("fact {fact_id} is not an EconomicRisk"))
        })?;
        check_transition(fact_id, stored, from, to)?;

        // Taking the write lock before reading status makes the compare atomic.
        let q = query(
            "MATCH (k:EconomicRisk {id: $id})
             SET k._lock = true
             WITH k, k.status AS stored
             FOREACH (_ IN CASE WHEN stored = $from THEN [1] ELSE [] END |
                 SET k.status = $to
                 CREATE (k)-[:STATUS_CHANGED]->(:StatusChange {
                     riskId: $id, from: $from, to: $to, changedAt: $now}))
             REMOVE k._lock
             RETURN stored",
        )
        .param("id", fact_id.to_string())
        .param("from", wire(&from))
        .param("to", wire(&to))
        .param("now", timestamp(Utc::now()));

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| GraphError::not_found("Fact", fact_id))?;
        let current: String = row.get("stored").unwrap_or_default();
        if current != wire(&from) {
            return Err(GraphError::Conflict(format!(
                "risk {fact_id} is {current}, expected {from}"
            )));
        }
        Ok(())
    }

    // ── Evidence ─────────────────────────────────────────────────

    pub async fn link_evidence(
        &self,
        fact_id: FactId,
        provenance_id: FactId,
        kind: EvidenceKind,
    ) -> Result<()> {
        let fact = self
            .fetch_fact(fact_id)
            .await?
            .ok_or_else(|| GraphError::not_found("Fact", fact_id))?;
        if self.provenance_owner(provenance_id).await? != Some(fact.fact.recipient_id) {
            return Err(GraphError::not_found("ProvenanceRecord", provenance_id));
        }

        let rel = match kind {
            EvidenceKind::Corroborates => "CORROBORATED_BY",
            EvidenceKind::Contradicts => "CONTRADICTED_BY",
        };
        let cypher = format!(
            "MATCH (f:Fact {{id: $fid}})
             MATCH (p:ProvenanceRecord {{id: $pid}})
             MERGE (f)-[e:{rel}]->(p)
             ON CREATE SET e.id = randomUUID(), e.createdAt = $now"
        );
        let q = query(&cypher)
            .param("fid", fact_id.to_string())
            .param("pid", provenance_id.to_string())
            .param("now", timestamp(Utc::now()));

        self.run(q).await
    }

    pub async fn mark_contradiction_resolved(
        &self,
        fact_id: FactId,
        provenance_id: FactId,
    ) -> Result<()> {
        let q = query(
            "MATCH (:Fact {id: $fid})-[x:CONTRADICTED_BY]->(:ProvenanceRecord {id: $pid})
             SET x.resolvedAt = coalesce(x.resolvedAt, $now)
             RETURN count(x) AS cnt",
        )
        .param("fid", fact_id.to_string())
        .param("pid", provenance_id.to_string())
        .param("now", timestamp(Utc::now()));

        let count = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        if count == 0 {
            return Err(GraphError::not_found(
                "Contradiction",
                format!("{fact_id} -> {provenance_id}"),
            ));
        }
        Ok(())
    }

    // ── Case patterns ────────────────────────────────────────────

    pub async fn merge_pattern(&self, pattern: &CasePattern) -> Result<()> {
        pattern.validate()?;
        let q = query(
            "MERGE (p:CasePattern {patternName: $name})
             ON CREATE SET p.id = $id, p.createdAt = $now
             SET p.description = $description, p.indicators = $indicators,
                 p.riskFactors = $risk_factors,
                 p.recommendedInterventions = $interventions,
                 p.relatedServices = $services, p.successfulCases = $successful_cases,
                 p.updatedAt = $now",
        )
        .param("name", pattern.pattern_name.clone())
        .param("id", pattern.node_id().to_string())
        .param("description", pattern.description.clone())
        .param("indicators", pattern.indicators.clone())
        .param("risk_factors", pattern.risk_factors.clone())
        .param("interventions", pattern.recommended_interventions.clone())
        .param("services", pattern.related_services.clone())
        .param("successful_cases", pattern.successful_cases as i64)
        .param("now", timestamp(Utc::now()));

        self.run(q).await
    }

    pub async fn link_recipient_pattern(
        &self,
        recipient_id: RecipientId,
        pattern_name: &str,
        linked_by: &str,
    ) -> Result<()> {
        self.fetch_recipient(recipient_id).await?;
        let q = query(
            "MATCH (r:Recipient {id: $rid})
             MATCH (p:CasePattern {patternName: $name})
             MERGE (r)-[m:MATCHES_PATTERN]->(p)
             ON CREATE SET m.id = randomUUID(), m.linkedBy = $linked_by, m.createdAt = $now
             RETURN count(m) AS cnt",
        )
        .param("rid", recipient_id.to_string())
        .param("name", pattern_name.to_string())
        .param("linked_by", linked_by.to_string())
        .param("now", timestamp(Utc::now()));

        let count = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        if count == 0 {
            return Err(GraphError::not_found("CasePattern", pattern_name));
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn create_fact_query(fact: &Fact, now: &str) -> Result<Query> {
    let kind = fact.kind();
    let (status, perpetrator, contact_name) = match &fact.body {
        FactBody::EconomicRisk(r) => (
            wire(&r.status),
            r.perpetrator.clone().unwrap_or_default(),
            String::new(),
        ),
        FactBody::FamilyMember(c) | FactBody::KeyPerson(c) | FactBody::SupportOrganization(c) => {
            (String::new(), String::new(), c.name.clone())
        }
        _ => (String::new(), String::new(), String::new()),
    };

    let cypher = format!(
        "MATCH (r:Recipient {{id: $rid}})
         CREATE (f:Fact:{label} {{
             id: $id, recipientId: $rid, kind: $kind, origin: $origin,
             recordedAt: $recorded_at, payload: $payload, status: $status,
             perpetrator: $perpetrator, contactName: $contact_name}})
         CREATE (r)-[:{rel} {{id: $edge_id, createdAt: $now}}]->(f)",
        label = kind.label(),
        rel = kind.relationship().as_cypher(),
    );

    Ok(query(&cypher)
        .param("rid", fact.recipient_id.to_string())
        .param("id", fact.id.to_string())
        .param("kind", kind.label())
        .param("origin", wire(&fact.origin))
        .param("recorded_at", timestamp(fact.recorded_at))
        .param("payload", serde_json::to_string(&fact.body)?)
        .param("status", status)
        .param("perpetrator", perpetrator)
        .param("contact_name", contact_name)
        .param("edge_id", uuid::Uuid::new_v4().to_string())
        .param("now", now.to_string()))
}

/// `POSES_RISK` and `MITIGATED_BY` edges implied by a newly created fact.
fn derived_edge_queries(fact: &Fact, now: &str) -> Vec<Query> {
    let cypher = match &fact.body {
        FactBody::EconomicRisk(r) if r.perpetrator.is_some() => Some(
            "MATCH (:Recipient {id: $rid})-[:HAS_FAMILY]->(m:FamilyMember)
             WHERE m.contactName = $name
             MATCH (f:Fact {id: $id})
             MERGE (m)-[e:POSES_RISK]->(f)
             ON CREATE SET e.id = randomUUID(), e.createdAt = $now",
        ),
        FactBody::FamilyMember(_) => Some(
            "MATCH (:Recipient {id: $rid})-[:FACES_RISK]->(k:EconomicRisk)
             WHERE k.perpetrator = $name
             MATCH (f:Fact {id: $id})
             MERGE (f)-[e:POSES_RISK]->(k)
             ON CREATE SET e.id = randomUUID(), e.createdAt = $now",
        ),
        FactBody::DailyLifeSupportService(_) => Some(
            "MATCH (:Recipient {id: $rid})-[:FACES_RISK]->(k:EconomicRisk {status: 'Active'})
             MATCH (f:Fact {id: $id})
             MERGE (k)-[e:MITIGATED_BY]->(f)
             ON CREATE SET e.id = randomUUID(), e.createdAt = $now",
        ),
        _ => None,
    };
    let name = match &fact.body {
        FactBody::EconomicRisk(r) => r.perpetrator.clone().unwrap_or_default(),
        FactBody::FamilyMember(c) => c.name.clone(),
        _ => String::new(),
    };

    cypher
        .map(|c| {
            query(c)
                .param("rid", fact.recipient_id.to_string())
                .param("id", fact.id.to_string())
                .param("name", name)
                .param("now", now.to_string())
        })
        .into_iter()
        .collect()
}

/// Fixed-width UTC timestamp so string order matches time order.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Bare serde name of a unit enum variant (`"Active"`, `"self_declared"`).
fn wire<T: Serialize>(val: &T) -> String {
    match serde_json::to_value(val) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
