//! Read operations against the Neo4j knowledge graph.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use neo4rs::query;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use dignity_core::types::{FactKind, StatusChange};
use dignity_core::{CasePattern, Fact, FactBody, FactId, Recipient, RecipientId};

use crate::client::{GraphClient, GraphError, Result};
use crate::repository::{latest_collaborations, Evidence, StoredFact};

/// Shared tail of every fact read: payload plus aggregated evidence edges.
const FACT_RETURN: &str = "
    OPTIONAL MATCH (f)-[:CORROBORATED_BY]->(pc:ProvenanceRecord)
    WITH f, collect(DISTINCT pc.id) AS corroborating
    OPTIONAL MATCH (f)-[x:CONTRADICTED_BY]->(px:ProvenanceRecord)
    WITH f, corroborating,
         collect(CASE WHEN x.resolvedAt IS NULL THEN px.id END) AS contradicting,
         count(x.resolvedAt) AS resolved
    RETURN f.id AS id, f.recipientId AS recipient_id, f.origin AS origin,
           f.recordedAt AS recorded_at, f.payload AS payload, f.status AS status,
           corroborating, contradicting, resolved
    ORDER BY f.recordedAt ASC";

impl GraphClient {
    /// Get a recipient by id.
    pub async fn fetch_recipient(&self, id: RecipientId) -> Result<Recipient> {
        let q = query(
            "MATCH (r:Recipient {id: $id})
             RETURN r.id AS id, r.name AS name,
                    r.protectionStartDate AS start_date, r.createdAt AS created_at",
        )
        .param("id", id.to_string());

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| GraphError::not_found("Recipient", id))?;

        let start: String = row.get("start_date").unwrap_or_default();
        Ok(Recipient {
            id: RecipientId(parse_uuid(&get_string(&row, "id")?)?),
            name: get_string(&row, "name")?,
            protection_start_date: NaiveDate::parse_from_str(&start, "%Y-%m-%d").ok(),
            created_at: parse_time(&get_string(&row, "created_at")?)?,
        })
    }

    /// Facts of the given kinds (all kinds when empty), oldest first.
    pub async fn fetch_facts(
        &self,
        recipient_id: RecipientId,
        kinds: &[FactKind],
    ) -> Result<Vec<StoredFact>> {
        self.fetch_recipient(recipient_id).await?;

        let labels: Vec<String> = if kinds.is_empty() {
            FactKind::ALL.iter().map(|k| k.label().to_string()).collect()
        } else {
            kinds.iter().map(|k| k.label().to_string()).collect()
        };
        let cypher = format!(
            "MATCH (:Recipient {{id: $rid}})-[]->(f:Fact)
             WHERE f.kind IN $kinds
             {FACT_RETURN}"
        );
        let q = query(&cypher)
            .param("rid", recipient_id.to_string())
            .param("kinds", labels);

        let rows = self.query_rows(q).await?;
        tracing::debug!(recipient_id = %recipient_id, rows = rows.len(), "Fetched facts");
        rows.iter().map(stored_fact_from_row).collect()
    }

    /// Active EconomicRisk facts for a recipient.
    pub async fn fetch_active_risks(&self, recipient_id: RecipientId) -> Result<Vec<StoredFact>> {
        self.fetch_recipient(recipient_id).await?;

        let cypher = format!(
            "MATCH (:Recipient {{id: $rid}})-[:FACES_RISK]->(f:EconomicRisk)
             WHERE f.status = 'Active'
             {FACT_RETURN}"
        );
        let q = query(&cypher).param("rid", recipient_id.to_string());
        let rows = self.query_rows(q).await?;
        rows.iter().map(stored_fact_from_row).collect()
    }

    /// Collaboration records, latest meeting date first.
    ///
    /// The meeting date lives in the payload, so ordering happens after the read.
    pub async fn fetch_collaboration_history(
        &self,
        recipient_id: RecipientId,
        limit: usize,
    ) -> Result<Vec<StoredFact>> {
        let facts = self
            .fetch_facts(recipient_id, &[FactKind::CollaborationRecord])
            .await?;
        Ok(latest_collaborations(facts, limit))
    }

    /// A single fact with its evidence, if present.
    pub async fn fetch_fact(&self, fact_id: FactId) -> Result<Option<StoredFact>> {
        let cypher = format!("MATCH (f:Fact {{id: $id}}) {FACT_RETURN}");
        let q = query(&cypher).param("id", fact_id.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(Some(stored_fact_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Case patterns sharing at least one indicator with the signal set.
    pub async fn fetch_patterns(&self, indicators: &BTreeSet<String>) -> Result<Vec<CasePattern>> {
        if indicators.is_empty() {
            return Ok(Vec::new());
        }
        let q = query(
            "MATCH (p:CasePattern)
             WHERE any(i IN p.indicators WHERE i IN $signals)
             RETURN p.patternName AS pattern_name, p.description AS description,
                    p.indicators AS indicators, p.riskFactors AS risk_factors,
                    p.recommendedInterventions AS interventions,
                    p.relatedServices AS services, p.successfulCases AS successful_cases
             ORDER BY p.patternName",
        )
        .param("signals", indicators.iter().cloned().collect::<Vec<_>>());

        let rows = self.query_rows(q).await?;
        let mut patterns = Vec::with_capacity(rows.len());
        for row in rows {
            patterns.push(CasePattern {
                pattern_name: get_string(&row, "pattern_name")?,
                description: row.get("description").unwrap_or_default(),
                indicators: row.get("indicators").unwrap_or_default(),
                risk_factors: row.get("risk_factors").unwrap_or_default(),
                recommended_interventions: row.get("interventions").unwrap_or_default(),
                related_services: row.get("services").unwrap_or_default(),
                successful_cases: row.get::<i64>("successful_cases").unwrap_or(0).max(0) as u32,
            });
        }
        Ok(patterns)
    }

    /// Status changes recorded for a risk, oldest first.
    pub async fn fetch_status_history(&self, risk_id: FactId) -> Result<Vec<StatusChange>> {
        if self.fetch_fact(risk_id).await?.is_none() {
            return Err(GraphError::not_found("Fact", risk_id));
        }
        let q = query(
            "MATCH (:EconomicRisk {id: $id})-[:STATUS_CHANGED]->(c:StatusChange)
             RETURN c.from AS from, c.to AS to, c.changedAt AS changed_at
             ORDER BY c.changedAt ASC",
        )
        .param("id", risk_id.to_string());

        let rows = self.query_rows(q).await?;
        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            history.push(StatusChange {
                risk_id,
                from: from_wire(&get_string(&row, "from")?)?,
                to: from_wire(&get_string(&row, "to")?)?,
                changed_at: parse_time(&get_string(&row, "changed_at")?)?,
            });
        }
        Ok(history)
    }

    /// Count fact and provenance nodes for a recipient.
    pub async fn count_recipient_nodes(&self, recipient_id: RecipientId) -> Result<usize> {
        self.fetch_recipient(recipient_id).await?;
        let q = query(
            "MATCH (n {recipientId: $rid})
             WHERE n:Fact OR n:ProvenanceRecord
             RETURN count(n) AS cnt",
        )
        .param("rid", recipient_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0).max(0) as usize),
            None => Ok(0),
        }
    }

    /// Recipient owning a provenance record, if it exists.
    pub(crate) async fn provenance_owner(&self, id: FactId) -> Result<Option<RecipientId>> {
        let q = query("MATCH (p:ProvenanceRecord {id: $id}) RETURN p.recipientId AS rid")
            .param("id", id.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(Some(RecipientId(parse_uuid(&get_string(&row, "rid")?)?))),
            None => Ok(None),
        }
    }
}

// ── Row decoding ─────────────────────────────────────────────────

fn stored_fact_from_row(row: &neo4rs::Row) -> Result<StoredFact> {
    let payload = get_string(row, "payload")?;
    let mut body: FactBody = serde_json::from_str(&payload)?;

    // The status property supersedes the status captured at creation.
    let status: String = row.get("status").unwrap_or_default();
    if let FactBody::EconomicRisk(risk) = &mut body {
        if !status.is_empty() {
            risk.status = from_wire(&status)?;
        }
    }

    let ids = |key: &str| -> Result<Vec<FactId>> {
        let raw: Vec<String> = row.get(key).unwrap_or_default();
        raw.iter().map(|s| parse_uuid(s).map(FactId)).collect()
    };

    Ok(StoredFact {
        fact: Fact {
            id: FactId(parse_uuid(&get_string(row, "id")?)?),
            recipient_id: RecipientId(parse_uuid(&get_string(row, "recipient_id")?)?),
            origin: from_wire(&get_string(row, "origin")?)?,
            recorded_at: parse_time(&get_string(row, "recorded_at")?)?,
            body,
        },
        evidence: Evidence {
            corroborating: ids("corroborating")?,
            contradicting: ids("contradicting")?,
            resolved_contradictions: row.get::<i64>("resolved").unwrap_or(0).max(0) as usize,
        },
    })
}

fn get_string(row: &neo4rs::Row, key: &str) -> Result<String> {
    row.get::<String>(key)
        .map_err(|e| GraphError::Serialization(format!("Failed to read column {key}: {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| GraphError::Serialization(format!("bad id {s:?}: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GraphError::Serialization(format!("bad timestamp {s:?}: {e}")))
}

/// Parse an enum from its bare serde name (as stored on graph properties).
pub(crate) fn from_wire<T: DeserializeOwned>(s: &str) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(
        s.to_string(),
    ))?)
}
