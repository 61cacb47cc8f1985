//! Dignity Audit: tamper-evident record of every read and write.
//!
//! Each operation on recipient data emits one [`AuditEvent`]. Sinks wrap
//! events into [`AuditEntry`] values chained by BLAKE3 hashes, so a removed,
//! edited or reordered entry breaks [`verify_chain`].

pub mod hash;
pub mod sink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use hash::{verify_chain, ChainError, GENESIS_HASH};
pub use sink::{AuditSink, JsonlAuditSink, MemoryAuditSink, SinkError};

// ── Core Types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Read,
    Update,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditResult {
    Success,
    Failure,
}

/// One read or write against recipient data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub action: AuditAction,
    /// e.g. `Briefing`, `EconomicRisk`, `GuidanceCheck`.
    pub resource_type: String,
    pub resource_id: String,
    pub result: AuditResult,
}

impl AuditEvent {
    pub fn new(
        actor_id: &str,
        action: AuditAction,
        resource_type: &str,
        resource_id: impl ToString,
        result: AuditResult,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id: actor_id.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            result,
        }
    }
}

/// An event as persisted: positioned and hash-linked to its predecessor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    /// `entry_hash` of the previous entry; [`GENESIS_HASH`] for the first.
    pub previous_hash: String,
    /// BLAKE3 (hex) over the event, `previous_hash` and `sequence`.
    pub entry_hash: String,
    pub event: AuditEvent,
}

impl AuditEntry {
    /// Chain `event` after an entry with the given sequence and hash.
    pub fn chain(sequence: u64, previous_hash: &str, event: AuditEvent) -> Result<Self, SinkError> {
        let entry_hash = hash::compute_entry_hash(sequence, previous_hash, &event)?;
        Ok(Self {
            sequence,
            previous_hash: previous_hash.to_string(),
            entry_hash,
            event,
        })
    }

    /// Whether the stored hash matches the entry's content.
    pub fn verify_integrity(&self) -> bool {
        hash::compute_entry_hash(self.sequence, &self.previous_hash, &self.event)
            .map(|h| h == self.entry_hash)
            .unwrap_or(false)
    }
}
