//! BLAKE3 hash chain over audit entries.

use serde::Serialize;

use crate::sink::SinkError;
use crate::{AuditEntry, AuditEvent};

/// `previous_hash` of the first entry in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Hashable representation of an entry (excludes `entry_hash`).
#[derive(Serialize)]
struct HashableEntry<'a> {
    sequence: u64,
    previous_hash: &'a str,
    event: &'a AuditEvent,
}

/// Compute the hex BLAKE3 hash binding an event to its chain position.
pub fn compute_entry_hash(
    sequence: u64,
    previous_hash: &str,
    event: &AuditEvent,
) -> Result<String, SinkError> {
    let hashable = HashableEntry {
        sequence,
        previous_hash,
        event,
    };
    let json = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// Where and why a chain stopped verifying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("entry {index}: expected sequence {expected}, found {found}")]
    Sequence { index: usize, expected: u64, found: u64 },

    #[error("entry {index}: previous hash does not match the preceding entry")]
    BrokenLink { index: usize },

    #[error("entry {index}: content does not match its hash")]
    Tampered { index: usize },
}

/// Verify an entire log from the genesis entry.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), ChainError> {
    let mut previous: &str = GENESIS_HASH;
    for (index, entry) in entries.iter().enumerate() {
        let expected = index as u64;
        if entry.sequence != expected {
            return Err(ChainError::Sequence {
                index,
                expected,
                found: entry.sequence,
            });
        }
        if entry.previous_hash != previous {
            return Err(ChainError::BrokenLink { index });
        }
        if !entry.verify_integrity() {
            return Err(ChainError::Tampered { index });
        }
        previous = entry.entry_hash.as_str();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditAction, AuditResult};

    fn chain_of(n: usize) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = Vec::new();
        for i in 0..n {
            let previous = entries
                .last()
                .map(|e| e.entry_hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string());
            let event = AuditEvent::new(
                "cw-1",
                AuditAction::Read,
                "Briefing",
                format!("recipient-{i}"),
                AuditResult::Success,
            );
            entries.push(AuditEntry::chain(i as u64, &previous, event).unwrap());
        }
        entries
    }

    #[test]
    fn genesis_hash_is_64_zeros() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn intact_chain_verifies() {
        assert!(verify_chain(&chain_of(5)).is_ok());
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn removed_entry_is_detected() {
        let mut entries = chain_of(4);
        entries.remove(1);
        assert_eq!(
            verify_chain(&entries),
            Err(ChainError::Sequence {
                index: 1,
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn reordered_entries_are_detected() {
        let mut entries = chain_of(3);
        entries.swap(1, 2);
        assert!(verify_chain(&entries).is_err());
    }

    #[test]
    fn edited_event_is_detected() {
        let mut entries = chain_of(3);
        entries[2].event.actor_id = "intruder".to_string();
        assert_eq!(verify_chain(&entries), Err(ChainError::Tampered { index: 2 }));
    }

    #[test]
    fn hash_depends_on_position() {
        let event = AuditEvent::new("a", AuditAction::Create, "Fact", "f", AuditResult::Success);
        let h0 = compute_entry_hash(0, GENESIS_HASH, &event).unwrap();
        let h1 = compute_entry_hash(1, GENESIS_HASH, &event).unwrap();
        assert_ne!(h0, h1);
        assert_eq!(h0.len(), 64);
    }
}
