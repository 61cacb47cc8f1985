//! Audit sinks: trait + in-memory and JSON-lines implementations.
//!
//! Sinks only append. There is no update or delete path.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::hash::{verify_chain, ChainError, GENESIS_HASH};
use crate::{AuditEntry, AuditEvent};

/// Errors that can occur while recording audit events.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Audit log at {path} failed verification: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: ChainError,
    },

    #[error("Audit sink lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for audit persistence backends.
pub trait AuditSink: Send + Sync {
    /// Chain and persist one event.
    fn record(&self, event: AuditEvent) -> Result<AuditEntry, SinkError>;

    /// Every entry recorded so far, in sequence order.
    fn entries(&self) -> Result<Vec<AuditEntry>, SinkError>;
}

/// Position of the next entry in a chain.
#[derive(Debug, Clone)]
struct ChainHead {
    next_sequence: u64,
    last_hash: String,
}

impl Default for ChainHead {
    fn default() -> Self {
        Self {
            next_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
        }
    }
}

impl ChainHead {
    fn advance(&mut self, event: AuditEvent) -> Result<AuditEntry, SinkError> {
        let entry = AuditEntry::chain(self.next_sequence, &self.last_hash, event)?;
        self.next_sequence += 1;
        self.last_hash = entry.entry_hash.clone();
        Ok(entry)
    }
}

/// In-memory sink, used by tests and short-lived processes.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<AuditEntry, SinkError> {
        let mut entries = self.entries.lock().map_err(|_| SinkError::Poisoned)?;
        let mut head = match entries.last() {
            Some(last) => ChainHead {
                next_sequence: last.sequence + 1,
                last_hash: last.entry_hash.clone(),
            },
            None => ChainHead::default(),
        };
        let entry = head.advance(event)?;
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, SinkError> {
        Ok(self.entries.lock().map_err(|_| SinkError::Poisoned)?.clone())
    }
}

/// Append-only JSON-lines file sink.
///
/// On open, the existing file is read and verified so new entries continue
/// the same chain.
pub struct JsonlAuditSink {
    path: PathBuf,
    head: Mutex<ChainHead>,
}

impl JsonlAuditSink {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = read_entries(&path)?;
        verify_chain(&existing).map_err(|source| SinkError::Corrupted {
            path: path.clone(),
            source,
        })?;
        let head = match existing.last() {
            Some(last) => ChainHead {
                next_sequence: last.sequence + 1,
                last_hash: last.entry_hash.clone(),
            },
            None => ChainHead::default(),
        };

        tracing::debug!(
            path = %path.display(),
            entries = existing.len(),
            "Audit log opened"
        );
        Ok(Self {
            path,
            head: Mutex::new(head),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: AuditEvent) -> Result<AuditEntry, SinkError> {
        let mut head = self.head.lock().map_err(|_| SinkError::Poisoned)?;
        let mut next = head.clone();
        let entry = next.advance(event)?;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        // Advance only once the entry is durable.
        *head = next;
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, SinkError> {
        read_entries(&self.path)
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, SinkError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(fs::File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditAction, AuditResult};

    fn event(resource_id: &str) -> AuditEvent {
        AuditEvent::new(
            "cw-1",
            AuditAction::Read,
            "Briefing",
            resource_id,
            AuditResult::Success,
        )
    }

    #[test]
    fn memory_sink_chains_entries() {
        let sink = MemoryAuditSink::new();
        let first = sink.record(event("a")).unwrap();
        let second = sink.record(event("b")).unwrap();

        assert_eq!(first.previous_hash, GENESIS_HASH);
        assert_eq!(second.previous_hash, first.entry_hash);
        assert_eq!(second.sequence, 1);
        assert!(verify_chain(&sink.entries().unwrap()).is_ok());
    }

    #[test]
    fn jsonl_sink_continues_chain_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("audit.jsonl");

        {
            let sink = JsonlAuditSink::open(&path).unwrap();
            sink.record(event("a")).unwrap();
            sink.record(event("b")).unwrap();
        }

        let sink = JsonlAuditSink::open(&path).unwrap();
        let third = sink.record(event("c")).unwrap();
        assert_eq!(third.sequence, 2);

        let entries = sink.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(verify_chain(&entries).is_ok());
    }

    #[test]
    fn jsonl_sink_refuses_tampered_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let sink = JsonlAuditSink::open(&path).unwrap();
            sink.record(event("a")).unwrap();
            sink.record(event("b")).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        fs::write(&path, contents.replace("\"resourceId\":\"a\"", "\"resourceId\":\"z\"")).unwrap();

        let err = JsonlAuditSink::open(&path).err().unwrap();
        assert!(matches!(
            err,
            SinkError::Corrupted {
                source: ChainError::Tampered { index: 0 },
                ..
            }
        ));
    }
}
