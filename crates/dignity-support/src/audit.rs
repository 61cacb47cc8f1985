//! Audit emission for support operations.

use std::sync::Arc;

use dignity_audit::{AuditAction, AuditEntry, AuditEvent, AuditResult, AuditSink};

use crate::error::Result;

/// Writes one event per operation. A failed write fails the operation.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn record(
        &self,
        actor_id: &str,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        result: AuditResult,
    ) -> Result<()> {
        let event = AuditEvent::new(actor_id, action, resource_type, resource_id, result);
        match self.sink.record(event) {
            Ok(entry) => {
                tracing::debug!(
                    sequence = entry.sequence,
                    resource_type,
                    result = ?result,
                    "Audit event recorded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, resource_type, "Audit sink rejected event");
                Err(e.into())
            }
        }
    }

    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.sink.entries()?)
    }
}
