//! Dignity Support: decision support over the recipient knowledge graph.
//!
//! Components:
//! - [`reliability`]: reliability tier of a fact from its evidence edges
//! - [`guidance`]: harmful-guidance phrasing detection
//! - [`signals`]: economic-risk and collaboration signals in narrative
//! - [`briefing`]: safety-ordered pre-visit briefing
//! - [`matcher`]: similar-case ranking against the case pattern catalogue
//! - [`handover`]: fixed ten-section handover document
//! - [`financial`]: financial safety summary and collaboration history
//! - [`extraction`]: candidate facts from the narrative extraction service
//!
//! [`SupportService`] is the caller-facing entry point. It checks the
//! actor's permissions and writes one audit event per operation.

pub mod audit;
pub mod briefing;
pub mod error;
pub mod extraction;
pub mod financial;
pub mod guidance;
pub mod handover;
pub mod matcher;
pub mod reliability;
pub mod signals;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use dignity_audit::{AuditAction, AuditEntry, AuditResult, AuditSink};
use dignity_core::{
    AccessPolicy, Actor, CasePattern, Fact, FactId, Permission, ProvenanceRecord, Recipient,
    RecipientId, RiskStatus,
};
use dignity_graph::{EvidenceKind, GraphRepository};

pub use audit::AuditRecorder;
pub use briefing::{Briefing, BriefingEngine, BriefingSection, BriefingSectionKind, TieredFact};
pub use error::{Result, SupportError};
pub use extraction::{CandidateFact, ExtractionResult};
pub use financial::{CollaborationEntry, FinancialSafetyReader, FinancialSafetySummary};
pub use guidance::{GuidanceDetector, GuidanceMatch, GuidanceReport, GuidanceRuleSet};
pub use handover::{HandoverComposer, HandoverDocument, HandoverSection};
pub use matcher::{CaseMatcher, PatternMatch};
pub use reliability::{classify, classify_fact, ReliabilityTier};
pub use signals::{DetectedSignal, SignalDetector, SignalReport, SignalRuleSet};

/// Permission-checked, audited facade over the support components.
pub struct SupportService {
    repo: Arc<dyn GraphRepository>,
    audit: AuditRecorder,
    policy: AccessPolicy,
    guidance: Arc<GuidanceDetector>,
    economic_signals: Arc<SignalDetector>,
    collaboration_signals: Arc<SignalDetector>,
    briefing: BriefingEngine,
    matcher: CaseMatcher,
    handover: HandoverComposer,
    financial: FinancialSafetyReader,
}

impl SupportService {
    /// A service with the default access policy and the built-in rule tables.
    pub fn new(repo: Arc<dyn GraphRepository>, sink: Arc<dyn AuditSink>) -> Result<Self> {
        Ok(Self {
            briefing: BriefingEngine::new(repo.clone()),
            matcher: CaseMatcher::new(repo.clone()),
            handover: HandoverComposer::new(repo.clone()),
            financial: FinancialSafetyReader::new(repo.clone()),
            repo,
            audit: AuditRecorder::new(sink),
            policy: AccessPolicy::default(),
            guidance: Arc::new(GuidanceDetector::builtin()?),
            economic_signals: Arc::new(SignalDetector::economic_risk()?),
            collaboration_signals: Arc::new(SignalDetector::collaboration()?),
        })
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_guidance(mut self, detector: GuidanceDetector) -> Self {
        self.guidance = Arc::new(detector);
        self
    }

    pub fn with_signals(mut self, economic: SignalDetector, collaboration: SignalDetector) -> Self {
        self.economic_signals = Arc::new(economic);
        self.collaboration_signals = Arc::new(collaboration);
        self
    }

    // ── Queries ──────────────────────────────────────────────────

    pub async fn briefing(&self, actor: &Actor, recipient_id: RecipientId) -> Result<Briefing> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "Briefing", &resource_id)?;
        let result = self.briefing.briefing(recipient_id).await;
        self.audited(actor, AuditAction::Read, "Briefing", &resource_id, result)
    }

    pub async fn handover(
        &self,
        actor: &Actor,
        recipient_id: RecipientId,
    ) -> Result<HandoverDocument> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "Handover", &resource_id)?;
        let result = self.handover.handover(recipient_id).await;
        self.audited(actor, AuditAction::Read, "Handover", &resource_id, result)
    }

    pub async fn similar_cases(
        &self,
        actor: &Actor,
        recipient_id: RecipientId,
        limit: Option<usize>,
    ) -> Result<Vec<PatternMatch>> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "CasePattern", &resource_id)?;
        let result = self.matcher.similar_cases(recipient_id, limit).await;
        self.audited(actor, AuditAction::Read, "CasePattern", &resource_id, result)
    }

    /// Check narrative text. The audit event identifies the text by its hash.
    pub fn guidance_check(&self, actor: &Actor, text: &str) -> Result<GuidanceReport> {
        let resource_id = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "GuidanceCheck", &resource_id)?;
        let report = self.guidance.check(text);
        if !report.matches.is_empty() {
            tracing::info!(
                matches = report.matches.len(),
                rules_version = %report.rules_version,
                "Harmful guidance phrasing detected"
            );
        }
        self.audited(actor, AuditAction::Read, "GuidanceCheck", &resource_id, Ok(report))
    }

    /// Economic-risk signals in narrative text, audited by text hash like a guidance check.
    pub fn economic_risk_signals(&self, actor: &Actor, text: &str) -> Result<SignalReport> {
        let report = self.detect_signals(actor, text, "EconomicRiskSignals", &self.economic_signals)?;
        if !report.signals.is_empty() {
            tracing::warn!(
                signals = report.signals.len(),
                rules_version = %report.rules_version,
                "Economic risk signals detected"
            );
        }
        Ok(report)
    }

    pub fn collaboration_signals(&self, actor: &Actor, text: &str) -> Result<SignalReport> {
        self.detect_signals(actor, text, "CollaborationSignals", &self.collaboration_signals)
    }

    pub async fn financial_safety_summary(
        &self,
        actor: &Actor,
        recipient_id: RecipientId,
    ) -> Result<FinancialSafetySummary> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "FinancialSafety", &resource_id)?;
        let result = self.financial.summary(recipient_id).await;
        self.audited(actor, AuditAction::Read, "FinancialSafety", &resource_id, result)
    }

    /// Collaboration records, latest meeting first (ten when `limit` is unset).
    pub async fn collaboration_history(
        &self,
        actor: &Actor,
        recipient_id: RecipientId,
        limit: Option<usize>,
    ) -> Result<Vec<CollaborationEntry>> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, "CollaborationRecord", &resource_id)?;
        let result = self.financial.collaboration_history(recipient_id, limit).await;
        self.audited(actor, AuditAction::Read, "CollaborationRecord", &resource_id, result)
    }

    /// The audit log itself. Reading it is audited too.
    pub fn audit_log(&self, actor: &Actor) -> Result<Vec<AuditEntry>> {
        self.authorize(actor, Permission::ViewAuditLogs, AuditAction::Read, "AuditLog", "*")?;
        let result = self.audit.entries();
        self.audited(actor, AuditAction::Read, "AuditLog", "*", result)
    }

    // ── Writes ───────────────────────────────────────────────────

    pub async fn register_recipient(&self, actor: &Actor, recipient: &Recipient) -> Result<()> {
        let resource_id = recipient.id.to_string();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Create, "Recipient", &resource_id)?;
        let result = self.repo.create_recipient(recipient).await.map_err(SupportError::from);
        self.audited(actor, AuditAction::Create, "Recipient", &resource_id, result)
    }

    pub async fn record_provenance(
        &self,
        actor: &Actor,
        record: &ProvenanceRecord,
    ) -> Result<FactId> {
        let resource_id = record.id.to_string();
        let resource_type = record.kind.label();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Create, resource_type, &resource_id)?;
        let result = self.repo.append_provenance(record).await.map_err(SupportError::from);
        self.audited(actor, AuditAction::Create, resource_type, &resource_id, result)
    }

    pub async fn record_fact(
        &self,
        actor: &Actor,
        fact: &Fact,
        provenance_ids: &[FactId],
    ) -> Result<FactId> {
        let resource_id = fact.id.to_string();
        let resource_type = fact.kind().label();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Create, resource_type, &resource_id)?;
        let result = self
            .repo
            .append_fact(fact, provenance_ids)
            .await
            .map_err(SupportError::from);
        self.audited(actor, AuditAction::Create, resource_type, &resource_id, result)
    }

    /// Store an extraction candidate. It must cite at least one record.
    pub async fn confirm_candidate(
        &self,
        actor: &Actor,
        candidate: CandidateFact,
        provenance_ids: &[FactId],
    ) -> Result<FactId> {
        let resource_id = candidate.id.to_string();
        let resource_type = candidate.kind().label();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Create, resource_type, &resource_id)?;
        let result = if provenance_ids.is_empty() {
            Err(SupportError::InvalidInput(format!(
                "candidate {resource_id} cannot be confirmed without a provenance record"
            )))
        } else {
            let fact = candidate.into_fact();
            self.repo
                .append_fact(&fact, provenance_ids)
                .await
                .map_err(SupportError::from)
        };
        self.audited(actor, AuditAction::Create, resource_type, &resource_id, result)
    }

    pub async fn transition_risk(
        &self,
        actor: &Actor,
        risk_id: FactId,
        from: RiskStatus,
        to: RiskStatus,
    ) -> Result<()> {
        let resource_id = risk_id.to_string();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Update, "EconomicRisk", &resource_id)?;
        let result = self
            .repo
            .transition_status(risk_id, from, to)
            .await
            .map_err(SupportError::from);
        self.audited(actor, AuditAction::Update, "EconomicRisk", &resource_id, result)
    }

    pub async fn add_evidence(
        &self,
        actor: &Actor,
        fact_id: FactId,
        provenance_id: FactId,
        kind: EvidenceKind,
    ) -> Result<()> {
        let resource_id = fact_id.to_string();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Update, "Evidence", &resource_id)?;
        let result = self
            .repo
            .add_evidence(fact_id, provenance_id, kind)
            .await
            .map_err(SupportError::from);
        self.audited(actor, AuditAction::Update, "Evidence", &resource_id, result)
    }

    pub async fn resolve_contradiction(
        &self,
        actor: &Actor,
        fact_id: FactId,
        provenance_id: FactId,
    ) -> Result<()> {
        let resource_id = fact_id.to_string();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Update, "Evidence", &resource_id)?;
        let result = self
            .repo
            .resolve_contradiction(fact_id, provenance_id)
            .await
            .map_err(SupportError::from);
        self.audited(actor, AuditAction::Update, "Evidence", &resource_id, result)
    }

    /// Record that a recipient matches a case pattern, attributed to the actor.
    pub async fn link_pattern(
        &self,
        actor: &Actor,
        recipient_id: RecipientId,
        pattern_name: &str,
    ) -> Result<()> {
        let resource_id = recipient_id.to_string();
        self.authorize(actor, Permission::WriteOwnCases, AuditAction::Create, "MatchesPattern", &resource_id)?;
        let result = self
            .repo
            .link_pattern(recipient_id, pattern_name, &actor.id)
            .await
            .map_err(SupportError::from);
        self.audited(actor, AuditAction::Create, "MatchesPattern", &resource_id, result)
    }

    /// Load case patterns into the catalogue. Admin only.
    pub async fn seed_patterns(&self, actor: &Actor, patterns: &[CasePattern]) -> Result<usize> {
        self.authorize(actor, Permission::SystemAdmin, AuditAction::Create, "CasePattern", "*")?;
        let result = async {
            for pattern in patterns {
                self.repo.upsert_pattern(pattern).await?;
            }
            Ok::<_, SupportError>(patterns.len())
        }
        .await;
        if let Ok(count) = &result {
            tracing::info!(count, "Case patterns seeded");
        }
        self.audited(actor, AuditAction::Create, "CasePattern", "*", result)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn detect_signals(
        &self,
        actor: &Actor,
        text: &str,
        resource_type: &str,
        detector: &SignalDetector,
    ) -> Result<SignalReport> {
        let resource_id = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.authorize(actor, Permission::ReadOwnCases, AuditAction::Read, resource_type, &resource_id)?;
        let report = detector.detect(text);
        self.audited(actor, AuditAction::Read, resource_type, &resource_id, Ok(report))
    }

    fn authorize(
        &self,
        actor: &Actor,
        permission: Permission,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<()> {
        if self.policy.allows(actor, permission) {
            return Ok(());
        }
        tracing::warn!(
            actor = %actor.id,
            permission = %permission,
            resource_type,
            "Permission denied"
        );
        self.audit
            .record(&actor.id, action, resource_type, resource_id, AuditResult::Failure)?;
        Err(SupportError::PermissionDenied {
            actor: actor.id.clone(),
            permission,
        })
    }

    /// Audit the outcome. If the audit write fails, so does the operation.
    fn audited<T>(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        result: Result<T>,
    ) -> Result<T> {
        let outcome = match &result {
            Ok(_) => AuditResult::Success,
            Err(_) => AuditResult::Failure,
        };
        self.audit
            .record(&actor.id, action, resource_type, resource_id, outcome)?;
        result
    }
}
