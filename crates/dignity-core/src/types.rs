//! Core domain types for the Dignity support graph.
//!
//! These types represent the nodes and edges of a recipient's knowledge
//! graph. Nodes are always referenced through stable opaque ids; edges are
//! typed `(source, edge_type, target)` triples, so cyclic relationships such
//! as FamilyMember → EconomicRisk → CollaborationRecord never form ownership
//! cycles in memory.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// ── Identifiers ───────────────────────────────────────────────────

/// Namespace for deterministic ids derived from natural keys (pattern names).
const PATTERN_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_42d9_83a7_4e51_b7a2_0c5d_91e3_aa10);

/// Unique identifier for any node in the knowledge graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a livelihood-protection recipient, the root of all facts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(pub Uuid);

impl RecipientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecipientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecipientId> for NodeId {
    fn from(id: RecipientId) -> Self {
        NodeId(id.0)
    }
}

/// Identifier of a fact or provenance record node.
///
/// Callers may supply their own id to make `append_fact` idempotent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactId(pub Uuid);

impl FactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<FactId> for NodeId {
    fn from(id: FactId) -> Self {
        NodeId(id.0)
    }
}

// ── Recipient & Provenance ────────────────────────────────────────

/// A person receiving livelihood-protection support.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub protection_start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    pub fn new(name: &str, protection_start_date: Option<NaiveDate>) -> Self {
        Self {
            id: RecipientId::new(),
            name: name.to_string(),
            protection_start_date,
            created_at: Utc::now(),
        }
    }
}

/// The kind of primary evidence a provenance record captures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProvenanceKind {
    CaseRecord,
    HomeVisit,
    Interaction,
    Observation,
}

impl ProvenanceKind {
    /// Graph label for this record kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CaseRecord => "CaseRecord",
            Self::HomeVisit => "HomeVisit",
            Self::Interaction => "Interaction",
            Self::Observation => "Observation",
        }
    }
}

/// A dated primary observation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvenanceRecord {
    pub id: FactId,
    pub recipient_id: RecipientId,
    pub kind: ProvenanceKind,
    pub date: NaiveDate,
    pub content: String,
    pub recorded_by: String,
    pub reliability_hint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProvenanceRecord {
    pub fn new(
        recipient_id: RecipientId,
        kind: ProvenanceKind,
        date: NaiveDate,
        content: &str,
        recorded_by: &str,
    ) -> Self {
        Self {
            id: FactId::new(),
            recipient_id,
            kind,
            date,
            content: content.to_string(),
            recorded_by: recorded_by.to_string(),
            reliability_hint: None,
            created_at: Utc::now(),
        }
    }
}

// ── Enums ─────────────────────────────────────────────────────────

/// Risk level / severity. Ordered so that `High` is the greatest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Lifecycle of an economic risk. Only moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskStatus {
    Active,
    Monitoring,
    Resolved,
}

impl RiskStatus {
    /// Whether `self → to` is a legal forward transition.
    pub fn can_transition_to(self, to: RiskStatus) -> bool {
        to > self
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "Active",
            Self::Monitoring => "Monitoring",
            Self::Resolved => "Resolved",
        };
        f.write_str(s)
    }
}

/// How well a recipient manages money.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MoneyCapability {
    #[serde(rename = "Self")]
    SelfManaged,
    Supported,
    NeedsSupport,
    Difficult,
}

impl MoneyCapability {
    /// Capabilities whose pattern tags count as risk signals for case matching.
    pub fn is_at_risk(&self) -> bool {
        matches!(self, Self::NeedsSupport | Self::Difficult)
    }
}

/// Status of a derived profile trait or support goal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TraitStatus {
    #[default]
    Current,
    Achieved,
    Superseded,
}

/// Where a fact came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FactOrigin {
    /// Entered by a caseworker.
    #[default]
    Caseworker,
    /// Proposed by the external extraction service and confirmed by a human.
    Extraction,
    /// Reported by an external agency (collaboration-sourced).
    Collaboration,
    /// Self-report only ("declared").
    SelfDeclared,
}

// ── Fact payloads ─────────────────────────────────────────────────

/// Effective / harmful ways of interacting with a recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApproachWisdom {
    pub description: String,
    /// Context (effective approaches) or reason (must-avoid approaches).
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub consequence: Option<String>,
}

/// A derived, continuously updated trait of the recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileTrait {
    pub description: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub status: TraitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MentalHealthStatus {
    pub diagnosis: String,
    #[serde(default)]
    pub current_status: String,
    #[serde(default)]
    pub treatment_status: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

/// Economic exploitation or money-loss risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomicRisk {
    pub risk_type: String,
    #[serde(default)]
    pub perpetrator: Option<String>,
    #[serde(default)]
    pub perpetrator_relationship: Option<String>,
    pub severity: RiskLevel,
    pub status: RiskStatus,
    pub discovered_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interventions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoneyManagementStatus {
    pub capability: MoneyCapability,
    #[serde(default)]
    pub pattern: String,
    /// Normalized pattern tags, comparable with CasePattern indicators.
    #[serde(default)]
    pub pattern_tags: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl MoneyManagementStatus {
    /// The pattern tags plus the free-text pattern, when present.
    pub fn signal_tags(&self) -> Vec<String> {
        let mut tags = self.pattern_tags.clone();
        let pattern = self.pattern.trim();
        if !pattern.is_empty() && !tags.iter().any(|t| t == pattern) {
            tags.push(pattern.to_string());
        }
        tags
    }
}

/// Daily-life independence support (mitigation for economic risk).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DailyLifeSupportService {
    pub provider: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub specialist: Option<String>,
}

/// Multi-agency collaboration log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationRecord {
    pub date: NaiveDate,
    pub collaboration_type: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<String>,
}

/// Self-reported life history. Reference only, never verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeclaredHistory {
    pub era: String,
    pub content: String,
}

/// A person or organization in the recipient's network. May be a risk source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NetworkContact {
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub risk_flag: bool,
}

/// Payload of a fact, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum FactBody {
    NgApproach(ApproachWisdom),
    EffectiveApproach(ApproachWisdom),
    TriggerSituation(ApproachWisdom),
    CriticalIncident(ApproachWisdom),
    Strength(ProfileTrait),
    Challenge(ProfileTrait),
    Pattern(ProfileTrait),
    SupportPreference(ProfileTrait),
    SupportGoal(ProfileTrait),
    MentalHealthStatus(MentalHealthStatus),
    EconomicRisk(EconomicRisk),
    MoneyManagementStatus(MoneyManagementStatus),
    DailyLifeSupportService(DailyLifeSupportService),
    CollaborationRecord(CollaborationRecord),
    DeclaredHistory(DeclaredHistory),
    FamilyMember(NetworkContact),
    KeyPerson(NetworkContact),
    SupportOrganization(NetworkContact),
}

impl FactBody {
    pub fn kind(&self) -> FactKind {
        match self {
            Self::NgApproach(_) => FactKind::NgApproach,
            Self::EffectiveApproach(_) => FactKind::EffectiveApproach,
            Self::TriggerSituation(_) => FactKind::TriggerSituation,
            Self::CriticalIncident(_) => FactKind::CriticalIncident,
            Self::Strength(_) => FactKind::Strength,
            Self::Challenge(_) => FactKind::Challenge,
            Self::Pattern(_) => FactKind::Pattern,
            Self::SupportPreference(_) => FactKind::SupportPreference,
            Self::SupportGoal(_) => FactKind::SupportGoal,
            Self::MentalHealthStatus(_) => FactKind::MentalHealthStatus,
            Self::EconomicRisk(_) => FactKind::EconomicRisk,
            Self::MoneyManagementStatus(_) => FactKind::MoneyManagementStatus,
            Self::DailyLifeSupportService(_) => FactKind::DailyLifeSupportService,
            Self::CollaborationRecord(_) => FactKind::CollaborationRecord,
            Self::DeclaredHistory(_) => FactKind::DeclaredHistory,
            Self::FamilyMember(_) => FactKind::FamilyMember,
            Self::KeyPerson(_) => FactKind::KeyPerson,
            Self::SupportOrganization(_) => FactKind::SupportOrganization,
        }
    }

    /// Key under which two facts are considered duplicates: (description, reason).
    ///
    /// Economic risks and collaboration records also key on the fields that
    /// tell two otherwise similar entries apart.
    pub fn dedup_key(&self) -> (String, String) {
        match self {
            Self::NgApproach(a)
            | Self::EffectiveApproach(a)
            | Self::TriggerSituation(a)
            | Self::CriticalIncident(a) => (a.description.clone(), a.reason.clone()),
            Self::Strength(t)
            | Self::Challenge(t)
            | Self::Pattern(t)
            | Self::SupportPreference(t)
            | Self::SupportGoal(t) => (t.description.clone(), t.context.clone()),
            Self::MentalHealthStatus(m) => (m.diagnosis.clone(), m.current_status.clone()),
            Self::EconomicRisk(r) => (
                r.risk_type.clone(),
                format!(
                    "{}\u{1f}{}\u{1f}{}",
                    r.description,
                    r.perpetrator.as_deref().unwrap_or_default(),
                    r.discovered_date
                ),
            ),
            Self::MoneyManagementStatus(m) => (m.pattern.clone(), String::new()),
            Self::DailyLifeSupportService(d) => (d.provider.clone(), d.services.join(",")),
            Self::CollaborationRecord(c) => (
                format!("{} {}", c.date, c.collaboration_type),
                format!("{}\u{1f}{}", c.organizations.join(","), c.participants.join(",")),
            ),
            Self::DeclaredHistory(d) => (d.era.clone(), d.content.clone()),
            Self::FamilyMember(c) | Self::KeyPerson(c) | Self::SupportOrganization(c) => {
                (c.name.clone(), c.relationship.clone())
            }
        }
    }

    /// Short human-readable line for this fact.
    pub fn headline(&self) -> String {
        match self {
            Self::NgApproach(a)
            | Self::EffectiveApproach(a)
            | Self::TriggerSituation(a)
            | Self::CriticalIncident(a) => a.description.clone(),
            Self::Strength(t)
            | Self::Challenge(t)
            | Self::Pattern(t)
            | Self::SupportPreference(t)
            | Self::SupportGoal(t) => t.description.clone(),
            Self::MentalHealthStatus(m) => m.diagnosis.clone(),
            Self::EconomicRisk(r) => r.risk_type.clone(),
            Self::MoneyManagementStatus(m) => m.pattern.clone(),
            Self::DailyLifeSupportService(d) => d.provider.clone(),
            Self::CollaborationRecord(c) => format!("{} {}", c.date, c.collaboration_type),
            Self::DeclaredHistory(d) => format!("{}: {}", d.era, d.content),
            Self::FamilyMember(c) | Self::KeyPerson(c) | Self::SupportOrganization(c) => {
                c.name.clone()
            }
        }
    }
}

/// The kind of a fact node. Doubles as its graph label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FactKind {
    NgApproach,
    EffectiveApproach,
    TriggerSituation,
    CriticalIncident,
    Strength,
    Challenge,
    Pattern,
    SupportPreference,
    SupportGoal,
    MentalHealthStatus,
    EconomicRisk,
    MoneyManagementStatus,
    DailyLifeSupportService,
    CollaborationRecord,
    DeclaredHistory,
    FamilyMember,
    KeyPerson,
    SupportOrganization,
}

impl FactKind {
    pub const ALL: [FactKind; 18] = [
        FactKind::NgApproach,
        FactKind::EffectiveApproach,
        FactKind::TriggerSituation,
        FactKind::CriticalIncident,
        FactKind::Strength,
        FactKind::Challenge,
        FactKind::Pattern,
        FactKind::SupportPreference,
        FactKind::SupportGoal,
        FactKind::MentalHealthStatus,
        FactKind::EconomicRisk,
        FactKind::MoneyManagementStatus,
        FactKind::DailyLifeSupportService,
        FactKind::CollaborationRecord,
        FactKind::DeclaredHistory,
        FactKind::FamilyMember,
        FactKind::KeyPerson,
        FactKind::SupportOrganization,
    ];

    /// Graph label for this fact kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NgApproach => "NgApproach",
            Self::EffectiveApproach => "EffectiveApproach",
            Self::TriggerSituation => "TriggerSituation",
            Self::CriticalIncident => "CriticalIncident",
            Self::Strength => "Strength",
            Self::Challenge => "Challenge",
            Self::Pattern => "Pattern",
            Self::SupportPreference => "SupportPreference",
            Self::SupportGoal => "SupportGoal",
            Self::MentalHealthStatus => "MentalHealthStatus",
            Self::EconomicRisk => "EconomicRisk",
            Self::MoneyManagementStatus => "MoneyManagementStatus",
            Self::DailyLifeSupportService => "DailyLifeSupportService",
            Self::CollaborationRecord => "CollaborationRecord",
            Self::DeclaredHistory => "DeclaredHistory",
            Self::FamilyMember => "FamilyMember",
            Self::KeyPerson => "KeyPerson",
            Self::SupportOrganization => "SupportOrganization",
        }
    }

    /// Parse a graph label back into a kind.
    pub fn from_label(label: &str) -> Option<FactKind> {
        Self::ALL.iter().copied().find(|k| k.label() == label)
    }

    /// The edge connecting a recipient to facts of this kind.
    pub fn relationship(&self) -> EdgeType {
        match self {
            Self::NgApproach => EdgeType::MustAvoid,
            Self::EffectiveApproach => EdgeType::RespondsWellTo,
            Self::TriggerSituation => EdgeType::HasTrigger,
            Self::CriticalIncident => EdgeType::ExperiencedIncident,
            Self::Strength => EdgeType::HasStrength,
            Self::Challenge => EdgeType::FacesChallenge,
            Self::Pattern => EdgeType::ShowsPattern,
            Self::SupportPreference => EdgeType::Prefers,
            Self::SupportGoal => EdgeType::HasGoal,
            Self::MentalHealthStatus => EdgeType::HasCondition,
            Self::EconomicRisk => EdgeType::FacesRisk,
            Self::MoneyManagementStatus => EdgeType::HasMoneyStatus,
            Self::DailyLifeSupportService => EdgeType::UsesService,
            Self::CollaborationRecord => EdgeType::HasCollaboration,
            Self::DeclaredHistory => EdgeType::DeclaredHistory,
            Self::FamilyMember => EdgeType::HasFamily,
            Self::KeyPerson => EdgeType::HasKeyPerson,
            Self::SupportOrganization => EdgeType::ReceivesSupportFrom,
        }
    }

    /// ApproachWisdom and ProfileTrait facts must cite at least one provenance
    /// record unless they are self-declared.
    pub fn requires_provenance(&self) -> bool {
        matches!(
            self,
            Self::NgApproach
                | Self::EffectiveApproach
                | Self::TriggerSituation
                | Self::CriticalIncident
                | Self::Strength
                | Self::Challenge
                | Self::Pattern
                | Self::SupportPreference
                | Self::MentalHealthStatus
        )
    }
}

/// A fact about a recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub id: FactId,
    pub recipient_id: RecipientId,
    pub origin: FactOrigin,
    pub recorded_at: DateTime<Utc>,
    pub body: FactBody,
}

impl Fact {
    pub fn new(recipient_id: RecipientId, origin: FactOrigin, body: FactBody) -> Self {
        Self {
            id: FactId::new(),
            recipient_id,
            origin,
            recorded_at: Utc::now(),
            body,
        }
    }

    pub fn kind(&self) -> FactKind {
        self.body.kind()
    }
}

// ── Status history ────────────────────────────────────────────────

/// One forward move of an economic risk's status. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub risk_id: FactId,
    pub from: RiskStatus,
    pub to: RiskStatus,
    pub changed_at: DateTime<Utc>,
}

// ── Case patterns ─────────────────────────────────────────────────

/// Cross-case knowledge: risk indicators and interventions that worked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CasePattern {
    pub pattern_name: String,
    #[serde(default)]
    pub description: String,
    pub indicators: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommended_interventions: Vec<String>,
    #[serde(default)]
    pub related_services: Vec<String>,
    #[serde(default)]
    pub successful_cases: u32,
}

impl CasePattern {
    /// Stable node id derived from the pattern name.
    pub fn node_id(&self) -> NodeId {
        Self::node_id_for(&self.pattern_name)
    }

    pub fn node_id_for(pattern_name: &str) -> NodeId {
        NodeId(Uuid::new_v5(&PATTERN_NAMESPACE, pattern_name.as_bytes()))
    }

    /// Reject patterns that matching cannot be defined against.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.pattern_name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "case pattern name must not be empty".to_string(),
            ));
        }
        if self.indicators.is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "case pattern '{}' has no indicators",
                self.pattern_name
            )));
        }
        if self.indicators.iter().any(|i| i.trim().is_empty()) {
            return Err(CoreError::InvalidInput(format!(
                "case pattern '{}' has a blank indicator",
                self.pattern_name
            )));
        }
        Ok(())
    }
}

// ── Edge Types ────────────────────────────────────────────────────

/// Unique identifier for an edge in the knowledge graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    pub properties: EdgeProperties,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(source_id: NodeId, edge_type: EdgeType, target_id: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source_id,
            target_id,
            edge_type,
            properties: EdgeProperties::default(),
            created_at: Utc::now(),
        }
    }
}

/// The type of relationship between two nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    HasRecord,
    MustAvoid,
    RespondsWellTo,
    HasTrigger,
    ExperiencedIncident,
    HasStrength,
    FacesChallenge,
    ShowsPattern,
    Prefers,
    HasGoal,
    HasCondition,
    FacesRisk,
    PosesRisk,
    StatusChanged,
    HasMoneyStatus,
    UsesService,
    MitigatedBy,
    HasCollaboration,
    DeclaredHistory,
    HasFamily,
    HasKeyPerson,
    ReceivesSupportFrom,
    CorroboratedBy,
    ContradictedBy,
    MatchesPattern,
}

impl EdgeType {
    /// Cypher relationship type string.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            Self::HasRecord => "HAS_RECORD",
            Self::MustAvoid => "MUST_AVOID",
            Self::RespondsWellTo => "RESPONDS_WELL_TO",
            Self::HasTrigger => "HAS_TRIGGER",
            Self::ExperiencedIncident => "EXPERIENCED_INCIDENT",
            Self::HasStrength => "HAS_STRENGTH",
            Self::FacesChallenge => "FACES_CHALLENGE",
            Self::ShowsPattern => "SHOWS_PATTERN",
            Self::Prefers => "PREFERS",
            Self::HasGoal => "HAS_GOAL",
            Self::HasCondition => "HAS_CONDITION",
            Self::FacesRisk => "FACES_RISK",
            Self::PosesRisk => "POSES_RISK",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::HasMoneyStatus => "HAS_MONEY_STATUS",
            Self::UsesService => "USES_SERVICE",
            Self::MitigatedBy => "MITIGATED_BY",
            Self::HasCollaboration => "HAS_COLLABORATION",
            Self::DeclaredHistory => "DECLARED_HISTORY",
            Self::HasFamily => "HAS_FAMILY",
            Self::HasKeyPerson => "HAS_KEY_PERSON",
            Self::ReceivesSupportFrom => "RECEIVES_SUPPORT_FROM",
            Self::CorroboratedBy => "CORROBORATED_BY",
            Self::ContradictedBy => "CONTRADICTED_BY",
            Self::MatchesPattern => "MATCHES_PATTERN",
        }
    }
}

/// Properties attached to an edge. Set once; a resolution is a superseding
/// field, never a removal.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EdgeProperties {
    /// For `CONTRADICTED_BY`: when the contradiction was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who created the link (e.g. `MATCHES_PATTERN`).
    pub linked_by: Option<String>,
}
