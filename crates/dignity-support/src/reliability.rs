//! Provenance-based reliability tiers.
//!
//! The tier is a pure function of a fact's origin and evidence edges,
//! recomputed on every read. Nothing here writes or caches.

use serde::{Deserialize, Serialize};

use dignity_core::FactOrigin;
use dignity_graph::{Evidence, StoredFact};

/// Confidence classification of a fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReliabilityTier {
    /// Two or more distinct corroborating records.
    Verified,
    /// Exactly one corroborating record.
    Observed,
    /// No corroboration; self-report only.
    Declared,
    /// At least one unresolved contradiction.
    Contradicted,
    /// Reported by an external agency.
    Collaboration,
}

impl ReliabilityTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::Observed => "Observed",
            Self::Declared => "Declared",
            Self::Contradicted => "Contradicted",
            Self::Collaboration => "Collaboration",
        }
    }
}

impl std::fmt::Display for ReliabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a fact from its origin and evidence.
///
/// An unresolved contradiction outranks every other signal, including an
/// external-agency origin and any number of corroborations.
pub fn classify(origin: FactOrigin, evidence: &Evidence) -> ReliabilityTier {
    if evidence.has_unresolved_contradiction() {
        return ReliabilityTier::Contradicted;
    }
    if origin == FactOrigin::Collaboration {
        return ReliabilityTier::Collaboration;
    }
    match evidence.distinct_corroborations() {
        0 => ReliabilityTier::Declared,
        1 => ReliabilityTier::Observed,
        _ => ReliabilityTier::Verified,
    }
}

pub fn classify_fact(stored: &StoredFact) -> ReliabilityTier {
    classify(stored.fact.origin, &stored.evidence)
}
