//! dignity-core: Shared types, configuration, and error handling for the Dignity support graph.
//!
//! This crate provides the foundational types used across all Dignity components:
//! - Recipient, provenance, and fact types for the knowledge graph
//! - Edge types (MustAvoid, FacesRisk, CorroboratedBy, etc.) for graph relationships
//! - Case patterns used for cross-case matching
//! - Configuration management and the role → permission policy
//! - Common error types

pub mod access;
pub mod config;
pub mod error;
pub mod types;

pub use access::{AccessPolicy, Actor, Permission};
pub use config::AppConfig;
pub use error::CoreError;
pub use types::{
    CasePattern, Edge, EdgeType, Fact, FactBody, FactId, FactKind, FactOrigin, NodeId,
    ProvenanceRecord, Recipient, RecipientId, RiskLevel, RiskStatus,
};
