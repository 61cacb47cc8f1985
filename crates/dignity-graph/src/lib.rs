//! Dignity Graph: typed access to the recipient knowledge graph.
//!
//! [`GraphRepository`] is the only way the decision-support layer touches
//! stored facts. [`GraphClient`] implements it over Neo4j; the in-memory
//! [`InMemoryRepository`] implements it over a typed adjacency map.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod repository;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::InMemoryRepository;
pub use repository::{Evidence, EvidenceKind, GraphRepository, StoredFact};
