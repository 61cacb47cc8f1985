//! Role → permission policy.
//!
//! The mapping is plain data, loaded once at process start (from the
//! `[access]` config section or the built-in default) and never mutated.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Permission {
    #[serde(rename = "read:own_cases")]
    ReadOwnCases,
    #[serde(rename = "write:own_cases")]
    WriteOwnCases,
    #[serde(rename = "read:team_cases")]
    ReadTeamCases,
    #[serde(rename = "read:all_cases")]
    ReadAllCases,
    #[serde(rename = "view:audit_logs")]
    ViewAuditLogs,
    #[serde(rename = "system:admin")]
    SystemAdmin,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ReadOwnCases,
        Permission::WriteOwnCases,
        Permission::ReadTeamCases,
        Permission::ReadAllCases,
        Permission::ViewAuditLogs,
        Permission::SystemAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOwnCases => "read:own_cases",
            Self::WriteOwnCases => "write:own_cases",
            Self::ReadTeamCases => "read:team_cases",
            Self::ReadAllCases => "read:all_cases",
            Self::ViewAuditLogs => "view:audit_logs",
            Self::SystemAdmin => "system:admin",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller. Authentication itself happens upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: &str, roles: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Immutable role → permission table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPolicy {
    #[serde(default = "default_roles")]
    pub roles: BTreeMap<String, Vec<Permission>>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            roles: default_roles(),
        }
    }
}

fn default_roles() -> BTreeMap<String, Vec<Permission>> {
    use Permission::*;
    BTreeMap::from([
        ("caseworker".to_string(), vec![ReadOwnCases, WriteOwnCases]),
        (
            "supervisor".to_string(),
            vec![ReadOwnCases, WriteOwnCases, ReadTeamCases, ViewAuditLogs],
        ),
        ("admin".to_string(), vec![SystemAdmin]),
        ("auditor".to_string(), vec![ViewAuditLogs]),
    ])
}

impl AccessPolicy {
    /// All permissions granted to the actor. `system:admin` implies every
    /// permission; `read:all_cases` implies `read:team_cases`, which implies
    /// `read:own_cases`.
    pub fn permissions_for(&self, actor: &Actor) -> HashSet<Permission> {
        let mut perms: HashSet<Permission> = actor
            .roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .flatten()
            .copied()
            .collect();

        if perms.contains(&Permission::SystemAdmin) {
            perms.extend(Permission::ALL);
        }
        if perms.contains(&Permission::ReadAllCases) {
            perms.insert(Permission::ReadTeamCases);
        }
        if perms.contains(&Permission::ReadTeamCases) {
            perms.insert(Permission::ReadOwnCases);
        }
        perms
    }

    pub fn allows(&self, actor: &Actor, permission: Permission) -> bool {
        self.permissions_for(actor).contains(&permission)
    }
}
