//! Configuration management for Dignity services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`DIGNITY__` prefix, `__` separator)
//! 2. Config file (`dignity.toml`, optional)
//! 3. Defaults

use serde::Deserialize;

use crate::access::AccessPolicy;
use crate::error::CoreError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,
    #[serde(default)]
    pub guidance: GuidanceSettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub access: AccessPolicy,
}

/// Connection settings for the backing graph store.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    /// Per-query timeout; exceeding it surfaces as `Unavailable`.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

/// Where the narrative rule tables come from. Each falls back to the
/// built-in table when unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuidanceSettings {
    /// External harmful-guidance rule table.
    #[serde(default)]
    pub rules_path: Option<String>,
    #[serde(default)]
    pub economic_signals_path: Option<String>,
    #[serde(default)]
    pub collaboration_signals_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    /// JSON-lines audit log file.
    #[serde(default = "default_audit_path")]
    pub log_path: String,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "dignity-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_audit_path() -> String {
    "./audit/audit.jsonl".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            log_path: default_audit_path(),
        }
    }
}

impl AppConfig {
    /// Load from `{file_prefix}.toml` (if present) and `DIGNITY__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self, CoreError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("DIGNITY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = cfg.try_deserialize()?;
        tracing::debug!(
            neo4j_uri = %app.neo4j.uri,
            rules_path = ?app.guidance.rules_path,
            "Configuration loaded"
        );
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Permission;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.query_timeout_ms, 5_000);
        assert!(config.guidance.rules_path.is_none());
        assert!(config.access.roles.contains_key("caseworker"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dignity.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[neo4j]
uri = "bolt://graph.internal:7687"
query_timeout_ms = 1500

[guidance]
rules_path = "/etc/dignity/guidance.toml"
economic_signals_path = "/etc/dignity/economic.toml"

[access.roles]
caseworker = ["read:own_cases"]
"#
        )
        .unwrap();

        let prefix = dir.path().join("dignity");
        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://graph.internal:7687");
        assert_eq!(config.neo4j.query_timeout_ms, 1500);
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(
            config.guidance.rules_path.as_deref(),
            Some("/etc/dignity/guidance.toml")
        );
        assert_eq!(
            config.guidance.economic_signals_path.as_deref(),
            Some("/etc/dignity/economic.toml")
        );
        assert!(config.guidance.collaboration_signals_path.is_none());
        assert_eq!(
            config.access.roles.get("caseworker"),
            Some(&vec![Permission::ReadOwnCases])
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.audit.log_path, "./audit/audit.jsonl");
    }
}
