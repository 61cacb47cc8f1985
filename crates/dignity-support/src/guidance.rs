//! Harmful-guidance detection over caseworker narrative.
//!
//! The rule table is versioned data loaded once, compiled into a
//! [`GuidanceDetector`], and never mutated afterwards. Detection is a pure
//! function of the input text.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SupportError};

/// The built-in rule table shipped with the binary.
const BUILTIN_RULES: &str = include_str!("../rules/guidance_rules.toml");

/// One entry of the rule table, as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidanceRule {
    pub pattern: String,
    pub category: String,
    pub risk_explanation: String,
    #[serde(default)]
    pub suggested: Option<String>,
}

/// A versioned rule table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidanceRuleSet {
    pub version: String,
    pub rules: Vec<GuidanceRule>,
}

impl GuidanceRuleSet {
    pub fn builtin() -> Result<Self> {
        Self::from_source(config::File::from_str(
            BUILTIN_RULES,
            config::FileFormat::Toml,
        ))
    }

    /// Load an external table. The format follows the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_source(table_file(path)?)
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        load_table(source)
    }
}

/// Deserialize a rule table from any `config` source.
pub(crate) fn load_table<T, S>(source: S) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    S: config::Source + Send + Sync + 'static,
{
    config::Config::builder()
        .add_source(source)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| SupportError::Rules(e.to_string()))
}

/// An external table on disk, rejected early when the file is missing.
pub(crate) fn table_file(path: &Path) -> Result<config::File<config::FileSourceFile, config::FileFormat>> {
    if !path.exists() {
        return Err(SupportError::Rules(format!(
            "rule table not found: {}",
            path.display()
        )));
    }
    Ok(config::File::from(path))
}

/// One flagged phrase in a narrative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidanceMatch {
    pub category: String,
    /// The matched substring.
    pub excerpt: String,
    pub risk_explanation: String,
    pub suggested: Option<String>,
    /// Byte offset of the excerpt in the input.
    pub start: usize,
}

/// Result of a guidance check, tagged with the rule-table version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidanceReport {
    pub rules_version: String,
    pub matches: Vec<GuidanceMatch>,
}

struct CompiledRule {
    regex: Regex,
    rule: GuidanceRule,
}

/// Compiled, immutable detector.
pub struct GuidanceDetector {
    version: String,
    rules: Vec<CompiledRule>,
}

impl GuidanceDetector {
    /// Compile every rule. An invalid pattern rejects the whole table.
    pub fn new(rule_set: GuidanceRuleSet) -> Result<Self> {
        if rule_set.rules.is_empty() {
            return Err(SupportError::Rules(format!(
                "rule table {} has no rules",
                rule_set.version
            )));
        }
        let rules = rule_set
            .rules
            .into_iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledRule { regex, rule: rule.clone() })
                    .map_err(|e| {
                        SupportError::Rules(format!("invalid pattern {:?}: {e}", rule.pattern))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            version = %rule_set.version,
            rules = rules.len(),
            "Guidance rules compiled"
        );
        Ok(Self {
            version: rule_set.version,
            rules,
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(GuidanceRuleSet::builtin()?)
    }

    /// Use the external table when configured, the built-in one otherwise.
    pub fn from_settings(settings: &dignity_core::config::GuidanceSettings) -> Result<Self> {
        match &settings.rules_path {
            Some(path) => Self::new(GuidanceRuleSet::from_path(Path::new(path))?),
            None => Self::builtin(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Every occurrence of every rule, ordered by position, then rule order.
    pub fn check(&self, text: &str) -> GuidanceReport {
        let mut found: Vec<(usize, usize, GuidanceMatch)> = Vec::new();
        for (index, compiled) in self.rules.iter().enumerate() {
            for m in compiled.regex.find_iter(text) {
                found.push((
                    m.start(),
                    index,
                    GuidanceMatch {
                        category: compiled.rule.category.clone(),
                        excerpt: m.as_str().to_string(),
                        risk_explanation: compiled.rule.risk_explanation.clone(),
                        suggested: compiled.rule.suggested.clone(),
                        start: m.start(),
                    },
                ));
            }
        }
        found.sort_by_key(|(start, index, _)| (*start, *index));

        GuidanceReport {
            rules_version: self.version.clone(),
            matches: found.into_iter().map(|(_, _, m)| m).collect(),
        }
    }
}
