//! Economic-risk and collaboration signals in narrative text.
//!
//! Same shape as the guidance tables: versioned data, compiled once. A rule
//! reports at most one hit per text, at its first occurrence.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use dignity_core::config::GuidanceSettings;

use crate::error::{Result, SupportError};
use crate::guidance::{load_table, table_file};

const ECONOMIC_RISK_SIGNALS: &str = include_str!("../rules/economic_risk_signals.toml");
const COLLABORATION_SIGNALS: &str = include_str!("../rules/collaboration_signals.toml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRule {
    pub pattern: String,
    pub signal: String,
    /// Risk types worth checking when the signal fires. Empty for collaboration signals.
    #[serde(default)]
    pub possible_causes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRuleSet {
    pub version: String,
    pub rules: Vec<SignalRule>,
}

impl SignalRuleSet {
    pub fn economic_risk() -> Result<Self> {
        load_table(config::File::from_str(
            ECONOMIC_RISK_SIGNALS,
            config::FileFormat::Toml,
        ))
    }

    pub fn collaboration() -> Result<Self> {
        load_table(config::File::from_str(
            COLLABORATION_SIGNALS,
            config::FileFormat::Toml,
        ))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        load_table(table_file(path)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedSignal {
    pub signal: String,
    pub possible_causes: Vec<String>,
    pub excerpt: String,
    /// Byte offset of the first occurrence.
    pub start: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalReport {
    pub rules_version: String,
    /// In rule-table order.
    pub signals: Vec<DetectedSignal>,
}

/// Compiled, immutable signal detector.
pub struct SignalDetector {
    version: String,
    rules: Vec<(Regex, SignalRule)>,
}

impl SignalDetector {
    pub fn new(rule_set: SignalRuleSet) -> Result<Self> {
        if rule_set.rules.is_empty() {
            return Err(SupportError::Rules(format!(
                "signal table {} has no rules",
                rule_set.version
            )));
        }
        let rules = rule_set
            .rules
            .into_iter()
            .map(|rule| match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                Ok(regex) => Ok((regex, rule)),
                Err(e) => Err(SupportError::Rules(format!(
                    "invalid pattern {:?}: {e}",
                    rule.pattern
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(version = %rule_set.version, rules = rules.len(), "Signal rules compiled");
        Ok(Self {
            version: rule_set.version,
            rules,
        })
    }

    pub fn economic_risk() -> Result<Self> {
        Self::new(SignalRuleSet::economic_risk()?)
    }

    pub fn collaboration() -> Result<Self> {
        Self::new(SignalRuleSet::collaboration()?)
    }

    /// Economic-risk and collaboration detectors, external tables taking precedence.
    pub fn from_settings(settings: &GuidanceSettings) -> Result<(Self, Self)> {
        let economic = match &settings.economic_signals_path {
            Some(path) => Self::new(SignalRuleSet::from_path(Path::new(path))?)?,
            None => Self::economic_risk()?,
        };
        let collaboration = match &settings.collaboration_signals_path {
            Some(path) => Self::new(SignalRuleSet::from_path(Path::new(path))?)?,
            None => Self::collaboration()?,
        };
        Ok((economic, collaboration))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn detect(&self, text: &str) -> SignalReport {
        let signals = self
            .rules
            .iter()
            .filter_map(|(regex, rule)| {
                regex.find(text).map(|m| DetectedSignal {
                    signal: rule.signal.clone(),
                    possible_causes: rule.possible_causes.clone(),
                    excerpt: m.as_str().to_string(),
                    start: m.start(),
                })
            })
            .collect();
        SignalReport {
            rules_version: self.version.clone(),
            signals,
        }
    }
}
