//! Mapping rules and their compiled form.

use crate::error::{CurateError, Result};
use crate::raw::StatementCategory;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A rule mapping raw accounts onto a standard line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Rule id assigned by the rule store
    pub id: i64,
    /// Exact filer account id to match
    pub account_source_id: Option<String>,
    /// Account name, matched exactly and as a regular expression
    pub account_name_pattern: Option<String>,
    /// Account hierarchy path (informational)
    pub account_detail_path: Option<String>,
    /// Statement filter; `None` matches every statement
    pub statement: Option<StatementCategory>,
    /// Target standard line id, e.g. `BS.TOTAL_ASSETS`
    pub standard_line_id: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Lower priorities are tried first
    pub priority: i32,
    /// Rule set version
    pub version: i32,
}

/// A rule to be added to the rule store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewMappingRule {
    /// Exact filer account id to match
    pub account_source_id: Option<String>,
    /// Account name pattern
    pub account_name_pattern: Option<String>,
    /// Account hierarchy path
    pub account_detail_path: Option<String>,
    /// Statement filter
    pub statement: Option<StatementCategory>,
    /// Target standard line id
    pub standard_line_id: String,
    /// Confidence (default 1.0)
    pub confidence: Option<f64>,
    /// Priority (default 10)
    pub priority: Option<i32>,
    /// Rule set version (default 1)
    pub version: Option<i32>,
}

impl NewMappingRule {
    /// Default priority for new rules.
    pub const DEFAULT_PRIORITY: i32 = 10;
    /// Default confidence for new rules.
    pub const DEFAULT_CONFIDENCE: f64 = 1.0;
    /// Default rule set version.
    pub const DEFAULT_VERSION: i32 = 1;

    /// Rule targeting a standard line.
    pub fn new(standard_line_id: impl Into<String>) -> Self {
        Self { standard_line_id: standard_line_id.into(), ..Default::default() }
    }

    /// Match on an exact filer account id.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.account_source_id = Some(source_id.into());
        self
    }

    /// Match on an account name pattern.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.account_name_pattern = Some(pattern.into());
        self
    }

    /// Restrict to one statement.
    pub fn for_statement(mut self, statement: StatementCategory) -> Self {
        self.statement = Some(statement);
        self
    }

    /// Set the priority.
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the confidence.
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Check the rule can match something and carries sane values.
    pub fn validate(&self) -> Result<()> {
        if self.standard_line_id.trim().is_empty() {
            return Err(CurateError::InvalidRule("standard line id is empty".to_string()));
        }
        if self.account_source_id.is_none() && self.account_name_pattern.is_none() {
            return Err(CurateError::InvalidRule(format!(
                "rule for {} has neither an account id nor a name pattern",
                self.standard_line_id
            )));
        }
        if let Some(confidence) = self.confidence
            && !(0.0..=1.0).contains(&confidence)
        {
            return Err(CurateError::InvalidRule(format!("confidence {confidence} outside [0, 1]")));
        }
        Ok(())
    }

    /// Complete the rule with defaults and a store-assigned id.
    pub fn into_rule(self, id: i64) -> MappingRule {
        MappingRule {
            id,
            account_source_id: self.account_source_id,
            account_name_pattern: self.account_name_pattern,
            account_detail_path: self.account_detail_path,
            statement: self.statement,
            standard_line_id: self.standard_line_id,
            confidence: self.confidence.unwrap_or(Self::DEFAULT_CONFIDENCE),
            priority: self.priority.unwrap_or(Self::DEFAULT_PRIORITY),
            version: self.version.unwrap_or(Self::DEFAULT_VERSION),
        }
    }
}

/// Rule with its name pattern compiled once per cache load.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) rule: MappingRule,
    pub(crate) regex: Option<Regex>,
}

impl CompiledRule {
    pub(crate) fn compile(rule: MappingRule) -> Self {
        let regex = rule.account_name_pattern.as_deref().and_then(|pattern| {
            Regex::new(pattern)
                .inspect_err(|err| {
                    tracing::warn!(
                        rule_id = rule.id,
                        pattern,
                        error = %err,
                        "Skipping rule in regex stage, pattern does not compile"
                    );
                })
                .ok()
        });
        Self { rule, regex }
    }

    pub(crate) fn applies_to(&self, statement: &StatementCategory) -> bool {
        self.rule.statement.as_ref().is_none_or(|s| s == statement)
    }
}

/// Order rules for matching: priority ascending, then confidence descending.
pub(crate) fn sort_rules(rules: &mut [MappingRule]) {
    rules.sort_by(|a, b| {
        a.priority.cmp(&b.priority).then_with(|| b.confidence.total_cmp(&a.confidence))
    });
}
