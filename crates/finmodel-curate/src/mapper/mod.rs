//! Rule-based classification of raw accounts onto standard lines.
//!
//! Matching runs in four stages, first hit wins:
//!
//! 1. exact account id with an equal statement (`ACCOUNT_ID`)
//! 2. exact account name, statement equal or unfiltered (`NAME_EXACT`)
//! 3. account name regex in rule order (`NAME_REGEX`, discounted confidence)
//! 4. `UNMAPPED`
//!
//! Rules are ordered by priority ascending, then confidence descending.

mod cache;
mod rules;

pub use cache::{Clock, SystemClock};
pub use rules::{MappingRule, NewMappingRule};

use crate::error::Result;
use crate::raw::{RawFilingRow, StatementCategory};
use crate::source::RuleStore;
use cache::{LoadedRules, RuleCache};
use chrono::TimeDelta;
use derive_more::Display;
use rules::{CompiledRule, sort_rules};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an account was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    /// Filer account id matched
    #[display("ACCOUNT_ID")]
    AccountId,
    /// Account name matched exactly
    #[display("NAME_EXACT")]
    NameExact,
    /// Account name matched a pattern
    #[display("NAME_REGEX")]
    NameRegex,
    /// No rule matched
    #[display("UNMAPPED")]
    Unmapped,
}

impl MatchMethod {
    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::AccountId => "ACCOUNT_ID",
            Self::NameExact => "NAME_EXACT",
            Self::NameRegex => "NAME_REGEX",
            Self::Unmapped => "UNMAPPED",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ACCOUNT_ID" => Some(Self::AccountId),
            "NAME_EXACT" => Some(Self::NameExact),
            "NAME_REGEX" => Some(Self::NameRegex),
            "UNMAPPED" => Some(Self::Unmapped),
            _ => None,
        }
    }
}

/// Classification of one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    /// Standard line id, `None` when unmapped
    pub standard_line_id: Option<String>,
    /// Rule that matched
    pub rule: Option<MappingRule>,
    /// Effective confidence
    pub confidence: f64,
    /// Match stage
    pub method: MatchMethod,
}

impl MappingResult {
    /// Result for an account no rule matched.
    pub const fn unmapped() -> Self {
        Self { standard_line_id: None, rule: None, confidence: 0.0, method: MatchMethod::Unmapped }
    }

    fn matched(rule: &MappingRule, method: MatchMethod, confidence: f64) -> Self {
        Self {
            standard_line_id: Some(rule.standard_line_id.clone()),
            rule: Some(rule.clone()),
            confidence,
            method,
        }
    }

    /// Did a rule match?
    pub const fn is_mapped(&self) -> bool {
        self.standard_line_id.is_some()
    }
}

/// An account reference in batch results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    /// Reported account name
    pub account_name: String,
    /// Statement the account appeared in
    pub statement: StatementCategory,
}

/// Outcome of classifying a batch of raw rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMapping {
    /// Rows classified
    pub total: usize,
    /// Rows that resolved to a line
    pub mapped: usize,
    /// Rows that did not, including failures
    pub unmapped: usize,
    /// Unmapped accounts in row order
    pub unmapped_accounts: Vec<AccountRef>,
    /// Classification failures
    pub errors: Vec<String>,
}

/// Mapper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Seconds a loaded rule set stays valid
    pub cache_ttl_secs: u64,
    /// Multiplier applied to rule confidence on regex matches
    pub regex_confidence_factor: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 300, regex_confidence_factor: 0.9 }
    }
}

/// Classifies raw accounts against the rule store.
pub struct AccountMapper {
    store: Arc<dyn RuleStore>,
    cache: RuleCache,
    clock: Arc<dyn Clock>,
    config: MapperConfig,
}

impl std::fmt::Debug for AccountMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountMapper")
            .field("cache", &self.cache)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccountMapper {
    /// Mapper with default settings.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self::with_config(store, MapperConfig::default())
    }

    /// Mapper with custom settings.
    pub fn with_config(store: Arc<dyn RuleStore>, config: MapperConfig) -> Self {
        let ttl = i64::try_from(config.cache_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            store,
            cache: RuleCache::new(ttl),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for cache expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mapper settings.
    pub const fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Drop the cached rule set; the next classification reloads it.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    fn rules(&self) -> Result<Arc<LoadedRules>> {
        let now = self.clock.now();
        if let Some(loaded) = self.cache.fresh(now) {
            return Ok(loaded);
        }

        let mut rules = self.store.load_rules()?;
        sort_rules(&mut rules);
        let compiled: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::compile).collect();
        tracing::debug!(rules = compiled.len(), "Loaded mapping rules");
        Ok(self.cache.store(compiled, now))
    }

    /// Classify one account.
    pub fn classify(
        &self,
        source_id: Option<&str>,
        raw_name: &str,
        _detail_path: Option<&str>,
        statement: &StatementCategory,
    ) -> Result<MappingResult> {
        let loaded = self.rules()?;
        let rules = &loaded.rules;

        if let Some(source_id) = source_id.filter(|id| !id.is_empty())
            && let Some(hit) = rules.iter().find(|c| {
                c.rule.account_source_id.as_deref() == Some(source_id)
                    && c.rule.statement.as_ref() == Some(statement)
            })
        {
            return Ok(MappingResult::matched(&hit.rule, MatchMethod::AccountId, hit.rule.confidence));
        }

        if let Some(hit) = rules.iter().find(|c| {
            c.rule.account_name_pattern.as_deref() == Some(raw_name) && c.applies_to(statement)
        }) {
            return Ok(MappingResult::matched(&hit.rule, MatchMethod::NameExact, hit.rule.confidence));
        }

        if let Some(hit) = rules.iter().find(|c| {
            c.applies_to(statement) && c.regex.as_ref().is_some_and(|re| re.is_match(raw_name))
        }) {
            let confidence = hit.rule.confidence * self.config.regex_confidence_factor;
            return Ok(MappingResult::matched(&hit.rule, MatchMethod::NameRegex, confidence));
        }

        Ok(MappingResult::unmapped())
    }

    /// Classify a raw row.
    pub fn classify_row(&self, row: &RawFilingRow) -> Result<MappingResult> {
        self.classify(
            row.account_id.as_deref(),
            row.account_name.trim(),
            row.account_detail.as_deref(),
            &row.statement,
        )
    }

    /// Classify every row. A failing row is recorded and counted as unmapped.
    pub fn classify_all(&self, rows: &[RawFilingRow]) -> BatchMapping {
        let mut batch = BatchMapping { total: rows.len(), ..Default::default() };
        for row in rows {
            match self.classify_row(row) {
                Ok(result) if result.is_mapped() => batch.mapped += 1,
                Ok(_) => {
                    batch.unmapped += 1;
                    batch.unmapped_accounts.push(AccountRef {
                        account_name: row.account_name.clone(),
                        statement: row.statement.clone(),
                    });
                }
                Err(err) => {
                    batch.unmapped += 1;
                    batch.errors.push(format!("{}: {err}", row.account_name));
                }
            }
        }
        batch
    }

    /// Validate and store a rule, then invalidate the cache.
    pub fn add_rule(&self, rule: NewMappingRule) -> Result<MappingRule> {
        rule.validate()?;
        let stored = self.store.insert_rule(rule)?;
        self.invalidate();
        tracing::info!(
            rule_id = stored.id,
            line = %stored.standard_line_id,
            "Added mapping rule"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurateError;
    use crate::raw::sample_row;
    use crate::testing::MemoryStore;
    use approx::assert_relative_eq;
    use cache::tests::ManualClock;
    use chrono::Duration;

    fn mapper_with(rules: Vec<NewMappingRule>) -> (Arc<MemoryStore>, AccountMapper) {
        let store = Arc::new(MemoryStore::default());
        for rule in rules {
            store.insert_rule(rule).unwrap();
        }
        let mapper = AccountMapper::new(store.clone());
        (store, mapper)
    }

    #[test]
    fn test_source_id_beats_name_rules_regardless_of_order() {
        let (_, mapper) = mapper_with(vec![
            NewMappingRule::new("BS.OTHER_CA").with_name_pattern("자산총계").with_priority(1),
            NewMappingRule::new("BS.TOTAL_ASSETS")
                .with_source_id("ifrs-full_Assets")
                .for_statement(StatementCategory::BalanceSheet)
                .with_priority(99)
                .with_confidence(0.8),
        ]);

        let result = mapper
            .classify(Some("ifrs-full_Assets"), "자산총계", None, &StatementCategory::BalanceSheet)
            .unwrap();
        assert_eq!(result.method, MatchMethod::AccountId);
        assert_eq!(result.standard_line_id.as_deref(), Some("BS.TOTAL_ASSETS"));
        assert_relative_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_source_id_requires_equal_statement() {
        let (_, mapper) = mapper_with(vec![
            NewMappingRule::new("BS.CASH").with_source_id("ifrs-full_Cash").for_statement(StatementCategory::BalanceSheet),
            NewMappingRule::new("CF.END_CASH").with_source_id("ifrs-full_Cash"),
        ]);

        let result =
            mapper.classify(Some("ifrs-full_Cash"), "현금", None, &StatementCategory::CashFlow).unwrap();
        assert_eq!(result.method, MatchMethod::Unmapped);
    }

    #[test]
    fn test_name_exact_then_regex() {
        let (_, mapper) = mapper_with(vec![
            NewMappingRule::new("IS.REVENUE").with_name_pattern("^매출").with_priority(1),
            NewMappingRule::new("IS.REVENUE_EXACT").with_name_pattern("매출액").with_priority(50),
        ]);

        let exact = mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(exact.method, MatchMethod::NameExact);
        assert_eq!(exact.standard_line_id.as_deref(), Some("IS.REVENUE_EXACT"));

        let regex = mapper.classify(None, "매출원가", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(regex.method, MatchMethod::NameRegex);
        assert_eq!(regex.standard_line_id.as_deref(), Some("IS.REVENUE"));
        assert_relative_eq!(regex.confidence, 0.9);
    }

    #[test]
    fn test_statement_filter() {
        let (_, mapper) = mapper_with(vec![
            NewMappingRule::new("BS.CASH")
                .with_name_pattern("현금및현금성자산")
                .for_statement(StatementCategory::BalanceSheet),
        ]);

        let cf = mapper.classify(None, "현금및현금성자산", None, &StatementCategory::CashFlow).unwrap();
        assert_eq!(cf, MappingResult::unmapped());

        let bs = mapper.classify(None, "현금및현금성자산", None, &StatementCategory::BalanceSheet).unwrap();
        assert_eq!(bs.method, MatchMethod::NameExact);
    }

    #[test]
    fn test_bad_pattern_still_matches_exactly() {
        let (_, mapper) =
            mapper_with(vec![NewMappingRule::new("IS.EBIT").with_name_pattern("영업이익(손실")]);

        let exact = mapper.classify(None, "영업이익(손실", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(exact.method, MatchMethod::NameExact);

        let other = mapper.classify(None, "영업이익", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(other.method, MatchMethod::Unmapped);
    }

    #[test]
    fn test_cache_ttl_and_invalidation() {
        let (store, mapper) = mapper_with(Vec::new());
        let clock = Arc::new(ManualClock::new());
        let mapper = mapper.with_clock(clock.clone());

        mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(store.rule_loads(), 1);

        clock.advance(Duration::minutes(5));
        mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(store.rule_loads(), 2);

        // A rule written behind the mapper's back stays invisible until expiry.
        store.insert_rule(NewMappingRule::new("IS.REVENUE").with_name_pattern("매출액")).unwrap();
        let stale = mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(stale.method, MatchMethod::Unmapped);

        mapper.invalidate();
        let fresh = mapper.classify(None, "매출액", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(fresh.method, MatchMethod::NameExact);
    }

    #[test]
    fn test_add_rule_invalidates() {
        let (store, mapper) = mapper_with(Vec::new());
        let before = mapper.classify(None, "매출원가", None, &StatementCategory::IncomeStatement).unwrap();
        assert!(!before.is_mapped());

        let rule = mapper.add_rule(NewMappingRule::new("IS.COGS").with_name_pattern("매출원가")).unwrap();
        assert_eq!(rule.priority, 10);

        let after = mapper.classify(None, "매출원가", None, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(after.standard_line_id.as_deref(), Some("IS.COGS"));
        assert_eq!(store.rule_loads(), 2);
    }

    #[test]
    fn test_add_rule_rejects_invalid() {
        let (_, mapper) = mapper_with(Vec::new());
        let err = mapper.add_rule(NewMappingRule::new("IS.COGS")).unwrap_err();
        assert!(matches!(err, CurateError::InvalidRule(_)));
    }

    #[test]
    fn test_classify_all_never_short_circuits() {
        let (store, mapper) = mapper_with(vec![NewMappingRule::new("BS.TOTAL_ASSETS").with_name_pattern("자산총계")]);
        let rows = vec![sample_row("BS", "자산총계"), sample_row("BS", "기타"), sample_row("IS", "매출액")];

        let batch = mapper.classify_all(&rows);
        assert_eq!(batch.total, 3);
        assert_eq!(batch.mapped, 1);
        assert_eq!(batch.unmapped, 2);
        assert_eq!(batch.unmapped_accounts[0].account_name, "기타");
        assert!(batch.errors.is_empty());

        store.fail_rule_loads(true);
        mapper.invalidate();
        let failed = mapper.classify_all(&rows);
        assert_eq!(failed.total, 3);
        assert_eq!(failed.unmapped, 3);
        assert_eq!(failed.errors.len(), 3);
    }

    #[test]
    fn test_match_method_db_str() {
        for method in [MatchMethod::AccountId, MatchMethod::NameExact, MatchMethod::NameRegex, MatchMethod::Unmapped] {
            assert_eq!(MatchMethod::from_db_str(method.to_db_str()), Some(method));
            assert_eq!(method.to_string(), method.to_db_str());
        }
    }
}
