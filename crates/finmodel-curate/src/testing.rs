//! In-memory store backing the unit tests.

use crate::error::{CurateError, Result};
use crate::fact::{CuratedFact, EntityRecord, UpsertOutcome};
use crate::mapper::{MappingRule, NewMappingRule};
use crate::raw::{RawFilingRow, RawRowQuery};
use crate::source::{EntityDirectory, FactFilter, FactQuery, FactSink, RawRowSource, RuleStore};
use indexmap::IndexMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    raw: Mutex<Vec<RawFilingRow>>,
    rules: Mutex<Vec<MappingRule>>,
    facts: Mutex<IndexMap<String, CuratedFact>>,
    entities: Mutex<IndexMap<String, EntityRecord>>,
    rule_loads: AtomicUsize,
    fail_rules: AtomicBool,
    fail_raw: AtomicBool,
    fail_upsert_for: Mutex<Option<String>>,
}

impl MemoryStore {
    pub(crate) fn with_rows(rows: Vec<RawFilingRow>) -> Self {
        let store = Self::default();
        *store.raw.lock().unwrap() = rows;
        store
    }

    pub(crate) fn rule_loads(&self) -> usize {
        self.rule_loads.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_rule_loads(&self, fail: bool) {
        self.fail_rules.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_raw_fetch(&self, fail: bool) {
        self.fail_raw.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_upsert_for(&self, account_name: &str) {
        *self.fail_upsert_for.lock().unwrap() = Some(account_name.to_string());
    }

    pub(crate) fn facts(&self) -> Vec<CuratedFact> {
        self.facts.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.entities.lock().unwrap().len()
    }
}

impl RawRowSource for MemoryStore {
    fn fetch_raw_rows(&self, query: &RawRowQuery) -> Result<Vec<RawFilingRow>> {
        if self.fail_raw.load(Ordering::SeqCst) {
            return Err(CurateError::Source("connection reset".to_string()));
        }
        Ok(self.raw.lock().unwrap().iter().filter(|r| query.matches(r)).cloned().collect())
    }
}

impl RuleStore for MemoryStore {
    fn load_rules(&self) -> Result<Vec<MappingRule>> {
        if self.fail_rules.load(Ordering::SeqCst) {
            return Err(CurateError::storage(std::io::Error::other("rules unavailable")));
        }
        self.rule_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rules.lock().unwrap().clone())
    }

    fn insert_rule(&self, rule: NewMappingRule) -> Result<MappingRule> {
        let mut rules = self.rules.lock().unwrap();
        let stored = rule.into_rule(rules.len() as i64 + 1);
        rules.push(stored.clone());
        Ok(stored)
    }
}

impl FactSink for MemoryStore {
    fn ensure_entity(&self, entity: &EntityRecord) -> Result<()> {
        self.entities.lock().unwrap().entry(entity.id.clone()).or_insert_with(|| entity.clone());
        Ok(())
    }

    fn upsert_fact(&self, fact: &CuratedFact) -> Result<UpsertOutcome> {
        if self.fail_upsert_for.lock().unwrap().as_deref() == Some(fact.row.account_name.as_str()) {
            return Err(CurateError::storage(std::io::Error::other("constraint failed")));
        }
        let mut facts = self.facts.lock().unwrap();
        let outcome = match facts.get(&fact.id) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing == fact => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };
        facts.insert(fact.id.clone(), fact.clone());
        Ok(outcome)
    }
}

impl FactQuery for MemoryStore {
    fn mapped_facts(&self, filter: &FactFilter) -> Result<Vec<CuratedFact>> {
        let mut facts: Vec<CuratedFact> = self
            .facts
            .lock()
            .unwrap()
            .values()
            .filter(|f| {
                f.is_mapped()
                    && f.row.entity_id == filter.entity_id
                    && f.row.period.kind == filter.period_kind
                    && f.row.scope == filter.scope
                    && filter.fiscal_years.contains(&f.row.period.fiscal_year)
            })
            .cloned()
            .collect();
        facts.sort_by_key(|f| (f.row.period.fiscal_year, f.row.ordinal));
        Ok(facts)
    }
}

impl EntityDirectory for MemoryStore {
    fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        Ok(self.entities.lock().unwrap().contains_key(entity_id))
    }
}
