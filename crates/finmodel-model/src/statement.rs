//! Statements and their lines.

use crate::chart::ModelStatement;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a line's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Reported in a filing
    #[default]
    #[display("SOURCE")]
    Source,
    /// Computed from other lines
    #[display("DERIVED")]
    Derived,
    /// Balancing figure
    #[display("PLUG")]
    Plug,
}

impl Provenance {
    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Derived => "DERIVED",
            Self::Plug => "PLUG",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "SOURCE" => Some(Self::Source),
            "DERIVED" => Some(Self::Derived),
            "PLUG" => Some(Self::Plug),
            _ => None,
        }
    }
}

/// One line of a statement across the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Line id
    pub line_id: String,
    /// Display name
    pub display_name: String,
    /// Owning statement
    pub statement: ModelStatement,
    /// Values by period index; a missing index has no value
    pub values: BTreeMap<usize, Decimal>,
    /// Currency unit
    pub unit: String,
    /// Position within the statement
    pub display_order: usize,
    /// Value origin
    pub provenance: Provenance,
}

impl StatementLine {
    /// Value at a period index.
    pub fn value(&self, index: usize) -> Option<Decimal> {
        self.values.get(&index).copied()
    }
}

/// A statement's lines in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement kind
    pub statement: ModelStatement,
    /// Lines in display order
    pub lines: Vec<StatementLine>,
}

impl Statement {
    /// Line by id.
    pub fn line(&self, line_id: &str) -> Option<&StatementLine> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    /// Value of a line at a period index, zero when absent.
    pub fn value_or_zero(&self, line_id: &str, index: usize) -> Decimal {
        self.line(line_id).and_then(|line| line.value(index)).unwrap_or(Decimal::ZERO)
    }

    /// Number of (line, period) values present.
    pub fn value_count(&self) -> usize {
        self.lines.iter().map(|line| line.values.len()).sum()
    }
}
