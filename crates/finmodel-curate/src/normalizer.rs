//! Raw row normalization: amount selection, parsing, period and scope.

use crate::amount::parse_amount;
use crate::error::Result;
use crate::period::{NormalizedPeriod, resolve_period};
use crate::raw::{RawFilingRow, StatementCategory};
use crate::selector::select_amount;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Consolidation scope of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsolidationScope {
    /// Consolidated statements (`CFS`)
    #[default]
    #[display("CONSOLIDATED")]
    Consolidated,
    /// Separate statements (`OFS`)
    #[display("SEPARATE")]
    Separate,
}

impl ConsolidationScope {
    /// Scope of a raw consolidation flag; anything but `CFS` is separate.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("CFS") { Self::Consolidated } else { Self::Separate }
    }

    /// Raw consolidation flag for this scope.
    pub const fn as_flag(&self) -> &'static str {
        match self {
            Self::Consolidated => "CFS",
            Self::Separate => "OFS",
        }
    }

    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Consolidated => "CONSOLIDATED",
            Self::Separate => "SEPARATE",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "CONSOLIDATED" => Some(Self::Consolidated),
            "SEPARATE" => Some(Self::Separate),
            _ => None,
        }
    }
}

/// Options for row normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Prefer the period-flow column over the cumulative column in interim reports
    pub prefer_period_flow: bool,
    /// Priority recorded on every normalized row
    pub source_priority: i32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { prefer_period_flow: true, source_priority: 10 }
    }
}

/// A typed, normalized filing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// Regulator company code
    pub corp_code: String,
    /// Listed stock code
    pub stock_code: Option<String>,
    /// Derived entity id (`entity-{corp_code}`)
    pub entity_id: String,
    /// Resolved fiscal period
    pub period: NormalizedPeriod,
    /// Report code as filed
    pub report_code: String,
    /// Consolidation scope
    pub scope: ConsolidationScope,
    /// Statement category
    pub statement: StatementCategory,
    /// Filer-assigned account id
    pub account_source_id: Option<String>,
    /// Reported account name
    pub account_name: String,
    /// Account hierarchy path
    pub account_detail: Option<String>,
    /// Amount in base currency units
    pub amount: Decimal,
    /// ISO currency code
    pub currency: String,
    /// Line position within its statement
    pub ordinal: Option<i32>,
    /// Receipt number of the source filing
    pub report_ref: Option<String>,
    /// Source priority
    pub source_priority: i32,
    /// Amount is a year-to-date accumulation
    pub is_accumulated: bool,
    /// Amount parsed cleanly
    pub parse_success: bool,
    /// Parse failure description
    pub parse_error: Option<String>,
}

/// Derived entity id for a company code.
pub fn entity_id_for(corp_code: &str) -> String {
    format!("entity-{corp_code}")
}

/// Normalize a currency label to an ISO code. Missing labels default to KRW.
pub fn normalize_currency(currency: Option<&str>) -> String {
    let Some(label) = currency.map(str::trim).filter(|c| !c.is_empty()) else {
        return "KRW".to_string();
    };
    match label {
        "원" | "한국원" => "KRW".to_string(),
        "달러" | "미국달러" => "USD".to_string(),
        other => other.to_uppercase(),
    }
}

/// Normalize one raw row.
///
/// Returns `Ok(None)` when the row carries no usable amount. A malformed
/// amount still yields a row, with a zero amount and the parse error recorded.
pub fn normalize_row(raw: &RawFilingRow, options: &NormalizeOptions) -> Result<Option<NormalizedRow>> {
    let selected = select_amount(raw, options.prefer_period_flow);
    let Some(text) = selected.amount else {
        return Ok(None);
    };

    let parsed = parse_amount(Some(text));
    let amount = match (parsed.success, parsed.value) {
        (true, Some(value)) => value,
        (true, None) => return Ok(None),
        (false, _) => {
            tracing::warn!(
                corp_code = %raw.corp_code,
                account = %raw.account_name,
                error = parsed.error.as_deref().unwrap_or_default(),
                "Amount parse failed, recording zero"
            );
            Decimal::ZERO
        }
    };

    let period = resolve_period(&raw.fiscal_year, &raw.report_code, &raw.statement)?;

    Ok(Some(NormalizedRow {
        corp_code: raw.corp_code.clone(),
        stock_code: raw.stock_code.clone(),
        entity_id: entity_id_for(&raw.corp_code),
        period,
        report_code: raw.report_code.clone(),
        scope: ConsolidationScope::from_flag(&raw.consolidation_flag),
        statement: raw.statement.clone(),
        account_source_id: raw.account_id.clone().filter(|id| !id.trim().is_empty()),
        account_name: raw.account_name.trim().to_string(),
        account_detail: raw.account_detail.clone(),
        amount,
        currency: normalize_currency(raw.currency.as_deref()),
        ordinal: raw.ordinal.as_deref().and_then(|o| o.trim().parse().ok()),
        report_ref: raw.receipt_no.clone(),
        source_priority: options.source_priority,
        is_accumulated: selected.is_accumulated,
        parse_success: parsed.success,
        parse_error: parsed.error,
    }))
}
