//! Raw filing rows as delivered by the ingestion collaborator.
//!
//! Field meanings follow the regulator's single-company full financial
//! statement endpoint: one row per reported account line, with up to four
//! amount columns and a handful of identifying codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement category (`sj_div` in the source data).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatementCategory {
    /// Balance sheet (point-in-time)
    BalanceSheet,
    /// Income statement
    IncomeStatement,
    /// Statement of comprehensive income
    ComprehensiveIncome,
    /// Cash flow statement
    CashFlow,
    /// Statement of changes in equity
    EquityChanges,
    /// Any other category code, kept verbatim
    Other(String),
}

impl StatementCategory {
    /// Source code for this category.
    pub fn as_code(&self) -> &str {
        match self {
            Self::BalanceSheet => "BS",
            Self::IncomeStatement => "IS",
            Self::ComprehensiveIncome => "CIS",
            Self::CashFlow => "CF",
            Self::EquityChanges => "SCE",
            Self::Other(code) => code,
        }
    }

    /// Balance sheet values are measured at an instant; everything else is a flow.
    pub const fn is_point_in_time(&self) -> bool {
        matches!(self, Self::BalanceSheet)
    }
}

impl From<&str> for StatementCategory {
    fn from(code: &str) -> Self {
        match code.trim() {
            "BS" => Self::BalanceSheet,
            "IS" => Self::IncomeStatement,
            "CIS" => Self::ComprehensiveIncome,
            "CF" => Self::CashFlow,
            "SCE" => Self::EquityChanges,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for StatementCategory {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<StatementCategory> for String {
    fn from(category: StatementCategory) -> Self {
        category.as_code().to_string()
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// One reported line from a filing.
///
/// Field names also deserialize from the regulator API's column names
/// (`bsns_year`, `reprt_code`, `fs_div`, `sj_div`, `account_nm`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFilingRow {
    /// Regulator company code
    pub corp_code: String,
    /// Listed stock code, if any
    #[serde(default)]
    pub stock_code: Option<String>,
    /// Fiscal (business) year, e.g. "2024"
    #[serde(alias = "bsns_year")]
    pub fiscal_year: String,
    /// Report type code (11011 annual, 11012 half-year, 11013 Q1, 11014 Q3)
    #[serde(alias = "reprt_code")]
    pub report_code: String,
    /// Consolidation flag: `CFS` (consolidated) or `OFS` (separate)
    #[serde(alias = "fs_div")]
    pub consolidation_flag: String,
    /// Statement category
    #[serde(alias = "sj_div")]
    pub statement: StatementCategory,
    /// Standard account id assigned by the filer, if any
    #[serde(default)]
    pub account_id: Option<String>,
    /// Reported account name
    #[serde(alias = "account_nm")]
    pub account_name: String,
    /// Account hierarchy path
    #[serde(default)]
    pub account_detail: Option<String>,
    /// Current period amount
    #[serde(default, alias = "thstrm_amount")]
    pub current_amount: Option<String>,
    /// Current period cumulative (year-to-date) amount
    #[serde(default, alias = "thstrm_add_amount")]
    pub current_cumulative_amount: Option<String>,
    /// Prior period amount
    #[serde(default, alias = "frmtrm_amount")]
    pub prior_amount: Option<String>,
    /// Amount two periods back
    #[serde(default, alias = "bfefrmtrm_amount")]
    pub prior_prior_amount: Option<String>,
    /// Reporting currency as written in the filing
    #[serde(default)]
    pub currency: Option<String>,
    /// Ordinal position of the line within its statement
    #[serde(default, alias = "ord")]
    pub ordinal: Option<String>,
    /// Receipt number of the filing this row came from
    #[serde(default, alias = "rcept_no")]
    pub receipt_no: Option<String>,
}

/// Selection of raw rows for one transform job or coverage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRowQuery {
    /// Company code
    pub corp_code: String,
    /// Fiscal year
    pub fiscal_year: String,
    /// Restrict to one report code
    pub report_code: Option<String>,
    /// Restrict to one consolidation flag
    pub consolidation_flag: Option<String>,
}

impl RawRowQuery {
    /// All rows of a company for a fiscal year.
    pub fn company_year(corp_code: impl Into<String>, fiscal_year: impl Into<String>) -> Self {
        Self {
            corp_code: corp_code.into(),
            fiscal_year: fiscal_year.into(),
            report_code: None,
            consolidation_flag: None,
        }
    }

    /// Does a row fall inside this selection?
    pub fn matches(&self, row: &RawFilingRow) -> bool {
        row.corp_code == self.corp_code
            && row.fiscal_year == self.fiscal_year
            && self
                .report_code
                .as_ref()
                .is_none_or(|code| *code == row.report_code)
            && self
                .consolidation_flag
                .as_ref()
                .is_none_or(|flag| *flag == row.consolidation_flag)
    }
}

#[cfg(test)]
pub(crate) fn sample_row(statement: &str, account_name: &str) -> RawFilingRow {
    RawFilingRow {
        corp_code: "00126380".to_string(),
        stock_code: Some("005930".to_string()),
        fiscal_year: "2024".to_string(),
        report_code: "11011".to_string(),
        consolidation_flag: "CFS".to_string(),
        statement: StatementCategory::from(statement),
        account_id: None,
        account_name: account_name.to_string(),
        account_detail: None,
        current_amount: Some("1,000".to_string()),
        current_cumulative_amount: None,
        prior_amount: None,
        prior_prior_amount: None,
        currency: Some("KRW".to_string()),
        ordinal: Some("1".to_string()),
        receipt_no: Some("20250311001085".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_category_codes() {
        assert_eq!(StatementCategory::from("BS"), StatementCategory::BalanceSheet);
        assert_eq!(StatementCategory::from("CIS"), StatementCategory::ComprehensiveIncome);
        assert_eq!(
            StatementCategory::from("XX"),
            StatementCategory::Other("XX".to_string())
        );
        assert_eq!(StatementCategory::CashFlow.to_string(), "CF");
        assert!(StatementCategory::BalanceSheet.is_point_in_time());
        assert!(!StatementCategory::IncomeStatement.is_point_in_time());
    }

    #[test]
    fn test_query_matches() {
        let row = sample_row("BS", "자산총계");
        let mut query = RawRowQuery::company_year("00126380", "2024");
        assert!(query.matches(&row));

        query.report_code = Some("11012".to_string());
        assert!(!query.matches(&row));

        query.report_code = Some("11011".to_string());
        query.consolidation_flag = Some("OFS".to_string());
        assert!(!query.matches(&row));
    }

    #[test]
    fn test_statement_category_serde() {
        let json = serde_json::to_string(&StatementCategory::ComprehensiveIncome).unwrap();
        assert_eq!(json, "\"CIS\"");

        let parsed: StatementCategory = serde_json::from_str("\"SCE\"").unwrap();
        assert_eq!(parsed, StatementCategory::EquityChanges);
    }

    #[test]
    fn test_row_from_api_field_names() {
        let json = r#"{
            "corp_code": "00126380",
            "bsns_year": "2024",
            "reprt_code": "11011",
            "fs_div": "CFS",
            "sj_div": "BS",
            "account_id": "ifrs-full_Assets",
            "account_nm": "자산총계",
            "thstrm_amount": "514,531,948,000,000",
            "ord": "1",
            "rcept_no": "20250311001085"
        }"#;
        let row: RawFilingRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.fiscal_year, "2024");
        assert_eq!(row.statement, StatementCategory::BalanceSheet);
        assert_eq!(row.account_name, "자산총계");
        assert_eq!(row.current_amount.as_deref(), Some("514,531,948,000,000"));
        assert_eq!(row.stock_code, None);
        assert_eq!(row.receipt_no.as_deref(), Some("20250311001085"));
    }
}
