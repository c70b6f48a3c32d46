//! Fiscal period resolution from report codes.

use crate::error::{CurateError, Result};
use crate::raw::StatementCategory;
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Regulator report type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportCode {
    /// `11011` business (annual) report
    Annual,
    /// `11013` first quarter report
    FirstQuarter,
    /// `11012` half-year report
    HalfYear,
    /// `11014` third quarter report
    ThirdQuarter,
    /// Any other code; resolved as annual
    Unrecognized(String),
}

impl ReportCode {
    /// Annual report code.
    pub const ANNUAL: &'static str = "11011";
    /// First quarter report code.
    pub const FIRST_QUARTER: &'static str = "11013";
    /// Half-year report code.
    pub const HALF_YEAR: &'static str = "11012";
    /// Third quarter report code.
    pub const THIRD_QUARTER: &'static str = "11014";

    /// Classify a raw report code.
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            Self::ANNUAL => Self::Annual,
            Self::FIRST_QUARTER => Self::FirstQuarter,
            Self::HALF_YEAR => Self::HalfYear,
            Self::THIRD_QUARTER => Self::ThirdQuarter,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Code as written in the source data.
    pub fn as_code(&self) -> &str {
        match self {
            Self::Annual => Self::ANNUAL,
            Self::FirstQuarter => Self::FIRST_QUARTER,
            Self::HalfYear => Self::HALF_YEAR,
            Self::ThirdQuarter => Self::THIRD_QUARTER,
            Self::Unrecognized(code) => code,
        }
    }

    /// Interim reports carry both a period and a cumulative amount column.
    pub const fn is_interim(&self) -> bool {
        matches!(self, Self::FirstQuarter | Self::HalfYear | Self::ThirdQuarter)
    }

    /// Period kind the report resolves to.
    pub const fn kind(&self) -> PeriodKind {
        match self {
            Self::FirstQuarter | Self::ThirdQuarter => PeriodKind::Quarter,
            Self::HalfYear => PeriodKind::HalfYear,
            Self::Annual | Self::Unrecognized(_) => PeriodKind::Annual,
        }
    }

    /// Fiscal quarter the report closes.
    pub const fn quarter(&self) -> Option<u8> {
        match self {
            Self::FirstQuarter => Some(1),
            Self::HalfYear => Some(2),
            Self::ThirdQuarter => Some(3),
            Self::Annual | Self::Unrecognized(_) => None,
        }
    }

    /// Month and day of the period end.
    const fn period_end(&self) -> (u32, u32) {
        match self {
            Self::FirstQuarter => (3, 31),
            Self::HalfYear => (6, 30),
            Self::ThirdQuarter => (9, 30),
            Self::Annual | Self::Unrecognized(_) => (12, 31),
        }
    }
}

/// Kind of fiscal period a value covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodKind {
    /// Full fiscal year
    #[display("ANNUAL")]
    Annual,
    /// Single quarter
    #[display("QUARTER")]
    Quarter,
    /// First half of the fiscal year
    #[display("HALF_YEAR")]
    HalfYear,
    /// Year to date
    #[display("YTD")]
    Ytd,
}

impl PeriodKind {
    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Annual => "ANNUAL",
            Self::Quarter => "QUARTER",
            Self::HalfYear => "HALF_YEAR",
            Self::Ytd => "YTD",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ANNUAL" => Some(Self::Annual),
            "QUARTER" => Some(Self::Quarter),
            "HALF_YEAR" => Some(Self::HalfYear),
            "YTD" => Some(Self::Ytd),
            _ => None,
        }
    }
}

/// Dates a value is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodDates {
    /// Point in time (balance sheet)
    AsOf {
        /// Measurement date
        date: NaiveDate,
    },
    /// Flow from the start of the fiscal year to the period end
    Flow {
        /// First day of the flow
        start: NaiveDate,
        /// Last day of the flow
        end: NaiveDate,
    },
}

impl PeriodDates {
    /// As-of date for point-in-time values.
    pub const fn as_of(&self) -> Option<NaiveDate> {
        match self {
            Self::AsOf { date } => Some(*date),
            Self::Flow { .. } => None,
        }
    }

    /// Start and end for flow values.
    pub const fn flow(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::AsOf { .. } => None,
            Self::Flow { start, end } => Some((*start, *end)),
        }
    }

    /// Last day the value covers.
    pub const fn end(&self) -> NaiveDate {
        match self {
            Self::AsOf { date } => *date,
            Self::Flow { end, .. } => *end,
        }
    }
}

/// Fiscal period semantics of one filing row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPeriod {
    /// Period kind
    pub kind: PeriodKind,
    /// Fiscal year
    pub fiscal_year: i32,
    /// Fiscal quarter (1-4), none for annual
    pub fiscal_quarter: Option<u8>,
    /// Measurement dates
    pub dates: PeriodDates,
}

/// Resolve the fiscal period of a row from its report code and statement.
///
/// Unrecognized report codes are treated as annual and logged.
pub fn resolve_period(
    fiscal_year: &str,
    report_code: &str,
    statement: &StatementCategory,
) -> Result<NormalizedPeriod> {
    let year: i32 = fiscal_year
        .trim()
        .parse()
        .map_err(|_| CurateError::InvalidFiscalYear(fiscal_year.to_string()))?;

    let code = ReportCode::parse(report_code);
    if let ReportCode::Unrecognized(raw) = &code {
        tracing::warn!(report_code = %raw, "Unrecognized report code, treating as annual");
    }

    let (month, day) = code.period_end();
    let end = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| CurateError::InvalidFiscalYear(fiscal_year.to_string()))?;

    let dates = if statement.is_point_in_time() {
        PeriodDates::AsOf { date: end }
    } else {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| CurateError::InvalidFiscalYear(fiscal_year.to_string()))?;
        PeriodDates::Flow { start, end }
    };

    Ok(NormalizedPeriod { kind: code.kind(), fiscal_year: year, fiscal_quarter: code.quarter(), dates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("11011", PeriodKind::Annual, None, (12, 31))]
    #[case("11013", PeriodKind::Quarter, Some(1), (3, 31))]
    #[case("11012", PeriodKind::HalfYear, Some(2), (6, 30))]
    #[case("11014", PeriodKind::Quarter, Some(3), (9, 30))]
    #[case("99999", PeriodKind::Annual, None, (12, 31))]
    fn test_report_code_table(
        #[case] code: &str,
        #[case] kind: PeriodKind,
        #[case] quarter: Option<u8>,
        #[case] end: (u32, u32),
    ) {
        let period = resolve_period("2024", code, &StatementCategory::IncomeStatement).unwrap();
        assert_eq!(period.kind, kind);
        assert_eq!(period.fiscal_year, 2024);
        assert_eq!(period.fiscal_quarter, quarter);
        assert_eq!(
            period.dates,
            PeriodDates::Flow { start: date(2024, 1, 1), end: date(2024, end.0, end.1) }
        );
    }

    #[test]
    fn test_balance_sheet_is_point_in_time() {
        let period = resolve_period("2023", "11012", &StatementCategory::BalanceSheet).unwrap();
        assert_eq!(period.dates.as_of(), Some(date(2023, 6, 30)));
        assert_eq!(period.dates.flow(), None);
    }

    #[test]
    fn test_flow_runs_from_january_first() {
        let period = resolve_period("2023", "11014", &StatementCategory::CashFlow).unwrap();
        assert_eq!(period.dates.flow(), Some((date(2023, 1, 1), date(2023, 9, 30))));
        assert_eq!(period.dates.end(), date(2023, 9, 30));
    }

    #[test]
    fn test_invalid_fiscal_year() {
        let err = resolve_period("FY24", "11011", &StatementCategory::BalanceSheet).unwrap_err();
        assert!(matches!(err, CurateError::InvalidFiscalYear(ref y) if y == "FY24"));
    }

    #[test]
    fn test_period_kind_db_str() {
        for kind in [PeriodKind::Annual, PeriodKind::Quarter, PeriodKind::HalfYear, PeriodKind::Ytd] {
            assert_eq!(PeriodKind::from_db_str(kind.to_db_str()), Some(kind));
            assert_eq!(kind.to_string(), kind.to_db_str());
        }
        assert_eq!(PeriodKind::from_db_str("MONTH"), None);
    }

    #[test]
    fn test_report_code_round_trip() {
        assert_eq!(ReportCode::parse(" 11012 "), ReportCode::HalfYear);
        assert_eq!(ReportCode::parse("11099").as_code(), "11099");
        assert!(ReportCode::FirstQuarter.is_interim());
        assert!(!ReportCode::Annual.is_interim());
    }
}
