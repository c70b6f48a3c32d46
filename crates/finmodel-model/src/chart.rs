//! Standard chart of accounts used by the model.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Statements of the three-statement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub enum ModelStatement {
    /// Income statement
    #[display("IS")]
    #[serde(rename = "IS")]
    IncomeStatement,
    /// Balance sheet
    #[display("BS")]
    #[serde(rename = "BS")]
    BalanceSheet,
    /// Cash flow statement
    #[display("CF")]
    #[serde(rename = "CF")]
    CashFlow,
}

impl ModelStatement {
    /// All statements in model order.
    pub const ALL: [Self; 3] = [Self::IncomeStatement, Self::BalanceSheet, Self::CashFlow];

    /// Short code, also the line id prefix.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "IS",
            Self::BalanceSheet => "BS",
            Self::CashFlow => "CF",
        }
    }

    /// Parse a short code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "IS" => Some(Self::IncomeStatement),
            "BS" => Some(Self::BalanceSheet),
            "CF" => Some(Self::CashFlow),
            _ => None,
        }
    }

    /// Standard lines of this statement in display order.
    pub const fn lines(&self) -> &'static [StandardLine] {
        match self {
            Self::IncomeStatement => INCOME_STATEMENT,
            Self::BalanceSheet => BALANCE_SHEET,
            Self::CashFlow => CASH_FLOW,
        }
    }
}

/// A line of the standard chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StandardLine {
    /// Line id, e.g. `BS.TOTAL_ASSETS`
    pub id: &'static str,
    /// Display name
    pub display_name: &'static str,
    /// Statement the line belongs to
    pub statement: ModelStatement,
}

const fn line(id: &'static str, display_name: &'static str, statement: ModelStatement) -> StandardLine {
    StandardLine { id, display_name, statement }
}

/// Line ids referenced by the integrity checks.
pub mod ids {
    /// Total assets
    pub const TOTAL_ASSETS: &str = "BS.TOTAL_ASSETS";
    /// Total liabilities
    pub const TOTAL_LIABILITIES: &str = "BS.TOTAL_LIABILITIES";
    /// Total equity
    pub const TOTAL_EQUITY: &str = "BS.TOTAL_EQUITY";
    /// Net change in cash
    pub const NET_CHANGE: &str = "CF.NET_CHANGE";
    /// Beginning cash
    pub const BEGIN_CASH: &str = "CF.BEGIN_CASH";
    /// Ending cash
    pub const END_CASH: &str = "CF.END_CASH";
}

use ModelStatement::{BalanceSheet as BS, CashFlow as CF, IncomeStatement as IS};

/// Income statement lines.
pub const INCOME_STATEMENT: &[StandardLine] = &[
    line("IS.REVENUE", "Revenue", IS),
    line("IS.COGS", "Cost of Goods Sold", IS),
    line("IS.GROSS_PROFIT", "Gross Profit", IS),
    line("IS.SGA", "SG&A", IS),
    line("IS.DA", "Depreciation & Amortization", IS),
    line("IS.EBIT", "EBIT", IS),
    line("IS.INTEREST_EXPENSE", "Interest Expense", IS),
    line("IS.EBT", "EBT", IS),
    line("IS.TAXES", "Income Tax Expense", IS),
    line("IS.NET_INCOME", "Net Income", IS),
];

/// Balance sheet lines.
pub const BALANCE_SHEET: &[StandardLine] = &[
    line("BS.CASH", "Cash & Cash Equivalents", BS),
    line("BS.AR", "Accounts Receivable", BS),
    line("BS.INVENTORY", "Inventory", BS),
    line("BS.OTHER_CA", "Other Current Assets", BS),
    line("BS.TOTAL_CA", "Total Current Assets", BS),
    line("BS.PPE_NET", "PP&E (Net)", BS),
    line("BS.INTANGIBLES", "Intangible Assets", BS),
    line("BS.OTHER_NCA", "Other Non-Current Assets", BS),
    line(ids::TOTAL_ASSETS, "Total Assets", BS),
    line("BS.AP", "Accounts Payable", BS),
    line("BS.OTHER_CL", "Other Current Liabilities", BS),
    line("BS.SHORT_DEBT", "Short-term Debt", BS),
    line("BS.TOTAL_CL", "Total Current Liabilities", BS),
    line("BS.LONG_DEBT", "Long-term Debt", BS),
    line("BS.OTHER_NCL", "Other Non-Current Liabilities", BS),
    line(ids::TOTAL_LIABILITIES, "Total Liabilities", BS),
    line("BS.COMMON_STOCK", "Common Stock", BS),
    line("BS.RETAINED_EARNINGS", "Retained Earnings", BS),
    line(ids::TOTAL_EQUITY, "Total Equity", BS),
];

/// Cash flow statement lines.
pub const CASH_FLOW: &[StandardLine] = &[
    line("CF.CFO", "Cash Flow from Operations", CF),
    line("CF.CFI", "Cash Flow from Investing", CF),
    line("CF.CFF", "Cash Flow from Financing", CF),
    line(ids::NET_CHANGE, "Net Change in Cash", CF),
    line(ids::BEGIN_CASH, "Beginning Cash", CF),
    line(ids::END_CASH, "Ending Cash", CF),
];

/// Look up a standard line by id.
pub fn find_line(id: &str) -> Option<&'static StandardLine> {
    ModelStatement::ALL.iter().flat_map(|s| s.lines()).find(|line| line.id == id)
}

/// Display name of a line id, falling back to the id itself.
pub fn display_name(id: &str) -> &str {
    find_line(id).map_or(id, |line| line.display_name)
}

/// Statement a line id belongs to, from its prefix.
pub fn statement_of(id: &str) -> Option<ModelStatement> {
    id.split_once('.').and_then(|(prefix, _)| ModelStatement::from_code(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_chart_sizes() {
        assert_eq!(INCOME_STATEMENT.len(), 10);
        assert_eq!(BALANCE_SHEET.len(), 19);
        assert_eq!(CASH_FLOW.len(), 6);
    }

    #[test]
    fn test_ids_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for statement in ModelStatement::ALL {
            for line in statement.lines() {
                assert!(seen.insert(line.id), "duplicate {}", line.id);
                assert_eq!(line.statement, statement);
                assert_eq!(statement_of(line.id), Some(statement));
            }
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("BS.PPE_NET"), "PP&E (Net)");
        assert_eq!(display_name("CF.END_CASH"), "Ending Cash");
        assert_eq!(display_name("IS.OTHER_INCOME"), "IS.OTHER_INCOME");
        assert!(find_line("XX.NOPE").is_none());
    }
}
