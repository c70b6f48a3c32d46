//! Choice between period-flow and cumulative amount columns.

use crate::period::ReportCode;
use crate::raw::RawFilingRow;

/// Amount column picked for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedAmount<'a> {
    /// Selected amount text, `None` when no usable column was found
    pub amount: Option<&'a str>,
    /// The value is a year-to-date accumulation
    pub is_accumulated: bool,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Select the amount column for a row.
///
/// Balance sheets and annual reports always use the current-period column.
/// Interim flow statements pick between the period and cumulative columns.
pub fn select_amount(row: &RawFilingRow, prefer_period_flow: bool) -> SelectedAmount<'_> {
    let current = present(row.current_amount.as_ref());

    if row.statement.is_point_in_time() || !ReportCode::parse(&row.report_code).is_interim() {
        return SelectedAmount { amount: current, is_accumulated: false };
    }

    let cumulative = present(row.current_cumulative_amount.as_ref());
    if prefer_period_flow {
        SelectedAmount { amount: current.or(cumulative), is_accumulated: current.is_none() && cumulative.is_some() }
    } else {
        SelectedAmount { amount: cumulative.or(current), is_accumulated: cumulative.is_some() }
    }
}
