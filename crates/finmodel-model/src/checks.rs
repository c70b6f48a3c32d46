//! Accounting identity checks.

use crate::chart::ids;
use crate::statement::Statement;
use crate::timeline::ModelTimeline;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of one identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Every period is within tolerance
    pub passed: bool,
    /// Largest absolute error over all periods
    pub max_error: Decimal,
    /// Allowed absolute error
    pub tolerance: Decimal,
}

impl CheckResult {
    fn over<I: IntoIterator<Item = Decimal>>(errors: I, tolerance: Decimal) -> Self {
        let max_error = errors.into_iter().map(|e| e.abs()).fold(Decimal::ZERO, Decimal::max);
        Self { passed: max_error <= tolerance, max_error, tolerance }
    }
}

/// Results of all model checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelChecks {
    /// Assets equal liabilities plus equity
    pub balance: CheckResult,
    /// Ending cash equals beginning cash plus net change
    pub cash_tie_out: CheckResult,
}

impl ModelChecks {
    /// Both checks passed.
    pub const fn is_valid(&self) -> bool {
        self.balance.passed && self.cash_tie_out.passed
    }
}

/// Run the balance and cash tie-out checks. Missing values count as zero.
pub fn run_checks(
    balance_sheet: &Statement,
    cash_flow: &Statement,
    timeline: &ModelTimeline,
    tolerance: Decimal,
) -> ModelChecks {
    let indices = || timeline.periods().iter().map(|p| p.index);

    let balance = CheckResult::over(
        indices().map(|i| {
            balance_sheet.value_or_zero(ids::TOTAL_ASSETS, i)
                - (balance_sheet.value_or_zero(ids::TOTAL_LIABILITIES, i)
                    + balance_sheet.value_or_zero(ids::TOTAL_EQUITY, i))
        }),
        tolerance,
    );

    let cash_tie_out = CheckResult::over(
        indices().map(|i| {
            cash_flow.value_or_zero(ids::END_CASH, i)
                - (cash_flow.value_or_zero(ids::BEGIN_CASH, i) + cash_flow.value_or_zero(ids::NET_CHANGE, i))
        }),
        tolerance,
    );

    ModelChecks { balance, cash_tie_out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ModelStatement;
    use crate::statement::{Provenance, StatementLine};
    use crate::timeline::{TimelineSpec, build_timeline};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn statement(kind: ModelStatement, lines: &[(&str, &[(usize, Decimal)])]) -> Statement {
        Statement {
            statement: kind,
            lines: lines
                .iter()
                .enumerate()
                .map(|(order, (id, values))| StatementLine {
                    line_id: id.to_string(),
                    display_name: id.to_string(),
                    statement: kind,
                    values: values.iter().copied().collect::<BTreeMap<_, _>>(),
                    unit: "KRW".to_string(),
                    display_order: order,
                    provenance: Provenance::Source,
                })
                .collect(),
        }
    }

    fn timeline() -> ModelTimeline {
        build_timeline(&TimelineSpec::annual(2024, 1, 1)).unwrap()
    }

    #[rstest]
    #[case(dec!(900000), true, dec!(0))]
    #[case(dec!(900002), false, dec!(2))]
    fn test_balance_check(#[case] equity: Decimal, #[case] passed: bool, #[case] max_error: Decimal) {
        let bs = statement(
            ModelStatement::BalanceSheet,
            &[
                (ids::TOTAL_ASSETS, &[(0, dec!(2200000))]),
                (ids::TOTAL_LIABILITIES, &[(0, dec!(1300000))]),
                (ids::TOTAL_EQUITY, &[(0, equity)]),
            ],
        );
        let cf = statement(ModelStatement::CashFlow, &[]);

        let checks = run_checks(&bs, &cf, &timeline(), dec!(1));
        assert_eq!(checks.balance.passed, passed);
        assert_eq!(checks.balance.max_error, max_error);
        assert_eq!(checks.balance.tolerance, dec!(1));
        assert_eq!(checks.is_valid(), passed);
    }

    #[test]
    fn test_error_within_tolerance_passes() {
        let bs = statement(ModelStatement::BalanceSheet, &[(ids::TOTAL_ASSETS, &[(0, dec!(1))])]);
        let cf = statement(ModelStatement::CashFlow, &[]);
        let checks = run_checks(&bs, &cf, &timeline(), dec!(1));
        assert!(checks.balance.passed);
        assert_eq!(checks.balance.max_error, dec!(1));
    }

    #[test]
    fn test_cash_tie_out_max_over_periods() {
        let bs = statement(ModelStatement::BalanceSheet, &[]);
        let cf = statement(
            ModelStatement::CashFlow,
            &[
                (ids::BEGIN_CASH, &[(0, dec!(100)), (1, dec!(150))]),
                (ids::NET_CHANGE, &[(0, dec!(50)), (1, dec!(-20))]),
                (ids::END_CASH, &[(0, dec!(150)), (1, dec!(125))]),
            ],
        );

        let checks = run_checks(&bs, &cf, &timeline(), dec!(1));
        assert!(checks.balance.passed);
        assert!(!checks.cash_tie_out.passed);
        assert_eq!(checks.cash_tie_out.max_error, dec!(5));
    }
}
