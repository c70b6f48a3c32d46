//! Normalization of a realistic half-year filing through the public API.

use finmodel_curate::{
    ConsolidationScope, NormalizeOptions, PeriodDates, PeriodKind, RawFilingRow, StatementCategory,
    identity_key, normalize_row,
};
use rstest::rstest;
use rust_decimal_macros::dec;

fn half_year_row(statement: &str, name: &str, current: &str, cumulative: &str) -> RawFilingRow {
    RawFilingRow {
        corp_code: "00164779".to_string(),
        stock_code: Some("000660".to_string()),
        fiscal_year: "2024".to_string(),
        report_code: "11012".to_string(),
        consolidation_flag: "CFS".to_string(),
        statement: StatementCategory::from(statement),
        account_id: None,
        account_name: name.to_string(),
        account_detail: Some("-".to_string()),
        current_amount: Some(current.to_string()),
        current_cumulative_amount: Some(cumulative.to_string()),
        prior_amount: Some("1".to_string()),
        prior_prior_amount: None,
        currency: Some("원".to_string()),
        ordinal: Some("3".to_string()),
        receipt_no: Some("20240814001234".to_string()),
    }
}

#[rstest]
#[case(true, dec!(16423300000000), false)]
#[case(false, dec!(28829600000000), true)]
fn test_half_year_income_statement(
    #[case] prefer_period_flow: bool,
    #[case] expected: rust_decimal::Decimal,
    #[case] accumulated: bool,
) {
    let raw = half_year_row("IS", "매출액", "16,423,300,000,000", "28,829,600,000,000");
    let options = NormalizeOptions { prefer_period_flow, ..Default::default() };

    let row = normalize_row(&raw, &options).unwrap().unwrap();
    assert_eq!(row.amount, expected);
    assert_eq!(row.is_accumulated, accumulated);
    assert_eq!(row.currency, "KRW");
    assert_eq!(row.period.kind, PeriodKind::HalfYear);
    assert_eq!(row.period.fiscal_quarter, Some(2));
    assert!(matches!(row.period.dates, PeriodDates::Flow { .. }));
    assert_eq!(row.scope, ConsolidationScope::Consolidated);
    assert_eq!(row.report_ref.as_deref(), Some("20240814001234"));
}

#[test]
fn test_balance_sheet_ignores_cumulative() {
    let raw = half_year_row("BS", "부채총계", "(2,000)", "9,999");
    let options = NormalizeOptions { prefer_period_flow: false, ..Default::default() };

    let row = normalize_row(&raw, &options).unwrap().unwrap();
    assert_eq!(row.amount, dec!(-2000));
    assert!(!row.is_accumulated);
    assert_eq!(identity_key(&row), "entity-00164779:HALF_YEAR:2024:2:11012:CONSOLIDATED:BS:부채총계");
}
