//! Default mapping rules for DART filings.
//!
//! Account ids follow the IFRS and DART taxonomies; names are the Korean
//! captions used in consolidated statements. Id rules take priority 1 and
//! name rules priority 10.

use finmodel_curate::{MappingRule, NewMappingRule, Result, RuleStore, StatementCategory};

/// Priority of rules keyed on taxonomy account ids.
pub const ACCOUNT_ID_PRIORITY: i32 = 1;

/// Priority of rules keyed on account names.
pub const NAME_PRIORITY: i32 = 10;

/// Rules for one standard line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSeed {
    /// Standard line id
    pub line_id: &'static str,
    /// Statement the accounts are reported in
    pub statement: &'static str,
    /// Taxonomy account ids
    pub account_ids: &'static [&'static str],
    /// Account names, matched exactly and as patterns
    pub names: &'static [&'static str],
}

const fn seed(
    line_id: &'static str,
    statement: &'static str,
    account_ids: &'static [&'static str],
    names: &'static [&'static str],
) -> LineSeed {
    LineSeed { line_id, statement, account_ids, names }
}

/// Default seeds. Order matters among name rules: a name that contains
/// another comes first.
pub const DEFAULT_SEEDS: &[LineSeed] = &[
    // Income statement
    seed("IS.REVENUE", "IS", &["ifrs-full_Revenue"], &["매출액", "수익(매출액)", "영업수익"]),
    seed("IS.COGS", "IS", &["ifrs-full_CostOfSales"], &["매출원가"]),
    seed("IS.GROSS_PROFIT", "IS", &["ifrs-full_GrossProfit"], &["매출총이익"]),
    seed("IS.SGA", "IS", &["dart_TotalSellingGeneralAdministrativeExpenses"], &["판매비와관리비"]),
    seed("IS.EBIT", "IS", &["dart_OperatingIncomeLoss"], &["영업이익", "영업이익(손실)"]),
    seed("IS.INTEREST_EXPENSE", "IS", &[], &["이자비용"]),
    seed(
        "IS.EBT",
        "IS",
        &["ifrs-full_ProfitLossBeforeTax"],
        &["법인세비용차감전순이익", "법인세비용차감전순이익(손실)"],
    ),
    seed("IS.TAXES", "IS", &["ifrs-full_IncomeTaxExpenseContinuingOperations"], &["법인세비용"]),
    seed("IS.NET_INCOME", "IS", &["ifrs-full_ProfitLoss"], &["당기순이익", "당기순이익(손실)"]),
    // Balance sheet
    seed("BS.CASH", "BS", &["ifrs-full_CashAndCashEquivalents"], &["현금및현금성자산"]),
    seed("BS.AR", "BS", &["ifrs-full_TradeAndOtherCurrentReceivables"], &["매출채권"]),
    seed("BS.INVENTORY", "BS", &["ifrs-full_Inventories"], &["재고자산"]),
    seed("BS.TOTAL_CA", "BS", &["ifrs-full_CurrentAssets"], &["^유동자산$"]),
    seed("BS.PPE_NET", "BS", &["ifrs-full_PropertyPlantAndEquipment"], &["유형자산"]),
    seed("BS.INTANGIBLES", "BS", &["ifrs-full_IntangibleAssetsOtherThanGoodwill"], &["무형자산"]),
    seed("BS.TOTAL_ASSETS", "BS", &["ifrs-full_Assets"], &["자산총계"]),
    seed("BS.AP", "BS", &["ifrs-full_TradeAndOtherCurrentPayables"], &["매입채무"]),
    seed("BS.SHORT_DEBT", "BS", &["ifrs-full_ShorttermBorrowings"], &["단기차입금"]),
    seed("BS.TOTAL_CL", "BS", &["ifrs-full_CurrentLiabilities"], &["^유동부채$"]),
    seed("BS.LONG_DEBT", "BS", &["dart_LongTermBorrowingsGross"], &["장기차입금"]),
    seed("BS.TOTAL_LIABILITIES", "BS", &["ifrs-full_Liabilities"], &["부채총계"]),
    seed("BS.COMMON_STOCK", "BS", &["ifrs-full_IssuedCapital"], &["자본금"]),
    seed("BS.RETAINED_EARNINGS", "BS", &["ifrs-full_RetainedEarnings"], &["이익잉여금"]),
    seed("BS.TOTAL_EQUITY", "BS", &["ifrs-full_Equity"], &["자본총계"]),
    // Cash flow
    seed("CF.CFO", "CF", &["ifrs-full_CashFlowsFromUsedInOperatingActivities"], &["영업활동현금흐름"]),
    seed("CF.CFI", "CF", &["ifrs-full_CashFlowsFromUsedInInvestingActivities"], &["투자활동현금흐름"]),
    seed("CF.CFF", "CF", &["ifrs-full_CashFlowsFromUsedInFinancingActivities"], &["재무활동현금흐름"]),
    seed(
        "CF.NET_CHANGE",
        "CF",
        &["ifrs-full_IncreaseDecreaseInCashAndCashEquivalents"],
        &["현금및현금성자산의순증가(감소)", "현금및현금성자산의증가(감소)"],
    ),
    seed("CF.BEGIN_CASH", "CF", &[], &["기초현금및현금성자산", "기초의현금및현금성자산"]),
    seed("CF.END_CASH", "CF", &[], &["기말현금및현금성자산", "기말의현금및현금성자산"]),
];

impl LineSeed {
    /// Rules for this line: one per account id, then one per name.
    ///
    /// Income statement name rules carry no statement filter so they also
    /// match comprehensive income rows.
    pub fn rules(&self) -> Vec<NewMappingRule> {
        let statement = StatementCategory::from(self.statement);
        let by_id = self.account_ids.iter().map(|id| {
            NewMappingRule::new(self.line_id)
                .with_source_id(*id)
                .for_statement(statement.clone())
                .with_priority(ACCOUNT_ID_PRIORITY)
        });
        let by_name = self.names.iter().map(|name| {
            let rule = NewMappingRule::new(self.line_id).with_name_pattern(*name).with_priority(NAME_PRIORITY);
            if statement == StatementCategory::IncomeStatement { rule } else { rule.for_statement(statement.clone()) }
        });
        by_id.chain(by_name).collect()
    }
}

/// Every default rule, id rules of all lines first.
pub fn default_rules() -> Vec<NewMappingRule> {
    let (by_id, by_name): (Vec<_>, Vec<_>) = DEFAULT_SEEDS
        .iter()
        .flat_map(LineSeed::rules)
        .partition(|rule| rule.account_source_id.is_some());
    by_id.into_iter().chain(by_name).collect()
}

/// Store the default rules unless the store already holds rules.
/// Returns the number of rules inserted.
pub fn seed_default_rules<S: RuleStore + ?Sized>(store: &S) -> Result<usize> {
    if !store.load_rules()?.is_empty() {
        tracing::info!("Rule store already populated, skipping seed");
        return Ok(0);
    }

    let rules = default_rules();
    for rule in &rules {
        rule.validate()?;
    }
    let inserted: Vec<MappingRule> = rules.into_iter().map(|rule| store.insert_rule(rule)).collect::<Result<_>>()?;
    tracing::info!(rules = inserted.len(), "Seeded default mapping rules");
    Ok(inserted.len())
}
