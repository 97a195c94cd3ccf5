use chrono::NaiveDate;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject, StringValidation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::utils::{transform, WalkControl};

/// Monetary value in the filing's presentation currency.
pub type MonetaryAmount = f64;

/// Optional monetary value; absent means "not reported", which the
/// normalization step turns into 0 for the strict full-taxonomy shape.
pub type OptionalMonetaryAmount = Option<f64>;

pub const UEN_PATTERN: &str = r"^([0-9]{8}[A-Z]|[0-9]{9}[A-Z]|[TSR][0-9]{2}[A-Z]{2}[0-9]{4}[A-Z])$";
pub const UEN_MIN_LENGTH: u32 = 9;
pub const UEN_MAX_LENGTH: u32 = 10;
pub const PRINCIPAL_ACTIVITIES_MAX_LENGTH: u32 = 2000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum ConsolidatedAndSeparate {
    Consolidated,
    Separate,
}

/// The closed set of statement shapes, keyed by their `statementType` tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum StatementType {
    CurrentNonCurrent,
    OrderOfLiquidity,
    IncomeStatement,
    TradeAndOtherReceivablesNote,
    TradeAndOtherPayablesNote,
    RevenueNote,
}

impl StatementType {
    pub const ALL: [StatementType; 6] = [
        StatementType::CurrentNonCurrent,
        StatementType::OrderOfLiquidity,
        StatementType::IncomeStatement,
        StatementType::TradeAndOtherReceivablesNote,
        StatementType::TradeAndOtherPayablesNote,
        StatementType::RevenueNote,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            StatementType::CurrentNonCurrent => "currentNonCurrent",
            StatementType::OrderOfLiquidity => "orderOfLiquidity",
            StatementType::IncomeStatement => "incomeStatement",
            StatementType::TradeAndOtherReceivablesNote => "tradeAndOtherReceivablesNote",
            StatementType::TradeAndOtherPayablesNote => "tradeAndOtherPayablesNote",
            StatementType::RevenueNote => "revenueNote",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StatementType::CurrentNonCurrent => "Statement of Financial Position (Current/Non-current)",
            StatementType::OrderOfLiquidity => "Statement of Financial Position (Order of Liquidity)",
            StatementType::IncomeStatement => "Income Statement",
            StatementType::TradeAndOtherReceivablesNote => "Trade and Other Receivables Note",
            StatementType::TradeAndOtherPayablesNote => "Trade and Other Payables Note",
            StatementType::RevenueNote => "Revenue Note",
        }
    }

    pub fn is_balance_sheet(self) -> bool {
        matches!(
            self,
            StatementType::CurrentNonCurrent | StatementType::OrderOfLiquidity
        )
    }

    /// Schema of the variant's payload, generated once from the typed model.
    pub fn json_schema(self) -> &'static RootSchema {
        static SCHEMAS: OnceLock<BTreeMap<StatementType, RootSchema>> = OnceLock::new();
        let schemas = SCHEMAS.get_or_init(|| {
            StatementType::ALL
                .into_iter()
                .map(|t| (t, t.generate_schema()))
                .collect()
        });
        &schemas[&self]
    }

    fn generate_schema(self) -> RootSchema {
        match self {
            StatementType::CurrentNonCurrent => schemars::schema_for!(CurrentNonCurrentBalanceSheet),
            StatementType::OrderOfLiquidity => schemars::schema_for!(OrderOfLiquidityBalanceSheet),
            StatementType::IncomeStatement => schemars::schema_for!(IncomeStatement),
            StatementType::TradeAndOtherReceivablesNote => {
                schemars::schema_for!(TradeAndOtherReceivablesNote)
            }
            StatementType::TradeAndOtherPayablesNote => {
                schemars::schema_for!(TradeAndOtherPayablesNote)
            }
            StatementType::RevenueNote => schemars::schema_for!(RevenueNote),
        }
    }

    /// `$ref`-free schema for structured-output consumers that cannot resolve
    /// definitions (e.g. an LLM response schema).
    pub fn response_schema(self) -> serde_json::Result<Value> {
        clean_schema(self.json_schema().clone())
    }
}

impl std::fmt::Display for StatementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Fields shared by every statement variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementHeader {
    #[schemars(description = "Whether the figures are for the group (Consolidated) or the company alone (Separate)")]
    pub consolidated_and_separate: ConsolidatedAndSeparate,

    #[schemars(description = "Reporting date in YYYY-MM-DD format")]
    pub period_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(schema_with = "uen_schema")]
    pub unique_entity_number: Option<String>,
}

impl StatementHeader {
    pub fn new(consolidated_and_separate: ConsolidatedAndSeparate) -> Self {
        Self {
            consolidated_and_separate,
            period_date: None,
            unique_entity_number: None,
        }
    }
}

fn uen_schema(_gen: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(vec![InstanceType::String, InstanceType::Null].into()),
        string: Some(Box::new(StringValidation {
            max_length: Some(UEN_MAX_LENGTH),
            min_length: Some(UEN_MIN_LENGTH),
            pattern: Some(UEN_PATTERN.to_string()),
        })),
        ..Default::default()
    }
    .into()
}

fn principal_activities_schema(_gen: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(vec![InstanceType::String, InstanceType::Null].into()),
        string: Some(Box::new(StringValidation {
            max_length: Some(PRINCIPAL_ACTIVITIES_MAX_LENGTH),
            min_length: Some(1),
            pattern: None,
        })),
        ..Default::default()
    }
    .into()
}

/// A section whose declared total should equal the sum of its components.
pub trait SectionTotals {
    /// `(fieldName, value)` of every component contributing to the total.
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)>;

    /// `(fieldName, value)` of the declared total.
    fn declared_total(&self) -> (&'static str, MonetaryAmount);

    fn component_sum(&self) -> f64 {
        self.components()
            .iter()
            .map(|(_, v)| v.unwrap_or(0.0))
            .sum()
    }

    fn has_components(&self) -> bool {
        self.components().iter().any(|(_, v)| v.is_some())
    }
}

// ---------------------------------------------------------------------------
// Statement of financial position: current / non-current presentation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAssets {
    pub cash_and_bank_balances: OptionalMonetaryAmount,
    pub trade_and_other_receivables_current: OptionalMonetaryAmount,
    pub current_finance_lease_receivables: OptionalMonetaryAmount,
    pub current_derivative_financial_assets: OptionalMonetaryAmount,
    pub current_financial_assets_measured_at_fair_value_through_profit_or_loss: OptionalMonetaryAmount,
    pub other_current_financial_assets: OptionalMonetaryAmount,
    pub development_properties: OptionalMonetaryAmount,
    pub inventories: OptionalMonetaryAmount,
    pub other_current_nonfinancial_assets: OptionalMonetaryAmount,
    pub non_current_assets_or_disposal_groups_classified_as_held_for_sale: OptionalMonetaryAmount,
    pub total_current_assets: MonetaryAmount,
}

impl SectionTotals for CurrentAssets {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("cashAndBankBalances", self.cash_and_bank_balances),
            ("tradeAndOtherReceivablesCurrent", self.trade_and_other_receivables_current),
            ("currentFinanceLeaseReceivables", self.current_finance_lease_receivables),
            ("currentDerivativeFinancialAssets", self.current_derivative_financial_assets),
            (
                "currentFinancialAssetsMeasuredAtFairValueThroughProfitOrLoss",
                self.current_financial_assets_measured_at_fair_value_through_profit_or_loss,
            ),
            ("otherCurrentFinancialAssets", self.other_current_financial_assets),
            ("developmentProperties", self.development_properties),
            ("inventories", self.inventories),
            ("otherCurrentNonfinancialAssets", self.other_current_nonfinancial_assets),
            (
                "nonCurrentAssetsOrDisposalGroupsClassifiedAsHeldForSale",
                self.non_current_assets_or_disposal_groups_classified_as_held_for_sale,
            ),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalCurrentAssets", self.total_current_assets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonCurrentAssets {
    pub trade_and_other_receivables_non_current: OptionalMonetaryAmount,
    pub non_current_finance_lease_receivables: OptionalMonetaryAmount,
    pub non_current_derivative_financial_assets: OptionalMonetaryAmount,
    pub non_current_financial_assets_measured_at_fair_value_through_profit_or_loss: OptionalMonetaryAmount,
    pub other_non_current_financial_assets: OptionalMonetaryAmount,
    pub property_plant_and_equipment: OptionalMonetaryAmount,
    pub investment_properties: OptionalMonetaryAmount,
    pub goodwill: OptionalMonetaryAmount,
    pub intangible_assets_other_than_goodwill: OptionalMonetaryAmount,
    pub investments_in_subsidiaries_associates_or_joint_ventures: OptionalMonetaryAmount,
    pub deferred_tax_assets: OptionalMonetaryAmount,
    pub other_non_current_nonfinancial_assets: OptionalMonetaryAmount,
    pub total_non_current_assets: MonetaryAmount,
}

impl SectionTotals for NonCurrentAssets {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("tradeAndOtherReceivablesNonCurrent", self.trade_and_other_receivables_non_current),
            ("nonCurrentFinanceLeaseReceivables", self.non_current_finance_lease_receivables),
            ("nonCurrentDerivativeFinancialAssets", self.non_current_derivative_financial_assets),
            (
                "nonCurrentFinancialAssetsMeasuredAtFairValueThroughProfitOrLoss",
                self.non_current_financial_assets_measured_at_fair_value_through_profit_or_loss,
            ),
            ("otherNonCurrentFinancialAssets", self.other_non_current_financial_assets),
            ("propertyPlantAndEquipment", self.property_plant_and_equipment),
            ("investmentProperties", self.investment_properties),
            ("goodwill", self.goodwill),
            ("intangibleAssetsOtherThanGoodwill", self.intangible_assets_other_than_goodwill),
            (
                "investmentsInSubsidiariesAssociatesOrJointVentures",
                self.investments_in_subsidiaries_associates_or_joint_ventures,
            ),
            ("deferredTaxAssets", self.deferred_tax_assets),
            ("otherNonCurrentNonfinancialAssets", self.other_non_current_nonfinancial_assets),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalNonCurrentAssets", self.total_non_current_assets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assets {
    pub current_assets: CurrentAssets,
    pub non_current_assets: NonCurrentAssets,
    pub total_assets: MonetaryAmount,
}

impl SectionTotals for Assets {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("totalCurrentAssets", Some(self.current_assets.total_current_assets)),
            ("totalNonCurrentAssets", Some(self.non_current_assets.total_non_current_assets)),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalAssets", self.total_assets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLiabilities {
    pub trade_and_other_payables_current: OptionalMonetaryAmount,
    pub current_loans_and_borrowings: OptionalMonetaryAmount,
    pub current_financial_liabilities_measured_at_fair_value_through_profit_or_loss: OptionalMonetaryAmount,
    pub current_finance_lease_liabilities: OptionalMonetaryAmount,
    pub other_current_financial_liabilities: OptionalMonetaryAmount,
    pub current_income_tax_liabilities: OptionalMonetaryAmount,
    pub current_provisions: OptionalMonetaryAmount,
    pub other_current_nonfinancial_liabilities: OptionalMonetaryAmount,
    pub liabilities_classified_as_held_for_sale: OptionalMonetaryAmount,
    pub total_current_liabilities: MonetaryAmount,
}

impl SectionTotals for CurrentLiabilities {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("tradeAndOtherPayablesCurrent", self.trade_and_other_payables_current),
            ("currentLoansAndBorrowings", self.current_loans_and_borrowings),
            (
                "currentFinancialLiabilitiesMeasuredAtFairValueThroughProfitOrLoss",
                self.current_financial_liabilities_measured_at_fair_value_through_profit_or_loss,
            ),
            ("currentFinanceLeaseLiabilities", self.current_finance_lease_liabilities),
            ("otherCurrentFinancialLiabilities", self.other_current_financial_liabilities),
            ("currentIncomeTaxLiabilities", self.current_income_tax_liabilities),
            ("currentProvisions", self.current_provisions),
            ("otherCurrentNonfinancialLiabilities", self.other_current_nonfinancial_liabilities),
            ("liabilitiesClassifiedAsHeldForSale", self.liabilities_classified_as_held_for_sale),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalCurrentLiabilities", self.total_current_liabilities)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonCurrentLiabilities {
    pub trade_and_other_payables_non_current: OptionalMonetaryAmount,
    pub non_current_loans_and_borrowings: OptionalMonetaryAmount,
    pub non_current_financial_liabilities_measured_at_fair_value_through_profit_or_loss: OptionalMonetaryAmount,
    pub non_current_finance_lease_liabilities: OptionalMonetaryAmount,
    pub other_non_current_financial_liabilities: OptionalMonetaryAmount,
    pub deferred_tax_liabilities: OptionalMonetaryAmount,
    pub non_current_provisions: OptionalMonetaryAmount,
    pub other_non_current_nonfinancial_liabilities: OptionalMonetaryAmount,
    pub total_non_current_liabilities: MonetaryAmount,
}

impl SectionTotals for NonCurrentLiabilities {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("tradeAndOtherPayablesNonCurrent", self.trade_and_other_payables_non_current),
            ("nonCurrentLoansAndBorrowings", self.non_current_loans_and_borrowings),
            (
                "nonCurrentFinancialLiabilitiesMeasuredAtFairValueThroughProfitOrLoss",
                self.non_current_financial_liabilities_measured_at_fair_value_through_profit_or_loss,
            ),
            ("nonCurrentFinanceLeaseLiabilities", self.non_current_finance_lease_liabilities),
            ("otherNonCurrentFinancialLiabilities", self.other_non_current_financial_liabilities),
            ("deferredTaxLiabilities", self.deferred_tax_liabilities),
            ("nonCurrentProvisions", self.non_current_provisions),
            ("otherNonCurrentNonfinancialLiabilities", self.other_non_current_nonfinancial_liabilities),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalNonCurrentLiabilities", self.total_non_current_liabilities)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Liabilities {
    pub current_liabilities: CurrentLiabilities,
    pub non_current_liabilities: NonCurrentLiabilities,
    pub total_liabilities: MonetaryAmount,
}

impl SectionTotals for Liabilities {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            (
                "totalCurrentLiabilities",
                Some(self.current_liabilities.total_current_liabilities),
            ),
            (
                "totalNonCurrentLiabilities",
                Some(self.non_current_liabilities.total_non_current_liabilities),
            ),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalLiabilities", self.total_liabilities)
    }
}

/// Equity section. `treasuryShares` is taken as reported (normally negative)
/// and summed like every other component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equity {
    pub share_capital: MonetaryAmount,
    pub treasury_shares: OptionalMonetaryAmount,
    pub accumulated_profits_losses: MonetaryAmount,
    pub other_reserves_attributable_to_owners_of_company: OptionalMonetaryAmount,
    pub non_controlling_interests: OptionalMonetaryAmount,
    pub total_equity: MonetaryAmount,
}

impl SectionTotals for Equity {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("shareCapital", Some(self.share_capital)),
            ("treasuryShares", self.treasury_shares),
            ("accumulatedProfitsLosses", Some(self.accumulated_profits_losses)),
            (
                "otherReservesAttributableToOwnersOfCompany",
                self.other_reserves_attributable_to_owners_of_company,
            ),
            ("nonControllingInterests", self.non_controlling_interests),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalEquity", self.total_equity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentNonCurrentBalanceSheet {
    #[serde(flatten)]
    pub header: StatementHeader,

    #[serde(default)]
    #[schemars(schema_with = "principal_activities_schema")]
    pub principal_activities: Option<String>,

    pub assets: Assets,
    pub liabilities: Liabilities,
    pub equity: Equity,
}

// ---------------------------------------------------------------------------
// Statement of financial position: order of liquidity presentation
// ---------------------------------------------------------------------------

/// Liquidity-ordered assets: the mandated total plus any other line items the
/// filer chose to present, kept as named values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityAssets {
    pub total_assets: MonetaryAmount,

    #[serde(flatten)]
    pub line_items: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityLiabilities {
    pub total_liabilities: MonetaryAmount,

    #[serde(flatten)]
    pub line_items: BTreeMap<String, Value>,
}

/// Numeric line items of an open section; subtotals (`total*`) and nested
/// groups are left out so they are not double counted.
fn numeric_line_items(items: &BTreeMap<String, Value>) -> Vec<(&'static str, OptionalMonetaryAmount)> {
    items
        .iter()
        .filter(|(key, _)| !key.starts_with("total"))
        .filter_map(|(_, value)| value.as_f64())
        .map(|v| ("lineItem", Some(v)))
        .collect()
}

impl LiquidityAssets {
    pub fn amount(&self, key: &str) -> Option<f64> {
        self.line_items.get(key).and_then(Value::as_f64)
    }
}

impl LiquidityLiabilities {
    pub fn amount(&self, key: &str) -> Option<f64> {
        self.line_items.get(key).and_then(Value::as_f64)
    }
}

impl SectionTotals for LiquidityAssets {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        numeric_line_items(&self.line_items)
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalAssets", self.total_assets)
    }
}

impl SectionTotals for LiquidityLiabilities {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        numeric_line_items(&self.line_items)
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalLiabilities", self.total_liabilities)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderOfLiquidityBalanceSheet {
    #[serde(flatten)]
    pub header: StatementHeader,

    #[serde(default)]
    #[schemars(schema_with = "principal_activities_schema")]
    pub principal_activities: Option<String>,

    pub assets: LiquidityAssets,
    pub liabilities: LiquidityLiabilities,
    pub equity: Equity,
}

// ---------------------------------------------------------------------------
// Income statement and note disclosures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    #[serde(flatten)]
    pub header: StatementHeader,

    pub revenue: MonetaryAmount,
    pub other_income: OptionalMonetaryAmount,
    pub employee_benefits_expense: OptionalMonetaryAmount,
    pub depreciation_expense: OptionalMonetaryAmount,
    pub amortisation_expense: OptionalMonetaryAmount,
    pub repairs_and_maintenance_expense: OptionalMonetaryAmount,
    pub sales_and_marketing_expense: OptionalMonetaryAmount,
    pub other_expenses_by_nature: OptionalMonetaryAmount,
    pub other_gains_losses: OptionalMonetaryAmount,
    pub finance_costs: OptionalMonetaryAmount,
    pub share_of_profit_loss_of_associates_and_joint_ventures: OptionalMonetaryAmount,
    pub profit_loss_before_taxation: MonetaryAmount,
    pub income_tax_expense_benefit: MonetaryAmount,
    pub profit_loss_from_discontinued_operations: OptionalMonetaryAmount,
    pub profit_loss: OptionalMonetaryAmount,
    pub profit_loss_attributable_to_owners_of_company: OptionalMonetaryAmount,
    pub profit_loss_attributable_to_non_controlling_interests: OptionalMonetaryAmount,
}

impl IncomeStatement {
    /// Reported profit after tax, or profit before tax less tax when the filer
    /// did not report it.
    pub fn net_profit(&self) -> f64 {
        self.profit_loss
            .unwrap_or(self.profit_loss_before_taxation - self.income_tax_expense_benefit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeAndOtherReceivablesNote {
    #[serde(flatten)]
    pub header: StatementHeader,

    pub trade_receivables_due_from_third_parties: OptionalMonetaryAmount,
    pub trade_receivables_due_from_related_parties: OptionalMonetaryAmount,
    pub contract_assets: OptionalMonetaryAmount,
    pub nontrade_receivables_due_from_related_parties: OptionalMonetaryAmount,
    pub nontrade_receivables_due_from_third_parties: OptionalMonetaryAmount,
    pub other_receivables: OptionalMonetaryAmount,
    pub total_trade_and_other_receivables: MonetaryAmount,
}

impl SectionTotals for TradeAndOtherReceivablesNote {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("tradeReceivablesDueFromThirdParties", self.trade_receivables_due_from_third_parties),
            ("tradeReceivablesDueFromRelatedParties", self.trade_receivables_due_from_related_parties),
            ("contractAssets", self.contract_assets),
            ("nontradeReceivablesDueFromRelatedParties", self.nontrade_receivables_due_from_related_parties),
            ("nontradeReceivablesDueFromThirdParties", self.nontrade_receivables_due_from_third_parties),
            ("otherReceivables", self.other_receivables),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalTradeAndOtherReceivables", self.total_trade_and_other_receivables)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeAndOtherPayablesNote {
    #[serde(flatten)]
    pub header: StatementHeader,

    pub trade_payables_due_to_third_parties: OptionalMonetaryAmount,
    pub trade_payables_due_to_related_parties: OptionalMonetaryAmount,
    pub deferred_income: OptionalMonetaryAmount,
    pub nontrade_payables_due_to_related_parties: OptionalMonetaryAmount,
    pub nontrade_payables_due_to_third_parties: OptionalMonetaryAmount,
    pub other_payables: OptionalMonetaryAmount,
    pub total_trade_and_other_payables: MonetaryAmount,
}

impl SectionTotals for TradeAndOtherPayablesNote {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            ("tradePayablesDueToThirdParties", self.trade_payables_due_to_third_parties),
            ("tradePayablesDueToRelatedParties", self.trade_payables_due_to_related_parties),
            ("deferredIncome", self.deferred_income),
            ("nontradePayablesDueToRelatedParties", self.nontrade_payables_due_to_related_parties),
            ("nontradePayablesDueToThirdParties", self.nontrade_payables_due_to_third_parties),
            ("otherPayables", self.other_payables),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalTradeAndOtherPayables", self.total_trade_and_other_payables)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueNote {
    #[serde(flatten)]
    pub header: StatementHeader,

    pub revenue_from_property_transferred_at_point_in_time: OptionalMonetaryAmount,
    pub revenue_from_goods_transferred_at_point_in_time: OptionalMonetaryAmount,
    pub revenue_from_services_transferred_at_point_in_time: OptionalMonetaryAmount,
    pub revenue_from_property_transferred_over_time: OptionalMonetaryAmount,
    pub revenue_from_construction_contracts_over_time: OptionalMonetaryAmount,
    pub revenue_from_services_transferred_over_time: OptionalMonetaryAmount,
    pub revenue_others: OptionalMonetaryAmount,
    pub total_revenue: MonetaryAmount,
}

impl SectionTotals for RevenueNote {
    fn components(&self) -> Vec<(&'static str, OptionalMonetaryAmount)> {
        vec![
            (
                "revenueFromPropertyTransferredAtPointInTime",
                self.revenue_from_property_transferred_at_point_in_time,
            ),
            (
                "revenueFromGoodsTransferredAtPointInTime",
                self.revenue_from_goods_transferred_at_point_in_time,
            ),
            (
                "revenueFromServicesTransferredAtPointInTime",
                self.revenue_from_services_transferred_at_point_in_time,
            ),
            (
                "revenueFromPropertyTransferredOverTime",
                self.revenue_from_property_transferred_over_time,
            ),
            (
                "revenueFromConstructionContractsOverTime",
                self.revenue_from_construction_contracts_over_time,
            ),
            (
                "revenueFromServicesTransferredOverTime",
                self.revenue_from_services_transferred_over_time,
            ),
            ("revenueOthers", self.revenue_others),
        ]
    }

    fn declared_total(&self) -> (&'static str, MonetaryAmount) {
        ("totalRevenue", self.total_revenue)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One financial statement, discriminated by `statementType`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "statementType", rename_all = "camelCase")]
pub enum StatementEnvelope {
    CurrentNonCurrent(CurrentNonCurrentBalanceSheet),
    OrderOfLiquidity(OrderOfLiquidityBalanceSheet),
    IncomeStatement(IncomeStatement),
    TradeAndOtherReceivablesNote(TradeAndOtherReceivablesNote),
    TradeAndOtherPayablesNote(TradeAndOtherPayablesNote),
    RevenueNote(RevenueNote),
}

/// The three balance-sheet totals, whichever presentation they came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTotals {
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
}

impl StatementEnvelope {
    pub fn statement_type(&self) -> StatementType {
        match self {
            StatementEnvelope::CurrentNonCurrent(_) => StatementType::CurrentNonCurrent,
            StatementEnvelope::OrderOfLiquidity(_) => StatementType::OrderOfLiquidity,
            StatementEnvelope::IncomeStatement(_) => StatementType::IncomeStatement,
            StatementEnvelope::TradeAndOtherReceivablesNote(_) => {
                StatementType::TradeAndOtherReceivablesNote
            }
            StatementEnvelope::TradeAndOtherPayablesNote(_) => {
                StatementType::TradeAndOtherPayablesNote
            }
            StatementEnvelope::RevenueNote(_) => StatementType::RevenueNote,
        }
    }

    pub fn header(&self) -> &StatementHeader {
        match self {
            StatementEnvelope::CurrentNonCurrent(s) => &s.header,
            StatementEnvelope::OrderOfLiquidity(s) => &s.header,
            StatementEnvelope::IncomeStatement(s) => &s.header,
            StatementEnvelope::TradeAndOtherReceivablesNote(s) => &s.header,
            StatementEnvelope::TradeAndOtherPayablesNote(s) => &s.header,
            StatementEnvelope::RevenueNote(s) => &s.header,
        }
    }

    pub fn balance_totals(&self) -> Option<BalanceTotals> {
        match self {
            StatementEnvelope::CurrentNonCurrent(s) => Some(BalanceTotals {
                total_assets: s.assets.total_assets,
                total_liabilities: s.liabilities.total_liabilities,
                total_equity: s.equity.total_equity,
            }),
            StatementEnvelope::OrderOfLiquidity(s) => Some(BalanceTotals {
                total_assets: s.assets.total_assets,
                total_liabilities: s.liabilities.total_liabilities,
                total_equity: s.equity.total_equity,
            }),
            StatementEnvelope::IncomeStatement(_)
            | StatementEnvelope::TradeAndOtherReceivablesNote(_)
            | StatementEnvelope::TradeAndOtherPayablesNote(_)
            | StatementEnvelope::RevenueNote(_) => None,
        }
    }

    pub fn principal_activities(&self) -> Option<&str> {
        match self {
            StatementEnvelope::CurrentNonCurrent(s) => s.principal_activities.as_deref(),
            StatementEnvelope::OrderOfLiquidity(s) => s.principal_activities.as_deref(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn generate_json_schema() -> RootSchema {
        schemars::schema_for!(StatementEnvelope)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Inlines every `#/definitions/*` reference and drops `$schema` /
/// `definitions`, leaving a self-contained schema.
pub fn clean_schema(root: RootSchema) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(root)?;
    let definitions = value
        .as_object_mut()
        .and_then(|m| m.remove("definitions"))
        .unwrap_or(Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.remove("$schema");
    }

    let inlined = transform(value, &mut |_, _, node| inline_reference(node, &definitions));

    // Nothing we generate is recursive, but make sure no reference survived.
    let mut dangling = false;
    crate::utils::walk(&inlined, &mut |_, _, node| {
        if node.get("$ref").is_some() {
            dangling = true;
            return WalkControl::Stop;
        }
        WalkControl::Continue
    });
    if dangling {
        log::warn!("Cleaned schema still contains an unresolved $ref");
    }

    Ok(inlined)
}

fn inline_reference(node: Value, definitions: &Value) -> Value {
    let mut map = match node {
        Value::Object(map) => map,
        other => return other,
    };

    // `{description, allOf: [{$ref}]}` is how schemars attaches a description to
    // a referenced type; collapse it to the referenced schema.
    let single_all_of = matches!(map.get("allOf"), Some(Value::Array(items)) if items.len() == 1);
    if single_all_of {
        if let Some(Value::Array(mut items)) = map.remove("allOf") {
            if let Some(Value::Object(inner)) = items.pop() {
                for (k, v) in inner {
                    map.entry(k).or_insert(v);
                }
            }
        }
    }

    let Some(reference) = map.get("$ref").and_then(Value::as_str).map(str::to_string) else {
        return Value::Object(map);
    };
    let name = reference.trim_start_matches("#/definitions/");
    match definitions.get(name) {
        Some(Value::Object(target)) => {
            map.remove("$ref");
            for (k, v) in target {
                map.entry(k.clone()).or_insert_with(|| v.clone());
            }
            Value::Object(map)
        }
        _ => Value::Object(map),
    }
}
