use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RatioConfig;
use crate::schema::StatementEnvelope;
use crate::utils::{get_path, number_at, round_to};

/// Places every ratio is rounded to unless a [`RatioConfig`] says otherwise.
pub const DEFAULT_DECIMAL_PLACES: i32 = 4;

/// `numerator / denominator` rounded to four places; `None` when either side
/// is missing, the denominator is zero, or the result is not finite.
pub fn calculate_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    ratio_with_precision(numerator, denominator, DEFAULT_DECIMAL_PLACES)
}

pub fn ratio_with_precision(
    numerator: Option<f64>,
    denominator: Option<f64>,
    decimal_places: i32,
) -> Option<f64> {
    finish(raw_ratio(numerator, denominator)?, decimal_places)
}

fn raw_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 || !n.is_finite() || !d.is_finite() {
        return None;
    }
    let r = n / d;
    r.is_finite().then_some(r)
}

fn finish(value: f64, decimal_places: i32) -> Option<f64> {
    let rounded = round_to(value, decimal_places);
    rounded.is_finite().then_some(rounded)
}

/// A figure the taxonomy does not carry, approximated from ones it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedFigure {
    pub value: f64,
    pub is_estimate: bool,
    pub basis: String,
}

impl EstimatedFigure {
    pub fn new(value: f64, basis: impl Into<String>) -> Self {
        Self {
            value,
            is_estimate: true,
            basis: basis.into(),
        }
    }
}

/// The inputs every ratio is computed from. Anything the filing did not
/// report stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialFigures {
    pub revenue: Option<f64>,
    pub net_profit: Option<f64>,
    pub profit_before_tax: Option<f64>,
    pub income_tax: Option<f64>,
    pub finance_costs: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_equity: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub cash: Option<f64>,
    pub inventories: Option<f64>,
    pub trade_receivables: Option<f64>,
    pub trade_payables: Option<f64>,
    pub property_plant_and_equipment: Option<f64>,
}

impl FinancialFigures {
    /// Collects figures from any mix of statements. Balance-sheet and income
    /// statement lines win over the note totals they overlap with.
    pub fn from_statements(statements: &[StatementEnvelope]) -> Self {
        let mut figures = FinancialFigures::default();
        let mut receivables_note = None;
        let mut payables_note = None;
        let mut revenue_note = None;

        for statement in statements {
            match statement {
                StatementEnvelope::CurrentNonCurrent(bs) => {
                    figures.total_assets = Some(bs.assets.total_assets);
                    figures.total_liabilities = Some(bs.liabilities.total_liabilities);
                    figures.total_equity = Some(bs.equity.total_equity);
                    figures.current_assets = Some(bs.assets.current_assets.total_current_assets);
                    figures.current_liabilities =
                        Some(bs.liabilities.current_liabilities.total_current_liabilities);
                    figures.cash = bs.assets.current_assets.cash_and_bank_balances;
                    figures.inventories = bs.assets.current_assets.inventories;
                    figures.trade_receivables =
                        bs.assets.current_assets.trade_and_other_receivables_current;
                    figures.trade_payables =
                        bs.liabilities.current_liabilities.trade_and_other_payables_current;
                    figures.property_plant_and_equipment =
                        bs.assets.non_current_assets.property_plant_and_equipment;
                }
                StatementEnvelope::OrderOfLiquidity(bs) => {
                    figures.total_assets = Some(bs.assets.total_assets);
                    figures.total_liabilities = Some(bs.liabilities.total_liabilities);
                    figures.total_equity = Some(bs.equity.total_equity);
                    figures.cash = bs.assets.amount("cashAndBankBalances");
                    figures.inventories = bs.assets.amount("inventories");
                    figures.trade_receivables = bs.assets.amount("tradeAndOtherReceivables");
                    figures.trade_payables = bs.liabilities.amount("tradeAndOtherPayables");
                    figures.property_plant_and_equipment =
                        bs.assets.amount("propertyPlantAndEquipment");
                }
                StatementEnvelope::IncomeStatement(is) => {
                    figures.revenue = Some(is.revenue);
                    figures.net_profit = Some(is.net_profit());
                    figures.profit_before_tax = Some(is.profit_loss_before_taxation);
                    figures.income_tax = Some(is.income_tax_expense_benefit);
                    figures.finance_costs = is.finance_costs;
                }
                StatementEnvelope::TradeAndOtherReceivablesNote(note) => {
                    receivables_note = Some(note.total_trade_and_other_receivables);
                }
                StatementEnvelope::TradeAndOtherPayablesNote(note) => {
                    payables_note = Some(note.total_trade_and_other_payables);
                }
                StatementEnvelope::RevenueNote(note) => {
                    revenue_note = Some(note.total_revenue);
                }
            }
        }

        figures.trade_receivables = figures.trade_receivables.or(receivables_note);
        figures.trade_payables = figures.trade_payables.or(payables_note);
        figures.revenue = figures.revenue.or(revenue_note);
        figures
    }

    /// Reads figures from an assembled filing object. Both balance-sheet
    /// presentations are understood; absent sub-trees leave figures unset.
    pub fn from_filing(filing: &Value) -> Self {
        let empty = Value::Null;
        let sofp = get_path(filing, &["statementOfFinancialPosition"]).unwrap_or(&empty);
        let income = get_path(filing, &["incomeStatement"]).unwrap_or(&empty);
        let notes = get_path(filing, &["notes"]).unwrap_or(&empty);

        let asset_line = |key: &str| {
            number_at(sofp, &["assets", "currentAssets", key])
                .or_else(|| number_at(sofp, &["assets", "nonCurrentAssets", key]))
                .or_else(|| number_at(sofp, &["assets", key]))
        };
        let liability_line = |key: &str| {
            number_at(sofp, &["liabilities", "currentLiabilities", key])
                .or_else(|| number_at(sofp, &["liabilities", key]))
        };

        let profit_before_tax = number_at(income, &["profitLossBeforeTaxation"]);
        let income_tax = number_at(income, &["incomeTaxExpenseBenefit"]);
        let net_profit = number_at(income, &["profitLoss"]).or_else(|| match (profit_before_tax, income_tax) {
            (Some(pbt), Some(tax)) => Some(pbt - tax),
            _ => None,
        });

        FinancialFigures {
            revenue: number_at(income, &["revenue"])
                .or_else(|| number_at(notes, &["revenue", "totalRevenue"])),
            net_profit,
            profit_before_tax,
            income_tax,
            finance_costs: number_at(income, &["financeCosts"]),
            total_assets: number_at(sofp, &["assets", "totalAssets"]),
            total_liabilities: number_at(sofp, &["liabilities", "totalLiabilities"]),
            total_equity: number_at(sofp, &["equity", "totalEquity"]),
            current_assets: number_at(sofp, &["assets", "currentAssets", "totalCurrentAssets"]),
            current_liabilities: number_at(
                sofp,
                &["liabilities", "currentLiabilities", "totalCurrentLiabilities"],
            ),
            cash: asset_line("cashAndBankBalances"),
            inventories: asset_line("inventories"),
            trade_receivables: asset_line("tradeAndOtherReceivablesCurrent")
                .or_else(|| asset_line("tradeAndOtherReceivables"))
                .or_else(|| {
                    number_at(
                        notes,
                        &["tradeAndOtherReceivables", "totalTradeAndOtherReceivables"],
                    )
                }),
            trade_payables: liability_line("tradeAndOtherPayablesCurrent")
                .or_else(|| liability_line("tradeAndOtherPayables"))
                .or_else(|| {
                    number_at(notes, &["tradeAndOtherPayables", "totalTradeAndOtherPayables"])
                }),
            property_plant_and_equipment: asset_line("propertyPlantAndEquipment"),
        }
    }
}

// Named ratios. All share one signature so callers can tabulate them.

pub fn return_on_equity(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.net_profit, f.total_equity, c.decimal_places)
}

pub fn return_on_assets(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.net_profit, f.total_assets, c.decimal_places)
}

pub fn net_profit_margin(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.net_profit, f.revenue, c.decimal_places)
}

pub fn current_ratio(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.current_assets, f.current_liabilities, c.decimal_places)
}

/// Current assets less inventories, over current liabilities.
pub fn quick_ratio(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    let quick_assets = f.current_assets.map(|ca| ca - f.inventories.unwrap_or(0.0));
    ratio_with_precision(quick_assets, f.current_liabilities, c.decimal_places)
}

pub fn cash_ratio(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.cash, f.current_liabilities, c.decimal_places)
}

pub fn debt_to_equity(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.total_liabilities, f.total_equity, c.decimal_places)
}

pub fn debt_ratio(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.total_liabilities, f.total_assets, c.decimal_places)
}

pub fn equity_ratio(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.total_equity, f.total_assets, c.decimal_places)
}

/// Estimated operating profit over finance costs.
pub fn interest_coverage(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(estimated_operating_profit(f), f.finance_costs, c.decimal_places)
}

pub fn asset_turnover(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(f.revenue, f.total_assets, c.decimal_places)
}

/// Estimated cost of goods sold over inventories.
pub fn inventory_turnover(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    ratio_with_precision(estimated_cost_of_goods_sold(f, c), f.inventories, c.decimal_places)
}

pub fn receivables_days(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    days(f.trade_receivables, f.revenue, c)
}

/// Trade payables over estimated cost of goods sold, in days.
pub fn payables_days(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    days(f.trade_payables, estimated_cost_of_goods_sold(f, c), c)
}

pub fn inventory_days(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    days(f.inventories, estimated_cost_of_goods_sold(f, c), c)
}

fn days(numerator: Option<f64>, denominator: Option<f64>, c: &RatioConfig) -> Option<f64> {
    finish(raw_ratio(numerator, denominator)? * c.days_in_year, c.decimal_places)
}

/// Profit before taxation with finance costs added back.
pub fn estimated_operating_profit(f: &FinancialFigures) -> Option<f64> {
    Some(f.profit_before_tax? + f.finance_costs.unwrap_or(0.0))
}

pub fn estimated_cost_of_goods_sold(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    f.revenue.map(|r| r * c.cogs_revenue_fraction)
}

pub fn estimated_gross_profit(f: &FinancialFigures, c: &RatioConfig) -> Option<f64> {
    Some(f.revenue? - estimated_cost_of_goods_sold(f, c)?)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilityRatios {
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub net_profit_margin: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRatios {
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvencyRatios {
    pub debt_to_equity: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub equity_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyRatios {
    pub asset_turnover: Option<f64>,
    pub receivables_days: Option<f64>,
}

/// Everything that rests on an approximation. Kept apart from the other groups
/// so it is never read as a reported figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedMetrics {
    pub operating_profit: Option<EstimatedFigure>,
    pub cost_of_goods_sold: Option<EstimatedFigure>,
    pub gross_profit: Option<EstimatedFigure>,
    pub gross_margin: Option<EstimatedFigure>,
    pub operating_margin: Option<EstimatedFigure>,
    pub interest_coverage: Option<EstimatedFigure>,
    pub inventory_turnover: Option<EstimatedFigure>,
    pub inventory_days: Option<EstimatedFigure>,
    pub payables_days: Option<EstimatedFigure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRatios {
    pub profitability: ProfitabilityRatios,
    pub liquidity: LiquidityRatios,
    pub solvency: SolvencyRatios,
    pub efficiency: EfficiencyRatios,
    pub estimated: EstimatedMetrics,
}

impl FinancialRatios {
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RatioCalculator {
    config: RatioConfig,
}

impl RatioCalculator {
    pub fn new(config: RatioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatioConfig {
        &self.config
    }

    pub fn calculate(&self, figures: &FinancialFigures) -> FinancialRatios {
        let c = &self.config;
        let cogs_basis = format!(
            "{}% of revenue; the taxonomy carries no cost-of-sales line",
            round_to(c.cogs_revenue_fraction * 100.0, 2)
        );
        let operating_basis = "profitLossBeforeTaxation + financeCosts";

        let estimate = |value: Option<f64>, basis: &str| -> Option<EstimatedFigure> {
            value
                .and_then(|v| finish(v, c.decimal_places))
                .map(|v| EstimatedFigure::new(v, basis))
        };

        let operating_profit = estimated_operating_profit(figures);
        let gross_profit = estimated_gross_profit(figures, c);

        let ratios = FinancialRatios {
            profitability: ProfitabilityRatios {
                return_on_equity: return_on_equity(figures, c),
                return_on_assets: return_on_assets(figures, c),
                net_profit_margin: net_profit_margin(figures, c),
            },
            liquidity: LiquidityRatios {
                current_ratio: current_ratio(figures, c),
                quick_ratio: quick_ratio(figures, c),
                cash_ratio: cash_ratio(figures, c),
            },
            solvency: SolvencyRatios {
                debt_to_equity: debt_to_equity(figures, c),
                debt_ratio: debt_ratio(figures, c),
                equity_ratio: equity_ratio(figures, c),
            },
            efficiency: EfficiencyRatios {
                asset_turnover: asset_turnover(figures, c),
                receivables_days: receivables_days(figures, c),
            },
            estimated: EstimatedMetrics {
                operating_profit: estimate(operating_profit, operating_basis),
                cost_of_goods_sold: estimate(estimated_cost_of_goods_sold(figures, c), &cogs_basis),
                gross_profit: estimate(gross_profit, &format!("revenue less cost of goods sold at {}", cogs_basis)),
                gross_margin: estimate(
                    ratio_with_precision(gross_profit, figures.revenue, c.decimal_places),
                    "estimated gross profit / revenue",
                ),
                operating_margin: estimate(
                    ratio_with_precision(operating_profit, figures.revenue, c.decimal_places),
                    "estimated operating profit / revenue",
                ),
                interest_coverage: estimate(
                    interest_coverage(figures, c),
                    "estimated operating profit / financeCosts",
                ),
                inventory_turnover: estimate(
                    inventory_turnover(figures, c),
                    "estimated cost of goods sold / inventories",
                ),
                inventory_days: estimate(
                    inventory_days(figures, c),
                    "inventories / estimated cost of goods sold x days in year",
                ),
                payables_days: estimate(
                    payables_days(figures, c),
                    "trade payables / estimated cost of goods sold x days in year",
                ),
            },
        };

        log::debug!(
            "Calculated ratios (revenue present: {}, balance sheet present: {})",
            figures.revenue.is_some(),
            figures.total_assets.is_some()
        );
        ratios
    }

    pub fn calculate_for_statements(&self, statements: &[StatementEnvelope]) -> FinancialRatios {
        self.calculate(&FinancialFigures::from_statements(statements))
    }

    pub fn calculate_for_filing(&self, filing: &Value) -> FinancialRatios {
        self.calculate(&FinancialFigures::from_filing(filing))
    }
}
