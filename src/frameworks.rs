//! Projection branches, one per framework view.
//!
//! Every branch reads named sub-trees off a filing document and builds a new
//! object. Missing sub-trees become `null` leaves. Branches never modify their
//! input and never validate it.

use serde_json::{json, Map, Value};

use crate::balancer::{totals_from_value, AccountingBalancer};
use crate::error::{Result, StatementError};
use crate::industry::{BalanceSheetShape, IndustryClassifier, IndustryTag};
use crate::ratios::{FinancialFigures, RatioCalculator};
use crate::utils::{count_numeric_leaves, get_path, number_at, pick, round_to, transform, value_at, walk, WalkControl};

/// Balance-sheet sections in regulatory presentation order.
pub const PRESENTATION_ORDER: [&str; 7] = [
    "currentAssets",
    "nonCurrentAssets",
    "totalAssets",
    "currentLiabilities",
    "nonCurrentLiabilities",
    "totalLiabilities",
    "equity",
];

const FINANCIAL_STATEMENT_SECTIONS: [&str; 5] = [
    "statementOfFinancialPosition",
    "incomeStatement",
    "statementOfCashFlows",
    "statementOfChangesInEquity",
    "notes",
];

const MINIMAL_FILING_FIELDS: [&str; 3] = ["nameOfCompany", "uniqueEntityNumber", "currentPeriodEndDate"];

/// Shared collaborators for the branches that derive figures.
pub struct ProjectionContext<'a> {
    pub calculator: &'a RatioCalculator,
    pub classifier: &'a IndustryClassifier,
    pub balancer: &'a AccountingBalancer,
}

/// A branch result: the reshaped view plus anything the branch wants added to
/// its `_frameworkMetadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOutput {
    pub view: Value,
    pub metadata: Map<String, Value>,
}

impl BranchOutput {
    fn plain(view: Value) -> Self {
        Self {
            view,
            metadata: Map::new(),
        }
    }

    fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

fn sofp(filing: &Value) -> Value {
    value_at(filing, &["statementOfFinancialPosition"])
}

fn industry_of(filing: &Value, ctx: &ProjectionContext<'_>) -> IndustryTag {
    ctx.classifier.classify_filing(filing)
}

pub fn full(filing: &Value, _ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    Ok(BranchOutput::plain(filing.clone()))
}

pub fn financial_statements(filing: &Value, _ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let mut view = Map::new();
    view.insert(
        "filingInformation".to_string(),
        pick(&value_at(filing, &["filingInformation"]), &MINIMAL_FILING_FIELDS),
    );
    for section in FINANCIAL_STATEMENT_SECTIONS {
        view.insert(section.to_string(), value_at(filing, &[section]));
    }
    Ok(BranchOutput::plain(Value::Object(view)))
}

/// Headline totals and three key ratios, amounts rounded to whole units.
pub fn simplified(filing: &Value, ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let balance_sheet = sofp(filing);
    let income = value_at(filing, &["incomeStatement"]);
    let ratios = ctx.calculator.calculate_for_filing(filing);

    let totals = json!({
        "balanceSheet": {
            "cashAndBankBalances": value_at(&balance_sheet, &["assets", "currentAssets", "cashAndBankBalances"]),
            "totalCurrentAssets": value_at(&balance_sheet, &["assets", "currentAssets", "totalCurrentAssets"]),
            "totalAssets": value_at(&balance_sheet, &["assets", "totalAssets"]),
            "totalCurrentLiabilities": value_at(&balance_sheet, &["liabilities", "currentLiabilities", "totalCurrentLiabilities"]),
            "totalLiabilities": value_at(&balance_sheet, &["liabilities", "totalLiabilities"]),
            "totalEquity": value_at(&balance_sheet, &["equity", "totalEquity"]),
        },
        "incomeStatement": {
            "revenue": value_at(&income, &["revenue"]),
            "profitLossBeforeTaxation": value_at(&income, &["profitLossBeforeTaxation"]),
            "incomeTaxExpenseBenefit": value_at(&income, &["incomeTaxExpenseBenefit"]),
            "profitLoss": value_at(&income, &["profitLoss"]),
        },
    });

    let rounded = transform(totals, &mut |_, _, node| match node.as_f64() {
        Some(n) if node.is_f64() => json!(round_to(n, 0)),
        _ => node,
    });

    let mut view = Map::new();
    view.insert(
        "companyInfo".to_string(),
        pick(
            &value_at(filing, &["filingInformation"]),
            &["nameOfCompany", "uniqueEntityNumber", "currentPeriodEndDate", "principalActivities"],
        ),
    );
    if let Value::Object(sections) = rounded {
        view.extend(sections);
    }
    view.insert(
        "keyMetrics".to_string(),
        json!({
            "currentRatio": ratios.liquidity.current_ratio,
            "debtToEquity": ratios.solvency.debt_to_equity,
            "netProfitMargin": ratios.profitability.net_profit_margin,
        }),
    );
    Ok(BranchOutput::plain(Value::Object(view)))
}

/// Filing metadata, governance sections and a checklist of the rules a
/// regulator looks at first.
pub fn compliance(filing: &Value, ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let balance_sheet = sofp(filing);
    let info = value_at(filing, &["filingInformation"]);

    let equation = match totals_from_value(&balance_sheet) {
        Some(totals) => serde_json::to_value(ctx.balancer.check_equation(totals))?,
        None => Value::Null,
    };

    let mut non_numeric_totals = Vec::new();
    walk(filing, &mut |path, _, node| {
        if let Some(key) = path.last_key() {
            if key.starts_with("total") && !node.is_number() && !node.is_null() {
                non_numeric_totals.push(Value::from(path.to_string()));
            }
        }
        WalkControl::Continue
    });

    let checks = json!({
        "accountingEquation": equation,
        "hasStatementOfFinancialPosition": balance_sheet.is_object(),
        "hasIncomeStatement": get_path(filing, &["incomeStatement"]).map_or(false, Value::is_object),
        "uniqueEntityNumberPresent": info.get("uniqueEntityNumber").map_or(false, Value::is_string),
        "periodEndDatePresent": info.get("currentPeriodEndDate").map_or(false, Value::is_string),
        "nonNumericTotals": non_numeric_totals,
        "reportedFigures": count_numeric_leaves(filing),
    });

    let view = json!({
        "filingInformation": info,
        "directorsStatement": value_at(filing, &["directorsStatement"]),
        "auditReport": value_at(filing, &["auditReport"]),
        "statementOfFinancialPosition": {
            "totalAssets": value_at(&balance_sheet, &["assets", "totalAssets"]),
            "totalLiabilities": value_at(&balance_sheet, &["liabilities", "totalLiabilities"]),
            "totalEquity": value_at(&balance_sheet, &["equity", "totalEquity"]),
        },
        "complianceChecks": checks,
    });
    Ok(BranchOutput::plain(view))
}

pub fn analytical(filing: &Value, ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let figures = FinancialFigures::from_filing(filing);
    let ratios = ctx.calculator.calculate(&figures);
    let industry = industry_of(filing, ctx);
    let ratio_view = ratios.to_value()?;

    let view = json!({
        "summary": {
            "revenue": figures.revenue,
            "netProfit": figures.net_profit,
            "totalAssets": figures.total_assets,
            "totalLiabilities": figures.total_liabilities,
            "totalEquity": figures.total_equity,
        },
        "ratios": ratio_view,
        "industry": industry,
    });
    Ok(BranchOutput::plain(view).with_metadata("industry", json!(industry)))
}

pub fn business_profile(filing: &Value, ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let info = value_at(filing, &["filingInformation"]);
    let balance_sheet = sofp(filing);
    let industry = industry_of(filing, ctx);

    let principal_activities = match info.get("principalActivities") {
        Some(Value::String(text)) => Value::from(text.clone()),
        _ => value_at(&balance_sheet, &["principalActivities"]),
    };

    let view = json!({
        "companyName": value_at(&info, &["nameOfCompany"]),
        "uniqueEntityNumber": value_at(&info, &["uniqueEntityNumber"]),
        "periodEnd": value_at(&info, &["currentPeriodEndDate"]),
        "reportingBasis": value_at(&info, &["consolidatedAndSeparate"]),
        "principalActivities": principal_activities,
        "industry": {"tag": industry, "label": industry.label()},
        "scale": {
            "revenue": value_at(filing, &["incomeStatement", "revenue"]),
            "totalAssets": value_at(&balance_sheet, &["assets", "totalAssets"]),
            "totalEquity": value_at(&balance_sheet, &["equity", "totalEquity"]),
        },
    });
    Ok(BranchOutput::plain(view))
}

/// Core statements plus the metrics that matter for the detected industry.
pub fn industry_specific(filing: &Value, ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let industry = industry_of(filing, ctx);
    let balance_sheet = sofp(filing);
    let ratios = ctx.calculator.calculate_for_filing(filing);
    let shape = BalanceSheetShape::from_value(filing);
    let asset_line = |key: &str| {
        number_at(&balance_sheet, &["assets", "currentAssets", key])
            .or_else(|| number_at(&balance_sheet, &["assets", "nonCurrentAssets", key]))
            .or_else(|| number_at(&balance_sheet, &["assets", key]))
    };

    let property_share = crate::ratios::calculate_ratio(
        Some(shape.investment_properties),
        number_at(&balance_sheet, &["assets", "totalAssets"]),
    );

    let metrics = match industry {
        IndustryTag::FinancialServices => json!({
            "fairValueFinancialAssets": shape.fair_value_financial_assets,
            "cashAndBankBalances": asset_line("cashAndBankBalances"),
            "equityRatio": ratios.solvency.equity_ratio,
            "debtRatio": ratios.solvency.debt_ratio,
        }),
        IndustryTag::RealEstate => json!({
            "investmentProperties": shape.investment_properties,
            "developmentProperties": asset_line("developmentProperties"),
            "investmentPropertiesToTotalAssets": property_share,
            "debtToEquity": ratios.solvency.debt_to_equity,
        }),
        IndustryTag::Manufacturing => json!({
            "inventories": shape.inventories,
            "propertyPlantAndEquipment": shape.property_plant_and_equipment,
            "assetTurnover": ratios.efficiency.asset_turnover,
            "inventoryTurnover": ratios.estimated.inventory_turnover,
        }),
        IndustryTag::Retail => json!({
            "inventories": shape.inventories,
            "currentRatio": ratios.liquidity.current_ratio,
            "quickRatio": ratios.liquidity.quick_ratio,
            "inventoryDays": ratios.estimated.inventory_days,
        }),
        IndustryTag::Generic => json!({
            "currentRatio": ratios.liquidity.current_ratio,
            "netProfitMargin": ratios.profitability.net_profit_margin,
            "returnOnEquity": ratios.profitability.return_on_equity,
        }),
    };

    let view = json!({
        "industry": {"tag": industry, "label": industry.label()},
        "statementOfFinancialPosition": balance_sheet,
        "incomeStatement": value_at(filing, &["incomeStatement"]),
        "industryMetrics": metrics,
    });
    Ok(BranchOutput::plain(view).with_metadata("industry", json!(industry)))
}

/// Line items of a section reported outside the current/non-current split,
/// as in an order-of-liquidity balance sheet.
fn insert_line_items(ordered: &mut Map<String, Value>, name: &str, section: Option<&Value>) {
    let Some(Value::Object(section)) = section else {
        return;
    };
    let items: Map<String, Value> = section
        .iter()
        .filter(|(key, _)| !key.starts_with("total") && !PRESENTATION_ORDER.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !items.is_empty() {
        ordered.insert(name.to_string(), Value::Object(items));
    }
}

/// Re-orders the balance sheet into [`PRESENTATION_ORDER`]. Nothing is
/// recalculated; liquidity line items are carried as `assetLineItems` and
/// `liabilityLineItems` ahead of their totals.
pub fn regulatory_reporting(filing: &Value, _ctx: &ProjectionContext<'_>) -> Result<BranchOutput> {
    let balance_sheet = sofp(filing);
    let ordered = match &balance_sheet {
        Value::Null => Value::Null,
        Value::Object(source) => {
            let mut ordered = Map::new();
            for header in ["statementType", "consolidatedAndSeparate", "periodDate", "uniqueEntityNumber"] {
                if let Some(v) = source.get(header) {
                    ordered.insert(header.to_string(), v.clone());
                }
            }
            let placements: [(&str, &[&str]); 7] = [
                ("currentAssets", &["assets", "currentAssets"]),
                ("nonCurrentAssets", &["assets", "nonCurrentAssets"]),
                ("totalAssets", &["assets", "totalAssets"]),
                ("currentLiabilities", &["liabilities", "currentLiabilities"]),
                ("nonCurrentLiabilities", &["liabilities", "nonCurrentLiabilities"]),
                ("totalLiabilities", &["liabilities", "totalLiabilities"]),
                ("equity", &["equity"]),
            ];
            for (name, path) in placements {
                match name {
                    "totalAssets" => insert_line_items(&mut ordered, "assetLineItems", source.get("assets")),
                    "totalLiabilities" => {
                        insert_line_items(&mut ordered, "liabilityLineItems", source.get("liabilities"))
                    }
                    _ => {}
                }
                ordered.insert(name.to_string(), value_at(&balance_sheet, path));
            }
            Value::Object(ordered)
        }
        other => {
            return Err(StatementError::Projection(format!(
                "statementOfFinancialPosition must be an object, got {}",
                crate::utils::json_type_name(other)
            )))
        }
    };

    let view = json!({
        "filingInformation": value_at(filing, &["filingInformation"]),
        "statementOfFinancialPosition": ordered,
        "incomeStatement": value_at(filing, &["incomeStatement"]),
        "notes": value_at(filing, &["notes"]),
        "presentationOrder": PRESENTATION_ORDER,
    });
    Ok(BranchOutput::plain(view))
}
