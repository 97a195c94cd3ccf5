use crate::config::ValidationConfig;
use crate::error::{Result, StatementError};
use crate::schema::{BalanceTotals, SectionTotals, StatementEnvelope};
use crate::utils::number_at;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of comparing `totalAssets` against `totalLiabilities + totalEquity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquationCheck {
    pub totals: BalanceTotals,
    pub difference: f64,
    pub tolerance: f64,
    pub balanced: bool,
}

/// A section whose declared total disagrees with its reported components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SumDiscrepancy {
    pub path: String,
    pub declared: f64,
    pub computed: f64,
    pub difference: f64,
    pub tolerance: f64,
}

pub struct AccountingBalancer {
    tolerance_ratio: f64,
}

impl AccountingBalancer {
    pub fn new(tolerance_ratio: f64) -> Self {
        Self { tolerance_ratio }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.tolerance_ratio)
    }

    /// Absolute tolerance for a given base amount, `|base| × tolerance_ratio`.
    ///
    /// The magnitude is used because a negative `totalAssets` would otherwise
    /// give a negative tolerance, and no difference (always `>= 0`) could fall
    /// within it: every such sheet would fail the equation check.
    pub fn tolerance_for(&self, base: f64) -> f64 {
        base.abs() * self.tolerance_ratio
    }

    pub fn check_equation(&self, totals: BalanceTotals) -> EquationCheck {
        let difference =
            (totals.total_assets - (totals.total_liabilities + totals.total_equity)).abs();
        let tolerance = self.tolerance_for(totals.total_assets);

        EquationCheck {
            totals,
            difference,
            tolerance,
            balanced: difference <= tolerance,
        }
    }

    pub fn verify_accounting_equation(&self, totals: BalanceTotals) -> Result<EquationCheck> {
        let check = self.check_equation(totals);
        if !check.balanced {
            return Err(StatementError::AccountingEquationViolation {
                total_assets: totals.total_assets,
                total_liabilities: totals.total_liabilities,
                total_equity: totals.total_equity,
                difference: check.difference,
                tolerance: check.tolerance,
            });
        }
        Ok(check)
    }

    /// Compares each section's declared total with the sum of its components.
    /// Sections that report nothing but their total are skipped.
    pub fn check_component_sums(&self, statement: &StatementEnvelope) -> Vec<SumDiscrepancy> {
        let mut discrepancies = Vec::new();

        match statement {
            StatementEnvelope::CurrentNonCurrent(bs) => {
                self.check_section("assets.currentAssets", &bs.assets.current_assets, &mut discrepancies);
                self.check_section(
                    "assets.nonCurrentAssets",
                    &bs.assets.non_current_assets,
                    &mut discrepancies,
                );
                self.check_section("assets", &bs.assets, &mut discrepancies);
                self.check_section(
                    "liabilities.currentLiabilities",
                    &bs.liabilities.current_liabilities,
                    &mut discrepancies,
                );
                self.check_section(
                    "liabilities.nonCurrentLiabilities",
                    &bs.liabilities.non_current_liabilities,
                    &mut discrepancies,
                );
                self.check_section("liabilities", &bs.liabilities, &mut discrepancies);
                self.check_section("equity", &bs.equity, &mut discrepancies);
            }
            StatementEnvelope::OrderOfLiquidity(bs) => {
                self.check_section("assets", &bs.assets, &mut discrepancies);
                self.check_section("liabilities", &bs.liabilities, &mut discrepancies);
                self.check_section("equity", &bs.equity, &mut discrepancies);
            }
            StatementEnvelope::TradeAndOtherReceivablesNote(note) => {
                self.check_section("", note, &mut discrepancies);
            }
            StatementEnvelope::TradeAndOtherPayablesNote(note) => {
                self.check_section("", note, &mut discrepancies);
            }
            StatementEnvelope::RevenueNote(note) => {
                self.check_section("", note, &mut discrepancies);
            }
            StatementEnvelope::IncomeStatement(_) => {}
        }

        discrepancies
    }

    fn check_section<S: SectionTotals>(
        &self,
        prefix: &str,
        section: &S,
        discrepancies: &mut Vec<SumDiscrepancy>,
    ) {
        if !section.has_components() {
            return;
        }

        let (total_name, declared) = section.declared_total();
        let computed = section.component_sum();
        let difference = (declared - computed).abs();
        let tolerance = self.tolerance_for(declared).max(f64::EPSILON);

        if difference > tolerance {
            let path = if prefix.is_empty() {
                total_name.to_string()
            } else {
                format!("{}.{}", prefix, total_name)
            };
            discrepancies.push(SumDiscrepancy {
                path,
                declared,
                computed,
                difference,
                tolerance,
            });
        }
    }
}

/// Reads the three balance-sheet totals from an untyped document; `None`
/// unless all three are numbers.
pub fn totals_from_value(candidate: &Value) -> Option<BalanceTotals> {
    Some(BalanceTotals {
        total_assets: number_at(candidate, &["assets", "totalAssets"])?,
        total_liabilities: number_at(candidate, &["liabilities", "totalLiabilities"])?,
        total_equity: number_at(candidate, &["equity", "totalEquity"])?,
    })
}

pub fn verify_accounting_equation(totals: BalanceTotals, tolerance_ratio: f64) -> Result<EquationCheck> {
    AccountingBalancer::new(tolerance_ratio).verify_accounting_equation(totals)
}
