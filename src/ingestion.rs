use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::{ConsolidatedAndSeparate, StatementEnvelope, StatementType};
use crate::utils::get_path;

/// Where each statement type lives inside a filing document.
pub fn filing_slot(statement_type: StatementType) -> &'static [&'static str] {
    match statement_type {
        StatementType::CurrentNonCurrent | StatementType::OrderOfLiquidity => {
            &["statementOfFinancialPosition"]
        }
        StatementType::IncomeStatement => &["incomeStatement"],
        StatementType::TradeAndOtherReceivablesNote => &["notes", "tradeAndOtherReceivables"],
        StatementType::TradeAndOtherPayablesNote => &["notes", "tradeAndOtherPayables"],
        StatementType::RevenueNote => &["notes", "revenue"],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_of_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_entity_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidated_and_separate: Option<ConsolidatedAndSeparate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_activities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_currency: Option<String>,
}

impl FilingInformation {
    /// Fills whatever the statements' headers can tell: the first UEN, period
    /// date and consolidation basis found, and the balance sheet's activities.
    pub fn from_statements(statements: &[StatementEnvelope]) -> Self {
        let mut info = FilingInformation::default();
        for statement in statements {
            let header = statement.header();
            if info.unique_entity_number.is_none() {
                info.unique_entity_number = header.unique_entity_number.clone();
            }
            if info.current_period_end_date.is_none() {
                info.current_period_end_date = header.period_date;
            }
            if info.consolidated_and_separate.is_none() {
                info.consolidated_and_separate = Some(header.consolidated_and_separate);
            }
            if info.principal_activities.is_none() {
                info.principal_activities = statement.principal_activities().map(str::to_string);
            }
        }
        info
    }

    /// Explicit values win; gaps are filled from `other`.
    pub fn merged_with(self, other: FilingInformation) -> Self {
        FilingInformation {
            name_of_company: self.name_of_company.or(other.name_of_company),
            unique_entity_number: self.unique_entity_number.or(other.unique_entity_number),
            current_period_end_date: self.current_period_end_date.or(other.current_period_end_date),
            consolidated_and_separate: self.consolidated_and_separate.or(other.consolidated_and_separate),
            principal_activities: self.principal_activities.or(other.principal_activities),
            presentation_currency: self.presentation_currency.or(other.presentation_currency),
        }
    }
}

/// Builds the filing document the projector and ratio calculator read:
///
/// ```text
/// filingInformation
/// statementOfFinancialPosition
/// incomeStatement
/// notes.{tradeAndOtherReceivables, tradeAndOtherPayables, revenue}
/// ```
///
/// A later statement of the same kind replaces an earlier one.
pub fn assemble_filing(
    statements: &[StatementEnvelope],
    info: Option<FilingInformation>,
) -> Result<Value> {
    let derived = FilingInformation::from_statements(statements);
    let info = match info {
        Some(explicit) => explicit.merged_with(derived),
        None => derived,
    };

    let mut filing = Map::new();
    filing.insert("filingInformation".to_string(), serde_json::to_value(&info)?);

    for statement in statements {
        let slot = filing_slot(statement.statement_type());
        let value = statement.to_value()?;
        if insert_at(&mut filing, slot, value).is_some() {
            log::warn!(
                "Filing already had a {}; keeping the later one",
                statement.statement_type().display_name()
            );
        }
    }

    log::debug!("Assembled filing from {} statement(s)", statements.len());
    Ok(Value::Object(filing))
}

fn insert_at(root: &mut Map<String, Value>, slot: &[&str], value: Value) -> Option<Value> {
    let (last, parents) = slot.split_last()?;
    let mut current = root;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    current.insert(last.to_string(), value)
}

/// Statement documents found in a filing, with the slot each came from.
pub fn filing_statements(filing: &Value) -> Vec<(String, &Value)> {
    let mut found: Vec<(String, &Value)> = Vec::new();
    for statement_type in StatementType::ALL {
        let slot = filing_slot(statement_type);
        let path = slot.join(".");
        if found.iter().any(|(p, _)| *p == path) {
            continue;
        }
        if let Some(value) = get_path(filing, slot) {
            if !value.is_null() {
                found.push((path, value));
            }
        }
    }
    found
}
