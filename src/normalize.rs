//! Declared defaults for the strict full-taxonomy shape.
//!
//! Optional monetary fields that a filer left out (or sent as `null`) are
//! written back as `0`. Which fields qualify is read from the variant schema.
//! Required fields are never invented, and neither are the reported profit
//! lines: an absent `profitLoss` must keep falling back to profit before tax
//! less tax.

use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::Map;
use serde_json::Value;

use crate::error::Result;
use crate::schema::{StatementEnvelope, StatementType};
use crate::structural::{expectation_of, resolve_schema};
use crate::utils::JsonPath;

/// Optional amounts that stand for a derived figure, so a default of 0 would
/// misreport them.
const DERIVED_AMOUNTS: [&str; 3] = [
    "profitLoss",
    "profitLossAttributableToOwnersOfCompany",
    "profitLossAttributableToNonControllingInterests",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredDefaults {
    pub value: Value,
    /// Dot-joined paths of every field that received a default.
    pub filled: Vec<String>,
}

/// Fills absent optional amounts of a statement document. Documents without a
/// recognised `statementType` are returned unchanged.
pub fn apply_declared_defaults(candidate: &Value) -> DeclaredDefaults {
    let mut value = candidate.clone();
    let mut filled = Vec::new();

    let statement_type = candidate
        .get("statementType")
        .and_then(Value::as_str)
        .and_then(StatementType::from_tag);

    if let Some(t) = statement_type {
        let root = t.json_schema();
        fill_object(&root.definitions, &root.schema, &mut value, &JsonPath::root(), &mut filled);
        log::debug!("Filled {} optional amount(s) on {} statement", filled.len(), t);
    }

    DeclaredDefaults { value, filled }
}

/// Typed counterpart of [`apply_declared_defaults`].
pub fn with_declared_defaults(statement: &StatementEnvelope) -> Result<StatementEnvelope> {
    let defaults = apply_declared_defaults(&statement.to_value()?);
    Ok(serde_json::from_value(defaults.value)?)
}

fn fill_object(
    definitions: &Map<String, Schema>,
    obj: &SchemaObject,
    value: &mut Value,
    path: &JsonPath,
    filled: &mut Vec<String>,
) {
    let Some(validation) = &obj.object else {
        return;
    };
    let Some(map) = value.as_object_mut() else {
        return;
    };

    for (name, schema) in &validation.properties {
        let child_path = path.child_key(name);
        let absent = matches!(map.get(name), None | Some(Value::Null));

        if absent {
            if !validation.required.contains(name)
                && !DERIVED_AMOUNTS.contains(&name.as_str())
                && is_optional_amount(definitions, schema)
            {
                map.insert(name.clone(), Value::from(0.0));
                filled.push(child_path.to_string());
            }
            continue;
        }

        if let Some(child) = map.get_mut(name) {
            if child.is_object() {
                if let Some(resolved) = resolve_schema(definitions, schema) {
                    fill_object(definitions, resolved, child, &child_path, filled);
                }
            }
        }
    }
}

fn is_optional_amount(definitions: &Map<String, Schema>, schema: &Schema) -> bool {
    let expectation = expectation_of(definitions, schema);
    expectation.is_numeric() && expectation.types.contains(&InstanceType::Null)
}
