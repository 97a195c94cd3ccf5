//! Structural checking of untrusted JSON against the schemas generated from
//! the typed statement model.
//!
//! Each variant's schemars output is compiled once into a `jsonschema`
//! validator. Its errors are turned into path-addressed [`StructuralIssue`]s,
//! at most one per field, with the expectation looked up in the schemars
//! schema so the validator can word its guidance.

use jsonschema::error::ValidationErrorKind;
use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject, SingleOrVec};
use schemars::Map;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{Result, StatementError};
use crate::schema::StatementType;
use crate::utils::{json_type_name, JsonPath, PathSegment};

#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    Missing,
    TypeMismatch,
    InvalidEnum,
    TooShort,
    TooLong,
    PatternMismatch,
    InvalidDate,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralIssue {
    pub path: JsonPath,
    pub kind: IssueKind,
    /// What the schema asks for at `path`.
    pub expected: Expectation,
    /// The offending value; `Null` for a missing field.
    pub found: Value,
    /// The schema validator's own description of the failure.
    pub detail: String,
}

/// What a schema node asks for, used to word diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expectation {
    pub types: Vec<InstanceType>,
    pub options: Vec<Value>,
    pub format: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
}

impl Expectation {
    pub fn is_numeric(&self) -> bool {
        self.types
            .iter()
            .any(|t| matches!(t, InstanceType::Number | InstanceType::Integer))
    }
}

fn compile(statement_type: StatementType) -> std::result::Result<jsonschema::Validator, String> {
    let schema = serde_json::to_value(statement_type.json_schema()).map_err(|e| e.to_string())?;
    jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| e.to_string())
}

fn compiled(statement_type: StatementType) -> Result<&'static jsonschema::Validator> {
    static VALIDATORS: OnceLock<BTreeMap<StatementType, std::result::Result<jsonschema::Validator, String>>> =
        OnceLock::new();
    let validators = VALIDATORS.get_or_init(|| {
        StatementType::ALL
            .into_iter()
            .map(|t| {
                let compiled = compile(t);
                if let Err(e) = &compiled {
                    log::warn!("Could not compile the {} schema: {}", t, e);
                }
                (t, compiled)
            })
            .collect()
    });

    match validators.get(&statement_type) {
        Some(Ok(validator)) => Ok(validator),
        Some(Err(e)) => Err(StatementError::Schema(format!("{}: {}", statement_type, e))),
        None => Err(StatementError::Schema(format!("no schema for {}", statement_type))),
    }
}

/// Checks `value` against the schema of `statement_type`. Issues come back in
/// the order the schema validator reports them, one per path.
pub fn check_statement(statement_type: StatementType, value: &Value) -> Result<Vec<StructuralIssue>> {
    let validator = compiled(statement_type)?;
    let root = statement_type.json_schema();

    let mut issues: Vec<StructuralIssue> = Vec::new();
    for error in validator.iter_errors(value) {
        let parent = parse_pointer(error.instance_path().as_str());
        let (path, kind) = match error.kind() {
            ValidationErrorKind::Required { property } => {
                let name = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
                (parent.child_key(&name), IssueKind::Missing)
            }
            ValidationErrorKind::Type { .. } => (parent, IssueKind::TypeMismatch),
            ValidationErrorKind::Enum { .. } => (parent, IssueKind::InvalidEnum),
            ValidationErrorKind::MinLength { .. } => (parent, IssueKind::TooShort),
            ValidationErrorKind::MaxLength { .. } => (parent, IssueKind::TooLong),
            ValidationErrorKind::Pattern { .. } => (parent, IssueKind::PatternMismatch),
            ValidationErrorKind::Format { .. } => (parent, IssueKind::InvalidDate),
            _ => (parent, IssueKind::Other),
        };

        if issues.iter().any(|i| i.path == path) {
            continue;
        }

        let expected = expectation_at(root, &path);
        let kind = match kind {
            IssueKind::InvalidDate if expected.format.as_deref() != Some("date") => IssueKind::Other,
            other => other,
        };
        issues.push(StructuralIssue {
            found: lookup(value, &path).cloned().unwrap_or(Value::Null),
            path,
            kind,
            expected,
            detail: error.to_string(),
        });
    }
    Ok(issues)
}

/// `/assets/totalAssets` → `assets.totalAssets`.
fn parse_pointer(pointer: &str) -> JsonPath {
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .fold(JsonPath::root(), |path, token| match token.parse::<usize>() {
            Ok(index) => path.child_index(index),
            Err(_) => path.child_key(&token),
        })
}

fn lookup<'a>(value: &'a Value, path: &JsonPath) -> Option<&'a Value> {
    path.segments().iter().try_fold(value, |node, segment| match segment {
        PathSegment::Key(key) => node.get(key.as_str()),
        PathSegment::Index(index) => node.get(*index),
    })
}

/// Expectation of the schema node that governs `path`; empty when the path
/// leaves the declared properties.
pub fn expectation_at(root: &RootSchema, path: &JsonPath) -> Expectation {
    let mut current = Schema::Object(root.schema.clone());
    for segment in path.segments() {
        let PathSegment::Key(key) = segment else {
            return Expectation::default();
        };
        let next = resolve_schema(&root.definitions, &current)
            .and_then(|obj| obj.object.as_ref())
            .and_then(|object| object.properties.get(key))
            .cloned();
        match next {
            Some(schema) => current = schema,
            None => return Expectation::default(),
        }
    }
    expectation_of(&root.definitions, &current)
}

pub(crate) fn resolve_reference<'a>(
    definitions: &'a Map<String, Schema>,
    reference: &str,
) -> Option<&'a Schema> {
    definitions.get(reference.trim_start_matches("#/definitions/"))
}

/// Follows `$ref` and single-element `allOf` wrappers down to the schema that
/// actually constrains the value.
pub(crate) fn resolve_schema<'a>(
    definitions: &'a Map<String, Schema>,
    schema: &'a Schema,
) -> Option<&'a SchemaObject> {
    let mut current = schema;
    for _ in 0..16 {
        let Schema::Object(obj) = current else {
            return None;
        };
        if let Some(reference) = &obj.reference {
            current = resolve_reference(definitions, reference)?;
            continue;
        }
        match obj.subschemas.as_ref().and_then(|s| s.all_of.as_ref()) {
            Some(all_of) if all_of.len() == 1 && obj.instance_type.is_none() => {
                current = &all_of[0];
            }
            _ => return Some(obj),
        }
    }
    None
}

pub(crate) fn expectation_of(definitions: &Map<String, Schema>, schema: &Schema) -> Expectation {
    let Some(obj) = resolve_schema(definitions, schema) else {
        return Expectation::default();
    };

    let mut expectation = Expectation {
        types: obj.instance_type.as_ref().map(single_or_vec).unwrap_or_default(),
        options: obj.enum_values.clone().unwrap_or_default(),
        format: obj.format.clone(),
        min_length: obj.string.as_ref().and_then(|s| s.min_length),
        max_length: obj.string.as_ref().and_then(|s| s.max_length),
    };

    if let Some(sub) = &obj.subschemas {
        for alternatives in [&sub.any_of, &sub.one_of].into_iter().flatten() {
            for alternative in alternatives {
                let inner = expectation_of(definitions, alternative);
                for t in inner.types {
                    if !expectation.types.contains(&t) {
                        expectation.types.push(t);
                    }
                }
                expectation.options.extend(inner.options);
                if expectation.format.is_none() {
                    expectation.format = inner.format;
                }
            }
        }
    }

    expectation
}

fn single_or_vec(types: &SingleOrVec<InstanceType>) -> Vec<InstanceType> {
    match types {
        SingleOrVec::Single(t) => vec![(**t).clone()],
        SingleOrVec::Vec(ts) => ts.clone(),
    }
}

pub fn instance_type_name(t: &InstanceType) -> &'static str {
    match t {
        InstanceType::Null => "null",
        InstanceType::Boolean => "boolean",
        InstanceType::Number => "number",
        InstanceType::Integer => "integer",
        InstanceType::String => "string",
        InstanceType::Array => "array",
        InstanceType::Object => "object",
    }
}

/// "number", "string or null", ...
pub fn describe_types(types: &[InstanceType]) -> String {
    let names: Vec<&str> = types
        .iter()
        .filter(|t| **t != InstanceType::Null)
        .map(instance_type_name)
        .collect();
    if names.is_empty() {
        "null".to_string()
    } else {
        names.join(" or ")
    }
}

pub fn describe_found(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string \"{}\"", s),
        other => json_type_name(other).to_string(),
    }
}
