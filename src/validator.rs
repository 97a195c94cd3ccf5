//! The validation gate between extracted JSON and the typed statement model.
//!
//! Steps run in order and stop at the first failing one:
//!
//! 1. shape: the candidate must be a JSON object;
//! 2. discriminator: `statementType` must name one of the known variants;
//! 3. balance-sheet guidance: `assets`, `liabilities` and `equity` objects and a
//!    numeric `assets.totalAssets`;
//! 4. accounting equation, when all three totals are numeric;
//! 5. structural check against the variant's generated schema;
//! 6. typed parse, plus component sums when the configuration enforces them.
//!
//! [`Validator::validate`] never fails: every rejection is reported through
//! [`ValidationResult`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::balancer::{totals_from_value, AccountingBalancer};
use crate::config::ValidationConfig;
use crate::error::{Result, StatementError};
use crate::schema::{StatementEnvelope, StatementType, UEN_MAX_LENGTH, UEN_MIN_LENGTH};
use crate::structural::{check_statement, describe_found, describe_types, IssueKind, StructuralIssue};
use crate::utils::{get_path, json_type_name};

const UEN_EXAMPLE: &str = "A UEN looks like 201912345K (company), 53123456A (business) or T09LL0001B (other entity)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dot-joined location of the offending value; empty for the document root.
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            guidance: None,
        }
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }
}

/// Outcome of [`Validator::validate`]. Serializes as `{success: true, data}` or
/// `{success: false, errors, guidance}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Success {
        data: StatementEnvelope,
    },
    Failure {
        errors: Vec<FieldError>,
        guidance: String,
    },
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success { .. })
    }

    pub fn data(&self) -> Option<&StatementEnvelope> {
        match self {
            ValidationResult::Success { data } => Some(data),
            ValidationResult::Failure { .. } => None,
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationResult::Success { .. } => &[],
            ValidationResult::Failure { errors, .. } => errors,
        }
    }

    pub fn guidance(&self) -> Option<&str> {
        match self {
            ValidationResult::Success { .. } => None,
            ValidationResult::Failure { guidance, .. } => Some(guidance),
        }
    }

    /// Collapses a failure into [`StatementError::Structural`] carrying every
    /// field error. Use [`Validator::parse`] for the precise error kind.
    pub fn into_result(self) -> Result<StatementEnvelope> {
        match self {
            ValidationResult::Success { data } => Ok(data),
            ValidationResult::Failure { errors, .. } => Err(StatementError::Structural { errors }),
        }
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            ValidationResult::Success { data } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            ValidationResult::Failure { errors, guidance } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("errors", errors)?;
                map.serialize_entry("guidance", guidance)?;
            }
        }
        map.end()
    }
}

struct Rejection {
    cause: StatementError,
    errors: Vec<FieldError>,
    guidance: String,
}

impl Rejection {
    fn single(cause: StatementError, error: FieldError, guidance: impl Into<String>) -> Self {
        Self {
            cause,
            errors: vec![error],
            guidance: guidance.into(),
        }
    }

    fn structural(errors: Vec<FieldError>, guidance: String) -> Self {
        Self {
            cause: StatementError::Structural {
                errors: errors.clone(),
            },
            errors,
            guidance,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(&self, candidate: &Value) -> ValidationResult {
        match self.run(candidate) {
            Ok(data) => ValidationResult::Success { data },
            Err(rejection) => ValidationResult::Failure {
                errors: rejection.errors,
                guidance: rejection.guidance,
            },
        }
    }

    /// Same pipeline as [`validate`](Self::validate), reporting the typed
    /// cause of the first failing step.
    pub fn parse(&self, candidate: &Value) -> Result<StatementEnvelope> {
        self.run(candidate).map_err(|rejection| rejection.cause)
    }

    fn run(&self, candidate: &Value) -> std::result::Result<StatementEnvelope, Rejection> {
        let object = candidate.as_object().ok_or_else(|| {
            log::debug!("Rejecting {} candidate: not a statement object", json_type_name(candidate));
            Rejection::single(
                StatementError::MissingDiscriminator,
                FieldError::new(
                    "statementType",
                    format!(
                        "Expected a statement object with a statementType field, got {}",
                        json_type_name(candidate)
                    ),
                )
                .with_guidance(valid_tags_hint()),
                "Submit a single JSON object describing one financial statement",
            )
        })?;

        let statement_type = discriminator(object)?;
        log::debug!("Validating {} statement", statement_type);

        if statement_type.is_balance_sheet() {
            self.check_balance_sheet(candidate)?;
        }

        let issues = check_statement(statement_type, candidate).map_err(|e| {
            log::error!("Structural check unavailable: {}", e);
            Rejection::single(
                e,
                FieldError::new("", format!("{} cannot be checked", statement_type.display_name())),
                "The statement schema failed to load; this is not a problem with the submission",
            )
        })?;
        if !issues.is_empty() {
            log::debug!(
                "{} statement has {} structural issue(s)",
                statement_type,
                issues.len()
            );
            let errors: Vec<FieldError> = issues.iter().map(field_error_for).collect();
            let guidance = format!(
                "{} has {} invalid field(s); correct the listed fields and resubmit",
                statement_type.display_name(),
                errors.len()
            );
            return Err(Rejection::structural(errors, guidance));
        }

        let data: StatementEnvelope = serde_json::from_value(candidate.clone()).map_err(|e| {
            log::warn!("Schema-valid {} statement failed to parse: {}", statement_type, e);
            Rejection::structural(
                vec![FieldError::new("", e.to_string())],
                "The statement could not be read into the typed model".to_string(),
            )
        })?;

        if self.config.enforce_component_sums {
            self.check_component_sums(&data)?;
        }

        log::debug!("{} statement passed validation", statement_type);
        Ok(data)
    }

    fn check_balance_sheet(&self, candidate: &Value) -> std::result::Result<(), Rejection> {
        let mut errors = Vec::new();
        for section in ["assets", "liabilities", "equity"] {
            match candidate.get(section) {
                Some(Value::Object(_)) => {}
                Some(other) => errors.push(
                    FieldError::new(
                        section,
                        format!("Expected an object for {}, got {}", section, json_type_name(other)),
                    )
                    .with_guidance(format!("Group the {} line items under a single {} object", section, section)),
                ),
                None => errors.push(
                    FieldError::new(section, format!("Balance sheet is missing the {} section", section))
                        .with_guidance(format!("Add a {} object with its line items and total", section)),
                ),
            }
        }

        if errors.is_empty() {
            match get_path(candidate, &["assets", "totalAssets"]) {
                Some(v) if v.is_number() => {}
                Some(v) => errors.push(number_expected("assets.totalAssets", v)),
                None => errors.push(
                    FieldError::new("assets.totalAssets", "Total assets is required")
                        .with_guidance("Report totalAssets as a number"),
                ),
            }
        }

        if !errors.is_empty() {
            return Err(Rejection::structural(
                errors,
                "A balance sheet needs assets, liabilities and equity sections with a numeric total assets figure"
                    .to_string(),
            ));
        }

        let Some(totals) = totals_from_value(candidate) else {
            return Ok(());
        };

        if totals.total_assets == 0.0 {
            if self.config.reject_zero_total_assets {
                return Err(Rejection::single(
                    StatementError::ZeroTotalAssets,
                    FieldError::new("assets.totalAssets", StatementError::ZeroTotalAssets.to_string())
                        .with_guidance("Report the entity's actual figures"),
                    "Statements with zero total assets are not accepted",
                ));
            }
            log::warn!("Accepting balance sheet with zero total assets");
        }

        let balancer = AccountingBalancer::from_config(&self.config);
        balancer.verify_accounting_equation(totals).map_err(|cause| {
            log::warn!("{}", cause);
            let error = FieldError::new("assets.totalAssets", cause.to_string()).with_guidance(format!(
                "Total assets ({}) should equal total liabilities ({}) plus total equity ({}) = {}",
                totals.total_assets,
                totals.total_liabilities,
                totals.total_equity,
                totals.total_liabilities + totals.total_equity
            ));
            Rejection::single(
                cause,
                error,
                "The balance sheet does not balance; check the section totals",
            )
        })?;

        Ok(())
    }

    fn check_component_sums(&self, data: &StatementEnvelope) -> std::result::Result<(), Rejection> {
        let balancer = AccountingBalancer::from_config(&self.config);
        let discrepancies = balancer.check_component_sums(data);
        let Some(first) = discrepancies.first() else {
            return Ok(());
        };

        let cause = StatementError::ComponentSumMismatch {
            path: first.path.clone(),
            declared: first.declared,
            computed: first.computed,
        };
        let errors = discrepancies
            .iter()
            .map(|d| {
                let mismatch = StatementError::ComponentSumMismatch {
                    path: d.path.clone(),
                    declared: d.declared,
                    computed: d.computed,
                };
                FieldError::new(d.path.clone(), mismatch.to_string())
                    .with_guidance("Make the total equal the sum of the line items reported above it")
            })
            .collect();

        Err(Rejection {
            cause,
            errors,
            guidance: "Section totals disagree with their line items".to_string(),
        })
    }
}

/// Validates with the default configuration.
pub fn validate(candidate: &Value) -> ValidationResult {
    Validator::default().validate(candidate)
}

fn discriminator(object: &Map<String, Value>) -> std::result::Result<StatementType, Rejection> {
    match object.get("statementType") {
        None | Some(Value::Null) => Err(Rejection::single(
            StatementError::MissingDiscriminator,
            FieldError::new("statementType", "statementType is required").with_guidance(valid_tags_hint()),
            "Say which statement this is before its fields can be checked",
        )),
        Some(Value::String(tag)) => StatementType::from_tag(tag).ok_or_else(|| {
            Rejection::single(
                StatementError::UnknownDiscriminator(tag.clone()),
                FieldError::new("statementType", format!("Unknown statementType '{}'", tag))
                    .with_guidance(valid_tags_hint()),
                "Use one of the supported statement types",
            )
        }),
        Some(other) => Err(Rejection::single(
            StatementError::UnknownDiscriminator(other.to_string()),
            FieldError::new(
                "statementType",
                format!("statementType must be a string, got {}", json_type_name(other)),
            )
            .with_guidance(valid_tags_hint()),
            "Use one of the supported statement types",
        )),
    }
}

fn valid_tags_hint() -> String {
    let tags: Vec<&str> = StatementType::ALL.iter().map(|t| t.tag()).collect();
    format!("Expected one of: {}", tags.join(", "))
}

fn is_uen(path: &str) -> bool {
    path.ends_with("uniqueEntityNumber")
}

fn field_error_for(issue: &StructuralIssue) -> FieldError {
    let path = issue.path.to_string();
    let expected = &issue.expected;
    let found = &issue.found;
    match issue.kind {
        IssueKind::Missing => {
            let error = FieldError::new(path.clone(), "Required field is missing");
            if !expected.options.is_empty() {
                error.with_guidance(format!("Expected one of: {}", list_options(&expected.options)))
            } else if expected.is_numeric() {
                error.with_guidance("Provide a number; use 0 when the amount is nil")
            } else if expected.types.is_empty() {
                error
            } else {
                error.with_guidance(format!("Provide a {}", describe_types(&expected.types)))
            }
        }
        IssueKind::TypeMismatch => {
            if expected.is_numeric() && found.is_string() {
                number_expected(&path, found)
            } else if expected.types.is_empty() {
                FieldError::new(path, issue.detail.clone())
            } else {
                FieldError::new(
                    path,
                    format!(
                        "Expected {} but got {}",
                        describe_types(&expected.types),
                        describe_found(found)
                    ),
                )
            }
        }
        IssueKind::InvalidEnum => FieldError::new(
            path,
            format!("Invalid value {}", describe_found(found)),
        )
        .with_guidance(format!("Expected one of: {}", list_options(&expected.options))),
        IssueKind::TooShort => {
            let actual = found.as_str().map(|s| s.chars().count()).unwrap_or(0);
            let message = match expected.min_length {
                Some(min) => format!("Too short: {} character(s), at least {} required", actual, min),
                None => issue.detail.clone(),
            };
            let error = FieldError::new(path.clone(), message);
            if is_uen(&path) {
                error.with_guidance(UEN_EXAMPLE)
            } else {
                error
            }
        }
        IssueKind::TooLong => {
            let actual = found.as_str().map(|s| s.chars().count()).unwrap_or(0);
            let message = match expected.max_length {
                Some(max) => format!("Too long: {} character(s), at most {} allowed", actual, max),
                None => issue.detail.clone(),
            };
            let error = FieldError::new(path.clone(), message);
            if is_uen(&path) {
                error.with_guidance(UEN_EXAMPLE)
            } else {
                error.with_guidance("Shorten the text")
            }
        }
        IssueKind::PatternMismatch => {
            let text = found.as_str().unwrap_or_default();
            if is_uen(&path) {
                FieldError::new(
                    path,
                    format!(
                        "\"{}\" is not a valid UEN ({}-{} characters, digits with a check letter)",
                        text, UEN_MIN_LENGTH, UEN_MAX_LENGTH
                    ),
                )
                .with_guidance(UEN_EXAMPLE)
            } else {
                FieldError::new(path, format!("\"{}\" does not match the required format", text))
            }
        }
        IssueKind::InvalidDate => {
            FieldError::new(path, format!("{} is not a valid date", describe_found(found)))
                .with_guidance("Use the YYYY-MM-DD format, e.g. 2023-12-31")
        }
        IssueKind::Other => FieldError::new(path, issue.detail.clone()),
    }
}

fn number_expected(path: &str, found: &Value) -> FieldError {
    let error = FieldError::new(
        path,
        format!("Expected a number but got {}", describe_found(found)),
    );
    match found.as_str().and_then(numeric_suggestion) {
        Some(n) => error.with_guidance(format!(
            "Remove currency symbols and thousands separators: use {}",
            n
        )),
        None => error.with_guidance("Report the amount as a plain number"),
    }
}

/// Reads amounts such as "S$1,200.50" or "(3,000)" the way a filer meant them.
fn numeric_suggestion(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    Some(if negative { -value.abs() } else { value })
}

fn list_options(options: &[Value]) -> String {
    options
        .iter()
        .map(|o| match o {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn balance_sheet(total_equity: f64) -> Value {
        json!({
            "statementType": "currentNonCurrent",
            "consolidatedAndSeparate": "Consolidated",
            "periodDate": "2023-12-31",
            "assets": {
                "currentAssets": {
                    "cashAndBankBalances": 535_156.0,
                    "inventories": 300_000.0,
                    "totalCurrentAssets": 835_156.0
                },
                "nonCurrentAssets": {
                    "propertyPlantAndEquipment": 1_000_000.0,
                    "totalNonCurrentAssets": 1_000_000.0
                },
                "totalAssets": 1_835_156.0
            },
            "liabilities": {
                "currentLiabilities": {
                    "tradeAndOtherPayablesCurrent": 353_000.0,
                    "totalCurrentLiabilities": 353_000.0
                },
                "nonCurrentLiabilities": {
                    "nonCurrentLoansAndBorrowings": 200_000.0,
                    "totalNonCurrentLiabilities": 200_000.0
                },
                "totalLiabilities": 553_000.0
            },
            "equity": {
                "shareCapital": 1_000_000.0,
                "accumulatedProfitsLosses": 282_156.0,
                "totalEquity": total_equity
            }
        })
    }

    #[test]
    fn test_balanced_sheet_is_accepted() {
        let result = validate(&balance_sheet(1_282_156.0));
        assert!(result.is_success(), "{:?}", result.errors());
        assert_eq!(
            result.data().map(|d| d.statement_type()),
            Some(StatementType::CurrentNonCurrent)
        );
    }

    #[test]
    fn test_unbalanced_sheet_is_rejected() {
        let result = validate(&balance_sheet(1_200_000.0));
        assert!(!result.is_success());
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not balanced"));
        assert!(errors[0].message.contains("1835156"));
        assert!(errors[0].message.contains("1200000"));

        let cause = Validator::new().parse(&balance_sheet(1_200_000.0));
        assert!(matches!(
            cause,
            Err(StatementError::AccountingEquationViolation { .. })
        ));
    }

    #[test]
    fn test_non_object_input() {
        for candidate in [Value::Null, json!([1, 2]), json!("text")] {
            let result = validate(&candidate);
            assert_eq!(result.errors().len(), 1);
            assert_eq!(result.errors()[0].path, "statementType");
        }
    }

    #[test]
    fn test_discriminator_errors() {
        let result = validate(&json!({"consolidatedAndSeparate": "Separate"}));
        assert_eq!(result.errors()[0].path, "statementType");
        assert!(matches!(
            Validator::new().parse(&json!({})),
            Err(StatementError::MissingDiscriminator)
        ));

        let result = validate(&json!({"statementType": "cashFlowStatement"}));
        let guidance = result.errors()[0].guidance.clone().unwrap();
        for t in StatementType::ALL {
            assert!(guidance.contains(t.tag()));
        }
        assert!(matches!(
            Validator::new().parse(&json!({"statementType": 7})),
            Err(StatementError::UnknownDiscriminator(_))
        ));
    }

    #[test]
    fn test_missing_required_income_field() {
        let result = validate(&json!({
            "statementType": "incomeStatement",
            "consolidatedAndSeparate": "Separate",
            "revenue": 1_000_000.0,
            "incomeTaxExpenseBenefit": 25_500.0
        }));
        assert!(!result.is_success());
        assert!(result
            .errors()
            .iter()
            .any(|e| e.path == "profitLossBeforeTaxation"));
    }

    #[test]
    fn test_string_amount_gets_cleanup_guidance() {
        let result = validate(&json!({
            "statementType": "revenueNote",
            "consolidatedAndSeparate": "Separate",
            "revenueOthers": "S$1,200",
            "totalRevenue": 1200
        }));
        let error = &result.errors()[0];
        assert_eq!(error.path, "revenueOthers");
        assert!(error.message.contains("Expected a number"));
        assert!(error.guidance.as_deref().unwrap().contains("1200"));
    }

    #[test]
    fn test_enum_guidance_lists_options() {
        let result = validate(&json!({
            "statementType": "revenueNote",
            "consolidatedAndSeparate": "Group",
            "totalRevenue": 10
        }));
        let error = &result.errors()[0];
        assert_eq!(error.path, "consolidatedAndSeparate");
        let guidance = error.guidance.as_deref().unwrap();
        assert!(guidance.contains("Consolidated") && guidance.contains("Separate"));
    }

    #[test]
    fn test_guidance_pass_for_balance_sheets() {
        let result = validate(&json!({
            "statementType": "orderOfLiquidity",
            "consolidatedAndSeparate": "Separate",
            "assets": {"totalAssets": "1,000"},
            "liabilities": {"totalLiabilities": 400},
            "equity": {"shareCapital": 600, "accumulatedProfitsLosses": 0, "totalEquity": 600}
        }));
        assert_eq!(result.errors()[0].path, "assets.totalAssets");

        let result = validate(&json!({
            "statementType": "orderOfLiquidity",
            "consolidatedAndSeparate": "Separate",
            "assets": {"totalAssets": 1000}
        }));
        let paths: Vec<&str> = result.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["liabilities", "equity"]);
    }

    #[test]
    fn test_zero_total_policy() {
        let zero = json!({
            "statementType": "orderOfLiquidity",
            "consolidatedAndSeparate": "Separate",
            "assets": {"totalAssets": 0},
            "liabilities": {"totalLiabilities": 0},
            "equity": {"shareCapital": 0, "accumulatedProfitsLosses": 0, "totalEquity": 0}
        });
        assert!(validate(&zero).is_success());

        let strict = Validator::with_config(ValidationConfig {
            reject_zero_total_assets: true,
            ..ValidationConfig::default()
        });
        assert!(matches!(strict.parse(&zero), Err(StatementError::ZeroTotalAssets)));
    }

    #[test]
    fn test_component_sums_enforced_on_request() {
        let mut sheet = balance_sheet(1_282_156.0);
        sheet["assets"]["currentAssets"]["inventories"] = json!(250_000.0);

        assert!(validate(&sheet).is_success());

        let strict = Validator::with_config(ValidationConfig {
            enforce_component_sums: true,
            ..ValidationConfig::default()
        });
        let result = strict.validate(&sheet);
        assert_eq!(
            result.errors()[0].path,
            "assets.currentAssets.totalCurrentAssets"
        );
        assert!(matches!(
            strict.parse(&sheet),
            Err(StatementError::ComponentSumMismatch { .. })
        ));
    }

    #[test]
    fn test_serialized_shape() {
        let ok = serde_json::to_value(validate(&balance_sheet(1_282_156.0))).unwrap();
        assert_eq!(ok["success"], json!(true));
        assert_eq!(ok["data"]["statementType"], json!("currentNonCurrent"));

        let failed = serde_json::to_value(validate(&json!({}))).unwrap();
        assert_eq!(failed["success"], json!(false));
        assert!(failed["errors"].is_array());
        assert!(failed["guidance"].is_string());
    }

    #[test]
    fn test_numeric_suggestion() {
        assert_eq!(numeric_suggestion("1,234.50"), Some(1234.5));
        assert_eq!(numeric_suggestion("(3,000)"), Some(-3000.0));
        assert_eq!(numeric_suggestion("n/a"), None);
    }

    #[test]
    fn test_padded_date_names_the_field() {
        let result = validate(&json!({
            "statementType": "revenueNote",
            "consolidatedAndSeparate": "Separate",
            "periodDate": "2023-12-31 ",
            "totalRevenue": 10
        }));
        assert_eq!(result.errors().len(), 1);
        let error = &result.errors()[0];
        assert_eq!(error.path, "periodDate");
        assert!(error.message.contains("not a valid date"));
        assert!(error.guidance.as_deref().unwrap().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_short_uen_gets_one_error_with_example() {
        let result = validate(&json!({
            "statementType": "revenueNote",
            "consolidatedAndSeparate": "Separate",
            "uniqueEntityNumber": "12345",
            "totalRevenue": 10
        }));
        assert_eq!(result.errors().len(), 1);
        let error = &result.errors()[0];
        assert_eq!(error.path, "uniqueEntityNumber");
        assert!(error.guidance.as_deref().unwrap().contains("201912345K"));
    }
}
