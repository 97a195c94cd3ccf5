use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::balancer::AccountingBalancer;
use crate::config::EngineConfig;
use crate::error::{Result, StatementError};
use crate::frameworks::{self, BranchOutput, ProjectionContext};
use crate::industry::IndustryClassifier;
use crate::ingestion::{assemble_filing, filing_slot};
use crate::ratios::RatioCalculator;
use crate::schema::{StatementEnvelope, StatementType};
use crate::utils::json_type_name;

pub const METADATA_KEY: &str = "_frameworkMetadata";
pub const ERROR_FRAMEWORK_NAME: &str = "Error Processing Framework";
pub const DEFAULT_FRAMEWORK_NAME: &str = "Default View";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameworkId {
    SfrsFull,
    FinancialStatements,
    SfrsSimplified,
    ComplianceFocused,
    Analytical,
    BusinessProfile,
    IndustrySpecific,
    RegulatoryReporting,
}

type Branch = fn(&Value, &ProjectionContext<'_>) -> Result<BranchOutput>;

impl FrameworkId {
    pub fn all() -> [FrameworkId; 8] {
        [
            FrameworkId::SfrsFull,
            FrameworkId::FinancialStatements,
            FrameworkId::SfrsSimplified,
            FrameworkId::ComplianceFocused,
            FrameworkId::Analytical,
            FrameworkId::BusinessProfile,
            FrameworkId::IndustrySpecific,
            FrameworkId::RegulatoryReporting,
        ]
    }

    /// Canonical id plus accepted aliases, matched case-insensitively.
    pub fn from_id(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sfrs-full" | "full-acra" => Some(FrameworkId::SfrsFull),
            "financial-statements" => Some(FrameworkId::FinancialStatements),
            "sfrs-simplified" | "simplified" => Some(FrameworkId::SfrsSimplified),
            "compliance-focused" | "compliance" => Some(FrameworkId::ComplianceFocused),
            "analytical" => Some(FrameworkId::Analytical),
            "business-profile" => Some(FrameworkId::BusinessProfile),
            "industry-specific" => Some(FrameworkId::IndustrySpecific),
            "regulatory-reporting" => Some(FrameworkId::RegulatoryReporting),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            FrameworkId::SfrsFull => "sfrs-full",
            FrameworkId::FinancialStatements => "financial-statements",
            FrameworkId::SfrsSimplified => "sfrs-simplified",
            FrameworkId::ComplianceFocused => "compliance-focused",
            FrameworkId::Analytical => "analytical",
            FrameworkId::BusinessProfile => "business-profile",
            FrameworkId::IndustrySpecific => "industry-specific",
            FrameworkId::RegulatoryReporting => "regulatory-reporting",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameworkId::SfrsFull => "SFRS Full (ACRA XBRL)",
            FrameworkId::FinancialStatements => "Financial Statements",
            FrameworkId::SfrsSimplified => "SFRS Simplified",
            FrameworkId::ComplianceFocused => "Compliance Focused",
            FrameworkId::Analytical => "Analytical",
            FrameworkId::BusinessProfile => "Business Profile",
            FrameworkId::IndustrySpecific => "Industry Specific",
            FrameworkId::RegulatoryReporting => "Regulatory Reporting",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FrameworkId::SfrsFull => "Complete filing in the full ACRA XBRL taxonomy",
            FrameworkId::FinancialStatements => {
                "The primary financial statements and notes with minimal filing details"
            }
            FrameworkId::SfrsSimplified => {
                "Headline totals and key ratios for small entities and quick review"
            }
            FrameworkId::ComplianceFocused => {
                "Filing details, governance sections and regulatory checks"
            }
            FrameworkId::Analytical => "Derived profitability, liquidity, solvency and efficiency ratios",
            FrameworkId::BusinessProfile => "Company identity, activities, industry and scale",
            FrameworkId::IndustrySpecific => {
                "Core statements with the metrics relevant to the detected industry"
            }
            FrameworkId::RegulatoryReporting => {
                "Balance sheet in regulatory presentation order"
            }
        }
    }

    pub fn sections(self) -> &'static [&'static str] {
        match self {
            FrameworkId::SfrsFull => &[
                "filingInformation",
                "directorsStatement",
                "auditReport",
                "statementOfFinancialPosition",
                "incomeStatement",
                "statementOfCashFlows",
                "statementOfChangesInEquity",
                "notes",
            ],
            FrameworkId::FinancialStatements => &[
                "filingInformation",
                "statementOfFinancialPosition",
                "incomeStatement",
                "statementOfCashFlows",
                "statementOfChangesInEquity",
                "notes",
            ],
            FrameworkId::SfrsSimplified => &["companyInfo", "balanceSheet", "incomeStatement", "keyMetrics"],
            FrameworkId::ComplianceFocused => &[
                "filingInformation",
                "directorsStatement",
                "auditReport",
                "statementOfFinancialPosition",
                "complianceChecks",
            ],
            FrameworkId::Analytical => &["summary", "ratios", "industry"],
            FrameworkId::BusinessProfile => &[
                "companyName",
                "uniqueEntityNumber",
                "periodEnd",
                "reportingBasis",
                "principalActivities",
                "industry",
                "scale",
            ],
            FrameworkId::IndustrySpecific => &[
                "industry",
                "statementOfFinancialPosition",
                "incomeStatement",
                "industryMetrics",
            ],
            FrameworkId::RegulatoryReporting => &[
                "filingInformation",
                "statementOfFinancialPosition",
                "incomeStatement",
                "notes",
                "presentationOrder",
            ],
        }
    }

    fn branch(self) -> Branch {
        match self {
            FrameworkId::SfrsFull => frameworks::full,
            FrameworkId::FinancialStatements => frameworks::financial_statements,
            FrameworkId::SfrsSimplified => frameworks::simplified,
            FrameworkId::ComplianceFocused => frameworks::compliance,
            FrameworkId::Analytical => frameworks::analytical,
            FrameworkId::BusinessProfile => frameworks::business_profile,
            FrameworkId::IndustrySpecific => frameworks::industry_specific,
            FrameworkId::RegulatoryReporting => frameworks::regulatory_reporting,
        }
    }

    pub fn descriptor(self) -> FrameworkDescriptor {
        FrameworkDescriptor {
            id: self.id().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            sections: self.sections().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FrameworkId {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self> {
        FrameworkId::from_id(s).ok_or_else(|| StatementError::UnknownFramework(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub sections: Vec<String>,
}

/// Every framework the projector knows, in catalogue order.
pub fn framework_catalog() -> Vec<FrameworkDescriptor> {
    FrameworkId::all().into_iter().map(FrameworkId::descriptor).collect()
}

/// The `_frameworkMetadata` envelope attached to every projected view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkMetadata {
    pub name: String,
    pub description: String,
    pub sections: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrameworkMetadata {
    fn for_framework(id: FrameworkId, extra: Map<String, Value>) -> Self {
        let mut extra = extra;
        extra.insert("frameworkId".to_string(), json!(id.id()));
        Self {
            name: id.name().to_string(),
            description: id.description().to_string(),
            sections: id.sections().iter().map(|s| s.to_string()).collect(),
            extra,
        }
    }

    fn default_view(requested: &str, sections: Vec<String>) -> Self {
        let mut extra = Map::new();
        extra.insert(
            "warning".to_string(),
            json!(format!(
                "Unknown framework '{}'; showing the full filing",
                requested
            )),
        );
        Self {
            name: DEFAULT_FRAMEWORK_NAME.to_string(),
            description: "Unmodified copy of the filing".to_string(),
            sections,
            extra,
        }
    }

    fn error(requested: &str, message: String) -> Self {
        let mut extra = Map::new();
        extra.insert("frameworkId".to_string(), json!(requested));
        extra.insert("error".to_string(), json!(message));
        Self {
            name: ERROR_FRAMEWORK_NAME.to_string(),
            description: "The view could not be produced; the input is returned unchanged".to_string(),
            sections: Vec::new(),
            extra,
        }
    }
}

/// Reshapes canonical filings into framework views.
///
/// Input is deep-copied before any branch runs, so the caller's document is
/// never touched and repeated calls give equal output. Branch failures come
/// back as the copied input annotated with an error metadata block.
pub struct FrameworkProjector {
    calculator: RatioCalculator,
    classifier: IndustryClassifier,
    balancer: AccountingBalancer,
}

impl FrameworkProjector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            calculator: RatioCalculator::new(config.ratios.clone()),
            classifier: IndustryClassifier::new(&config.industry),
            balancer: AccountingBalancer::from_config(&config.validation),
        }
    }

    pub fn project(&self, canonical: &Value, framework_id: &str) -> Value {
        let copy = canonical.clone();

        if !copy.is_object() {
            let message = format!("expected a filing object, got {}", json_type_name(&copy));
            log::warn!("Cannot project into '{}': {}", framework_id, message);
            let mut wrapped = Map::new();
            wrapped.insert("input".to_string(), copy);
            insert_metadata(&mut wrapped, FrameworkMetadata::error(framework_id, message));
            return Value::Object(wrapped);
        }

        let filing = lift_statement(copy);

        let Some(id) = FrameworkId::from_id(framework_id) else {
            log::warn!("Unknown framework id '{}'; returning the full filing", framework_id);
            let sections = match &filing {
                Value::Object(map) => map.keys().cloned().collect(),
                _ => Vec::new(),
            };
            return with_metadata(filing, FrameworkMetadata::default_view(framework_id, sections));
        };

        let ctx = ProjectionContext {
            calculator: &self.calculator,
            classifier: &self.classifier,
            balancer: &self.balancer,
        };

        match (id.branch())(&filing, &ctx) {
            Ok(output) => {
                log::debug!("Projected filing into {}", id);
                with_metadata(output.view, FrameworkMetadata::for_framework(id, output.metadata))
            }
            Err(e) => {
                log::warn!("Projection into {} failed: {}", id, e);
                with_metadata(filing, FrameworkMetadata::error(id.id(), e.to_string()))
            }
        }
    }

    /// Projects a single typed statement by first placing it in a filing.
    pub fn project_statement(&self, statement: &StatementEnvelope, framework_id: &str) -> Value {
        match assemble_filing(std::slice::from_ref(statement), None) {
            Ok(filing) => self.project(&filing, framework_id),
            Err(e) => {
                log::warn!("Could not assemble filing for projection: {}", e);
                let mut wrapped = Map::new();
                wrapped.insert("input".to_string(), Value::Null);
                insert_metadata(&mut wrapped, FrameworkMetadata::error(framework_id, e.to_string()));
                Value::Object(wrapped)
            }
        }
    }

    /// One view per framework in the catalogue, keyed by canonical id.
    pub fn project_all(&self, canonical: &Value) -> Map<String, Value> {
        FrameworkId::all()
            .into_iter()
            .map(|id| (id.id().to_string(), self.project(canonical, id.id())))
            .collect()
    }
}

impl Default for FrameworkProjector {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// Projects with the default configuration.
pub fn project(canonical: &Value, framework_id: &str) -> Value {
    FrameworkProjector::default().project(canonical, framework_id)
}

/// A bare statement (a document carrying a known `statementType`) is moved
/// into its filing slot; anything else is taken to be a filing already.
fn lift_statement(document: Value) -> Value {
    let statement_type = document
        .get("statementType")
        .and_then(Value::as_str)
        .and_then(StatementType::from_tag);
    let Some(statement_type) = statement_type else {
        return document;
    };

    let mut lifted = json!({});
    let mut cursor = &mut lifted;
    for key in filing_slot(statement_type) {
        cursor = &mut cursor[*key];
    }
    *cursor = document;
    lifted
}

fn insert_metadata(map: &mut Map<String, Value>, metadata: FrameworkMetadata) {
    let value = serde_json::to_value(&metadata).unwrap_or_else(|e| json!({"name": metadata.name, "error": e.to_string()}));
    map.insert(METADATA_KEY.to_string(), value);
}

fn with_metadata(view: Value, metadata: FrameworkMetadata) -> Value {
    match view {
        Value::Object(mut map) => {
            insert_metadata(&mut map, metadata);
            Value::Object(map)
        }
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("input".to_string(), other);
            insert_metadata(&mut wrapped, metadata);
            Value::Object(wrapped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(FrameworkId::from_id("full-acra"), Some(FrameworkId::SfrsFull));
        assert_eq!(FrameworkId::from_id("SIMPLIFIED"), Some(FrameworkId::SfrsSimplified));
        assert_eq!(FrameworkId::from_id(" compliance "), Some(FrameworkId::ComplianceFocused));
        assert_eq!(FrameworkId::from_id("ifrs-full"), None);
        assert!(matches!(
            "ifrs-full".parse::<FrameworkId>(),
            Err(StatementError::UnknownFramework(_))
        ));
        for id in FrameworkId::all() {
            assert_eq!(id.id().parse::<FrameworkId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), json!(id.id()));
        }
    }

    #[test]
    fn test_catalog_lists_every_framework() {
        let catalog = framework_catalog();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog[1].name, "Financial Statements");
        assert!(catalog.iter().all(|d| !d.sections.is_empty()));
    }

    #[test]
    fn test_lift_statement_into_slot() {
        let lifted = lift_statement(json!({"statementType": "revenueNote", "totalRevenue": 5.0}));
        assert_eq!(lifted["notes"]["revenue"]["totalRevenue"], json!(5.0));

        let filing = json!({"incomeStatement": {"revenue": 1.0}});
        assert_eq!(lift_statement(filing.clone()), filing);
    }

    #[test]
    fn test_metadata_attached() {
        let view = project(&json!({"incomeStatement": {"revenue": 1.0}}), "analytical");
        let metadata = &view[METADATA_KEY];
        assert_eq!(metadata["name"], json!("Analytical"));
        assert_eq!(metadata["frameworkId"], json!("analytical"));
        assert_eq!(metadata["industry"], json!("generic"));
        assert!(metadata["sections"].is_array());
    }

    #[test]
    fn test_unknown_framework_falls_back() {
        let input = json!({"incomeStatement": {"revenue": 1.0}});
        let view = project(&input, "ifrs-full");
        assert_eq!(view["incomeStatement"], input["incomeStatement"]);
        assert_eq!(view[METADATA_KEY]["name"], json!(DEFAULT_FRAMEWORK_NAME));
        assert!(view[METADATA_KEY]["warning"].as_str().unwrap().contains("ifrs-full"));
    }

    #[test]
    fn test_branch_failure_is_annotated() {
        let input = json!({"statementOfFinancialPosition": "not an object"});
        let view = project(&input, "regulatory-reporting");
        assert_eq!(view["statementOfFinancialPosition"], json!("not an object"));
        assert_eq!(view[METADATA_KEY]["name"], json!(ERROR_FRAMEWORK_NAME));
        assert!(view[METADATA_KEY]["error"].as_str().unwrap().contains("must be an object"));
    }

    #[test]
    fn test_non_object_input_is_wrapped() {
        let view = project(&json!([1, 2, 3]), "sfrs-full");
        assert_eq!(view["input"], json!([1, 2, 3]));
        assert_eq!(view[METADATA_KEY]["name"], json!(ERROR_FRAMEWORK_NAME));
    }
}
