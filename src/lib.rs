//! # ACRA Statements
//!
//! Validation and multi-framework projection of Singapore ACRA/XBRL financial
//! statements extracted from filings.
//!
//! ## Core Concepts
//!
//! - **Statement**: one of six shapes (two balance-sheet presentations, the
//!   income statement, three note disclosures) discriminated by `statementType`
//! - **Validation**: a gate that turns untrusted JSON into a typed
//!   [`StatementEnvelope`] or a list of field errors with guidance
//! - **Accounting Integrity**: `totalAssets` must equal `totalLiabilities +
//!   totalEquity` within 0.1% of total assets
//! - **Filing**: statements assembled under their conventional sections
//!   (`statementOfFinancialPosition`, `incomeStatement`, `notes`, ...)
//! - **Framework**: a named view of a filing for one audience, built by a pure
//!   projection that never touches its input
//!
//! ## Example
//!
//! ```rust,ignore
//! use acra_statements::*;
//! use serde_json::json;
//!
//! let candidate = json!({
//!     "statementType": "orderOfLiquidity",
//!     "consolidatedAndSeparate": "Separate",
//!     "principalActivities": "Operation of convenience stores",
//!     "assets": {"totalAssets": 1000.0, "inventories": 400.0},
//!     "liabilities": {"totalLiabilities": 300.0},
//!     "equity": {"shareCapital": 700.0, "accumulatedProfitsLosses": 0.0, "totalEquity": 700.0}
//! });
//!
//! match validate(&candidate) {
//!     ValidationResult::Success { data } => {
//!         let view = FrameworkProjector::default().project_statement(&data, "industry-specific");
//!         println!("{}", view["industry"]["tag"]);
//!     }
//!     ValidationResult::Failure { errors, guidance } => {
//!         eprintln!("{}: {:?}", guidance, errors);
//!     }
//! }
//! ```

pub mod balancer;
pub mod config;
pub mod engine;
pub mod error;
pub mod frameworks;
pub mod industry;
pub mod ingestion;
pub mod normalize;
pub mod ratios;
pub mod schema;
pub mod structural;
pub mod utils;
pub mod validator;

pub use balancer::{
    totals_from_value, verify_accounting_equation, AccountingBalancer, EquationCheck,
    SumDiscrepancy,
};
pub use config::{EngineConfig, IndustryConfig, IndustryProfile, RatioConfig, ValidationConfig};
pub use engine::{framework_catalog, project, FrameworkDescriptor, FrameworkId, FrameworkProjector};
pub use error::{Result, StatementError};
pub use industry::{classify, BalanceSheetShape, IndustryClassifier, IndustryTag};
pub use ingestion::{assemble_filing, filing_statements, FilingInformation};
pub use normalize::{apply_declared_defaults, with_declared_defaults, DeclaredDefaults};
pub use ratios::{calculate_ratio, EstimatedFigure, FinancialFigures, FinancialRatios, RatioCalculator};
pub use schema::*;
pub use validator::{validate, FieldError, ValidationResult, Validator};

use log::{debug, info};
use serde_json::Value;
use std::path::Path;

/// Validate-then-project pipeline sharing one [`EngineConfig`].
pub struct StatementProcessor {
    validator: Validator,
    projector: FrameworkProjector,
    calculator: RatioCalculator,
}

impl StatementProcessor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: Validator::with_config(config.validation.clone()),
            projector: FrameworkProjector::new(&config),
            calculator: RatioCalculator::new(config.ratios),
        }
    }

    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_path(path)?))
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn projector(&self) -> &FrameworkProjector {
        &self.projector
    }

    /// Validates one statement and projects it into `framework_id`.
    pub fn process(&self, candidate: &Value, framework_id: &str) -> Result<Value> {
        let statement = self.validator.parse(candidate)?;
        debug!("Projecting {} into {}", statement.statement_type(), framework_id);
        Ok(self.projector.project_statement(&statement, framework_id))
    }

    /// Validates every candidate, assembles them into one filing and projects
    /// it. The first invalid statement aborts the run.
    pub fn process_filing(
        &self,
        candidates: &[Value],
        info: Option<FilingInformation>,
        framework_id: &str,
    ) -> Result<Value> {
        let statements = candidates
            .iter()
            .map(|c| self.validator.parse(c))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Processing filing of {} statement(s) into {}",
            statements.len(),
            framework_id
        );

        let filing = assemble_filing(&statements, info)?;
        Ok(self.projector.project(&filing, framework_id))
    }

    /// Validates each statement found in an assembled filing, keyed by its
    /// dot-joined slot.
    pub fn validate_filing(&self, filing: &Value) -> Vec<(String, ValidationResult)> {
        filing_statements(filing)
            .into_iter()
            .map(|(slot, statement)| {
                let result = self.validator.validate(statement);
                if !result.is_success() {
                    debug!("{} failed validation with {} error(s)", slot, result.errors().len());
                }
                (slot, result)
            })
            .collect()
    }

    pub fn ratios(&self, statements: &[StatementEnvelope]) -> FinancialRatios {
        self.calculator.calculate_for_statements(statements)
    }
}

impl Default for StatementProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Validates `candidate` and projects it with the default configuration.
pub fn process_statement(candidate: &Value, framework_id: &str) -> Result<Value> {
    StatementProcessor::default().process(candidate, framework_id)
}
