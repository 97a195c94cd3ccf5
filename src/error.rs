use thiserror::Error;

use crate::validator::FieldError;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Statement failed structural validation ({} field error(s))", errors.len())]
    Structural { errors: Vec<FieldError> },

    #[error("Missing statementType: the document does not say which statement it is")]
    MissingDiscriminator,

    #[error("Unknown statementType '{0}'")]
    UnknownDiscriminator(String),

    #[error("Accounting equation not balanced: Assets ({total_assets}) != Liabilities ({total_liabilities}) + Equity ({total_equity}), difference {difference} exceeds tolerance {tolerance}")]
    AccountingEquationViolation {
        total_assets: f64,
        total_liabilities: f64,
        total_equity: f64,
        difference: f64,
        tolerance: f64,
    },

    #[error("Component sum mismatch at {path}: declared total {declared}, components sum to {computed}")]
    ComponentSumMismatch {
        path: String,
        declared: f64,
        computed: f64,
    },

    #[error("Zero-value statement rejected: totalAssets is 0")]
    ZeroTotalAssets,

    #[error("Unknown framework id '{0}'")]
    UnknownFramework(String),

    #[error("Projection failed: {0}")]
    Projection(String),

    #[error("Statement schema could not be compiled: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
