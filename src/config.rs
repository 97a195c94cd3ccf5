use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, StatementError};
use crate::industry::IndustryTag;

/// Settings for the validator's business rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Allowed deviation of `totalAssets` from `totalLiabilities + totalEquity`,
    /// as a fraction of `|totalAssets|`.
    pub tolerance_ratio: f64,

    /// Treat a statement whose `totalAssets` is exactly 0 as invalid.
    pub reject_zero_total_assets: bool,

    /// Fail validation when a section's declared total disagrees with the sum
    /// of its reported components.
    pub enforce_component_sums: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance_ratio: 0.001,
            reject_zero_total_assets: false,
            enforce_component_sums: false,
        }
    }
}

/// Settings for derived ratios and estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RatioConfig {
    /// Share of revenue assumed to be cost of goods sold when the taxonomy
    /// carries no cost-of-sales line.
    pub cogs_revenue_fraction: f64,
    pub days_in_year: f64,
    pub decimal_places: i32,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            cogs_revenue_fraction: 0.7,
            days_in_year: 365.0,
            decimal_places: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndustryProfile {
    pub tag: IndustryTag,
    /// Lower-case fragments matched against the principal-activities text.
    pub keywords: Vec<String>,
}

impl IndustryProfile {
    pub fn new(tag: IndustryTag, keywords: &[&str]) -> Self {
        Self {
            tag,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Keyword tables for the industry classifier, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndustryConfig {
    pub profiles: Vec<IndustryProfile>,
    /// Only match keywords at the start of a word ("bank" no longer matches
    /// "riverbank"). Off by default: keywords match anywhere in the text.
    pub match_word_starts: bool,
}

impl Default for IndustryConfig {
    fn default() -> Self {
        Self {
            profiles: vec![
                IndustryProfile::new(
                    IndustryTag::FinancialServices,
                    &[
                        "bank",
                        "finance",
                        "financial services",
                        "insurance",
                        "fund management",
                        "asset management",
                        "wealth management",
                        "securities",
                        "brokerage",
                        "money lending",
                        "lending",
                        "credit",
                        "payment services",
                        "remittance",
                        "fintech",
                        "capital markets",
                    ],
                ),
                IndustryProfile::new(
                    IndustryTag::RealEstate,
                    &[
                        "real estate",
                        "property development",
                        "property investment",
                        "property management",
                        "properties",
                        "realty",
                        "reit",
                        "landlord",
                        "letting of",
                        "rental of commercial",
                    ],
                ),
                IndustryProfile::new(
                    IndustryTag::Manufacturing,
                    &[
                        "manufactur",
                        "factory",
                        "fabricat",
                        "production of",
                        "assembly of",
                        "industrial",
                        "machining",
                        "semiconductor",
                        "chemicals",
                        "processing plant",
                    ],
                ),
                IndustryProfile::new(
                    IndustryTag::Retail,
                    &[
                        "retail",
                        "supermarket",
                        "e-commerce",
                        "ecommerce",
                        "online store",
                        "boutique",
                        "convenience store",
                        "department store",
                        "outlet",
                        "shop",
                    ],
                ),
            ],
            match_word_starts: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub validation: ValidationConfig,
    pub ratios: RatioConfig,
    pub industry: IndustryConfig,
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading engine configuration from {}", path.as_ref().display());
        Self::from_json_str(&raw)
    }

    /// Rejects settings the engine cannot honour.
    pub fn check(&self) -> Result<()> {
        let tolerance = self.validation.tolerance_ratio;
        if !tolerance.is_finite() || !(0.0..1.0).contains(&tolerance) {
            return Err(StatementError::InvalidConfig(format!(
                "toleranceRatio {} must be within [0, 1)",
                tolerance
            )));
        }

        let fraction = self.ratios.cogs_revenue_fraction;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(StatementError::InvalidConfig(format!(
                "cogsRevenueFraction {} must be within [0, 1]",
                fraction
            )));
        }

        if self.ratios.days_in_year <= 0.0 {
            return Err(StatementError::InvalidConfig(format!(
                "daysInYear {} must be positive",
                self.ratios.days_in_year
            )));
        }

        if !(0..=10).contains(&self.ratios.decimal_places) {
            return Err(StatementError::InvalidConfig(format!(
                "decimalPlaces {} must be between 0 and 10",
                self.ratios.decimal_places
            )));
        }

        for profile in &self.industry.profiles {
            if profile.tag == IndustryTag::Generic {
                return Err(StatementError::InvalidConfig(
                    "the generic industry is the fallback and cannot carry keywords".to_string(),
                ));
            }
            if profile.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(StatementError::InvalidConfig(format!(
                    "industry profile {} has an empty keyword",
                    profile.tag
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.validation.tolerance_ratio, 0.001);
        assert!(!config.validation.reject_zero_total_assets);
        assert_eq!(config.ratios.cogs_revenue_fraction, 0.7);
        assert_eq!(
            config
                .industry
                .profiles
                .iter()
                .map(|p| p.tag)
                .collect::<Vec<_>>(),
            vec![
                IndustryTag::FinancialServices,
                IndustryTag::RealEstate,
                IndustryTag::Manufacturing,
                IndustryTag::Retail
            ]
        );
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"validation": {"enforceComponentSums": true}}"#)
                .unwrap();
        assert!(config.validation.enforce_component_sums);
        assert_eq!(config.validation.tolerance_ratio, 0.001);
        assert_eq!(config.ratios.days_in_year, 365.0);
        assert_eq!(config.industry.profiles.len(), 4);
    }

    #[test]
    fn test_custom_industry_tables() {
        let config = EngineConfig::from_json_str(
            r#"{"industry": {"profiles": [{"tag": "retail", "keywords": ["bubble tea"]}]}}"#,
        )
        .unwrap();
        assert_eq!(config.industry.profiles.len(), 1);
        assert_eq!(config.industry.profiles[0].tag, IndustryTag::Retail);
        assert!(!config.industry.match_word_starts);

        let config = EngineConfig::from_json_str(r#"{"industry": {"matchWordStarts": true}}"#).unwrap();
        assert!(config.industry.match_word_starts);
        assert_eq!(config.industry.profiles.len(), 4);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = EngineConfig::from_json_str(r#"{"validation": {"toleranceRatio": 1.5}}"#);
        assert!(matches!(result, Err(StatementError::InvalidConfig(_))));

        let result = EngineConfig::from_json_str(r#"{"ratios": {"cogsRevenueFraction": -0.1}}"#);
        assert!(matches!(result, Err(StatementError::InvalidConfig(_))));

        let result = EngineConfig::from_json_str(
            r#"{"industry": {"profiles": [{"tag": "generic", "keywords": ["x"]}]}}"#,
        );
        assert!(matches!(result, Err(StatementError::InvalidConfig(_))));

        let result = EngineConfig::from_json_str("not json");
        assert!(matches!(result, Err(StatementError::SerializationError(_))));
    }
}
