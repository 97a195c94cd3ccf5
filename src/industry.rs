use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::IndustryConfig;
use crate::schema::StatementEnvelope;
use crate::utils::{get_path, text_at, walk, WalkControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndustryTag {
    FinancialServices,
    RealEstate,
    Manufacturing,
    Retail,
    Generic,
}

impl IndustryTag {
    pub const ALL: [IndustryTag; 5] = [
        IndustryTag::FinancialServices,
        IndustryTag::RealEstate,
        IndustryTag::Manufacturing,
        IndustryTag::Retail,
        IndustryTag::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndustryTag::FinancialServices => "financial-services",
            IndustryTag::RealEstate => "real-estate",
            IndustryTag::Manufacturing => "manufacturing",
            IndustryTag::Retail => "retail",
            IndustryTag::Generic => "generic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IndustryTag::FinancialServices => "Financial Services",
            IndustryTag::RealEstate => "Real Estate",
            IndustryTag::Manufacturing => "Manufacturing",
            IndustryTag::Retail => "Retail",
            IndustryTag::Generic => "General Business",
        }
    }
}

impl fmt::Display for IndustryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The balance-sheet signals the classifier falls back on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheetShape {
    pub fair_value_financial_assets: f64,
    pub investment_properties: f64,
    pub inventories: f64,
    pub property_plant_and_equipment: f64,
}

impl BalanceSheetShape {
    pub fn from_statement(statement: &StatementEnvelope) -> Self {
        let mut shape = BalanceSheetShape::default();
        match statement {
            StatementEnvelope::CurrentNonCurrent(bs) => {
                let current = &bs.assets.current_assets;
                let non_current = &bs.assets.non_current_assets;
                let lines = [
                    (
                        "currentFinancialAssetsMeasuredAtFairValueThroughProfitOrLoss",
                        current.current_financial_assets_measured_at_fair_value_through_profit_or_loss,
                    ),
                    (
                        "nonCurrentFinancialAssetsMeasuredAtFairValueThroughProfitOrLoss",
                        non_current.non_current_financial_assets_measured_at_fair_value_through_profit_or_loss,
                    ),
                    ("inventories", current.inventories),
                    ("investmentProperties", non_current.investment_properties),
                    ("propertyPlantAndEquipment", non_current.property_plant_and_equipment),
                ];
                for (key, amount) in lines {
                    if let Some(amount) = amount {
                        shape.absorb(key, amount);
                    }
                }
            }
            StatementEnvelope::OrderOfLiquidity(bs) => {
                for (key, value) in &bs.assets.line_items {
                    if let Some(amount) = value.as_f64() {
                        shape.absorb(key, amount);
                    }
                }
            }
            _ => {}
        }
        shape
    }

    /// Reads the shape from a statement or filing document. Only the asset
    /// side is inspected.
    pub fn from_value(document: &Value) -> Self {
        let target = get_path(document, &["statementOfFinancialPosition"]).unwrap_or(document);
        let mut shape = BalanceSheetShape::default();

        walk(target, &mut |path, _, node| {
            match path.last_key() {
                Some("liabilities" | "equity" | "incomeStatement" | "notes") => {
                    return WalkControl::SkipChildren
                }
                Some(key) => {
                    if let Some(amount) = node.as_f64() {
                        shape.absorb(key, amount);
                    }
                }
                None => {}
            }
            WalkControl::Continue
        });

        shape
    }

    fn absorb(&mut self, key: &str, amount: f64) {
        if key.contains("FairValueThroughProfitOrLoss") || key.contains("FairValueThroughOtherComprehensiveIncome") {
            self.fair_value_financial_assets += amount;
        } else if key == "investmentProperties" {
            self.investment_properties += amount;
        } else if key == "inventories" {
            self.inventories += amount;
        } else if key == "propertyPlantAndEquipment" {
            self.property_plant_and_equipment += amount;
        }
    }

    /// Fallback order: fair-value holdings, investment property, inventories
    /// with plant, inventories alone.
    pub fn suggests(&self) -> Option<IndustryTag> {
        if self.fair_value_financial_assets != 0.0 {
            Some(IndustryTag::FinancialServices)
        } else if self.investment_properties != 0.0 {
            Some(IndustryTag::RealEstate)
        } else if self.inventories != 0.0 && self.property_plant_and_equipment != 0.0 {
            Some(IndustryTag::Manufacturing)
        } else if self.inventories != 0.0 {
            Some(IndustryTag::Retail)
        } else {
            None
        }
    }
}

pub struct IndustryClassifier {
    profiles: Vec<(IndustryTag, Vec<Regex>)>,
}

impl IndustryClassifier {
    pub fn new(config: &IndustryConfig) -> Self {
        let profiles = config
            .profiles
            .iter()
            .map(|profile| {
                let patterns = profile
                    .keywords
                    .iter()
                    .filter_map(|keyword| {
                        let escaped = regex::escape(&keyword.trim().to_lowercase());
                        let pattern = if config.match_word_starts {
                            format!(r"\b{}", escaped)
                        } else {
                            escaped
                        };
                        match Regex::new(&pattern) {
                            Ok(re) => Some(re),
                            Err(e) => {
                                log::warn!("Skipping industry keyword '{}': {}", keyword, e);
                                None
                            }
                        }
                    })
                    .collect();
                (profile.tag, patterns)
            })
            .collect();
        Self { profiles }
    }

    /// First profile with a keyword in the text, in configured order.
    pub fn classify_text(&self, principal_activities: &str) -> Option<IndustryTag> {
        let text = principal_activities.to_lowercase();
        self.profiles
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&text)))
            .map(|(tag, _)| *tag)
    }

    pub fn classify_text_and_shape(
        &self,
        principal_activities: Option<&str>,
        shape: &BalanceSheetShape,
    ) -> IndustryTag {
        let tag = principal_activities
            .and_then(|text| self.classify_text(text))
            .or_else(|| shape.suggests())
            .unwrap_or(IndustryTag::Generic);
        log::debug!("Classified entity as {}", tag);
        tag
    }

    pub fn classify_statement(&self, statement: &StatementEnvelope) -> IndustryTag {
        self.classify_text_and_shape(
            statement.principal_activities(),
            &BalanceSheetShape::from_statement(statement),
        )
    }

    /// Classifies a statement or filing document. The activities text is read
    /// from `filingInformation`, the balance sheet, or the document root.
    pub fn classify_filing(&self, document: &Value) -> IndustryTag {
        let text = text_at(document, &["filingInformation", "principalActivities"])
            .or_else(|| text_at(document, &["statementOfFinancialPosition", "principalActivities"]))
            .or_else(|| text_at(document, &["principalActivities"]));
        self.classify_text_and_shape(text, &BalanceSheetShape::from_value(document))
    }
}

impl Default for IndustryClassifier {
    fn default() -> Self {
        Self::new(&IndustryConfig::default())
    }
}

/// Classifies with the default keyword tables.
pub fn classify(principal_activities: Option<&str>, shape: &BalanceSheetShape) -> IndustryTag {
    IndustryClassifier::default().classify_text_and_shape(principal_activities, shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndustryProfile;
    use serde_json::json;

    fn text(activities: &str) -> IndustryTag {
        classify(Some(activities), &BalanceSheetShape::default())
    }

    #[test]
    fn test_keyword_matches() {
        assert_eq!(text("Licensed money lending"), IndustryTag::FinancialServices);
        assert_eq!(text("Development of residential REIT assets"), IndustryTag::RealEstate);
        assert_eq!(text("Manufacturing of precision components"), IndustryTag::Manufacturing);
        assert_eq!(text("Operation of supermarkets"), IndustryTag::Retail);
        assert_eq!(text("Management consultancy"), IndustryTag::Generic);
    }

    #[test]
    fn test_keyword_priority_order() {
        // Mentions both a bank and property development; financial services wins.
        assert_eq!(
            text("Bank holding company with property development arm"),
            IndustryTag::FinancialServices
        );
        assert_eq!(
            text("Retail of goods produced in our own factory"),
            IndustryTag::Manufacturing
        );
    }

    #[test]
    fn test_keywords_match_anywhere_by_default() {
        assert_eq!(text("Motor workshop services"), IndustryTag::Retail);
        assert_eq!(text("Coffee SHOP"), IndustryTag::Retail);
        assert_eq!(text("Riverbank holdings"), IndustryTag::FinancialServices);
    }

    #[test]
    fn test_word_start_matching_is_opt_in() {
        let classifier = IndustryClassifier::new(&IndustryConfig {
            match_word_starts: true,
            ..IndustryConfig::default()
        });
        assert_eq!(classifier.classify_text("Motor workshop services"), None);
        assert_eq!(classifier.classify_text("Riverbank holdings"), None);
        assert_eq!(classifier.classify_text("Coffee shop"), Some(IndustryTag::Retail));
    }

    #[test]
    fn test_shape_fallback_order() {
        let shape = |fv: f64, ip: f64, inv: f64, ppe: f64| BalanceSheetShape {
            fair_value_financial_assets: fv,
            investment_properties: ip,
            inventories: inv,
            property_plant_and_equipment: ppe,
        };
        assert_eq!(classify(None, &shape(1.0, 1.0, 1.0, 1.0)), IndustryTag::FinancialServices);
        assert_eq!(classify(None, &shape(0.0, 5.0, 1.0, 1.0)), IndustryTag::RealEstate);
        assert_eq!(classify(None, &shape(0.0, 0.0, 1.0, 1.0)), IndustryTag::Manufacturing);
        assert_eq!(classify(None, &shape(0.0, 0.0, 1.0, 0.0)), IndustryTag::Retail);
        assert_eq!(classify(None, &shape(0.0, 0.0, 0.0, 9.0)), IndustryTag::Generic);
        assert_eq!(classify(Some(""), &BalanceSheetShape::default()), IndustryTag::Generic);
    }

    #[test]
    fn test_shape_from_documents() {
        let doc = json!({
            "assets": {
                "currentAssets": {"inventories": 20.0, "totalCurrentAssets": 20.0},
                "nonCurrentAssets": {"propertyPlantAndEquipment": 50.0, "totalNonCurrentAssets": 50.0},
                "totalAssets": 70.0
            },
            "liabilities": {"inventories": 999.0}
        });
        let shape = BalanceSheetShape::from_value(&doc);
        assert_eq!(shape.inventories, 20.0);
        assert_eq!(shape.property_plant_and_equipment, 50.0);
        assert_eq!(shape.suggests(), Some(IndustryTag::Manufacturing));

        let liquidity = json!({
            "statementOfFinancialPosition": {
                "assets": {"totalAssets": 10.0, "financialAssetsAtFairValueThroughProfitOrLoss": 4.0}
            }
        });
        assert_eq!(
            IndustryClassifier::default().classify_filing(&liquidity),
            IndustryTag::FinancialServices
        );
    }

    #[test]
    fn test_classify_typed_statement() {
        let statement: StatementEnvelope = serde_json::from_value(json!({
            "statementType": "orderOfLiquidity",
            "consolidatedAndSeparate": "Consolidated",
            "principalActivities": "Investment holding",
            "assets": {"totalAssets": 100.0, "investmentProperties": 80.0, "cashAndBankBalances": 20.0},
            "liabilities": {"totalLiabilities": 40.0},
            "equity": {"shareCapital": 60.0, "accumulatedProfitsLosses": 0.0, "totalEquity": 60.0}
        }))
        .unwrap();
        assert_eq!(
            IndustryClassifier::default().classify_statement(&statement),
            IndustryTag::RealEstate
        );
    }

    #[test]
    fn test_injected_tables() {
        let config = IndustryConfig {
            profiles: vec![IndustryProfile::new(IndustryTag::Retail, &["bubble tea"])],
            ..IndustryConfig::default()
        };
        let classifier = IndustryClassifier::new(&config);
        assert_eq!(classifier.classify_text("Bubble Tea kiosks"), Some(IndustryTag::Retail));
        assert_eq!(classifier.classify_text("Commercial bank"), None);
    }

    #[test]
    fn test_tag_serialization() {
        for tag in IndustryTag::ALL {
            assert_eq!(serde_json::to_value(tag).unwrap(), json!(tag.as_str()));
        }
    }
}
