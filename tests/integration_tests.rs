use acra_statements::*;
use serde_json::{json, Value};

fn balance_sheet(total_equity: f64) -> Value {
    json!({
        "statementType": "currentNonCurrent",
        "consolidatedAndSeparate": "Consolidated",
        "periodDate": "2023-12-31",
        "uniqueEntityNumber": "201912345K",
        "principalActivities": "Manufacture of industrial fasteners",
        "assets": {
            "currentAssets": {
                "cashAndBankBalances": 385_156.0,
                "tradeAndOtherReceivablesCurrent": 150_000.0,
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
                "tradeAndOtherPayablesCurrent": 253_000.0,
                "currentLoansAndBorrowings": 100_000.0,
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

fn income_statement() -> Value {
    json!({
        "statementType": "incomeStatement",
        "consolidatedAndSeparate": "Consolidated",
        "periodDate": "2023-12-31",
        "revenue": 2_400_000.0,
        "employeeBenefitsExpense": 600_000.0,
        "depreciationExpense": 80_000.0,
        "financeCosts": 18_000.0,
        "profitLossBeforeTaxation": 210_000.0,
        "incomeTaxExpenseBenefit": 35_700.0,
        "profitLoss": 174_300.0
    })
}

fn minimal_valid(tag: &str) -> Value {
    match tag {
        "currentNonCurrent" => balance_sheet(1_282_156.0),
        "orderOfLiquidity" => json!({
            "statementType": "orderOfLiquidity",
            "consolidatedAndSeparate": "Separate",
            "assets": {"totalAssets": 500.0, "cashAndBankBalances": 500.0},
            "liabilities": {"totalLiabilities": 100.0},
            "equity": {"shareCapital": 400.0, "accumulatedProfitsLosses": 0.0, "totalEquity": 400.0}
        }),
        "incomeStatement" => income_statement(),
        "tradeAndOtherReceivablesNote" => json!({
            "statementType": "tradeAndOtherReceivablesNote",
            "consolidatedAndSeparate": "Separate",
            "tradeReceivablesDueFromThirdParties": 150_000.0,
            "totalTradeAndOtherReceivables": 150_000.0
        }),
        "tradeAndOtherPayablesNote" => json!({
            "statementType": "tradeAndOtherPayablesNote",
            "consolidatedAndSeparate": "Separate",
            "totalTradeAndOtherPayables": 253_000.0
        }),
        "revenueNote" => json!({
            "statementType": "revenueNote",
            "consolidatedAndSeparate": "Separate",
            "revenueFromGoodsTransferredAtPointInTime": 2_400_000.0,
            "totalRevenue": 2_400_000.0
        }),
        other => panic!("no fixture for {}", other),
    }
}

#[test]
fn test_balanced_balance_sheet_is_accepted() {
    let result = validate(&balance_sheet(1_282_156.0));
    assert!(result.is_success(), "errors: {:?}", result.errors());
    match result.data() {
        Some(StatementEnvelope::CurrentNonCurrent(bs)) => {
            assert_eq!(bs.assets.total_assets, 1_835_156.0);
            assert_eq!(bs.header.unique_entity_number.as_deref(), Some("201912345K"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_unbalanced_balance_sheet_is_rejected() {
    let result = validate(&balance_sheet(1_200_000.0));
    assert!(!result.is_success());
    let message = &result.errors()[0].message;
    assert!(message.contains("not balanced"), "{}", message);

    match Validator::default().parse(&balance_sheet(1_200_000.0)) {
        Err(StatementError::AccountingEquationViolation {
            difference,
            tolerance,
            ..
        }) => {
            assert!((difference - 82_156.0).abs() < 1e-6);
            assert!((tolerance - 1_835.156).abs() < 1e-6);
        }
        other => panic!("expected an equation violation, got {:?}", other),
    }
}

#[test]
fn test_missing_profit_before_tax_is_reported_by_path() {
    let mut candidate = income_statement();
    candidate
        .as_object_mut()
        .unwrap()
        .remove("profitLossBeforeTaxation");

    let result = validate(&candidate);
    assert!(!result.is_success());
    assert!(result
        .errors()
        .iter()
        .any(|e| e.path == "profitLossBeforeTaxation"));
}

#[test]
fn test_financial_statements_view() {
    let statement = validate(&balance_sheet(1_282_156.0)).into_result().unwrap();
    let view = FrameworkProjector::default().project_statement(&statement, "financial-statements");

    let mut keys: Vec<&str> = view.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "_frameworkMetadata",
            "filingInformation",
            "incomeStatement",
            "notes",
            "statementOfCashFlows",
            "statementOfChangesInEquity",
            "statementOfFinancialPosition",
        ]
    );
    assert_eq!(view["_frameworkMetadata"]["name"], json!("Financial Statements"));
    assert_eq!(view["filingInformation"]["uniqueEntityNumber"], json!("201912345K"));
    assert!(view["filingInformation"].get("principalActivities").is_none());
    assert_eq!(
        view["statementOfFinancialPosition"]["assets"]["totalAssets"],
        json!(1_835_156.0)
    );
}

#[test]
fn test_every_statement_type_validates_into_its_variant() {
    for statement_type in StatementType::ALL {
        let result = validate(&minimal_valid(statement_type.tag()));
        assert!(
            result.is_success(),
            "{} failed: {:?}",
            statement_type,
            result.errors()
        );
        assert_eq!(result.data().unwrap().statement_type(), statement_type);
    }

    let result = validate(&json!({"statementType": "statementOfCashFlows"}));
    assert_eq!(result.errors()[0].path, "statementType");
}

#[test]
fn test_projection_is_idempotent_and_leaves_input_untouched() -> anyhow::Result<()> {
    let statements = vec![
        Validator::default().parse(&balance_sheet(1_282_156.0))?,
        Validator::default().parse(&income_statement())?,
    ];
    let filing = assemble_filing(&statements, None)?;
    let snapshot = filing.clone();
    let projector = FrameworkProjector::default();

    for descriptor in framework_catalog() {
        let first = projector.project(&filing, &descriptor.id);
        let second = projector.project(&filing, &descriptor.id);
        assert_eq!(first, second, "{} is not idempotent", descriptor.id);
        assert_eq!(first["_frameworkMetadata"]["name"], json!(descriptor.name));
        assert_eq!(filing, snapshot, "{} modified its input", descriptor.id);
    }
    Ok(())
}

#[test]
fn test_projection_of_partial_documents_degrades_to_nulls() {
    let projector = FrameworkProjector::default();
    let partial = json!({"incomeStatement": {"revenue": "pending"}});
    for descriptor in framework_catalog() {
        let view = projector.project(&partial, &descriptor.id);
        assert_ne!(
            view["_frameworkMetadata"]["name"],
            json!("Error Processing Framework"),
            "{} failed on partial input",
            descriptor.id
        );
    }
    let simplified = projector.project(&partial, "simplified");
    assert_eq!(simplified["balanceSheet"]["totalAssets"], Value::Null);
    assert_eq!(simplified["keyMetrics"]["netProfitMargin"], Value::Null);
}

#[test]
fn test_regulatory_reporting_presentation_order() -> anyhow::Result<()> {
    let view = process_statement(&balance_sheet(1_282_156.0), "regulatory-reporting")?;
    let ordered: Vec<&str> = view["statementOfFinancialPosition"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .skip_while(|k| *k != "currentAssets")
        .collect();
    assert_eq!(
        ordered,
        vec![
            "currentAssets",
            "nonCurrentAssets",
            "totalAssets",
            "currentLiabilities",
            "nonCurrentLiabilities",
            "totalLiabilities",
            "equity"
        ]
    );
    assert_eq!(
        view["statementOfFinancialPosition"]["currentLiabilities"]["totalCurrentLiabilities"],
        json!(353_000.0)
    );
    Ok(())
}

#[test]
fn test_ratios_from_validated_statements() -> anyhow::Result<()> {
    let processor = StatementProcessor::default();
    let statements = vec![
        processor.validator().parse(&balance_sheet(1_282_156.0))?,
        processor.validator().parse(&income_statement())?,
    ];
    let ratios = processor.ratios(&statements);

    assert_eq!(ratios.liquidity.current_ratio, Some(2.3659));
    assert_eq!(ratios.solvency.debt_to_equity, Some(0.4313));
    assert_eq!(ratios.profitability.net_profit_margin, Some(0.0726));
    assert_eq!(ratios.efficiency.receivables_days, Some(22.8125));

    let interest_cover = ratios.estimated.interest_coverage.unwrap();
    assert!(interest_cover.is_estimate);
    assert_eq!(interest_cover.value, 12.6667);
    Ok(())
}

#[test]
fn test_ratios_never_divide_by_zero() {
    let statement = validate(&minimal_valid("orderOfLiquidity")).into_result().unwrap();
    let ratios = RatioCalculator::default().calculate_for_statements(&[statement]);
    assert_eq!(ratios.liquidity.current_ratio, None);
    assert_eq!(ratios.profitability.return_on_equity, None);
    assert_eq!(ratios.estimated.inventory_turnover, None);

    let text = serde_json::to_string(&ratios).unwrap();
    assert!(!text.contains("Infinity") && !text.contains("NaN"));
}

#[test]
fn test_component_sum_discrepancies_are_reported() {
    let mut candidate = balance_sheet(1_282_156.0);
    candidate["liabilities"]["currentLiabilities"]["currentLoansAndBorrowings"] = json!(90_000.0);

    let statement = validate(&candidate).into_result().unwrap();
    let discrepancies = AccountingBalancer::new(0.001).check_component_sums(&statement);
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(
        discrepancies[0].path,
        "liabilities.currentLiabilities.totalCurrentLiabilities"
    );
    assert_eq!(discrepancies[0].computed, 343_000.0);

    let strict = EngineConfig::from_json_str(r#"{"validation": {"enforceComponentSums": true}}"#).unwrap();
    let result = Validator::with_config(strict.validation).validate(&candidate);
    assert!(!result.is_success());
}

#[test]
fn test_industry_views_use_activities_and_shape() -> anyhow::Result<()> {
    let view = process_statement(&balance_sheet(1_282_156.0), "industry-specific")?;
    assert_eq!(view["industry"]["tag"], json!("manufacturing"));
    assert_eq!(view["_frameworkMetadata"]["industry"], json!("manufacturing"));

    let mut retail = minimal_valid("orderOfLiquidity");
    retail["assets"]["inventories"] = json!(200.0);
    retail["assets"]["cashAndBankBalances"] = json!(300.0);
    let view = process_statement(&retail, "business-profile")?;
    assert_eq!(view["industry"]["tag"], json!("retail"));
    assert_eq!(view["industry"]["label"], json!("Retail"));
    Ok(())
}

#[test]
fn test_process_filing_and_validate_filing() -> anyhow::Result<()> {
    let processor = StatementProcessor::default();
    let info = FilingInformation {
        name_of_company: Some("Kallang Fasteners Pte. Ltd.".to_string()),
        ..FilingInformation::default()
    };
    let view = processor.process_filing(
        &[balance_sheet(1_282_156.0), income_statement(), minimal_valid("revenueNote")],
        Some(info),
        "analytical",
    )?;
    assert_eq!(view["summary"]["revenue"], json!(2_400_000.0));
    assert_eq!(view["ratios"]["estimated"]["costOfGoodsSold"]["value"], json!(1_680_000.0));

    let result = processor.process_filing(&[balance_sheet(1_200_000.0)], None, "analytical");
    assert!(matches!(
        result,
        Err(StatementError::AccountingEquationViolation { .. })
    ));

    let statements = vec![
        processor.validator().parse(&balance_sheet(1_282_156.0))?,
        processor.validator().parse(&income_statement())?,
    ];
    let mut filing = assemble_filing(&statements, None)?;
    filing["incomeStatement"]["revenue"] = json!("2.4m");
    let results = processor.validate_filing(&filing);
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_success());
    assert_eq!(results[1].0, "incomeStatement");
    assert_eq!(results[1].1.errors()[0].path, "revenue");
    Ok(())
}

#[test]
fn test_declared_defaults_then_validation() {
    let filled = apply_declared_defaults(&minimal_valid("tradeAndOtherPayablesNote"));
    assert_eq!(filled.value["otherPayables"], json!(0.0));
    let result = validate(&filled.value);
    assert!(result.is_success());
}

#[test]
fn test_response_schema_is_self_contained() {
    for statement_type in StatementType::ALL {
        let schema = statement_type.response_schema().unwrap();
        assert!(!schema.to_string().contains("$ref"));
        assert_eq!(schema["type"], json!("object"));
    }
}

fn without(document: &Value, path: &str) -> Value {
    let mut copy = document.clone();
    let (parent, field) = match path.rsplit_once('.') {
        Some((parent, field)) => (parent.split('.').collect::<Vec<_>>(), field),
        None => (Vec::new(), path),
    };
    let target = parent
        .iter()
        .try_fold(&mut copy, |node, key| node.get_mut(*key))
        .and_then(Value::as_object_mut)
        .unwrap_or_else(|| panic!("fixture has no {}", path));
    assert!(target.remove(field).is_some(), "fixture has no {}", path);
    copy
}

#[test]
fn test_each_missing_required_field_is_reported_at_its_path() {
    let cases: &[(&str, &[&str])] = &[
        (
            "currentNonCurrent",
            &[
                "consolidatedAndSeparate",
                "assets",
                "assets.currentAssets",
                "assets.currentAssets.totalCurrentAssets",
                "assets.nonCurrentAssets",
                "assets.nonCurrentAssets.totalNonCurrentAssets",
                "assets.totalAssets",
                "liabilities",
                "liabilities.currentLiabilities",
                "liabilities.currentLiabilities.totalCurrentLiabilities",
                "liabilities.nonCurrentLiabilities",
                "liabilities.nonCurrentLiabilities.totalNonCurrentLiabilities",
                "liabilities.totalLiabilities",
                "equity",
                "equity.shareCapital",
                "equity.accumulatedProfitsLosses",
                "equity.totalEquity",
            ],
        ),
        (
            "orderOfLiquidity",
            &[
                "consolidatedAndSeparate",
                "assets",
                "assets.totalAssets",
                "liabilities",
                "liabilities.totalLiabilities",
                "equity",
                "equity.shareCapital",
                "equity.accumulatedProfitsLosses",
                "equity.totalEquity",
            ],
        ),
        (
            "incomeStatement",
            &[
                "consolidatedAndSeparate",
                "revenue",
                "profitLossBeforeTaxation",
                "incomeTaxExpenseBenefit",
            ],
        ),
        (
            "tradeAndOtherReceivablesNote",
            &["consolidatedAndSeparate", "totalTradeAndOtherReceivables"],
        ),
        (
            "tradeAndOtherPayablesNote",
            &["consolidatedAndSeparate", "totalTradeAndOtherPayables"],
        ),
        ("revenueNote", &["consolidatedAndSeparate", "totalRevenue"]),
    ];

    for (tag, required) in cases {
        let fixture = minimal_valid(tag);
        assert!(validate(&fixture).is_success(), "{} fixture should be valid", tag);
        for path in *required {
            let result = validate(&without(&fixture, path));
            assert!(!result.is_success(), "{} without {} was accepted", tag, path);
            let paths: Vec<&str> = result.errors().iter().map(|e| e.path.as_str()).collect();
            assert_eq!(paths, vec![*path], "{} without {}", tag, path);
        }
    }
}

#[test]
fn test_regulatory_reporting_carries_liquidity_line_items() -> anyhow::Result<()> {
    let view = process_statement(&minimal_valid("orderOfLiquidity"), "regulatory-reporting")?;
    let sofp = &view["statementOfFinancialPosition"];
    assert_eq!(sofp["assetLineItems"]["cashAndBankBalances"], json!(500.0));
    assert_eq!(sofp["totalAssets"], json!(500.0));
    assert_eq!(sofp["totalLiabilities"], json!(100.0));
    Ok(())
}

#[test]
fn test_keywords_match_inside_words() {
    let classifier = IndustryClassifier::default();
    assert_eq!(
        classifier.classify_text("Motor workshop services"),
        Some(IndustryTag::Retail)
    );
}

#[test]
fn test_normalised_income_statement_keeps_its_ratios() -> anyhow::Result<()> {
    let raw = Validator::default().parse(&json!({
        "statementType": "incomeStatement",
        "consolidatedAndSeparate": "Separate",
        "revenue": 100.0,
        "profitLossBeforeTaxation": 20.0,
        "incomeTaxExpenseBenefit": 3.0
    }))?;
    let normalised = with_declared_defaults(&raw)?;
    let calculator = RatioCalculator::default();
    let before = calculator.calculate_for_statements(&[raw]);
    let after = calculator.calculate_for_statements(&[normalised]);
    assert_eq!(after.profitability.net_profit_margin, Some(0.17));
    assert_eq!(after, before);
    Ok(())
}

#[test]
fn test_padded_period_date_is_reported_at_its_path() {
    let mut statement = income_statement();
    statement["periodDate"] = json!("2023-12-31 ");
    let result = validate(&statement);
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].path, "periodDate");
}
