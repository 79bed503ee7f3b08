use bank_wrangler::schema::{BANK, CATEGORY, DESCRIPTION, FROM, TO};
use bank_wrangler::{
    account_flows, Diagnostic, Entry, Error, Fetched, Pipeline, SchemaError, StaticPayload, StaticSource,
    StaticTransaction, TransactionStore,
};
use indoc::indoc;
use serde_json::Value;

fn transaction(from: &str, to: &str, date: &str, description: &str, amount: &str) -> StaticTransaction {
    StaticTransaction {
        from: from.to_string(),
        to: to.to_string(),
        date: date.to_string(),
        description: description.to_string(),
        amount: amount.to_string(),
    }
}

fn fetched(name: &str, accounts: &[&str], transactions: Vec<StaticTransaction>) -> anyhow::Result<Fetched> {
    let payload = StaticPayload {
        accounts: accounts.iter().map(|a| a.to_string()).collect(),
        transactions,
        ..StaticPayload::default()
    };
    let source = StaticSource::from_payload(name, &payload)?;
    let raw = serde_json::to_vec(&payload)?;
    Ok(Fetched::new(source, raw))
}

/// A checking account at one bank and a credit card at another, paid off
/// from checking. The card bank only knows the payment came from "ACH
/// PAYMENT", which the first rules pass renames.
fn two_banks() -> anyhow::Result<Vec<Fetched>> {
    Ok(vec![
        fetched(
            "citizens",
            &["checking"],
            vec![
                transaction("employer", "checking", "2017/01/01", "PAYROLL", "1000.00"),
                transaction("checking", "visa", "2017/01/05", "CARD PAYMENT", "200.00"),
                transaction("checking", "landlord", "2017/01/06", "RENT", "700.00"),
            ],
        )?,
        fetched(
            "fidelity-visa",
            &["visa"],
            vec![
                transaction("visa", "Whole Foods", "2017/01/02", "WHOLE FOODS #12", "80.00"),
                transaction("ACH PAYMENT", "visa", "2017/01/05", "THANK YOU", "200.00"),
            ],
        )?,
    ])
}

fn column<'s>(store: &'s TransactionStore, name: &str) -> Vec<&'s str> {
    store
        .iter()
        .map(|row| store.field(row, name).unwrap().as_str().unwrap())
        .collect()
}

#[test]
fn full_pipeline() -> anyhow::Result<()> {
    let output = Pipeline::builder()
        .sources(two_banks()?)
        .first_pass_rules(r#"from == "ACH PAYMENT", from = "checking""#)
        .category_rules(indoc!(
            r#"
            description ~~ "PAYROLL", category = "Income"
            description ~~ "WHOLE FOODS", category = "Food"
            to == "landlord", category = "Housing"
            from == "checking", to == "visa", category = "Transfers"
            "#
        ))
        .build()
        .run()?;

    assert_eq!(output.ingested.len(), 5);
    assert_eq!(output.deduplicated.len(), 4);
    assert!(output.first_pass.is_clean());
    assert!(output.categories.is_clean());

    let store = &output.categorized;
    assert_eq!(store.columns().names().last(), Some(CATEGORY));
    assert_eq!(
        column(store, BANK),
        vec!["citizens + fidelity-visa", "citizens", "citizens", "fidelity-visa"]
    );
    assert_eq!(
        column(store, DESCRIPTION),
        vec!["CARD PAYMENT + THANK YOU", "PAYROLL", "RENT", "WHOLE FOODS #12"]
    );
    assert_eq!(column(store, CATEGORY), vec!["Transfers", "Income", "Housing", "Food"]);
    Ok(())
}

#[test]
fn flows_of_known_accounts_survive() -> anyhow::Result<()> {
    let output = Pipeline::builder()
        .sources(two_banks()?)
        .first_pass_rules(r#"from == "ACH PAYMENT", from = "checking""#)
        .build()
        .run()?;
    let before = account_flows(&output.rewritten, &output.banks)?;
    let after = account_flows(&output.deduplicated, &output.banks)?;
    assert_eq!(before, after);
    assert_eq!(after["checking"].to_string(), "100.00");
    assert_eq!(after["visa"].to_string(), "120.00");
    Ok(())
}

#[test]
fn without_renaming_the_payment_stays_unmatched() -> anyhow::Result<()> {
    let output = Pipeline::builder().sources(two_banks()?).build().run()?;
    assert_eq!(output.deduplicated.len(), 5);
    assert_eq!(column(&output.deduplicated, TO)[0], "unmatched: visa");
    assert_eq!(column(&output.deduplicated, FROM)[4], "ACH PAYMENT");
    assert!(column(&output.categorized, CATEGORY).iter().all(|c| *c == "Unknown"));
    Ok(())
}

#[test]
fn broken_rule_lines_are_reported_and_skipped() -> anyhow::Result<()> {
    let output = Pipeline::builder()
        .sources(two_banks()?)
        .category_rules(indoc!(
            r#"
            description ~~ "RENT", category = "Housing"
            description ~~ "PAYROLL" category = "Income"
            to = "elsewhere"
            "#
        ))
        .default_category("Uncategorized")
        .build()
        .run()?;
    assert_eq!(output.categories.errors.len(), 2);
    assert!(output.categories.errors[0].is_parse_error());
    assert_eq!(output.categories.errors[0].location.0, 2);
    assert!(!output.categories.errors[1].is_parse_error());

    let categories = column(&output.categorized, CATEGORY);
    assert_eq!(categories.iter().filter(|c| **c == "Housing").count(), 1);
    assert_eq!(categories.iter().filter(|c| **c == "Uncategorized").count(), 4);
    Ok(())
}

#[test]
fn conflicting_categories_are_diagnosed() -> anyhow::Result<()> {
    let output = Pipeline::builder()
        .sources(two_banks()?)
        .category_rules(indoc!(
            r#"
            description ~~ "RENT", category = "P"
            to == "landlord", category = "Q"
            "#
        ))
        .build()
        .run()?;
    assert_eq!(output.categories.diagnostics.len(), 1);
    match &output.categories.diagnostics[0] {
        Diagnostic::Conflict { conflicts, .. } => {
            assert_eq!(conflicts[CATEGORY], vec![Entry::from("P"), Entry::from("Q")]);
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
    assert_eq!(
        output.categories.diagnostics[0].to_string(),
        r#"rules conflict: {category: {"P", "Q"}}"#
    );
    assert!(column(&output.categorized, CATEGORY).iter().all(|c| *c == "Unknown"));
    Ok(())
}

#[test]
fn report_data_lists_every_known_account() -> anyhow::Result<()> {
    let output = Pipeline::builder().sources(two_banks()?).build().run()?;
    let data: Value = serde_json::from_str(&output.data_json()?)?;
    assert_eq!(data["accounts"], serde_json::json!(["checking", "visa"]));
    assert_eq!(data["transactions"].as_array().map(Vec::len), Some(5));

    let mut table = Vec::new();
    output.render_table(&mut table)?;
    let table = String::from_utf8(table)?;
    assert_eq!(table.lines().count(), 6);
    assert!(table.starts_with("bank\tfrom\tto\tdate\tdescription\tamount\tcategory\n"));
    Ok(())
}

#[test]
fn empty_pipeline_is_fine() -> anyhow::Result<()> {
    let output = Pipeline::builder().build().run()?;
    assert!(output.categorized.is_empty());
    assert!(output.banks.is_empty());
    Ok(())
}

#[test]
fn source_errors_stop_the_run() {
    let broken = Fetched::new(StaticSource::new("broken", "{}"), b"not json".to_vec());
    match Pipeline::builder().sources(vec![broken]).build().run() {
        Err(Error::Source(err)) => assert_eq!(err.bank, "broken"),
        other => panic!("expected a source error, got {:?}", other.map(|o| o.ingested.len())),
    }
}

#[test]
fn stores_must_share_the_base_schema() {
    let store = TransactionStore::base()
        .widen(CATEGORY, Entry::from("x"))
        .unwrap();
    let err = TransactionStore::concat(bank_wrangler::ColumnSchema::base(), vec![store]).unwrap_err();
    assert_eq!(err, SchemaError::SchemaMismatch);
}
