//! Runs the whole pipeline over two in-memory banks and prints the result.
//!
//! `RUST_LOG=debug cargo run --example pipeline` shows every stage.

use bank_wrangler::{Fetched, Pipeline, StaticPayload, StaticSource, StaticTransaction};
use indoc::indoc;
use tracing_subscriber::EnvFilter;

fn transaction(from: &str, to: &str, date: &str, description: &str, amount: &str) -> StaticTransaction {
    StaticTransaction {
        from: from.into(),
        to: to.into(),
        date: date.into(),
        description: description.into(),
        amount: amount.into(),
    }
}

fn bank(name: &str, accounts: &[&str], transactions: Vec<StaticTransaction>) -> anyhow::Result<Fetched> {
    let payload = StaticPayload {
        accounts: accounts.iter().map(|a| a.to_string()).collect(),
        transactions,
        ..StaticPayload::default()
    };
    let source = StaticSource::from_payload(name, &payload)?;
    let raw = serde_json::to_vec(&payload)?;
    Ok(Fetched::new(source, raw))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let sources = vec![
        bank(
            "citizens",
            &["checking", "savings"],
            vec![
                transaction("employer", "checking", "2018/03/01", "ACME PAYROLL", "2400.00"),
                transaction("checking", "savings", "2018/03/02", "TRANSFER TO SAV", "500.00"),
                transaction("checking", "venmo", "2018/03/03", "VENMO CASHOUT", "40.00"),
                transaction("checking", "landlord", "2018/03/04", "RENT MARCH", "1100.00"),
            ],
        )?,
        bank(
            "venmo",
            &["venmo"],
            vec![
                transaction("checking", "venmo", "2018/03/03", "Transfer from bank", "40.00"),
                transaction("venmo", "alex", "2018/03/05", "pizza", "18.50"),
            ],
        )?,
    ];

    let output = Pipeline::builder()
        .sources(sources)
        .category_rules(indoc!(
            r#"
            description ~~ "PAYROLL", category = "Income"
            description ~~ "^RENT", category = "Housing"
            description ~~ "(?i)pizza|grocer", category = "Food"
            to == "savings", category = "Savings"
            to == "venmo", category = "Transfers"
            "#
        ))
        .build()
        .run()?;

    for error in &output.categories.errors {
        eprintln!("rules: {}", error);
    }
    for diagnostic in &output.categories.diagnostics {
        eprintln!("rules: {}", diagnostic);
    }
    output.render_table(&mut std::io::stdout())?;
    Ok(())
}
