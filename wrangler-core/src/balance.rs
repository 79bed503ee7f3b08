use rust_decimal::Decimal;

use super::schema::{AMOUNT, DATE, FROM, TO};
use super::{Date, Dollars, Entry, SchemaError, TransactionStore};

/// The counterparty of balance corrections.
pub const UNIVERSE: &str = "Universe";
pub const BALANCE_CORRECTION: &str = "Balance correction";

/// Net dollars into `account`: incoming amounts count positive, outgoing negative.
pub fn compute_balance(account: &str, transactions: &TransactionStore) -> Result<Decimal, SchemaError> {
    let schema = transactions.columns();
    let from = schema.require(FROM)?;
    let to = schema.require(TO)?;
    let amount = schema.require(AMOUNT)?;

    let mut result = Decimal::ZERO;
    for row in transactions {
        let value = row[amount].as_dollars().map(Decimal::from).unwrap_or_default();
        if row[to].as_str() == Some(account) {
            result += value;
        }
        if row[from].as_str() == Some(account) {
            result -= value;
        }
    }
    Ok(result)
}

fn oldest_date(transactions: &TransactionStore) -> Result<Option<Date>, SchemaError> {
    let date = transactions.columns().require(DATE)?;
    Ok(transactions.iter().filter_map(|row| row[date].as_date()).min())
}

/// Appends a row moving money between [`UNIVERSE`] and `account` so that the
/// account's computed balance equals `real_balance`.
///
/// Banks only report a limited history, so the computed balance of an account
/// can differ from what the bank says it holds. The correction is dated at the
/// oldest transaction, or at `fallback` for an empty store. Returns whether a
/// row was added.
pub fn add_balance_correction(
    bank: &str,
    account: &str,
    real_balance: Decimal,
    transactions: &mut TransactionStore,
    fallback: Date,
) -> Result<bool, SchemaError> {
    let correction = real_balance - compute_balance(account, transactions)?;
    if correction.is_zero() {
        return Ok(false);
    }
    let (from, to) = if correction < Decimal::ZERO {
        (account, UNIVERSE)
    } else {
        (UNIVERSE, account)
    };
    let date = oldest_date(transactions)?.unwrap_or(fallback);
    transactions.ingest_row(vec![
        Entry::from(bank),
        Entry::from(from),
        Entry::from(to),
        Entry::from(date),
        Entry::from(BALANCE_CORRECTION),
        Entry::from(Dollars::magnitude(correction)),
    ])?;
    Ok(true)
}
