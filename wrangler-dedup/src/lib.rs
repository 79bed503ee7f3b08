//! Reconciliation of transfers between known accounts.
//!
//! Whenever money moves between two banks the user has accounts with, both
//! banks report the transfer. [`deduplicate`] pairs those reports up and
//! fuses each pair into a single row. A report whose counterpart is missing
//! keeps its amount, but the endpoint its bank does not own is renamed to
//! `unmatched: <account>` so the other bank's balance is not touched:
//!
//! ```text
//! accountA                  accountB         fused, one row
//! o------------$500------------> o
//!
//! accountA                  unmatched: accountB
//! o------------$500------------> o           only bankA reported it
//! ```
//!
//! The amount flowing through any known account, as seen by the bank owning
//! it, is the same before and after deduplication ([`account_flows`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::iter::FromIterator;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;
use wrangler_core::schema::{AMOUNT, BANK, DATE, DESCRIPTION, FROM, TO};
use wrangler_core::{ColumnSchema, Entry, EntryKind, Row, SchemaError, TransactionStore};

/// Prefix given to an endpoint no bank confirmed.
pub const UNMATCHED: &str = "unmatched: ";

/// Separator between the banks and descriptions of a fused row.
pub const FUSE_SEPARATOR: &str = " + ";

#[derive(Error, Clone, Debug, PartialEq)]
pub enum DedupError {
    #[error("transfer {from} -> {to} on {date} for {amount} is reported by more than two banks: {}", .banks.join(", "))]
    AmbiguousTransfer {
        from: Entry,
        to: Entry,
        date: Entry,
        amount: Entry,
        banks: Vec<String>,
    },
    #[error("bank `{0}` reported an internal transfer but has no accounts configured")]
    UnknownBank(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// The accounts each bank reports on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankAccounts(BTreeMap<String, BTreeSet<String>>);

impl BankAccounts {
    pub fn new() -> Self {
        BankAccounts::default()
    }

    /// Adds `accounts` to the ones `bank` already owns.
    pub fn insert<B, I, S>(&mut self, bank: B, accounts: I)
    where
        B: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(bank.into())
            .or_default()
            .extend(accounts.into_iter().map(Into::into));
    }

    pub fn accounts(&self, bank: &str) -> Option<&BTreeSet<String>> {
        self.0.get(bank)
    }

    pub fn banks(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(bank, accounts)| (bank.as_str(), accounts))
    }

    /// Every account owned by some bank.
    pub fn all_accounts(&self) -> BTreeSet<&str> {
        self.0.values().flatten().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<B, I, S> FromIterator<(B, I)> for BankAccounts
where
    B: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (B, I)>>(iter: T) -> Self {
        let mut result = BankAccounts::new();
        for (bank, accounts) in iter {
            result.insert(bank, accounts);
        }
        result
    }
}

/// Positions of the base columns in the store being reconciled.
struct Columns {
    bank: usize,
    from: usize,
    to: usize,
    date: usize,
    description: usize,
    amount: usize,
}

impl Columns {
    fn of(schema: &ColumnSchema) -> Result<Self, SchemaError> {
        let require = |name: &str, expected: EntryKind| -> Result<usize, SchemaError> {
            let index = schema.require(name)?;
            match schema.kind_of(name) {
                Some(found) if found != expected => Err(SchemaError::KindMismatch {
                    column: name.to_string(),
                    expected,
                    found,
                }),
                _ => Ok(index),
            }
        };
        Ok(Columns {
            bank: require(BANK, EntryKind::String)?,
            from: require(FROM, EntryKind::String)?,
            to: require(TO, EntryKind::String)?,
            date: require(DATE, EntryKind::Date)?,
            description: require(DESCRIPTION, EntryKind::String)?,
            amount: require(AMOUNT, EntryKind::Dollars)?,
        })
    }

    fn text<'r>(&self, row: &'r Row, index: usize) -> &'r str {
        row[index].as_str().unwrap_or_default()
    }

    fn bank<'r>(&self, row: &'r Row) -> &'r str {
        self.text(row, self.bank)
    }

    fn is_internal(&self, row: &Row, known: &BTreeSet<&str>) -> bool {
        known.contains(self.text(row, self.from)) && known.contains(self.text(row, self.to))
    }

    /// `(from, to, date, amount)`: what two banks agree on for one transfer.
    fn loose_identity<'r>(&self, row: &'r Row) -> [&'r Entry; 4] {
        [
            &row[self.from],
            &row[self.to],
            &row[self.date],
            &row[self.amount],
        ]
    }

    fn fuse(&self, a: &Row, b: &Row) -> Row {
        debug_assert_eq!(self.loose_identity(a), self.loose_identity(b));
        let description = if a[self.description] == b[self.description] {
            a[self.description].clone()
        } else {
            Entry::from(format!(
                "{}{}{}",
                self.text(a, self.description),
                FUSE_SEPARATOR,
                self.text(b, self.description)
            ))
        };
        let bank = format!("{}{}{}", self.bank(a), FUSE_SEPARATOR, self.bank(b));
        a.with(self.bank, Entry::from(bank))
            .with(self.description, description)
    }

    fn unmatch(&self, row: &Row, owned: &BTreeSet<String>) -> Row {
        let mut result = row.clone();
        for &index in &[self.from, self.to] {
            let account = self.text(row, index);
            if !owned.contains(account) {
                result = result.with(index, Entry::from(format!("{}{}", UNMATCHED, account)));
            }
        }
        result
    }
}

/// Rows sharing one loose identity, split by reporting bank.
struct Group<'r> {
    banks: Vec<(&'r str, Vec<&'r Row>)>,
}

impl<'r> Group<'r> {
    fn new() -> Self {
        Group { banks: Vec::new() }
    }

    fn push(&mut self, bank: &'r str, row: &'r Row) {
        match self.banks.iter_mut().find(|(b, _)| *b == bank) {
            Some((_, rows)) => rows.push(row),
            None => self.banks.push((bank, vec![row])),
        }
    }
}

/// Fuses transfers reported by both banks and marks the ones only one bank
/// reported.
///
/// The result has the schema of `store`: fused and unmatched transfers in
/// the order their first report appears, then every row not moving money
/// between two known accounts, untouched.
pub fn deduplicate(store: &TransactionStore, banks: &BankAccounts) -> Result<TransactionStore, DedupError> {
    let columns = Columns::of(store.columns())?;
    let known = banks.all_accounts();

    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut positions: HashMap<[&Entry; 4], usize> = HashMap::new();
    let mut external = Vec::new();
    for row in store {
        if !columns.is_internal(row, &known) {
            external.push(row);
            continue;
        }
        let position = *positions
            .entry(columns.loose_identity(row))
            .or_insert_with(|| {
                groups.push(Group::new());
                groups.len() - 1
            });
        groups[position].push(columns.bank(row), row);
    }

    let owned = |bank: &str| {
        banks
            .accounts(bank)
            .ok_or_else(|| DedupError::UnknownBank(bank.to_string()))
    };

    let mut result = TransactionStore::new(store.columns().clone());
    let (mut fused, mut unmatched) = (0, 0);
    for group in &groups {
        match group.banks.as_slice() {
            [] => {}
            [(bank, rows)] => {
                let owned = owned(*bank)?;
                for row in rows {
                    result.ingest(columns.unmatch(row, owned))?;
                    unmatched += 1;
                }
            }
            [(bank_a, rows_a), (bank_b, rows_b)] => {
                for i in 0..rows_a.len().max(rows_b.len()) {
                    let row = match (rows_a.get(i), rows_b.get(i)) {
                        (Some(a), Some(b)) => {
                            fused += 1;
                            columns.fuse(a, b)
                        }
                        (Some(a), None) => {
                            unmatched += 1;
                            columns.unmatch(a, owned(*bank_a)?)
                        }
                        (None, Some(b)) => {
                            unmatched += 1;
                            columns.unmatch(b, owned(*bank_b)?)
                        }
                        (None, None) => continue,
                    };
                    result.ingest(row)?;
                }
            }
            [(_, rows), ..] => {
                let [from, to, date, amount] = columns.loose_identity(rows[0]);
                return Err(DedupError::AmbiguousTransfer {
                    from: from.clone(),
                    to: to.clone(),
                    date: date.clone(),
                    amount: amount.clone(),
                    banks: group.banks.iter().map(|(bank, _)| bank.to_string()).collect(),
                });
            }
        }
    }
    let external_count = external.len();
    for row in external {
        result.ingest(row.clone())?;
    }

    debug!(
        groups = groups.len(),
        fused,
        unmatched,
        external = external_count,
        "deduplicated transfers"
    );
    Ok(result)
}

/// Net flow into each known account over the rows its own bank reported.
///
/// A fused row counts as reported by each of its banks. Deduplication leaves
/// these numbers unchanged.
pub fn account_flows(store: &TransactionStore, banks: &BankAccounts) -> Result<BTreeMap<String, Decimal>, DedupError> {
    let columns = Columns::of(store.columns())?;
    let mut flows = BTreeMap::new();
    for (bank, accounts) in banks.iter() {
        for account in accounts {
            flows.entry(account.clone()).or_insert(Decimal::ZERO);
        }
        for row in store {
            if !columns.bank(row).split(FUSE_SEPARATOR).any(|b| b == bank) {
                continue;
            }
            let amount = row[columns.amount]
                .as_dollars()
                .map(Decimal::from)
                .unwrap_or_default();
            let to = columns.text(row, columns.to);
            let from = columns.text(row, columns.from);
            if let Some(flow) = accounts.get(to).and_then(|a| flows.get_mut(a)) {
                *flow += amount;
            }
            if let Some(flow) = accounts.get(from).and_then(|a| flows.get_mut(a)) {
                *flow -= amount;
            }
        }
    }
    Ok(flows)
}
