use std::collections::{BTreeMap, BTreeSet};
use std::error::Error as StdError;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use wrangler_core::{add_balance_correction, Date, Dollars, Entry, TransactionStore};

use crate::config::{ConfigField, SourceConfig};

/// Any failure of a bank source, reduced to the bank it came from and a message.
#[derive(Error, Debug)]
#[error("{bank}: {message}")]
pub struct SourceError {
    pub bank: String,
    pub message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl SourceError {
    pub fn new<B: Into<String>, M: Into<String>>(bank: B, message: M) -> Self {
        SourceError {
            bank: bank.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<B, M, E>(bank: B, message: M, source: E) -> Self
    where
        B: Into<String>,
        M: Into<String>,
        E: StdError + Send + Sync + 'static,
    {
        SourceError {
            bank: bank.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// A place transactions come from, usually one bank's website.
///
/// Fetching and parsing are split so raw downloads can be kept and parsed
/// again later. Stores returned by [`parse_transactions`] use the base
/// schema and name this source in their `bank` column.
///
/// [`parse_transactions`]: BankSource::parse_transactions
pub trait BankSource {
    fn name(&self) -> &str;

    /// The fields a user must fill in before [`fetch`](BankSource::fetch) can run.
    fn empty_config(&self) -> Vec<ConfigField>;

    fn fetch(&self, config: &SourceConfig) -> Result<Vec<u8>, SourceError>;

    fn parse_transactions(&self, raw: &[u8]) -> Result<TransactionStore, SourceError>;

    /// The accounts this source reports on.
    fn parse_accounts(&self, raw: &[u8]) -> Result<BTreeSet<String>, SourceError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticTransaction {
    pub from: String,
    pub to: String,
    /// `YYYY/MM/DD`
    pub date: String,
    pub description: String,
    /// Non-negative, with or without a leading `$`.
    pub amount: String,
}

/// The JSON document a [`StaticSource`] serves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticPayload {
    pub accounts: Vec<String>,
    #[serde(default)]
    pub transactions: Vec<StaticTransaction>,
    /// Balances the bank reports per account. A balance differing from the
    /// sum of the transactions gets a correction row.
    #[serde(default)]
    pub balances: BTreeMap<String, String>,
    /// Date of correction rows when there are no transactions.
    #[serde(default)]
    pub as_of: Option<String>,
}

/// A source serving a fixed JSON payload, for tests and demos.
#[derive(Clone, Debug)]
pub struct StaticSource {
    name: String,
    fields: Vec<ConfigField>,
    payload: Vec<u8>,
}

impl StaticSource {
    pub fn new<S: Into<String>, P: Into<Vec<u8>>>(name: S, payload: P) -> Self {
        StaticSource {
            name: name.into(),
            fields: Vec::new(),
            payload: payload.into(),
        }
    }

    pub fn from_payload<S: Into<String>>(name: S, payload: &StaticPayload) -> Result<Self, SourceError> {
        let name = name.into();
        let json = serde_json::to_vec(payload)
            .map_err(|e| SourceError::with_source(name.as_str(), "could not encode payload", e))?;
        Ok(StaticSource::new(name, json))
    }

    /// Requires these fields to be filled before fetching.
    pub fn with_config(self, fields: Vec<ConfigField>) -> Self {
        StaticSource { fields, ..self }
    }

    fn error<M: Into<String>>(&self, message: M) -> SourceError {
        SourceError::new(self.name.as_str(), message)
    }

    fn decode(&self, raw: &[u8]) -> Result<StaticPayload, SourceError> {
        serde_json::from_slice(raw)
            .map_err(|e| SourceError::with_source(self.name.as_str(), "malformed payload", e))
    }

    fn row(&self, transaction: &StaticTransaction) -> Result<Vec<Entry>, SourceError> {
        let date = Date::from_str(&transaction.date)
            .map_err(|e| SourceError::with_source(self.name.as_str(), "bad transaction date", e))?;
        let amount = Dollars::from_str(&transaction.amount)
            .map_err(|e| SourceError::with_source(self.name.as_str(), "bad transaction amount", e))?;
        Ok(vec![
            Entry::from(self.name.as_str()),
            Entry::from(transaction.from.as_str()),
            Entry::from(transaction.to.as_str()),
            Entry::from(date),
            Entry::from(transaction.description.as_str()),
            Entry::from(amount),
        ])
    }
}

impl BankSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn empty_config(&self) -> Vec<ConfigField> {
        self.fields
            .iter()
            .map(|field| ConfigField::empty(field.hidden, field.label.as_str()))
            .collect()
    }

    fn fetch(&self, config: &SourceConfig) -> Result<Vec<u8>, SourceError> {
        if config.bank != self.name {
            return Err(self.error(format!("config is for `{}`", config.bank)));
        }
        for field in &self.fields {
            if config.get(&field.label).is_none() {
                return Err(self.error(format!("missing value for `{}`", field.label)));
            }
        }
        Ok(self.payload.clone())
    }

    fn parse_transactions(&self, raw: &[u8]) -> Result<TransactionStore, SourceError> {
        let payload = self.decode(raw)?;
        let mut store = TransactionStore::base();
        for transaction in &payload.transactions {
            store
                .ingest_row(self.row(transaction)?)
                .map_err(|e| SourceError::with_source(self.name.as_str(), "bad transaction", e))?;
        }

        let fallback = match &payload.as_of {
            Some(date) => Some(
                Date::from_str(date)
                    .map_err(|e| SourceError::with_source(self.name.as_str(), "bad as_of date", e))?,
            ),
            None => None,
        };
        for (account, balance) in &payload.balances {
            let balance = Decimal::from_str(balance.trim_start_matches('$'))
                .map_err(|e| SourceError::with_source(self.name.as_str(), "bad balance", e))?;
            let fallback = match fallback {
                Some(date) => date,
                None if !store.is_empty() => Date::new(1970, 1, 1),
                None => return Err(self.error("balances without transactions need `as_of`")),
            };
            let corrected = add_balance_correction(&self.name, account, balance, &mut store, fallback)
                .map_err(|e| SourceError::with_source(self.name.as_str(), "bad balance correction", e))?;
            if corrected {
                debug!(bank = %self.name, account = %account, "added balance correction");
            }
        }
        Ok(store)
    }

    fn parse_accounts(&self, raw: &[u8]) -> Result<BTreeSet<String>, SourceError> {
        Ok(self.decode(raw)?.accounts.into_iter().collect())
    }
}
