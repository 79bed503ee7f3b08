use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::ValueError;

/// A non-negative quantity of US dollars.
///
/// The direction of a transfer is carried by its `from` and `to` columns, so
/// amounts themselves are never negative. The decimal keeps the scale it was
/// written with: `$10.00` stays `$10.00`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Dollars(Decimal);

impl Dollars {
    pub fn new(amount: Decimal) -> Result<Self, ValueError> {
        if amount < Decimal::ZERO {
            return Err(ValueError::NegativeDollars(amount.to_string()));
        }
        Ok(Dollars(amount))
    }

    /// The absolute value of a signed amount.
    pub fn magnitude(amount: Decimal) -> Self {
        Dollars(amount.abs())
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<Dollars> for Decimal {
    fn from(val: Dollars) -> Self {
        val.0
    }
}

impl fmt::Display for Dollars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Accepts both `12.34` and `$12.34`.
impl FromStr for Dollars {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('$');
        let amount = Decimal::from_str(digits).map_err(|e| ValueError::InvalidDecimal {
            input: s.to_string(),
            message: e.to_string(),
        })?;
        Dollars::new(amount)
    }
}
