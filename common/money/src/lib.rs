use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use thiserror::Error;

/// Whole-currency-unit amount (kronor, no öre). Prices in this shop are
/// integers end to end; fractional money does not exist in the domain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub i64);

#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("amount out of range")]
    Overflow,
    #[error("negative amount not allowed")]
    Negative,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn new(units: i64) -> Self {
        Amount(units)
    }

    pub fn units(&self) -> i64 {
        self.0
    }

    /// Convert to minor units (öre) for payment-provider APIs, which always
    /// speak in the smallest denomination.
    pub fn minor_units(&self) -> i64 {
        self.0 * 100
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked line-total computation; quantity comes from user input.
    pub fn checked_mul_qty(&self, quantity: u32) -> Result<Amount, MoneyError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_add(&self, other: Amount) -> Result<Amount, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Mul<i64> for Amount {
    type Output = Amount;
    fn mul(self, rhs: i64) -> Amount {
        Amount(self.0 * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl From<i64> for Amount {
    fn from(units: i64) -> Self {
        Amount(units)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kr", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_scale_by_hundred() {
        assert_eq!(Amount::new(149).minor_units(), 14900);
        assert_eq!(Amount::ZERO.minor_units(), 0);
    }

    #[test]
    fn line_total_is_checked() {
        let price = Amount::new(249);
        assert_eq!(price.checked_mul_qty(2).unwrap(), Amount::new(498));
        assert!(Amount::new(i64::MAX).checked_mul_qty(2).is_err());
    }

    #[test]
    fn sums_accumulate() {
        let total: Amount = [Amount::new(298), Amount::new(249)].into_iter().sum();
        assert_eq!(total, Amount::new(547));
    }

    #[test]
    fn serde_is_transparent() {
        let v: Amount = serde_json::from_str("149").unwrap();
        assert_eq!(v, Amount::new(149));
        assert_eq!(serde_json::to_string(&v).unwrap(), "149");
    }
}
