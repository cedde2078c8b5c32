use std::fmt;
use std::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A fixed-point monetary amount with exactly two fractional digits.
///
/// Prices and contribution amounts are compared with exact decimal
/// arithmetic. Values carrying more precision than cents are rejected at
/// construction rather than rounded, so a ledger of many small amounts never
/// drifts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits carried by every amount.
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build from a decimal, rejecting more than [`Self::SCALE`] fractional digits.
    pub fn new(value: Decimal) -> Result<Self, TypeError> {
        let mut value = value.normalize();
        if value.scale() > Self::SCALE {
            return Err(TypeError::Precision {
                value: value.to_string(),
                max_scale: Self::SCALE,
            });
        }
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    /// Build from an integer number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal (always at scale 2).
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, other: Money) -> Result<Money, TypeError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| TypeError::Overflow(format!("{self} + {other}")))
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, TypeError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| TypeError::Overflow(format!("{self} - {other}")))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = TypeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({self})")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(Self::SCALE))
    }
}
