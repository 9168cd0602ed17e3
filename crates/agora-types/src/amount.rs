//! Token amounts.
//!
//! Amounts are raw integer units (u128). Every arithmetic helper is checked:
//! governance accounting never wraps.

use crate::error::TypesError;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Quantity of the value token, or of raw voting power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(Self)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.0.checked_div(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self + other`, as a `Result` for `?` chains.
    pub fn try_add(self, other: Self) -> Result<Self, TypesError> {
        self.checked_add(other).ok_or(TypesError::AmountOverflow)
    }

    /// `self - other`, as a `Result` for `?` chains.
    pub fn try_sub(self, other: Self) -> Result<Self, TypesError> {
        self.checked_sub(other).ok_or(TypesError::AmountUnderflow)
    }

    /// `self * numerator / denominator`, truncating toward zero.
    ///
    /// The product is formed first, so the result is exact up to the final
    /// truncation; an overflowing product is an error rather than a silently
    /// reordered (and less precise) computation.
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<Self, TypesError> {
        if denominator == 0 {
            return Err(TypesError::AmountDivisionByZero);
        }
        let product = self
            .0
            .checked_mul(numerator)
            .ok_or(TypesError::AmountOverflow)?;
        Ok(Self(product / denominator))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Sum for Amount {
    /// Saturating sum; callers that must detect overflow use `try_add`.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u128, |acc, a| acc.saturating_add(a.0)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() {
            return Err(TypesError::InvalidAmountString(s.to_string()));
        }
        Ok(Self(cleaned.parse::<u128>()?))
    }
}
