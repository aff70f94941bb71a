//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::ops::{Add, Mul};
use core::str::FromStr;
use std::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in the store currency.
///
/// Serializes as the bare decimal amount, which is how the remote store
/// keeps `price`, `total_price` and `product_price` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of pounds.
    #[must_use]
    pub fn from_whole(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the price is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiply by a line quantity, saturating at the decimal range.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map_or_else(|| Self::saturated(self.0.is_sign_negative()), Self)
    }

    /// Add two prices, saturating at the decimal range.
    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        self.0
            .checked_add(rhs.0)
            .map_or_else(|| Self::saturated(rhs.0.is_sign_negative()), Self)
    }

    const fn saturated(negative: bool) -> Self {
        if negative {
            Self(Decimal::MIN)
        } else {
            Self(Decimal::MAX)
        }
    }

    /// Format for display (e.g., "299.00 EGP").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} {}", self.0, CurrencyCode::default().code())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        self.times(rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// ISO 4217 currency of displayed prices. The store sells in Egyptian pounds only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EGP,
}

impl CurrencyCode {
    /// The ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EGP => "EGP",
        }
    }
}
