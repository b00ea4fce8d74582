//! Money and weight types.
//!
//! The shop prices everything in whole pesos; there are no cents anywhere in
//! the catalog, the cart or an order. Weights are exact decimals in kilograms
//! so that `0.5 kg` never turns into `0.49999`.

use core::fmt;
use core::ops::{Add, AddAssign};
use std::iter::Sum;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in whole currency units.
///
/// Arithmetic saturates instead of overflowing, so price computations stay
/// infallible even for absurd quantities.
///
/// ```
/// use carniceria_core::Money;
///
/// assert_eq!(Money::new(8500).to_string(), "$8.500");
/// assert_eq!(Money::new(1_234_567).to_string(), "$1.234.567");
/// assert_eq!(Money::new(0).to_string(), "$0");
/// ```
///
/// Deserializes from a plain number or from a string in any form
/// [`FromStr`] accepts, so seed files may quote `"8.500"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "MoneyRepr", into = "i64")]
pub struct Money(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Amount(i64),
    Text(String),
}

impl TryFrom<MoneyRepr> for Money {
    type Error = MoneyError;

    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> {
        match repr {
            MoneyRepr::Amount(amount) => Ok(Self(amount)),
            MoneyRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Money {
    /// Zero pesos.
    pub const ZERO: Self = Self(0);

    /// Create an amount from whole units.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the amount in whole units.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Multiply by a count, saturating at the numeric bounds.
    #[must_use]
    pub const fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as i64))
    }

    /// Multiply by a weight, rounding half away from zero to whole units.
    ///
    /// ```
    /// use carniceria_core::{Kilograms, Money};
    ///
    /// let kg: Kilograms = "1.25".parse().unwrap();
    /// assert_eq!(Money::new(8500).per_kilo_times(kg), Money::new(10625));
    ///
    /// let kg: Kilograms = "0,333".parse().unwrap();
    /// assert_eq!(Money::new(1000).per_kilo_times(kg), Money::new(333));
    /// ```
    #[must_use]
    pub fn per_kilo_times(self, weight: Kilograms) -> Self {
        let exact = Decimal::from(self.0).saturating_mul(weight.0);
        let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self(rounded.to_i64().unwrap_or(i64::MAX))
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-${grouped}")
        } else {
            write!(f, "${grouped}")
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

/// Errors from parsing a money amount typed into an admin form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be a whole number: {0}")]
    Invalid(String),
    #[error("amount cannot be negative")]
    Negative,
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Accepts `8500`, `8.500` and `$ 8.500`. Dots are thousands separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .collect();
        if cleaned.is_empty() {
            return Err(MoneyError::Empty);
        }
        let amount = cleaned
            .parse::<i64>()
            .map_err(|_| MoneyError::Invalid(s.trim().to_owned()))?;
        if amount < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self(amount))
    }
}

// SQLx support: stored as BIGINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// A weight in kilograms.
///
/// Always positive once constructed through [`Kilograms::new`] or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Kilograms(Decimal);

/// Errors from constructing a [`Kilograms`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WeightError {
    #[error("weight must be a number of kilograms: {0}")]
    Invalid(String),
    #[error("weight must be greater than zero")]
    NotPositive,
}

impl Kilograms {
    /// Create a weight, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::NotPositive`] when `value <= 0`.
    pub fn new(value: Decimal) -> Result<Self, WeightError> {
        if value <= Decimal::ZERO {
            return Err(WeightError::NotPositive);
        }
        Ok(Self(value.normalize()))
    }

    /// Exactly one kilogram.
    #[must_use]
    pub const fn one() -> Self {
        Self(Decimal::ONE)
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Kilograms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg", self.0.normalize())
    }
}

impl FromStr for Kilograms {
    type Err = WeightError;

    /// Accepts both `1.5` and `1,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        let value = Decimal::from_str(&normalized)
            .map_err(|_| WeightError::Invalid(s.trim().to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Kilograms {
    type Error = WeightError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Kilograms> for Decimal {
    fn from(kg: Kilograms) -> Self {
        kg.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_from_number_or_text() {
        let from_number: Money = serde_json::from_str("13900").unwrap();
        let from_text: Money = serde_json::from_str(r#""13900""#).unwrap();
        let grouped: Money = serde_json::from_str(r#""$ 13.900""#).unwrap();
        assert_eq!(from_number, Money::new(13900));
        assert_eq!(from_text, Money::new(13900));
        assert_eq!(grouped, Money::new(13900));
        assert!(serde_json::from_str::<Money>(r#""trece mil""#).is_err());
        assert_eq!(serde_json::to_string(&Money::new(13900)).unwrap(), "13900");
    }

    #[test]
    fn test_display_uses_dot_thousands() {
        assert_eq!(Money::new(500).to_string(), "$500");
        assert_eq!(Money::new(1500).to_string(), "$1.500");
        assert_eq!(Money::new(15000).to_string(), "$15.000");
        assert_eq!(Money::new(-2500).to_string(), "-$2.500");
    }

    #[test]
    fn test_parse_admin_input() {
        assert_eq!("8.500".parse::<Money>(), Ok(Money::new(8500)));
        assert_eq!("$ 12000".parse::<Money>(), Ok(Money::new(12000)));
        assert_eq!("".parse::<Money>(), Err(MoneyError::Empty));
        assert_eq!("-5".parse::<Money>(), Err(MoneyError::Negative));
        assert!("doce".parse::<Money>().is_err());
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        let half: Kilograms = "0.5".parse().unwrap();
        assert_eq!(Money::new(1001).per_kilo_times(half), Money::new(501));
        assert_eq!(Money::new(8500).per_kilo_times(Kilograms::one()), Money::new(8500));
    }

    #[test]
    fn test_saturating_arithmetic() {
        let max = Money::new(i64::MAX);
        assert_eq!(max + Money::new(1), max);
        assert_eq!(max.times(3), max);
        let total: Money = [Money::new(1000), Money::new(2000)].into_iter().sum();
        assert_eq!(total, Money::new(3000));
    }

    #[test]
    fn test_weight_rejects_non_positive() {
        assert_eq!("0".parse::<Kilograms>(), Err(WeightError::NotPositive));
        assert_eq!("-1".parse::<Kilograms>(), Err(WeightError::NotPositive));
        assert!("medio".parse::<Kilograms>().is_err());
        assert_eq!("1,5".parse::<Kilograms>().unwrap().to_string(), "1.5 kg");
    }

    #[test]
    fn test_weight_serde_rejects_zero() {
        assert!(serde_json::from_str::<Kilograms>("\"0\"").is_err());
        let kg: Kilograms = serde_json::from_str("\"2.50\"").unwrap();
        assert_eq!(kg.value(), Decimal::new(25, 1));
    }
}
