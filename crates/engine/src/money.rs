use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::EngineError;

/// Smallest amount the engine accepts for a monetary field, in minor units.
pub const MIN_AMOUNT_MINOR: i64 = -1_000_000_000_000_000;
/// Largest amount the engine accepts for a monetary field, in minor units.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000_000;

/// Signed money amount represented as **integer minor units**.
///
/// Use this type for **all** monetary values in the engine (account balances,
/// budget amounts, operation amounts) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let minor = abs % 100;
        write!(f, "{sign}{units}.{minor:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::validation("amount", "empty amount");
        let invalid = || EngineError::validation("amount", "invalid amount");
        let overflow = || EngineError::validation("amount", "amount too large");

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let minor: i64 = match minor_str {
            None => 0,
            Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::validation("amount", "too many decimals")),
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}

/// Converts an amount in a foreign currency into main-currency minor units.
///
/// `rate` is the value of one foreign minor unit expressed in main minor
/// units. The product is rounded half-up on its absolute value (ties away
/// from zero), once, and never carried unrounded into another conversion.
pub fn convert_to_main(amount_minor: i64, rate: f64) -> Result<i64, EngineError> {
    let rate = rate_to_decimal(rate)?;
    to_minor(Decimal::from(amount_minor) * rate)
}

/// Converts main-currency minor units into a foreign currency.
///
/// Same rounding policy as [`convert_to_main`].
pub fn convert_from_main(amount_minor: i64, rate: f64) -> Result<i64, EngineError> {
    let rate = rate_to_decimal(rate)?;
    to_minor(Decimal::from(amount_minor) / rate)
}

/// Returns `1 / rate`.
///
/// Computed in decimal so repeated round-trips do not drift; never returns
/// `Inf` or `NaN`.
pub fn reverse_rate(rate: f64) -> Result<f64, EngineError> {
    let rate = rate_to_decimal(rate)?;
    (Decimal::ONE / rate)
        .to_f64()
        .ok_or_else(|| EngineError::InvalidRate("rate reciprocal out of range".to_string()))
}

fn rate_to_decimal(rate: f64) -> Result<Decimal, EngineError> {
    if !rate.is_finite() {
        return Err(EngineError::InvalidRate(format!("rate {rate} is not finite")));
    }
    if rate <= 0.0 {
        return Err(EngineError::InvalidRate(format!(
            "rate must be > 0, got {rate}"
        )));
    }
    Decimal::try_from(rate).map_err(|_| EngineError::InvalidRate(format!("unrepresentable rate {rate}")))
}

fn to_minor(value: Decimal) -> Result<i64, EngineError> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| EngineError::validation("amount", "conversion overflows minor units"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(10).to_string(), "0.10");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().minor(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_more_than_two_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
    }

    #[test]
    fn convert_rounds_half_up() {
        assert_eq!(convert_to_main(10_000, 0.012).unwrap(), 120);
        // 125 * 0.5 = 62.5 -> 63 (ties away from zero)
        assert_eq!(convert_to_main(125, 0.5).unwrap(), 63);
        assert_eq!(convert_to_main(-125, 0.5).unwrap(), -63);
        // 3 / 2 = 1.5 -> 2
        assert_eq!(convert_from_main(3, 2.0).unwrap(), 2);
    }

    #[test]
    fn convert_round_trip_stays_within_one_minor_unit() {
        for amount in [0i64, 1, 99, 12_345, 1_000_000_000] {
            for rate in [0.5, 1.0, 1.1737, 86.44] {
                let there = convert_to_main(amount, rate).unwrap();
                let back = convert_from_main(there, rate).unwrap();
                assert!(
                    (back - amount).abs() <= 1,
                    "{amount} @ {rate}: got back {back}"
                );
            }
        }
    }

    #[test]
    fn reverse_rate_matches_reciprocal() {
        let reversed = reverse_rate(0.012).unwrap();
        assert!((reversed - 1.0 / 0.012).abs() < 1e-9);
        assert_eq!(reverse_rate(1.0).unwrap(), 1.0);
    }

    #[test]
    fn zero_or_negative_rate_is_rejected() {
        assert!(matches!(
            convert_to_main(100, 0.0),
            Err(EngineError::InvalidRate(_))
        ));
        assert!(matches!(
            convert_from_main(100, 0.0),
            Err(EngineError::InvalidRate(_))
        ));
        assert!(matches!(reverse_rate(0.0), Err(EngineError::InvalidRate(_))));
        assert!(matches!(
            convert_to_main(100, -0.5),
            Err(EngineError::InvalidRate(_))
        ));
        assert!(matches!(
            reverse_rate(f64::NAN),
            Err(EngineError::InvalidRate(_))
        ));
    }
}
