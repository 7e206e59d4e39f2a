use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "CNY";

//--------------------------------------        Cents        ---------------------------------------------------------
/// An amount of money in minor currency units (fen, cents). All prices and totals are stored this way; conversion to
/// major units only happens at the payment gateway boundary.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Formats the amount in major units the way the payment gateway expects it: no trailing zeros and no decimal
    /// point for whole amounts. `1500` becomes `"15"`, `1550` becomes `"15.5"` and `1` becomes `"0.01"`.
    ///
    /// The result is signed over and sent verbatim, so it must stay byte-for-byte stable.
    pub fn to_major_units_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let (whole, frac) = (abs / 100, abs % 100);
        match frac {
            0 => format!("{sign}{whole}"),
            f if f % 10 == 0 => format!("{sign}{whole}.{}", f / 10),
            f => format!("{sign}{whole}.{f:02}"),
        }
    }
}

impl FromStr for Cents {
    type Err = CentsConversionError;

    /// Parses a major-unit decimal string such as `"15"`, `"15.5"` or `"0.01"`. More than two decimal places is an
    /// error rather than being rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CentsConversionError(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if frac.len() > 2 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| err())? };
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        let value = whole.checked_mul(100).and_then(|w| w.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn major_unit_formatting() {
        assert_eq!(Cents::from(1500).to_major_units_string(), "15");
        assert_eq!(Cents::from(1550).to_major_units_string(), "15.5");
        assert_eq!(Cents::from(1505).to_major_units_string(), "15.05");
        assert_eq!(Cents::from(1).to_major_units_string(), "0.01");
        assert_eq!(Cents::from(0).to_major_units_string(), "0");
        assert_eq!(Cents::from(-250).to_major_units_string(), "-2.5");
    }

    #[test]
    fn parse_major_units() {
        assert_eq!("15".parse::<Cents>().unwrap(), Cents::from(1500));
        assert_eq!("15.5".parse::<Cents>().unwrap(), Cents::from(1550));
        assert_eq!("0.01".parse::<Cents>().unwrap(), Cents::from(1));
        assert_eq!(".5".parse::<Cents>().unwrap(), Cents::from(50));
        assert!("1.005".parse::<Cents>().is_err());
        assert!("abc".parse::<Cents>().is_err());
        assert!("".parse::<Cents>().is_err());
    }

    #[test]
    fn arithmetic() {
        let total: Cents = vec![Cents::from(100), Cents::from(250)].into_iter().sum();
        assert_eq!(total, Cents::from(350));
        assert_eq!(Cents::from(1500) * 3, Cents::from(4500));
        assert_eq!(format!("{}", Cents::from(1505)), "15.05");
        assert_eq!(format!("{}", Cents::from(-5)), "-0.05");
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Cents::from(1999)).unwrap();
        assert_eq!(json, "1999");
    }
}
