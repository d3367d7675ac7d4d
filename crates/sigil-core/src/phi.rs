//! # Phi Amounts — 18-Decimal Fixed Point
//!
//! Branch bookkeeping (`branchBasePhi`, `branchSpentPhi`) and exhale
//! payloads carry amounts as decimal strings. `PhiAmount` holds them as an
//! integer count of 10^-18 units so sums are exact.
//!
//! Two renderings exist:
//!
//! - `Display` trims trailing fractional zeros (`"20"`, `"0.5"`).
//! - [`PhiAmount::to_fixed_string`] always emits 18 decimals
//!   (`"20.000000000000000000"`), the form persisted for spent totals.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};

use crate::error::EncodingError;

/// Number of fractional decimal digits.
pub const PHI_SCALE: usize = 18;

const TEN_POW_SCALE: u64 = 1_000_000_000_000_000_000;

/// An exact decimal amount with 18 fractional digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhiAmount(BigInt);

impl PhiAmount {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from a raw count of 10^-18 units.
    pub fn from_scaled(units: BigInt) -> Self {
        Self(units)
    }

    /// The raw count of 10^-18 units.
    pub fn scaled(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    /// Lenient parse used for persisted bookkeeping fields.
    ///
    /// Empty input is zero. A leading `-` sets the sign; every other
    /// character that is not a digit or `.` is dropped. Fractional digits
    /// past the 18th are truncated. Never fails.
    pub fn parse_lossy(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() {
            return Self::zero();
        }
        let negative = t.starts_with('-');

        let kept: String = t
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let clean = if kept.starts_with('.') {
            format!("0.{}", kept.trim_start_matches('.'))
        } else {
            kept
        };

        let mut parts = clean.split('.');
        let int_digits = parts.next().unwrap_or("");
        let frac_digits = parts.next().unwrap_or("");

        let magnitude = scaled_from_digits(int_digits, frac_digits);
        Self(if negative { -magnitude } else { magnitude })
    }

    /// All 18 fractional digits, e.g. `"20.000000000000000000"`.
    pub fn to_fixed_string(&self) -> String {
        let (sign, int_part, frac) = self.split();
        format!("{sign}{int_part}.{frac}")
    }

    fn split(&self) -> (&'static str, BigUint, String) {
        let sign = if self.0.sign() == Sign::Minus { "-" } else { "" };
        let mag = self.0.magnitude();
        let int_part = mag / TEN_POW_SCALE;
        let frac = format!("{:0>width$}", (mag % TEN_POW_SCALE).to_string(), width = PHI_SCALE);
        (sign, int_part, frac)
    }
}

fn scaled_from_digits(int_digits: &str, frac_digits: &str) -> BigInt {
    let int_digits = if int_digits.is_empty() { "0" } else { int_digits };
    let mut frac: String = frac_digits.chars().take(PHI_SCALE).collect();
    while frac.len() < PHI_SCALE {
        frac.push('0');
    }
    let int_val = BigInt::parse_bytes(int_digits.as_bytes(), 10).unwrap_or_default();
    let frac_val = BigInt::parse_bytes(frac.as_bytes(), 10).unwrap_or_default();
    int_val * TEN_POW_SCALE + frac_val
}

/// Strict parse: `-?digits(.digits)?` with at most 18 fractional digits.
impl FromStr for PhiAmount {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EncodingError::InvalidDecimal(s.to_string());
        let t = s.trim();
        let (negative, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, t),
        };
        let (int_digits, frac_digits) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_digits.is_empty()
            || !all_digits(int_digits)
            || !all_digits(frac_digits)
            || (body.contains('.') && frac_digits.is_empty())
            || frac_digits.len() > PHI_SCALE
        {
            return Err(invalid());
        }
        let magnitude = scaled_from_digits(int_digits, frac_digits);
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for PhiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, int_part, frac) = self.split();
        let trimmed = frac.trim_end_matches('0');
        if trimmed.is_empty() {
            write!(f, "{sign}{int_part}")
        } else {
            write!(f, "{sign}{int_part}.{trimmed}")
        }
    }
}

impl Add for PhiAmount {
    type Output = PhiAmount;

    fn add(self, rhs: PhiAmount) -> PhiAmount {
        PhiAmount(self.0 + rhs.0)
    }
}

impl AddAssign for PhiAmount {
    fn add_assign(&mut self, rhs: PhiAmount) {
        self.0 += rhs.0;
    }
}

impl<'a> AddAssign<&'a PhiAmount> for PhiAmount {
    fn add_assign(&mut self, rhs: &'a PhiAmount) {
        self.0 += &rhs.0;
    }
}

impl std::iter::Sum for PhiAmount {
    fn sum<I: Iterator<Item = PhiAmount>>(iter: I) -> Self {
        iter.fold(PhiAmount::zero(), |acc, x| acc + x)
    }
}
