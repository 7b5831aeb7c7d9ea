//! Arbitrary-magnitude decimal numbers for resource and cost quantities.
//!
//! [`BigNumber`] keeps two canonical forms:
//!
//! - **Plain**: `|value| < 1e15`, stored directly in an `f64` with
//!   `exponent == 0`. Integers in this range are exact, so everyday counts
//!   (a handful of peasants, a few thousand wheat) never pick up float noise.
//! - **Scaled**: `mantissa × 10^exponent` with `1 ≤ |mantissa| < 10` and
//!   `exponent ≥ 15`. The exponent is an `i64`, so magnitudes far beyond
//!   `f64::MAX` stay finite.
//!
//! Every constructor and operation normalizes into exactly one of these forms,
//! which makes the derived field equality a value equality.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Values at or above this magnitude switch to the scaled form.
const PLAIN_LIMIT: f64 = 1e15;

/// Exponent of [`PLAIN_LIMIT`].
const PLAIN_EXPONENT: i64 = 15;

/// Beyond this many decimal digits of separation, the smaller operand of an
/// addition cannot affect an `f64` mantissa.
const SIGNIFICANT_DIGITS: i64 = 17;

/// Errors raised by checked [`BigNumber`] construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// A decimal value with an unbounded base-10 exponent.
#[derive(Clone, Copy, PartialEq)]
pub struct BigNumber {
    mantissa: f64,
    exponent: i64,
}

#[inline]
fn pow10(exp: i64) -> f64 {
    if exp > 308 {
        f64::INFINITY
    } else if exp < -323 {
        0.0
    } else {
        10f64.powi(exp as i32)
    }
}

/// Split a finite non-zero `f64` into a mantissa in `[1, 10)` and exponent.
fn split(v: f64) -> (f64, i64) {
    let mut exp = v.abs().log10().floor() as i64;
    let mut mant = if exp >= 0 { v / pow10(exp) } else { v * pow10(-exp) };
    if mant.abs() >= 10.0 {
        mant /= 10.0;
        exp += 1;
    } else if mant.abs() < 1.0 {
        mant *= 10.0;
        exp -= 1;
    }
    (mant, exp)
}

impl BigNumber {
    pub const ZERO: BigNumber = BigNumber {
        mantissa: 0.0,
        exponent: 0,
    };

    pub const ONE: BigNumber = BigNumber {
        mantissa: 1.0,
        exponent: 0,
    };

    /// Build from a finite `f64`.
    pub fn from_f64(v: f64) -> Result<Self, NumberError> {
        if !v.is_finite() {
            return Err(NumberError::InvalidNumber(v.to_string()));
        }
        Ok(Self::normalize(v, 0))
    }

    /// Build `mantissa × 10^exponent`. The mantissa need not be normalized.
    pub fn from_parts(mantissa: f64, exponent: i64) -> Result<Self, NumberError> {
        if !mantissa.is_finite() {
            return Err(NumberError::InvalidNumber(format!("{mantissa}e{exponent}")));
        }
        Ok(Self::normalize(mantissa, exponent))
    }

    /// `10^exp`.
    pub fn pow10(exp: i64) -> Self {
        Self::normalize(1.0, exp)
    }

    fn normalize(m: f64, e: i64) -> Self {
        if m == 0.0 || !m.is_finite() {
            return Self::ZERO;
        }
        let (mut mant, shift) = split(m);
        let mut exp = e.saturating_add(shift);
        if exp < PLAIN_EXPONENT {
            let v = m * pow10(e);
            if v.abs() < PLAIN_LIMIT {
                return Self {
                    mantissa: if v == 0.0 { 0.0 } else { v },
                    exponent: 0,
                };
            }
            // Rounded up across the boundary; fall through as 1e15.
            let (m2, s2) = split(v);
            mant = m2;
            exp = s2;
        }
        Self {
            mantissa: mant,
            exponent: exp,
        }
    }

    #[inline]
    fn is_plain(&self) -> bool {
        self.exponent == 0
    }

    /// Normalized `(mantissa, exponent)` for any value. Zero is `(0, 0)`.
    pub fn parts(&self) -> (f64, i64) {
        if self.mantissa == 0.0 {
            (0.0, 0)
        } else if self.is_plain() {
            split(self.mantissa)
        } else {
            (self.mantissa, self.exponent)
        }
    }

    /// Base-10 exponent: `floor(log10(|self|))`, or 0 for zero.
    pub fn exponent(&self) -> i64 {
        self.parts().1
    }

    /// Normalized mantissa in `[1, 10)` (signed), or 0 for zero.
    pub fn mantissa(&self) -> f64 {
        self.parts().0
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0.0
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa > 0.0
    }

    /// Lossy conversion; overflows to infinity above `f64::MAX`.
    pub fn to_f64(&self) -> f64 {
        if self.is_plain() {
            self.mantissa
        } else {
            self.mantissa * pow10(self.exponent)
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    /// Largest integer ≤ self. Scaled values with 17+ digits are already
    /// integral at mantissa precision and are returned unchanged.
    pub fn floor(&self) -> Self {
        if self.is_plain() {
            return Self::normalize(self.mantissa.floor(), 0);
        }
        if self.exponent >= SIGNIFICANT_DIGITS {
            return *self;
        }
        Self::normalize((self.mantissa * pow10(self.exponent)).floor(), 0)
    }

    /// Checked addition. Never fails for valid operands; kept for API symmetry.
    pub fn add(&self, other: &Self) -> Self {
        if self.is_plain() && other.is_plain() {
            return Self::normalize(self.mantissa + other.mantissa, 0);
        }
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        let (ma, ea) = self.parts();
        let (mb, eb) = other.parts();
        let (big_m, big_e, small_m, small_e, big) = if ea >= eb {
            (ma, ea, mb, eb, *self)
        } else {
            (mb, eb, ma, ea, *other)
        };
        let diff = big_e - small_e;
        if diff > SIGNIFICANT_DIGITS {
            return big;
        }
        Self::normalize(big_m + small_m / pow10(diff), big_e)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::ZERO;
        }
        if self.is_plain() && other.is_plain() {
            let p = self.mantissa * other.mantissa;
            if p.is_finite() && p.abs() < PLAIN_LIMIT {
                return Self::normalize(p, 0);
            }
        }
        let (ma, ea) = self.parts();
        let (mb, eb) = other.parts();
        Self::normalize(ma * mb, ea.saturating_add(eb))
    }

    /// Division that reports a zero divisor instead of panicking.
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        if self.is_plain() && other.is_plain() {
            let q = self.mantissa / other.mantissa;
            if q.is_finite() && q.abs() < PLAIN_LIMIT {
                return Ok(Self::normalize(q, 0));
            }
        }
        let (ma, ea) = self.parts();
        let (mb, eb) = other.parts();
        Ok(Self::normalize(ma / mb, ea.saturating_sub(eb)))
    }

    /// `self^power`. Negative bases are raised by magnitude; the sign is kept
    /// only for odd integral powers.
    pub fn pow(&self, power: f64) -> Self {
        if power == 0.0 {
            return Self::ONE;
        }
        if self.is_zero() {
            return Self::ZERO;
        }
        let negative = self.is_negative() && power.fract() == 0.0 && (power as i64) % 2 != 0;
        let base = self.abs();
        let mut out = 'calc: {
            if base.is_plain() {
                let r = base.mantissa.powf(power);
                if r.is_finite() && r.abs() < PLAIN_LIMIT {
                    break 'calc Self::normalize(r, 0);
                }
            }
            let (m, e) = base.parts();
            let log = power * (e as f64 + m.log10());
            let whole = log.floor();
            Self::normalize(10f64.powf(log - whole), whole as i64)
        };
        if negative {
            out = out.neg();
        }
        out
    }

    pub fn neg(&self) -> Self {
        if self.is_zero() {
            return *self;
        }
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }

    pub fn min(self, other: Self) -> Self {
        if other < self { other } else { self }
    }

    pub fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    fn compare(&self, other: &Self) -> Ordering {
        if self.is_plain() && other.is_plain() {
            return self
                .mantissa
                .partial_cmp(&other.mantissa)
                .unwrap_or(Ordering::Equal);
        }
        let sa = self.mantissa.signum() as i8 * (!self.is_zero()) as i8;
        let sb = other.mantissa.signum() as i8 * (!other.is_zero()) as i8;
        if sa != sb {
            return sa.cmp(&sb);
        }
        let (ma, ea) = self.parts();
        let (mb, eb) = other.parts();
        let by_magnitude = ea.cmp(&eb).then_with(|| {
            ma.abs()
                .partial_cmp(&mb.abs())
                .unwrap_or(Ordering::Equal)
        });
        if sa < 0 { by_magnitude.reverse() } else { by_magnitude }
    }
}

impl Default for BigNumber {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Eq for BigNumber {}

impl PartialOrd for BigNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl From<u32> for BigNumber {
    fn from(v: u32) -> Self {
        Self::normalize(v as f64, 0)
    }
}

impl From<u64> for BigNumber {
    fn from(v: u64) -> Self {
        Self::normalize(v as f64, 0)
    }
}

impl From<i32> for BigNumber {
    fn from(v: i32) -> Self {
        Self::normalize(v as f64, 0)
    }
}

impl Add for BigNumber {
    type Output = BigNumber;
    fn add(self, rhs: Self) -> Self {
        BigNumber::add(&self, &rhs)
    }
}

impl Sub for BigNumber {
    type Output = BigNumber;
    fn sub(self, rhs: Self) -> Self {
        BigNumber::sub(&self, &rhs)
    }
}

impl Mul for BigNumber {
    type Output = BigNumber;
    fn mul(self, rhs: Self) -> Self {
        BigNumber::mul(&self, &rhs)
    }
}

/// Panics on a zero divisor. Use [`BigNumber::checked_div`] where the
/// divisor is not guaranteed non-zero by construction.
impl Div for BigNumber {
    type Output = BigNumber;
    fn div(self, rhs: Self) -> Self {
        match self.checked_div(&rhs) {
            Ok(q) => q,
            Err(e) => panic!("BigNumber division failed: {e}"),
        }
    }
}

impl Neg for BigNumber {
    type Output = BigNumber;
    fn neg(self) -> Self {
        BigNumber::neg(&self)
    }
}

impl AddAssign for BigNumber {
    fn add_assign(&mut self, rhs: Self) {
        *self = BigNumber::add(self, &rhs);
    }
}

impl SubAssign for BigNumber {
    fn sub_assign(&mut self, rhs: Self) {
        *self = BigNumber::sub(self, &rhs);
    }
}

impl MulAssign for BigNumber {
    fn mul_assign(&mut self, rhs: Self) {
        *self = BigNumber::mul(self, &rhs);
    }
}

impl Sum for BigNumber {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            write!(f, "{}", self.mantissa)
        } else {
            write!(f, "{}e{}", self.mantissa, self.exponent)
        }
    }
}

impl fmt::Debug for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNumber({self})")
    }
}

impl FromStr for BigNumber {
    type Err = NumberError;

    /// Accepts plain decimals (`"123"`, `"0.5"`) and exponent notation
    /// (`"1.5e42"`, `"1.5e+42"`), including exponents beyond `f64` range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || NumberError::InvalidNumber(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }
        let (mant_str, exp) = match s.find(['e', 'E']) {
            Some(idx) => {
                let exp: i64 = s[idx + 1..].parse().map_err(|_| invalid())?;
                (&s[..idx], exp)
            }
            None => (s, 0),
        };
        let mantissa: f64 = mant_str.parse().map_err(|_| invalid())?;
        if !mantissa.is_finite() {
            return Err(invalid());
        }
        Ok(Self::normalize(mantissa, exp))
    }
}

impl Serialize for BigNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct BigNumberVisitor;

impl Visitor<'_> for BigNumberVisitor {
    type Value = BigNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BigNumber, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigNumber, E> {
        BigNumber::from_f64(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigNumber, E> {
        Ok(BigNumber::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigNumber, E> {
        BigNumber::from_f64(v as f64).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for BigNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BigNumberVisitor)
    }
}
