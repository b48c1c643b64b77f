//! 24.8 signed fixed-point numbers.
//!
//! The wire form is an `i32` holding `value * 256`. Conversion from `f64`
//! rounds half to even, so `0.5 / 256` encodes as 0 and `1.5 / 256` as 2.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Error, Result};

/// Fixed-point value with 8 fractional bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Number of fractional bits.
    pub const FRACTION_BITS: u32 = 8;
    const SCALE: f64 = 256.0;

    pub const ZERO: Fixed = Fixed(0);
    pub const MIN: Fixed = Fixed(i32::MIN);
    pub const MAX: Fixed = Fixed(i32::MAX);

    /// Wrap a raw wire value.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw wire value.
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Convert a float, rounding half to even.
    ///
    /// Fails with `OutOfRange` for NaN, infinities, and values whose scaled
    /// form does not fit in an `i32`; nothing is ever truncated.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::out_of_range(format!("fixed value {} is not finite", value)));
        }
        let scaled = (value * Self::SCALE).round_ties_even();
        if scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
            return Err(Error::out_of_range(format!(
                "fixed value {} outside [{}, {}]",
                value,
                Self::MIN.to_f64(),
                Self::MAX.to_f64()
            )));
        }
        Ok(Self(scaled as i32))
    }

    /// Exact conversion of an integer.
    pub fn from_int(value: i32) -> Result<Self> {
        value
            .checked_mul(1 << Self::FRACTION_BITS)
            .map(Self)
            .ok_or_else(|| Error::out_of_range(format!("fixed value {} outside range", value)))
    }

    /// Exact conversion to a float.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / Self::SCALE
    }

    /// Integer part, rounded toward negative infinity.
    pub fn floor(self) -> i32 {
        self.0 >> Self::FRACTION_BITS
    }
}

impl TryFrom<f64> for Fixed {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_f64(value)
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> f64 {
        value.to_f64()
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
