//! Exact rational arithmetic for quorum and threshold checks.
//!
//! Pass/fail decisions must be bit-identical across nodes, so all ratio
//! comparisons cross-multiply through arbitrary-precision integers instead
//! of dividing. Binary floats never appear in a verdict.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rational number in (0, 1], stored as numerator / denominator.
///
/// Used for `quorum`, `pass_threshold`, and `veto_threshold`. Construction
/// enforces the open-closed interval; comparisons against stake fractions
/// are exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    num: u64,
    den: u64,
}

impl Ratio {
    /// Construct a ratio, enforcing `0 < num/den <= 1`.
    pub fn new(num: u64, den: u64) -> Result<Self, RatioError> {
        if den == 0 {
            return Err(RatioError::ZeroDenominator);
        }
        if num == 0 || num > den {
            return Err(RatioError::OutOfRange { num, den });
        }
        Ok(Self { num, den })
    }

    /// One half. Valid by construction.
    pub const ONE_HALF: Self = Self { num: 1, den: 2 };

    /// One third. Valid by construction.
    pub const ONE_THIRD: Self = Self { num: 1, den: 3 };

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }

    /// Whether `num/den > self`, computed exactly.
    ///
    /// `num * self.den > self.num * den` via `BigUint`, so u128 stake sums
    /// cannot overflow the comparison.
    pub fn lt_frac(&self, num: u128, den: u128) -> bool {
        BigUint::from(num) * BigUint::from(self.den) > BigUint::from(self.num) * BigUint::from(den)
    }

    /// Whether `num/den >= self`, computed exactly.
    pub fn le_frac(&self, num: u128, den: u128) -> bool {
        BigUint::from(num) * BigUint::from(self.den)
            >= BigUint::from(self.num) * BigUint::from(den)
    }

    /// Parse from a `"num/den"` string, as used by parameter-change payloads.
    pub fn parse(s: &str) -> Result<Self, RatioError> {
        let (num_s, den_s) = s
            .split_once('/')
            .ok_or_else(|| RatioError::Malformed(s.to_string()))?;
        let num = num_s
            .trim()
            .parse::<u64>()
            .map_err(|_| RatioError::Malformed(s.to_string()))?;
        let den = den_s
            .trim()
            .parse::<u64>()
            .map_err(|_| RatioError::Malformed(s.to_string()))?;
        Self::new(num, den)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RatioError {
    #[error("ratio denominator must be non-zero")]
    ZeroDenominator,

    #[error("ratio {num}/{den} outside (0, 1]")]
    OutOfRange { num: u64, den: u64 },

    #[error("malformed ratio string: {0}")]
    Malformed(String),
}
