//! Arbitrary-precision decimal-normalization helpers shared by `GetTokenPrice`
//! / `GetTokenQuote` and the Oracle's `price://` handling.
//!
//! All value math is integer; no floating-point arithmetic anywhere in this
//! core. Division always truncates toward zero, matching `num_bigint::BigInt`'s
//! native `Div` semantics.

use num_bigint::BigInt;
use num_traits::{One, Zero};

fn pow10(exp: u32) -> BigInt {
    let mut result = BigInt::one();
    let ten = BigInt::from(10);
    for _ in 0..exp {
        result *= &ten;
    }
    result
}

/// A fixed-point quantity: `mantissa * 10^-decimals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    pub mantissa: BigInt,
    pub decimals: u32,
}

impl Decimal {
    pub fn new(mantissa: BigInt, decimals: u32) -> Self {
        Self { mantissa, decimals }
    }

    /// Rescales to `target_decimals`, truncating toward zero when narrowing.
    pub fn to_big_integer(&self, target_decimals: u32) -> BigInt {
        rescale(&self.mantissa, self.decimals, target_decimals)
    }
}

pub fn rescale(mantissa: &BigInt, from_decimals: u32, to_decimals: u32) -> BigInt {
    if to_decimals >= from_decimals {
        mantissa * pow10(to_decimals - from_decimals)
    } else if mantissa.is_zero() {
        BigInt::zero()
    } else {
        mantissa / pow10(from_decimals - to_decimals)
    }
}
