//! Integer square root over `BigInt`.
//!
//! Small values go through `f64::sqrt` directly. Larger values use a float
//! estimate as the starting point for Newton's method; the estimate can be
//! several units off for very large magnitudes, so every candidate is checked
//! against `r² ≤ n ≤ r² + 2r` before it is returned.

use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::error::{CodecError, Result};

/// Largest value whose root is taken with a single `f64::sqrt`.
const FAST_SQRT_LIMIT: u64 = 4_503_599_761_588_223;

/// Values spanning fewer bytes than this convert to `f64` without overflow.
const DIRECT_FLOAT_BYTES: u64 = 128;

/// Floor of the square root of `value`.
pub fn isqrt(value: &BigInt) -> Result<BigInt> {
    if value.sign() == Sign::Minus {
        return Err(CodecError::NegativeSqrt { value: value.to_string() });
    }

    if let Some(small) = value.to_u64().filter(|v| *v <= FAST_SQRT_LIMIT) {
        return Ok(BigInt::from(small_isqrt(small)));
    }

    let mut root = initial_estimate(value);
    loop {
        let next = newton_step(value, &root);
        if (next == root || next == &root + 1u32) && is_floor_sqrt(value, &root) {
            return Ok(root);
        }
        root = newton_step(value, &next);
        if (root == next || root == &next + 1u32) && is_floor_sqrt(value, &next) {
            return Ok(next);
        }
    }
}

/// `root² ≤ value ≤ root² + 2·root`, i.e. `root` is the floor of `√value`.
pub fn is_floor_sqrt(value: &BigInt, root: &BigInt) -> bool {
    let lower = root * root;
    let upper = &lower + (root << 1u32);
    *value >= lower && *value <= upper
}

fn small_isqrt(value: u64) -> u64 {
    let mut root = (value as f64).sqrt() as u64;
    // f64 rounding can land one off near perfect squares
    let wide = value as u128;
    while (root as u128) * (root as u128) > wide {
        root -= 1;
    }
    while ((root + 1) as u128) * ((root + 1) as u128) <= wide {
        root += 1;
    }
    root
}

fn initial_estimate(value: &BigInt) -> BigInt {
    // two's complement length, sign byte included
    let byte_len = value.bits() / 8 + 1;

    let estimate = if byte_len < DIRECT_FLOAT_BYTES {
        float_root(value)
    } else {
        let dropped = (byte_len - (DIRECT_FLOAT_BYTES - 1)) * 8;
        float_root(&(value >> dropped)) << (dropped / 2)
    };

    if estimate.is_zero() {
        BigInt::from(1u32)
    } else {
        estimate
    }
}

fn float_root(value: &BigInt) -> BigInt {
    value
        .to_f64()
        .map(f64::sqrt)
        .and_then(BigInt::from_f64)
        .unwrap_or_else(|| BigInt::from(1u32))
}

fn newton_step(value: &BigInt, root: &BigInt) -> BigInt {
    (value / root + root) >> 1u32
}
