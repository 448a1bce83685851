//! Working seed derivation.
//!
//! Every file starts from the base seed `isqrt((3s)^73 · (713853 + 3s))`.
//! Versions 2-4 replace it with values mixed from the timestamp and the
//! absolute file path; the digit-stripping steps below are part of the
//! format and must stay exactly as they are for stored seeds to match.

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use rust_decimal::Decimal;

use super::clock::{date_sum, timestamp_digits};
use super::version::FormatVersion;
use crate::error::{CodecError, Result};
use crate::math::isqrt;

pub const DEFAULT_EXPONENT: u32 = 73;
pub const DEFAULT_ADDITIVE: f64 = 713_853.587;

const TIMED_EXPONENT: u32 = 17;
const PATH_EXPONENT: u32 = 2;
const DIVISOR_ADDITIVE: f64 = 0.587;
const PATH_SEED_MULTIPLIER: u32 = 15_439_813;

const MAX_DECIMAL_SCALE: u32 = 28;

/// Integer part of π.
const PI_FLOOR: u32 = 3;

/// Seed used for every header record, and for the payload of versions
/// that do not store their own seed.
pub fn derive_base_seed(seed: i64) -> Result<BigInt> {
    derive_seed_with(seed, DEFAULT_EXPONENT, DEFAULT_ADDITIVE)
}

/// `isqrt((|seed|·3)^exponent · (trunc(additive) + |seed|·3))`
pub fn derive_seed_with(seed: i64, exponent: u32, additive: f64) -> Result<BigInt> {
    let scaled = BigInt::from(seed.unsigned_abs()) * PI_FLOOR;
    let additive = BigInt::from_f64(additive.trunc()).unwrap_or_default();
    isqrt(&(scaled.pow(exponent) * (additive + &scaled)))
}

/// The payload seed stored in the second header record.
pub fn derive_payload_seed(
    seed: i64,
    version: FormatVersion,
    file_path: &Path,
    now: NaiveDateTime,
) -> Result<BigInt> {
    match version {
        FormatVersion::Legacy | FormatVersion::Unknown(_) => derive_base_seed(seed),
        FormatVersion::Timed => timed_seed(seed, now),
        FormatVersion::PathBound | FormatVersion::Expiring => {
            path_bound_seed(seed, version, file_path, now)
        }
    }
}

/// Seed for the payload generator, given the seed recovered from the header.
///
/// Path-bound versions fold in the absolute path of the file being read or
/// written, and expiring files fold in the current date, so both have to be
/// reproduced at decode time.
pub fn generator_seed(
    version: FormatVersion,
    payload_seed: BigInt,
    file_path: &Path,
    now: NaiveDateTime,
) -> Result<BigInt> {
    match version {
        FormatVersion::PathBound => Ok(payload_seed * path_number(file_path)?),
        FormatVersion::Expiring => {
            Ok(payload_seed * path_number(file_path)? * date_sum(now))
        }
        FormatVersion::Legacy | FormatVersion::Timed | FormatVersion::Unknown(_) => {
            Ok(payload_seed)
        }
    }
}

/// Folds the UTF-8 bytes of the absolute path into a wrapping `i32`,
/// dropping every `0` digit after each multiplication.
pub fn path_number(file_path: &Path) -> Result<i32> {
    let absolute = std::path::absolute(file_path)?;
    let text = absolute.to_string_lossy();
    Ok(text
        .as_bytes()
        .iter()
        .fold(1i32, |acc, &byte| strip_zero_digits_i32(acc.wrapping_mul(byte as i32))))
}

fn strip_zero_digits_i32(value: i32) -> i32 {
    value.to_string().replace('0', "").parse().unwrap_or(1)
}

fn timed_seed(seed: i64, now: NaiveDateTime) -> Result<BigInt> {
    let version = FormatVersion::Timed;
    let stamp = BigInt::from_str(&timestamp_digits(now))
        .map_err(|e| derivation_error(version, e.to_string()))?;
    let divisor = derive_seed_with(seed, TIMED_EXPONENT, DIVISOR_ADDITIVE)?;
    if divisor.is_zero() {
        return Err(derivation_error(version, "seed 0 yields a zero divisor"));
    }
    Ok(stamp / divisor)
}

fn path_bound_seed(
    seed: i64,
    version: FormatVersion,
    file_path: &Path,
    now: NaiveDateTime,
) -> Result<BigInt> {
    let path_num = path_number(file_path)?;

    let divisor = derive_seed_with(seed, PATH_EXPONENT, DIVISOR_ADDITIVE)?;
    if divisor.is_zero() {
        return Err(derivation_error(version, "seed 0 yields a zero divisor"));
    }
    let digits = timestamp_digits(now);
    let now_num = match Decimal::from_str(&divisor.to_string()) {
        Ok(small) => Decimal::from_str(&digits)
            .map_err(|e| derivation_error(version, e.to_string()))?
            .checked_div(small)
            .ok_or_else(|| derivation_error(version, "timestamp division overflow"))?,
        Err(_) => wide_quotient(&digits, &divisor)
            .ok_or_else(|| derivation_error(version, "timestamp quotient out of range"))?,
    };
    let product = Decimal::from(path_num)
        .checked_mul(now_num)
        .ok_or_else(|| derivation_error(version, "path product overflow"))?;

    let mixed = parse_stripped_decimal(&strip_zero_digits(&product.normalize().to_string()))
        .map_err(|reason| derivation_error(version, reason))?;

    // exact in BigInt: the decimal result can exceed Decimal::MAX
    let scaled = BigInt::from(mixed.mantissa()) * PATH_SEED_MULTIPLIER;
    Ok(scaled / BigInt::from(10u32).pow(mixed.scale()))
}

/// `stamp / divisor` truncated to the maximum decimal scale, for divisors
/// too wide for `Decimal`. Only the quotient has to fit.
fn wide_quotient(stamp: &str, divisor: &BigInt) -> Option<Decimal> {
    let stamp = BigInt::from_str(stamp).ok()?;
    let mantissa = stamp * BigInt::from(10u32).pow(MAX_DECIMAL_SCALE) / divisor;
    Decimal::try_from_i128_with_scale(mantissa.to_i128()?, MAX_DECIMAL_SCALE).ok()
}

/// Removes `0` digits and exponent markers from a decimal rendering.
pub fn strip_zero_digits(text: &str) -> String {
    text.replace('0', "").replace("E+", "").replace("e+", "")
}

fn parse_stripped_decimal(text: &str) -> std::result::Result<Decimal, String> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let digits = digits.trim_end_matches('.');
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let padded = if digits.starts_with('.') {
        format!("{sign}0{digits}")
    } else {
        format!("{sign}{digits}")
    };
    Decimal::from_str(&padded).map_err(|e| format!("cannot re-parse '{padded}': {e}"))
}

fn derivation_error(version: FormatVersion, reason: impl Into<String>) -> CodecError {
    CodecError::SeedDerivation { version: version.tag(), reason: reason.into() }
}
