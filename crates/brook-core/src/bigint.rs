//! Arbitrary-precision BigInt values
//!
//! Backed by `num-bigint`, whose sign-and-magnitude limb storage is canonical
//! by construction (no leading zero limbs, zero is unsigned). Values are
//! immutable; arithmetic always produces a new value.
//!
//! The string parser here implements the runtime String-to-BigInt coercion
//! path, which is stricter than literal lexing: no `n` suffix, and an
//! explicit sign is only legal for base-10 input.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, One, Pow, Signed, ToPrimitive, Zero};

use crate::error::{EngineError, EngineResult};

const PARSE_ERROR: &str = "Failed to parse String to BigInt";

/// An immutable arbitrary-precision integer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsBigInt {
    value: BigInt,
}

impl JsBigInt {
    /// Wrap a raw `BigInt`
    pub fn new(value: BigInt) -> Self {
        Self { value }
    }

    /// The value zero
    pub fn zero() -> Self {
        Self::new(BigInt::zero())
    }

    /// Construct from a signed 64-bit integer
    pub fn from_i64(v: i64) -> Self {
        Self::new(BigInt::from(v))
    }

    /// Construct from an unsigned 64-bit integer
    pub fn from_u64(v: u64) -> Self {
        Self::new(BigInt::from(v))
    }

    /// Borrow the underlying `BigInt`
    pub fn as_inner(&self) -> &BigInt {
        &self.value
    }

    /// True if the value is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Runtime String-to-BigInt coercion.
    ///
    /// Trims ASCII whitespace, treats empty input as zero, accepts an
    /// optional single `+`/`-` for base-10 only, and recognizes `0x`/`0o`/
    /// `0b` radix prefixes. Every digit must be valid for the selected base;
    /// a trailing `n` suffix is rejected.
    pub fn parse(input: &str) -> EngineResult<Self> {
        let s = input.trim_matches(|c: char| c.is_ascii_whitespace());
        if s.is_empty() {
            return Ok(Self::zero());
        }

        let bytes = s.as_bytes();
        let (negative, rest) = match bytes[0] {
            b'+' => (false, &bytes[1..]),
            b'-' => (true, &bytes[1..]),
            _ => (false, bytes),
        };
        let explicit_sign = rest.len() != bytes.len();

        let (radix, digits) = if rest.len() >= 2 && rest[0] == b'0' {
            match rest[1] {
                b'x' | b'X' => (16u32, &rest[2..]),
                b'o' | b'O' => (8u32, &rest[2..]),
                b'b' | b'B' => (2u32, &rest[2..]),
                _ => (10u32, rest),
            }
        } else {
            (10u32, rest)
        };

        // A sign combined with a radix prefix is malformed ("+0x10").
        if explicit_sign && radix != 10 {
            return Err(EngineError::syntax_error(PARSE_ERROR));
        }
        if digits.is_empty() {
            return Err(EngineError::syntax_error(PARSE_ERROR));
        }

        let mut magnitude = BigInt::zero();
        let big_radix = BigInt::from(radix);
        for &b in digits {
            let digit = match b {
                b'0'..=b'9' => (b - b'0') as u32,
                b'a'..=b'f' => (b - b'a') as u32 + 10,
                b'A'..=b'F' => (b - b'A') as u32 + 10,
                // Covers the `n` literal suffix as well: this path coerces
                // runtime strings, not source literals.
                _ => return Err(EngineError::syntax_error(PARSE_ERROR)),
            };
            if digit >= radix {
                return Err(EngineError::syntax_error(PARSE_ERROR));
            }
            magnitude = magnitude * &big_radix + BigInt::from(digit);
        }

        Ok(Self::new(if negative { -magnitude } else { magnitude }))
    }

    /// Number-to-BigInt conversion; only integral finite values are legal.
    pub fn from_number(n: f64) -> EngineResult<Self> {
        if !n.is_finite() || n.fract() != 0.0 {
            return Err(EngineError::range_error(
                "Not an integer",
            ));
        }
        BigInt::from_f64(n)
            .map(Self::new)
            .ok_or_else(|| EngineError::range_error("Not an integer"))
    }

    /// Minimal correctly-signed digit string in the given radix (2..=36),
    /// lowercase digits, no leading zeros.
    pub fn to_string_radix(&self, radix: u32) -> EngineResult<String> {
        if !(2..=36).contains(&radix) {
            return Err(EngineError::range_error(
                "toString() radix argument must be between 2 and 36",
            ));
        }
        Ok(self.value.to_str_radix(radix))
    }

    /// Lossy conversion to f64 (rounds to nearest representable double)
    pub fn to_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(f64::INFINITY)
    }

    /// Exact mathematical comparison against a Number. `None` for NaN.
    pub fn partial_cmp_number(&self, n: f64) -> Option<Ordering> {
        if n.is_nan() {
            return None;
        }
        if n == f64::INFINITY {
            return Some(Ordering::Less);
        }
        if n == f64::NEG_INFINITY {
            return Some(Ordering::Greater);
        }
        if n.fract() == 0.0 {
            // Integral doubles convert exactly
            let other = BigInt::from_f64(n)?;
            return Some(self.value.cmp(&other));
        }
        // Non-integral: compare against floor(n). self <= floor(n) < n means
        // less; self > floor(n) means self >= floor(n)+1 > n.
        let floor = BigInt::from_f64(n.floor())?;
        if self.value <= floor {
            Some(Ordering::Less)
        } else {
            Some(Ordering::Greater)
        }
    }

    /// Loose (`==`) equality against a Number: exact mathematical equality,
    /// no double rounding.
    pub fn equals_number(&self, n: f64) -> bool {
        self.partial_cmp_number(n) == Some(Ordering::Equal)
    }

    /// Addition
    pub fn add(&self, other: &JsBigInt) -> JsBigInt {
        Self::new(&self.value + &other.value)
    }

    /// Subtraction
    pub fn sub(&self, other: &JsBigInt) -> JsBigInt {
        Self::new(&self.value - &other.value)
    }

    /// Multiplication
    pub fn mul(&self, other: &JsBigInt) -> JsBigInt {
        Self::new(&self.value * &other.value)
    }

    /// Truncating division; division by zero is a RangeError.
    pub fn div(&self, other: &JsBigInt) -> EngineResult<JsBigInt> {
        if other.value.is_zero() {
            return Err(EngineError::range_error("Division by zero"));
        }
        Ok(Self::new(&self.value / &other.value))
    }

    /// Remainder with the sign of the dividend; zero divisor is a RangeError.
    pub fn rem(&self, other: &JsBigInt) -> EngineResult<JsBigInt> {
        if other.value.is_zero() {
            return Err(EngineError::range_error("Division by zero"));
        }
        Ok(Self::new(&self.value % &other.value))
    }

    /// Exponentiation; negative exponents are a RangeError, oversized ones
    /// would exhaust memory and are rejected up front.
    pub fn pow(&self, exponent: &JsBigInt) -> EngineResult<JsBigInt> {
        if exponent.value.is_negative() {
            return Err(EngineError::range_error(
                "Exponent must be non-negative",
            ));
        }
        let exp = exponent
            .value
            .to_u32()
            .ok_or_else(|| EngineError::range_error("Maximum BigInt size exceeded"))?;
        Ok(Self::new(Pow::pow(&self.value, exp)))
    }

    /// Negation
    pub fn neg(&self) -> JsBigInt {
        Self::new(-&self.value)
    }

    /// Wrap into the unsigned 64-bit range (for BigUint64 elements)
    pub fn to_wrapped_u64(&self) -> u64 {
        let two64 = BigInt::one() << 64u32;
        let mut r = &self.value % &two64;
        if r.is_negative() {
            r += &two64;
        }
        // r is now in [0, 2^64)
        r.to_u64().unwrap_or(0)
    }

    /// Wrap into the signed 64-bit range (for BigInt64 elements)
    pub fn to_wrapped_i64(&self) -> i64 {
        self.to_wrapped_u64() as i64
    }
}

impl PartialOrd for JsBigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JsBigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl std::fmt::Display for JsBigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(JsBigInt::parse("123").unwrap(), JsBigInt::from_i64(123));
        assert_eq!(JsBigInt::parse("-45").unwrap(), JsBigInt::from_i64(-45));
        assert_eq!(JsBigInt::parse("+45").unwrap(), JsBigInt::from_i64(45));
        assert_eq!(JsBigInt::parse("  7\t").unwrap(), JsBigInt::from_i64(7));
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(JsBigInt::parse("").unwrap(), JsBigInt::zero());
        assert_eq!(JsBigInt::parse("   ").unwrap(), JsBigInt::zero());
    }

    #[test]
    fn test_parse_radix_prefixes() {
        assert_eq!(JsBigInt::parse("0b1111").unwrap(), JsBigInt::from_i64(15));
        assert_eq!(JsBigInt::parse("0o17").unwrap(), JsBigInt::from_i64(15));
        assert_eq!(JsBigInt::parse("0xFf").unwrap(), JsBigInt::from_i64(255));
        assert_eq!(JsBigInt::parse("0B10").unwrap(), JsBigInt::from_i64(2));
    }

    #[test]
    fn test_parse_invalid_digit_for_base() {
        assert!(JsBigInt::parse("0o8").unwrap_err().is_syntax_error());
        assert!(JsBigInt::parse("0b2").unwrap_err().is_syntax_error());
        assert!(JsBigInt::parse("0xg").unwrap_err().is_syntax_error());
        assert!(JsBigInt::parse("12a").unwrap_err().is_syntax_error());
    }

    #[test]
    fn test_parse_sign_with_prefix_rejected() {
        assert!(JsBigInt::parse("-0x10").unwrap_err().is_syntax_error());
        assert!(JsBigInt::parse("+0b1").unwrap_err().is_syntax_error());
    }

    #[test]
    fn test_parse_literal_suffix_rejected() {
        assert!(JsBigInt::parse("123n").unwrap_err().is_syntax_error());
    }

    #[test]
    fn test_parse_bare_prefix_rejected() {
        assert!(JsBigInt::parse("0x").unwrap_err().is_syntax_error());
        assert!(JsBigInt::parse("-").unwrap_err().is_syntax_error());
    }

    #[test]
    fn test_from_number() {
        assert_eq!(JsBigInt::from_number(42.0).unwrap(), JsBigInt::from_i64(42));
        assert_eq!(
            JsBigInt::from_number(-0.0).unwrap(),
            JsBigInt::zero()
        );
        assert!(JsBigInt::from_number(1.5).unwrap_err().is_range_error());
        assert!(JsBigInt::from_number(f64::NAN).unwrap_err().is_range_error());
        assert!(
            JsBigInt::from_number(f64::INFINITY)
                .unwrap_err()
                .is_range_error()
        );
    }

    #[test]
    fn test_to_string_radix() {
        let v = JsBigInt::from_i64(255);
        assert_eq!(v.to_string_radix(16).unwrap(), "ff");
        assert_eq!(v.to_string_radix(2).unwrap(), "11111111");
        assert_eq!(v.to_string_radix(10).unwrap(), "255");
        assert!(v.to_string_radix(1).unwrap_err().is_range_error());
        assert!(v.to_string_radix(37).unwrap_err().is_range_error());
    }

    #[test]
    fn test_round_trip_ignores_leading_zeros_and_whitespace() {
        let v = JsBigInt::parse("  0x00ff ").unwrap();
        assert_eq!(v.to_string_radix(16).unwrap(), "ff");
        let v = JsBigInt::parse("-000123").unwrap();
        assert_eq!(v.to_string_radix(10).unwrap(), "-123");
    }

    #[test]
    fn test_exact_number_comparison() {
        // 2^53 + 1 is not representable as f64; 2^53 and 2^53+2 are.
        let big = JsBigInt::parse("9007199254740993").unwrap();
        assert_eq!(
            big.partial_cmp_number(9007199254740992.0),
            Some(Ordering::Greater)
        );
        assert_eq!(
            big.partial_cmp_number(9007199254740994.0),
            Some(Ordering::Less)
        );
        assert!(!big.equals_number(9007199254740992.0));
    }

    #[test]
    fn test_fractional_comparison() {
        let v = JsBigInt::from_i64(2);
        assert_eq!(v.partial_cmp_number(2.5), Some(Ordering::Less));
        assert_eq!(v.partial_cmp_number(1.5), Some(Ordering::Greater));
        assert_eq!(v.partial_cmp_number(-2.5), Some(Ordering::Greater));
        assert_eq!(v.partial_cmp_number(f64::NAN), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = JsBigInt::from_i64(10);
        let b = JsBigInt::from_i64(3);
        assert_eq!(a.add(&b), JsBigInt::from_i64(13));
        assert_eq!(a.sub(&b), JsBigInt::from_i64(7));
        assert_eq!(a.mul(&b), JsBigInt::from_i64(30));
        assert_eq!(a.div(&b).unwrap(), JsBigInt::from_i64(3));
        assert_eq!(a.rem(&b).unwrap(), JsBigInt::from_i64(1));
        assert_eq!(a.neg(), JsBigInt::from_i64(-10));
        assert_eq!(
            JsBigInt::from_i64(-10).rem(&b).unwrap(),
            JsBigInt::from_i64(-1)
        );
    }

    #[test]
    fn test_division_by_zero() {
        let a = JsBigInt::from_i64(1);
        assert!(a.div(&JsBigInt::zero()).unwrap_err().is_range_error());
        assert!(a.rem(&JsBigInt::zero()).unwrap_err().is_range_error());
    }

    #[test]
    fn test_pow() {
        let a = JsBigInt::from_i64(2);
        assert_eq!(a.pow(&JsBigInt::from_i64(10)).unwrap(), JsBigInt::from_i64(1024));
        assert!(a.pow(&JsBigInt::from_i64(-1)).unwrap_err().is_range_error());
    }

    #[test]
    fn test_wrapping_conversions() {
        let v = JsBigInt::from_i64(-1);
        assert_eq!(v.to_wrapped_u64(), u64::MAX);
        assert_eq!(v.to_wrapped_i64(), -1);

        let big = JsBigInt::parse("18446744073709551617").unwrap(); // 2^64 + 1
        assert_eq!(big.to_wrapped_u64(), 1);
    }
}
