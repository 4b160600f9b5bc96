//! Abstract coercion operations
//!
//! The conversions the object core needs: ToBoolean lives on `Value`; the
//! fallible, potentially re-entrant ones live here. Coercing an object calls
//! its `valueOf`/`toString` callables, which may synchronously mutate any
//! reachable object — callers that hold validity assumptions (typed-array
//! views especially) must re-check them after every call into this module.

use std::sync::Arc;

use crate::bigint::JsBigInt;
use crate::error::{EngineError, EngineResult};
use crate::object::PropertyKey;
use crate::string::JsString;
use crate::value::Value;

/// Hint passed to ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// `valueOf` first
    Number,
    /// `toString` first
    String,
    /// Same ordering as Number
    Default,
}

/// ToPrimitive: convert an object to a non-object value via its own
/// `valueOf`/`toString` methods. Non-objects pass through unchanged.
pub fn to_primitive(value: &Value, hint: PreferredType) -> EngineResult<Value> {
    let Some(obj) = value.as_object() else {
        return Ok(value.clone());
    };

    let method_names: [&str; 2] = match hint {
        PreferredType::String => ["toString", "valueOf"],
        PreferredType::Number | PreferredType::Default => ["valueOf", "toString"],
    };

    for name in method_names {
        let method = obj.get(&PropertyKey::string(name), value)?;
        if method.is_callable() {
            let result = method.call(value, &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }

    Err(EngineError::type_error(
        "Cannot convert object to primitive value",
    ))
}

/// ToNumber
pub fn to_number(value: &Value) -> EngineResult<f64> {
    match value {
        Value::Undefined => Ok(f64::NAN),
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => Ok(string_to_number(&s.to_std_string())),
        Value::Symbol(_) => Err(EngineError::type_error(
            "Cannot convert a Symbol value to a number",
        )),
        Value::BigInt(_) => Err(EngineError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
        Value::Object(_) => {
            let prim = to_primitive(value, PreferredType::Number)?;
            to_number(&prim)
        }
    }
}

/// StringToNumber: trimmed numeric literal grammar, radix prefixes included.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let bytes = t.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return radix_to_number(&t[2..], radix);
        }
    }

    // Reject the spellings Rust's parser accepts but JS does not
    // ("inf", "NaN", leading/trailing junk is already handled by parse).
    if t.bytes()
        .any(|b| !matches!(b, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

fn radix_to_number(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = value * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    value
}

/// ToIntegerOrInfinity
pub fn to_integer_or_infinity(value: &Value) -> EngineResult<f64> {
    let n = to_number(value)?;
    if n.is_nan() || n == 0.0 {
        return Ok(0.0);
    }
    if n.is_infinite() {
        return Ok(n);
    }
    Ok(n.trunc())
}

/// ToUint32 (pure, on an already-coerced Number)
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulus = 4294967296.0; // 2^32
    let mut r = n.trunc() % modulus;
    if r < 0.0 {
        r += modulus;
    }
    r as u32
}

/// ToInt32 (pure)
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToInt16 (pure)
pub fn to_int16(n: f64) -> i16 {
    to_uint32(n) as u16 as i16
}

/// ToUint16 (pure)
pub fn to_uint16(n: f64) -> u16 {
    to_uint32(n) as u16
}

/// ToInt8 (pure)
pub fn to_int8(n: f64) -> i8 {
    to_uint32(n) as u8 as i8
}

/// ToUint8 (pure)
pub fn to_uint8(n: f64) -> u8 {
    to_uint32(n) as u8
}

/// ToUint8Clamp (pure): clamp to [0, 255] with round-half-to-even
pub fn to_uint8_clamp(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let floor = n.floor();
    let frac = n - floor;
    let rounded = if frac < 0.5 {
        floor
    } else if frac > 0.5 {
        floor + 1.0
    } else if (floor as u64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    rounded as u8
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// ToLength: integer clamped to [0, 2^53-1]
pub fn to_length(value: &Value) -> EngineResult<u64> {
    let n = to_integer_or_infinity(value)?;
    if n <= 0.0 {
        return Ok(0);
    }
    Ok(n.min(MAX_SAFE_INTEGER) as u64)
}

/// ToIndex: non-negative integer fitting the address space
pub fn to_index(value: &Value) -> EngineResult<usize> {
    if value.is_undefined() {
        return Ok(0);
    }
    let n = to_integer_or_infinity(value)?;
    if n < 0.0 || n > MAX_SAFE_INTEGER {
        return Err(EngineError::range_error("Invalid index"));
    }
    if n > usize::MAX as f64 {
        return Err(EngineError::range_error("Invalid index"));
    }
    Ok(n as usize)
}

/// Number-to-String with JS formatting for the common shapes
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == f64::INFINITY {
        return "Infinity".to_string();
    }
    if n == f64::NEG_INFINITY {
        return "-Infinity".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        let mut buf = itoa::Buffer::new();
        return buf.format(n as i64).to_string();
    }
    let mut buf = ryu::Buffer::new();
    let printed = buf.format(n);
    // ryu writes "1e21" where JS writes "1e+21"
    if let Some(pos) = printed.find('e') {
        let (mantissa, exp) = printed.split_at(pos);
        let exp_digits = &exp[1..];
        if !exp_digits.starts_with('-') {
            return format!("{mantissa}e+{exp_digits}");
        }
    }
    printed.to_string()
}

/// ToString
pub fn to_string(value: &Value) -> EngineResult<Arc<JsString>> {
    match value {
        Value::Undefined => Ok(JsString::intern("undefined")),
        Value::Null => Ok(JsString::intern("null")),
        Value::Boolean(b) => Ok(JsString::intern(if *b { "true" } else { "false" })),
        Value::Number(n) => Ok(JsString::intern(&number_to_string(*n))),
        Value::BigInt(b) => {
            let digits = b.to_string_radix(10)?;
            Ok(JsString::intern(&digits))
        }
        Value::String(s) => Ok(s.clone()),
        Value::Symbol(_) => Err(EngineError::type_error(
            "Cannot convert a Symbol value to a string",
        )),
        Value::Object(_) => {
            let prim = to_primitive(value, PreferredType::String)?;
            to_string(&prim)
        }
    }
}

/// ToPropertyKey
pub fn to_property_key(value: &Value) -> EngineResult<PropertyKey> {
    let prim = to_primitive(value, PreferredType::String)?;
    if let Some(sym) = prim.as_symbol() {
        return Ok(PropertyKey::Symbol(sym.clone()));
    }
    Ok(PropertyKey::from_js_string(to_string(&prim)?))
}

/// Loose equality (`==`) with the fixed coercion table
pub fn loose_equals(a: &Value, b: &Value) -> EngineResult<bool> {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(true),
        (Value::Number(_), Value::Number(_))
        | (Value::BigInt(_), Value::BigInt(_))
        | (Value::String(_), Value::String(_))
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::Symbol(_), Value::Symbol(_))
        | (Value::Object(_), Value::Object(_)) => Ok(a.strict_equals(b)),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            Ok(*n == string_to_number(&s.to_std_string()))
        }
        (Value::BigInt(big), Value::String(s)) | (Value::String(s), Value::BigInt(big)) => {
            match JsBigInt::parse(&s.to_std_string()) {
                Ok(parsed) => Ok(**big == parsed),
                Err(_) => Ok(false),
            }
        }
        (Value::BigInt(big), Value::Number(n)) | (Value::Number(n), Value::BigInt(big)) => {
            Ok(big.equals_number(*n))
        }
        (Value::Boolean(x), other) => {
            loose_equals(&Value::number(if *x { 1.0 } else { 0.0 }), other)
        }
        (other, Value::Boolean(x)) => {
            loose_equals(other, &Value::number(if *x { 1.0 } else { 0.0 }))
        }
        (Value::Object(_), _) => {
            let prim = to_primitive(a, PreferredType::Default)?;
            loose_equals(&prim, b)
        }
        (_, Value::Object(_)) => {
            let prim = to_primitive(b, PreferredType::Default)?;
            loose_equals(a, &prim)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::JsObject;

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("0o17"), 15.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("NaN").is_nan());
        assert_eq!(string_to_number("1e3"), 1000.0);
    }

    #[test]
    fn test_to_uint32_wrapping() {
        assert_eq!(to_uint32(-1.0), u32::MAX);
        assert_eq!(to_uint32(4294967296.0), 0);
        assert_eq!(to_uint32(f64::NAN), 0);
        assert_eq!(to_int32(2147483648.0), i32::MIN);
    }

    #[test]
    fn test_uint8_clamp_round_half_even() {
        assert_eq!(to_uint8_clamp(0.5), 0);
        assert_eq!(to_uint8_clamp(1.5), 2);
        assert_eq!(to_uint8_clamp(2.5), 2);
        assert_eq!(to_uint8_clamp(300.0), 255);
        assert_eq!(to_uint8_clamp(-7.0), 0);
        assert_eq!(to_uint8_clamp(f64::NAN), 0);
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-1.5), "-1.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_to_number_rejects_symbol_and_bigint() {
        let sym = Value::symbol(crate::value::JsSymbol::new(None));
        assert!(to_number(&sym).unwrap_err().is_type_error());
        let big = Value::bigint(JsBigInt::from_i64(1));
        assert!(to_number(&big).unwrap_err().is_type_error());
    }

    #[test]
    fn test_to_number_calls_value_of() {
        let obj = JsObject::new(None);
        obj.set_native_property("valueOf", |_this, _args| Ok(Value::number(7.0)));
        assert_eq!(to_number(&Value::object(obj)).unwrap(), 7.0);
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(&Value::number(3.0)).unwrap(), 3);
        assert_eq!(to_index(&Value::undefined()).unwrap(), 0);
        assert!(to_index(&Value::number(-1.0)).unwrap_err().is_range_error());
        assert!(
            to_index(&Value::number(f64::INFINITY))
                .unwrap_err()
                .is_range_error()
        );
    }

    #[test]
    fn test_loose_equality_table() {
        assert!(loose_equals(&Value::null(), &Value::undefined()).unwrap());
        assert!(loose_equals(&Value::number(1.0), &Value::string("1")).unwrap());
        assert!(
            loose_equals(
                &Value::bigint(JsBigInt::from_i64(15)),
                &Value::string("0xf")
            )
            .unwrap()
        );
        assert!(
            loose_equals(&Value::bigint(JsBigInt::from_i64(1)), &Value::number(1.0)).unwrap()
        );
        assert!(!loose_equals(&Value::string("x"), &Value::number(1.0)).unwrap());
    }

    #[test]
    fn test_to_length_clamps() {
        assert_eq!(to_length(&Value::number(-5.0)).unwrap(), 0);
        assert_eq!(
            to_length(&Value::number(1e300)).unwrap(),
            9_007_199_254_740_991
        );
    }
}
