//! Immutable UTF-16 JavaScript strings
//!
//! Strings are immutable sequences of UTF-16 code units and are interned for
//! deduplication where possible. Interning is best effort: on a hash
//! collision a fresh uninterned string is handed out, and equality always
//! compares code units, never pointers.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHasher;

use crate::error::{EngineError, EngineResult};
use crate::limits::Limits;

/// Global string intern table
static STRING_TABLE: std::sync::LazyLock<DashMap<u64, Arc<JsString>>> =
    std::sync::LazyLock::new(DashMap::new);

/// An immutable JavaScript string (UTF-16 code units)
pub struct JsString {
    units: Box<[u16]>,
    hash: u64,
}

impl JsString {
    fn compute_hash(units: &[u16]) -> u64 {
        let mut hasher = FxHasher::default();
        units.hash(&mut hasher);
        hasher.finish()
    }

    /// Create or retrieve an interned string from Rust text
    pub fn intern(s: &str) -> Arc<Self> {
        let units: Vec<u16> = s.encode_utf16().collect();
        Self::intern_units(units)
    }

    /// Create or retrieve an interned string from raw code units
    pub fn intern_units(units: Vec<u16>) -> Arc<Self> {
        let hash = Self::compute_hash(&units);

        if let Some(existing) = STRING_TABLE.get(&hash) {
            if existing.units.as_ref() == units.as_slice() {
                return existing.clone();
            }
            // Hash collision: hand out an uninterned string. Equality still
            // holds because comparisons go through the code units.
            return Arc::new(Self {
                units: units.into_boxed_slice(),
                hash,
            });
        }

        let js_str = Arc::new(Self {
            units: units.into_boxed_slice(),
            hash,
        });
        STRING_TABLE.insert(hash, js_str.clone());
        js_str
    }

    /// The empty string
    pub fn empty() -> Arc<Self> {
        Self::intern("")
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if the string has no code units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The raw code units
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Lossy conversion to Rust text (unpaired surrogates become U+FFFD)
    pub fn to_std_string(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    /// Exact Rust text, if every unit is well-formed UTF-16
    pub fn to_std_string_exact(&self) -> Option<String> {
        String::from_utf16(&self.units).ok()
    }

    /// True if every code unit is an ASCII character
    pub fn is_ascii(&self) -> bool {
        self.units.iter().all(|&u| u < 0x80)
    }

    /// Concatenate two strings, honoring the configured maximum length
    pub fn concat(&self, other: &JsString, limits: &Limits) -> EngineResult<Arc<JsString>> {
        let total = self.len() + other.len();
        if total > limits.max_string_length {
            return Err(EngineError::range_error("Out of memory"));
        }
        let mut units = Vec::with_capacity(total);
        units.extend_from_slice(&self.units);
        units.extend_from_slice(&other.units);
        Ok(Self::intern_units(units))
    }

    /// Repeat the string `count` times
    pub fn repeat(&self, count: usize, limits: &Limits) -> EngineResult<Arc<JsString>> {
        let total = self
            .len()
            .checked_mul(count)
            .ok_or_else(|| EngineError::range_error("Out of memory"))?;
        if total > limits.max_string_length {
            return Err(EngineError::range_error("Out of memory"));
        }
        let mut units = Vec::with_capacity(total);
        for _ in 0..count {
            units.extend_from_slice(&self.units);
        }
        Ok(Self::intern_units(units))
    }

    /// `String.prototype.padStart` semantics: left-pad with `fill` until the
    /// string is `max_length` units long. A `max_length` at or below the
    /// current length, or an empty filler, returns the string unchanged.
    pub fn pad_start(
        self: &Arc<Self>,
        max_length: u64,
        fill: &JsString,
        limits: &Limits,
    ) -> EngineResult<Arc<JsString>> {
        self.pad(max_length, fill, limits, true)
    }

    /// `String.prototype.padEnd` semantics
    pub fn pad_end(
        self: &Arc<Self>,
        max_length: u64,
        fill: &JsString,
        limits: &Limits,
    ) -> EngineResult<Arc<JsString>> {
        self.pad(max_length, fill, limits, false)
    }

    fn pad(
        self: &Arc<Self>,
        max_length: u64,
        fill: &JsString,
        limits: &Limits,
        at_start: bool,
    ) -> EngineResult<Arc<JsString>> {
        if max_length <= self.len() as u64 {
            return Ok(self.clone());
        }
        if max_length > limits.max_string_length as u64 {
            return Err(EngineError::range_error("Out of memory"));
        }
        if fill.is_empty() {
            return Ok(self.clone());
        }
        let target = max_length as usize;
        let pad_len = target - self.len();
        let mut padding = Vec::with_capacity(pad_len);
        while padding.len() < pad_len {
            let remaining = pad_len - padding.len();
            let take = remaining.min(fill.len());
            padding.extend_from_slice(&fill.units[..take]);
        }
        let mut units = Vec::with_capacity(target);
        if at_start {
            units.extend_from_slice(&padding);
            units.extend_from_slice(&self.units);
        } else {
            units.extend_from_slice(&self.units);
            units.extend_from_slice(&padding);
        }
        Ok(Self::intern_units(units))
    }

    /// Parse this string as a canonical array index (`"0"` … `"4294967294"`).
    ///
    /// Leading zeros, signs, or any non-digit disqualify the string, as does
    /// a value at or above 2^32-1.
    pub fn as_array_index(&self) -> Option<u32> {
        parse_array_index_units(&self.units)
    }
}

/// Canonical array-index parse over raw code units
pub(crate) fn parse_array_index_units(units: &[u16]) -> Option<u32> {
    if units.is_empty() || units.len() > 10 {
        return None;
    }
    if units[0] == b'0' as u16 && units.len() > 1 {
        return None; // not canonical: leading zero
    }
    let mut value: u64 = 0;
    for &u in units {
        if !(b'0' as u16..=b'9' as u16).contains(&u) {
            return None;
        }
        value = value * 10 + (u - b'0' as u16) as u64;
    }
    // 2^32-1 is reserved for the array length itself
    if value >= u32::MAX as u64 {
        return None;
    }
    Some(value as u32)
}

/// Canonical array-index parse over Rust text
pub fn parse_array_index(s: &str) -> Option<u32> {
    let units: Vec<u16> = s.encode_utf16().collect();
    parse_array_index_units(&units)
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.units == other.units
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for JsString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JsString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Code-unit order, which is what JS string comparison uses
        self.units.cmp(&other.units)
    }
}

impl std::fmt::Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_std_string())
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_std_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let a = JsString::intern("hello");
        let b = JsString::intern("hello");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_equality_is_by_units() {
        let a = JsString::intern("abc");
        let b = JsString::intern_units(vec![b'a' as u16, b'b' as u16, b'c' as u16]);
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_utf16_length() {
        // U+1F600 is a surrogate pair: two code units
        let s = JsString::intern("\u{1F600}");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_pad_start_scenario() {
        let limits = Limits::default();
        let s = JsString::intern(".");
        let fill = JsString::intern("!");
        let padded = s.pad_start(10, &fill, &limits).unwrap();
        assert_eq!(padded.to_std_string(), "!!!!!!!!!.");
        assert_eq!(padded.len(), 10);
    }

    #[test]
    fn test_pad_end_truncates_filler() {
        let limits = Limits::default();
        let s = JsString::intern("ab");
        let fill = JsString::intern("123");
        let padded = s.pad_end(6, &fill, &limits).unwrap();
        assert_eq!(padded.to_std_string(), "ab1231");
    }

    #[test]
    fn test_pad_short_target_is_identity() {
        let limits = Limits::default();
        let s = JsString::intern("hello");
        let fill = JsString::intern("x");
        let padded = s.pad_start(3, &fill, &limits).unwrap();
        assert!(Arc::ptr_eq(&padded, &s));
    }

    #[test]
    fn test_pad_out_of_memory() {
        let limits = Limits::with_max_string_length(100);
        let s = JsString::intern(".");
        let fill = JsString::intern("!");
        let err = s.pad_start(0x8000_0000, &fill, &limits).unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(err.message(), "Out of memory");
    }

    #[test]
    fn test_empty_filler_is_identity() {
        let limits = Limits::default();
        let s = JsString::intern("x");
        let fill = JsString::empty();
        let padded = s.pad_start(10, &fill, &limits).unwrap();
        assert!(Arc::ptr_eq(&padded, &s));
    }

    #[test]
    fn test_array_index_parse() {
        assert_eq!(parse_array_index("0"), Some(0));
        assert_eq!(parse_array_index("42"), Some(42));
        assert_eq!(parse_array_index("4294967294"), Some(4294967294));
        assert_eq!(parse_array_index("4294967295"), None); // length slot
        assert_eq!(parse_array_index("01"), None); // not canonical
        assert_eq!(parse_array_index("-1"), None);
        assert_eq!(parse_array_index(""), None);
        assert_eq!(parse_array_index("1e3"), None);
    }

    #[test]
    fn test_repeat_limit() {
        let limits = Limits::with_max_string_length(8);
        let s = JsString::intern("abc");
        assert_eq!(s.repeat(2, &limits).unwrap().to_std_string(), "abcabc");
        assert!(s.repeat(3, &limits).unwrap_err().is_range_error());
    }
}
