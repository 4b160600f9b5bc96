//! Host-configurable resource bounds
//!
//! The "Out of memory" RangeError boundary is implementation-defined, so it
//! lives here as configuration instead of a hard-coded 32-bit literal.

/// Allocation limits consulted by string and buffer materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum string length in UTF-16 code units
    pub max_string_length: usize,
    /// Maximum ArrayBuffer byte length
    pub max_byte_length: usize,
    /// Bound on prototype-chain walks (belt and braces; the visited set is
    /// the primary termination guarantee)
    pub max_prototype_chain: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_string_length: 0x7FFF_FFFF,
            max_byte_length: 0x7FFF_FFFF,
            max_prototype_chain: 1 << 16,
        }
    }
}

impl Limits {
    /// Limits with a custom string bound, other fields defaulted
    pub fn with_max_string_length(max_string_length: usize) -> Self {
        Self {
            max_string_length,
            ..Self::default()
        }
    }

    /// Limits with a custom buffer bound, other fields defaulted
    pub fn with_max_byte_length(max_byte_length: usize) -> Self {
        Self {
            max_byte_length,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let l = Limits::default();
        assert_eq!(l.max_string_length, 0x7FFF_FFFF);
        assert_eq!(l.max_byte_length, 0x7FFF_FFFF);
    }

    #[test]
    fn test_custom_string_bound() {
        let l = Limits::with_max_string_length(16);
        assert_eq!(l.max_string_length, 16);
        assert_eq!(l.max_byte_length, Limits::default().max_byte_length);
    }
}
