//! ArrayBuffer byte storage
//!
//! A buffer is in one of three states: live with a fixed capacity, live and
//! resizable up to a declared maximum, or detached. Detaching drops the
//! bytes immediately; every view over the buffer observes the change on its
//! next access. The record is shared between the owning ArrayBuffer object
//! and any number of TypedArray views.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::limits::Limits;

const DETACHED_BUFFER: &str = "ArrayBuffer is detached";

/// Backing store of an ArrayBuffer
pub struct ArrayBufferRecord {
    /// `None` once detached
    data: RwLock<Option<Vec<u8>>>,
    /// `Some` for resizable buffers
    max_byte_length: Option<usize>,
}

impl ArrayBufferRecord {
    /// Allocate a fixed-length buffer, zero-filled
    pub fn new(byte_length: usize, limits: &Limits) -> EngineResult<Arc<Self>> {
        if byte_length > limits.max_byte_length {
            return Err(EngineError::range_error("Out of memory"));
        }
        Ok(Arc::new(Self {
            data: RwLock::new(Some(vec![0; byte_length])),
            max_byte_length: None,
        }))
    }

    /// Allocate a resizable buffer with the given maximum capacity
    pub fn new_resizable(
        byte_length: usize,
        max_byte_length: usize,
        limits: &Limits,
    ) -> EngineResult<Arc<Self>> {
        if byte_length > max_byte_length {
            return Err(EngineError::range_error(
                "ArrayBuffer length exceeds maxByteLength",
            ));
        }
        if max_byte_length > limits.max_byte_length {
            return Err(EngineError::range_error("Out of memory"));
        }
        Ok(Arc::new(Self {
            data: RwLock::new(Some(vec![0; byte_length])),
            max_byte_length: Some(max_byte_length),
        }))
    }

    /// Wrap existing bytes as a fixed-length buffer
    pub fn from_bytes(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data: RwLock::new(Some(bytes)),
            max_byte_length: None,
        })
    }

    /// Current length in bytes; 0 once detached
    pub fn byte_length(&self) -> usize {
        self.data.read().as_ref().map(|d| d.len()).unwrap_or(0)
    }

    /// The declared maximum, for resizable buffers
    pub fn max_byte_length(&self) -> Option<usize> {
        self.max_byte_length
    }

    /// True for resizable buffers (even after detach)
    pub fn is_resizable(&self) -> bool {
        self.max_byte_length.is_some()
    }

    /// True once the bytes have been released
    pub fn is_detached(&self) -> bool {
        self.data.read().is_none()
    }

    /// Release the bytes. Idempotent.
    pub fn detach(&self) {
        *self.data.write() = None;
    }

    /// Resize a resizable buffer. Growing zero-fills the new tail; shrinking
    /// truncates in place.
    pub fn resize(&self, new_byte_length: usize) -> EngineResult<()> {
        let Some(max) = self.max_byte_length else {
            return Err(EngineError::type_error(
                "ArrayBuffer is not resizable",
            ));
        };
        if new_byte_length > max {
            return Err(EngineError::range_error(
                "ArrayBuffer resize exceeds maxByteLength",
            ));
        }
        let mut guard = self.data.write();
        match guard.as_mut() {
            Some(data) => {
                data.resize(new_byte_length, 0);
                Ok(())
            }
            None => Err(EngineError::type_error(DETACHED_BUFFER)),
        }
    }

    /// Copy out `[start, end)` as a fresh fixed-length buffer
    pub fn slice(&self, start: usize, end: usize) -> EngineResult<Arc<Self>> {
        let guard = self.data.read();
        let Some(data) = guard.as_ref() else {
            return Err(EngineError::type_error(DETACHED_BUFFER));
        };
        let start = start.min(data.len());
        let end = end.clamp(start, data.len());
        Ok(Self::from_bytes(data[start..end].to_vec()))
    }

    /// Move the bytes into a fresh buffer of `new_byte_length`, detaching
    /// this one. Shorter lengths truncate, longer lengths zero-fill.
    pub fn transfer(&self, new_byte_length: usize, limits: &Limits) -> EngineResult<Arc<Self>> {
        if new_byte_length > limits.max_byte_length {
            return Err(EngineError::range_error("Out of memory"));
        }
        let mut guard = self.data.write();
        let Some(mut data) = guard.take() else {
            return Err(EngineError::type_error(DETACHED_BUFFER));
        };
        data.resize(new_byte_length, 0);
        Ok(Self::from_bytes(data))
    }

    /// Run `f` over the bytes; TypeError if detached
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> EngineResult<R> {
        let guard = self.data.read();
        match guard.as_ref() {
            Some(data) => Ok(f(data)),
            None => Err(EngineError::type_error(DETACHED_BUFFER)),
        }
    }

    /// Run `f` over the bytes mutably; TypeError if detached
    pub fn with_data_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> EngineResult<R> {
        let mut guard = self.data.write();
        match guard.as_mut() {
            Some(data) => Ok(f(data)),
            None => Err(EngineError::type_error(DETACHED_BUFFER)),
        }
    }
}

impl std::fmt::Debug for ArrayBufferRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayBufferRecord")
            .field("byte_length", &self.byte_length())
            .field("detached", &self.is_detached())
            .field("max_byte_length", &self.max_byte_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zero_filled() {
        let limits = Limits::default();
        let buf = ArrayBufferRecord::new(8, &limits).unwrap();
        assert_eq!(buf.byte_length(), 8);
        buf.with_data(|d| assert!(d.iter().all(|&b| b == 0))).unwrap();
    }

    #[test]
    fn test_detach() {
        let limits = Limits::default();
        let buf = ArrayBufferRecord::new(4, &limits).unwrap();
        buf.detach();
        assert!(buf.is_detached());
        assert_eq!(buf.byte_length(), 0);
        assert!(buf.with_data(|_| ()).unwrap_err().is_type_error());
        // Second detach is a no-op.
        buf.detach();
    }

    #[test]
    fn test_resize_grow_zero_fills() {
        let limits = Limits::default();
        let buf = ArrayBufferRecord::new_resizable(2, 8, &limits).unwrap();
        buf.with_data_mut(|d| d.fill(0xFF)).unwrap();
        buf.resize(4).unwrap();
        buf.with_data(|d| assert_eq!(d, &[0xFF, 0xFF, 0, 0])).unwrap();
        buf.resize(1).unwrap();
        assert_eq!(buf.byte_length(), 1);
    }

    #[test]
    fn test_resize_limits() {
        let limits = Limits::default();
        let fixed = ArrayBufferRecord::new(2, &limits).unwrap();
        assert!(fixed.resize(4).unwrap_err().is_type_error());

        let buf = ArrayBufferRecord::new_resizable(2, 8, &limits).unwrap();
        assert!(buf.resize(9).unwrap_err().is_range_error());
        buf.detach();
        assert!(buf.resize(4).unwrap_err().is_type_error());
    }

    #[test]
    fn test_allocation_limit() {
        let limits = Limits::with_max_byte_length(16);
        assert!(ArrayBufferRecord::new(17, &limits).unwrap_err().is_range_error());
        assert!(
            ArrayBufferRecord::new_resizable(4, 32, &limits)
                .unwrap_err()
                .is_range_error()
        );
        assert!(
            ArrayBufferRecord::new_resizable(8, 4, &limits)
                .unwrap_err()
                .is_range_error()
        );
    }

    #[test]
    fn test_slice_copies() {
        let buf = ArrayBufferRecord::from_bytes(vec![1, 2, 3, 4]);
        let cut = buf.slice(1, 3).unwrap();
        cut.with_data(|d| assert_eq!(d, &[2, 3])).unwrap();
        // Mutating the source does not touch the slice.
        buf.with_data_mut(|d| d[1] = 9).unwrap();
        cut.with_data(|d| assert_eq!(d, &[2, 3])).unwrap();
    }

    #[test]
    fn test_transfer_detaches_source() {
        let limits = Limits::default();
        let buf = ArrayBufferRecord::from_bytes(vec![1, 2, 3]);
        let moved = buf.transfer(5, &limits).unwrap();
        assert!(buf.is_detached());
        moved.with_data(|d| assert_eq!(d, &[1, 2, 3, 0, 0])).unwrap();
        assert!(buf.transfer(1, &limits).unwrap_err().is_type_error());
    }
}
