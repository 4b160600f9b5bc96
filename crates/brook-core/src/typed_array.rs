//! TypedArray views over ArrayBuffers
//!
//! A view either has a fixed element count or tracks the length of a
//! resizable buffer. Every access revalidates against the buffer: a view
//! whose buffer was detached, or whose window no longer fits, reports no
//! elements. Reflective getters degrade to 0; the prototype methods that
//! mutate throw instead.
//!
//! Argument coercion can run user code (valueOf, species constructors) that
//! detaches or resizes the buffer mid-operation, so every method re-checks
//! validity after each coercion checkpoint before touching bytes.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::array_buffer::ArrayBufferRecord;
use crate::convert;
use crate::error::{EngineError, EngineResult};
use crate::limits::Limits;
use crate::object::{DescriptorSpec, JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::value::{JsSymbol, Value};

/// Error message for operations on a view whose buffer is gone or whose
/// window no longer fits
pub const DETACHED_MSG: &str =
    "Underlying ArrayBuffer has been detached from the view or out-of-bounds";

/// Element type of a typed array
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ElementKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl ElementKind {
    /// Size of one element in bytes
    pub fn element_size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Uint8Clamped => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 | Self::BigInt64 | Self::BigUint64 => 8,
        }
    }

    /// Constructor name, as used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::BigInt64 => "BigInt64Array",
            Self::BigUint64 => "BigUint64Array",
        }
    }

    /// True for the two BigInt-element kinds
    pub fn is_bigint(self) -> bool {
        matches!(self, Self::BigInt64 | Self::BigUint64)
    }

    fn zero(self) -> Value {
        if self.is_bigint() {
            Value::bigint(crate::bigint::JsBigInt::zero())
        } else {
            Value::number(0.0)
        }
    }
}

/// Internal slots of a typed array view
#[derive(Clone)]
pub struct TypedArrayRecord {
    buffer: Arc<ArrayBufferRecord>,
    byte_offset: usize,
    /// `None` for length-tracking views over a resizable buffer
    length: Option<usize>,
    kind: ElementKind,
}

impl TypedArrayRecord {
    /// View over an existing buffer. `length: None` means span the rest of
    /// the buffer (length-tracking when the buffer is resizable).
    pub fn new(
        kind: ElementKind,
        buffer: Arc<ArrayBufferRecord>,
        byte_offset: usize,
        length: Option<usize>,
    ) -> EngineResult<Self> {
        let size = kind.element_size();
        if byte_offset % size != 0 {
            return Err(EngineError::range_error(format!(
                "Start offset of {} should be a multiple of {}",
                kind.name(),
                size
            )));
        }
        let buffer_len = buffer.byte_length();
        let length = match length {
            Some(n) => {
                let byte_len = n
                    .checked_mul(size)
                    .ok_or_else(|| EngineError::range_error("Invalid typed array length"))?;
                if byte_offset.checked_add(byte_len).map(|end| end > buffer_len).unwrap_or(true) {
                    return Err(EngineError::range_error("Invalid typed array length"));
                }
                Some(n)
            }
            None if buffer.is_resizable() => {
                if byte_offset > buffer_len {
                    return Err(EngineError::range_error("Invalid typed array length"));
                }
                None
            }
            None => {
                if byte_offset > buffer_len {
                    return Err(EngineError::range_error("Invalid typed array length"));
                }
                let remainder = buffer_len - byte_offset;
                if remainder % size != 0 {
                    return Err(EngineError::range_error(format!(
                        "Byte length of {} should be a multiple of {}",
                        kind.name(),
                        size
                    )));
                }
                Some(remainder / size)
            }
        };
        Ok(Self {
            buffer,
            byte_offset,
            length,
            kind,
        })
    }

    /// View construction from uncoerced offset/length values
    pub fn from_values(
        kind: ElementKind,
        buffer: Arc<ArrayBufferRecord>,
        byte_offset: &Value,
        length: Option<&Value>,
    ) -> EngineResult<Self> {
        let offset = convert::to_integer_or_infinity(byte_offset)?;
        if offset < 0.0 {
            return Err(EngineError::range_error("Offset should not be negative"));
        }
        let offset = convert::to_index(&Value::number(offset))?;
        let length = match length {
            Some(v) if !v.is_undefined() => Some(convert::to_index(v)?),
            _ => None,
        };
        Self::new(kind, buffer, offset, length)
    }

    /// Fresh view over its own zero-filled buffer
    pub fn allocate(kind: ElementKind, length: usize, limits: &Limits) -> EngineResult<Self> {
        let byte_len = length
            .checked_mul(kind.element_size())
            .ok_or_else(|| EngineError::range_error("Invalid typed array length"))?;
        let buffer = ArrayBufferRecord::new(byte_len, limits)?;
        Ok(Self {
            buffer,
            byte_offset: 0,
            length: Some(length),
            kind,
        })
    }

    /// The element kind
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The backing buffer
    pub fn buffer(&self) -> &Arc<ArrayBufferRecord> {
        &self.buffer
    }

    /// True for views that follow the buffer's current length
    pub fn is_length_tracking(&self) -> bool {
        self.length.is_none()
    }

    /// Element count, or `None` when the view is detached or out of bounds
    pub fn element_count(&self) -> Option<usize> {
        if self.buffer.is_detached() {
            return None;
        }
        let buffer_len = self.buffer.byte_length();
        let size = self.kind.element_size();
        match self.length {
            Some(n) => {
                if self.byte_offset + n * size <= buffer_len {
                    Some(n)
                } else {
                    None
                }
            }
            None => {
                if self.byte_offset <= buffer_len {
                    Some((buffer_len - self.byte_offset) / size)
                } else {
                    None
                }
            }
        }
    }

    /// `length` getter: 0 when the view is invalid
    pub fn length(&self) -> usize {
        self.element_count().unwrap_or(0)
    }

    /// `byteLength` getter: 0 when the view is invalid
    pub fn byte_length(&self) -> usize {
        self.length() * self.kind.element_size()
    }

    /// `byteOffset` getter: 0 when the view is invalid
    pub fn byte_offset(&self) -> usize {
        if self.element_count().is_some() {
            self.byte_offset
        } else {
            0
        }
    }

    /// Read element `i`; `None` when out of bounds or invalid
    pub fn read(&self, i: usize) -> Option<Value> {
        let count = self.element_count()?;
        if i >= count {
            return None;
        }
        let offset = self.byte_offset + i * self.kind.element_size();
        self.buffer
            .with_data(|data| read_raw(data, self.kind, offset))
            .ok()
    }

    /// Write a converted element at `i`; silently ignored when the index is
    /// no longer valid
    fn write(&self, i: usize, element: ElementValue) {
        let Some(count) = self.element_count() else {
            return;
        };
        if i >= count {
            return;
        }
        let offset = self.byte_offset + i * self.kind.element_size();
        let _ = self
            .buffer
            .with_data_mut(|data| write_raw(data, self.kind, offset, element));
    }
}

impl std::fmt::Debug for TypedArrayRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedArrayRecord")
            .field("kind", &self.kind.name())
            .field("byte_offset", &self.byte_offset)
            .field("length", &self.length)
            .field("valid", &self.element_count().is_some())
            .finish()
    }
}

/// A value already converted to the element's storage form
#[derive(Clone, Copy)]
enum ElementValue {
    Number(f64),
    /// Wrapped 64-bit pattern for the BigInt kinds
    Bits(u64),
}

/// Convert a language value for storage. BigInt kinds accept only BigInt
/// values; numeric kinds coerce through ToNumber and refuse BigInts.
fn convert_element(kind: ElementKind, value: &Value) -> EngineResult<ElementValue> {
    if kind.is_bigint() {
        match value {
            Value::BigInt(b) => Ok(ElementValue::Bits(b.to_wrapped_u64())),
            other => Err(EngineError::type_error(format!(
                "Cannot convert {} to a BigInt",
                other.type_of()
            ))),
        }
    } else {
        if value.is_bigint() {
            return Err(EngineError::type_error(
                "Cannot convert a BigInt value to a number",
            ));
        }
        Ok(ElementValue::Number(convert::to_number(value)?))
    }
}

fn read_raw(data: &[u8], kind: ElementKind, offset: usize) -> Value {
    macro_rules! le {
        ($ty:ty) => {{
            let mut bytes = [0u8; std::mem::size_of::<$ty>()];
            bytes.copy_from_slice(&data[offset..offset + std::mem::size_of::<$ty>()]);
            <$ty>::from_le_bytes(bytes)
        }};
    }
    match kind {
        ElementKind::Int8 => Value::number(le!(i8) as f64),
        ElementKind::Uint8 | ElementKind::Uint8Clamped => Value::number(le!(u8) as f64),
        ElementKind::Int16 => Value::number(le!(i16) as f64),
        ElementKind::Uint16 => Value::number(le!(u16) as f64),
        ElementKind::Int32 => Value::number(le!(i32) as f64),
        ElementKind::Uint32 => Value::number(le!(u32) as f64),
        ElementKind::Float32 => Value::number(le!(f32) as f64),
        ElementKind::Float64 => Value::number(le!(f64)),
        ElementKind::BigInt64 => Value::bigint(crate::bigint::JsBigInt::from_i64(le!(i64))),
        ElementKind::BigUint64 => Value::bigint(crate::bigint::JsBigInt::from_u64(le!(u64))),
    }
}

fn write_raw(data: &mut [u8], kind: ElementKind, offset: usize, element: ElementValue) {
    let n = match element {
        ElementValue::Number(n) => n,
        ElementValue::Bits(bits) => {
            match kind {
                ElementKind::BigInt64 => {
                    data[offset..offset + 8].copy_from_slice(&(bits as i64).to_le_bytes());
                }
                // BigUint64, or a bigint pattern aimed at a numeric kind
                // (unreachable through convert_element)
                _ => {
                    data[offset..offset + 8].copy_from_slice(&bits.to_le_bytes());
                }
            }
            return;
        }
    };
    match kind {
        ElementKind::Int8 => data[offset] = convert::to_int8(n) as u8,
        ElementKind::Uint8 => data[offset] = convert::to_uint8(n),
        ElementKind::Uint8Clamped => data[offset] = convert::to_uint8_clamp(n),
        ElementKind::Int16 => {
            data[offset..offset + 2].copy_from_slice(&convert::to_int16(n).to_le_bytes());
        }
        ElementKind::Uint16 => {
            data[offset..offset + 2].copy_from_slice(&convert::to_uint16(n).to_le_bytes());
        }
        ElementKind::Int32 => {
            data[offset..offset + 4].copy_from_slice(&convert::to_int32(n).to_le_bytes());
        }
        ElementKind::Uint32 => {
            data[offset..offset + 4].copy_from_slice(&convert::to_uint32(n).to_le_bytes());
        }
        ElementKind::Float32 => {
            data[offset..offset + 4].copy_from_slice(&(n as f32).to_le_bytes());
        }
        ElementKind::Float64 => {
            data[offset..offset + 8].copy_from_slice(&n.to_le_bytes());
        }
        ElementKind::BigInt64 | ElementKind::BigUint64 => {}
    }
}

// ---------------------------------------------------------------------------
// Integer-indexed access, called from the object dispatch layer
// ---------------------------------------------------------------------------

/// Own-property descriptor for an integer index: a writable, enumerable,
/// configurable data property, or absent when the index is invalid
pub(crate) fn index_descriptor(record: &TypedArrayRecord, i: u32) -> Option<PropertyDescriptor> {
    record.read(i as usize).map(|value| {
        PropertyDescriptor::data_with(value, PropertyAttributes::data())
    })
}

pub(crate) fn record_length(record: &TypedArrayRecord) -> usize {
    record.length()
}

/// [[Set]] for an integer index. Conversion may invalidate the view; a write
/// to an invalid index succeeds silently.
pub(crate) fn set_index(obj: &Arc<JsObject>, i: u32, value: &Value) -> EngineResult<bool> {
    let Some(record) = obj.typed_array_record() else {
        return Ok(false);
    };
    let element = convert_element(record.kind(), value)?;
    record.write(i as usize, element);
    Ok(true)
}

/// [[DefineOwnProperty]] for an integer index. Accessor shapes and any
/// attribute other than writable/enumerable/configurable all-true are
/// rejected.
pub(crate) fn define_index(obj: &Arc<JsObject>, i: u32, spec: &DescriptorSpec) -> EngineResult<bool> {
    let Some(record) = obj.typed_array_record() else {
        return Ok(false);
    };
    let Some(count) = record.element_count() else {
        return Ok(false);
    };
    if i as usize >= count {
        return Ok(false);
    }
    if spec.is_accessor()
        || spec.configurable == Some(false)
        || spec.enumerable == Some(false)
        || spec.writable == Some(false)
    {
        return Ok(false);
    }
    if let Some(value) = &spec.value {
        let element = convert_element(record.kind(), value)?;
        record.write(i as usize, element);
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Prototype methods
// ---------------------------------------------------------------------------

fn view(obj: &Arc<JsObject>) -> EngineResult<&TypedArrayRecord> {
    obj.typed_array_record()
        .ok_or_else(|| EngineError::type_error("Method called on incompatible receiver"))
}

fn validate(record: &TypedArrayRecord) -> EngineResult<usize> {
    record
        .element_count()
        .ok_or_else(|| EngineError::type_error(DETACHED_MSG))
}

/// Resolve a relative index against `len` the way slice-family methods do
fn relative_index(value: &Value, len: usize, default: usize) -> EngineResult<usize> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = convert::to_integer_or_infinity(value)?;
    Ok(if n < 0.0 {
        let adjusted = len as f64 + n;
        if adjusted < 0.0 { 0 } else { adjusted as usize }
    } else if n > len as f64 {
        len
    } else {
        n as usize
    })
}

/// `%TypedArray%.prototype.fill`
pub fn ta_fill(obj: &Arc<JsObject>, value: &Value, start: &Value, end: &Value) -> EngineResult<()> {
    let record = view(obj)?;
    let len = validate(record)?;
    let element = convert_element(record.kind(), value)?;
    let from = relative_index(start, len, 0)?;
    let to = relative_index(end, len, len)?;
    // Coercion checkpoints are behind us; the view must still be live.
    let current = validate(record)?;
    let to = to.min(current);
    for i in from..to {
        record.write(i, element);
    }
    Ok(())
}

/// `%TypedArray%.prototype.set`
pub fn ta_set(obj: &Arc<JsObject>, source: &Value, offset: &Value) -> EngineResult<()> {
    let record = view(obj)?;
    let len = validate(record)?;
    let offset_n = convert::to_integer_or_infinity(offset)?;
    if offset_n < 0.0 {
        return Err(EngineError::range_error("Offset should not be negative"));
    }
    let offset = offset_n as usize;
    // The offset coercion may have run user code against the destination.
    let len = validate(record)?;

    if let Some(src_record) = source.as_object().and_then(|o| o.typed_array_record()) {
        let src_len = validate(src_record)?;
        if record.kind().is_bigint() != src_record.kind().is_bigint() {
            return Err(EngineError::type_error(
                "Cannot mix BigInt and other types",
            ));
        }
        if offset.checked_add(src_len).is_none_or(|end| end > len) {
            return Err(EngineError::range_error("Source is too large"));
        }
        // Read-then-write through the element codecs handles overlapping
        // views over the same buffer one element at a time; buffer the
        // source first so overlap cannot corrupt it.
        let staged: Vec<Value> = (0..src_len)
            .map(|i| src_record.read(i).unwrap_or_else(|| src_record.kind().zero()))
            .collect();
        for (i, v) in staged.iter().enumerate() {
            let element = convert_element(record.kind(), v)?;
            record.write(offset + i, element);
        }
        return Ok(());
    }

    let Some(src_obj) = source.as_object() else {
        return Err(EngineError::type_error("Invalid source for %TypedArray%.prototype.set"));
    };
    let src_len = convert::to_length(&src_obj.get_value(&PropertyKey::string("length"))?)? as usize;
    if offset.checked_add(src_len).is_none_or(|end| end > len) {
        return Err(EngineError::range_error("Source is too large"));
    }
    for i in 0..src_len {
        let v = src_obj.get_value(&PropertyKey::from_u64(i as u64))?;
        let element = convert_element(record.kind(), &v)?;
        // The gets above may have detached the buffer.
        if record.element_count().is_none() {
            return Err(EngineError::type_error(DETACHED_MSG));
        }
        record.write(offset + i, element);
    }
    Ok(())
}

/// `%TypedArray%.prototype.copyWithin`
pub fn ta_copy_within(
    obj: &Arc<JsObject>,
    target: &Value,
    start: &Value,
    end: &Value,
) -> EngineResult<()> {
    let record = view(obj)?;
    let len = validate(record)?;
    let to = relative_index(target, len, 0)?;
    let from = relative_index(start, len, 0)?;
    let until = relative_index(end, len, len)?;
    let current = validate(record)?;
    let len = len.min(current);
    // Every resolved index must be re-clamped too: a coercion above may have
    // shrunk a resizable buffer, and the raw byte copy below cannot tolerate
    // a stale window.
    let to = to.min(len);
    let from = from.min(len);
    let until = until.min(len);
    let count = until.saturating_sub(from).min(len.saturating_sub(to));
    if count == 0 {
        return Ok(());
    }
    let size = record.kind().element_size();
    let base = record.byte_offset();
    record.buffer().with_data_mut(|data| {
        data.copy_within(
            base + from * size..base + (from + count) * size,
            base + to * size,
        );
    })?;
    Ok(())
}

/// `%TypedArray%.prototype.reverse`
pub fn ta_reverse(obj: &Arc<JsObject>) -> EngineResult<()> {
    let record = view(obj)?;
    let len = validate(record)?;
    for i in 0..len / 2 {
        let j = len - 1 - i;
        let (a, b) = match (record.read(i), record.read(j)) {
            (Some(a), Some(b)) => (a, b),
            _ => break,
        };
        record.write(i, convert_element(record.kind(), &b)?);
        record.write(j, convert_element(record.kind(), &a)?);
    }
    Ok(())
}

fn default_compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::BigInt(x), Value::BigInt(y)) => x.as_inner().cmp(y.as_inner()),
        (Value::Number(x), Value::Number(y)) => {
            // NaN sorts to the end; -0 sorts before +0.
            match (x.is_nan(), y.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    if x == y {
                        match (x.is_sign_negative(), y.is_sign_negative()) {
                            (true, false) => Ordering::Less,
                            (false, true) => Ordering::Greater,
                            _ => Ordering::Equal,
                        }
                    } else if x < y {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                }
            }
        }
        _ => Ordering::Equal,
    }
}

/// Stable merge sort that can surface comparator errors
pub(crate) fn fallible_sort(
    values: &mut Vec<Value>,
    cmp: &mut dyn FnMut(&Value, &Value) -> EngineResult<Ordering>,
) -> EngineResult<()> {
    let len = values.len();
    if len < 2 {
        return Ok(());
    }
    let mid = len / 2;
    let mut right = values.split_off(mid);
    fallible_sort(values, cmp)?;
    fallible_sort(&mut right, cmp)?;
    let mut merged = Vec::with_capacity(len);
    let mut left_iter = std::mem::take(values).into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();
    loop {
        match (left_iter.peek(), right_iter.peek()) {
            (Some(l), Some(r)) => {
                if cmp(l, r)? == Ordering::Greater {
                    merged.push(right_iter.next().unwrap_or(Value::undefined()));
                } else {
                    merged.push(left_iter.next().unwrap_or(Value::undefined()));
                }
            }
            (Some(_), None) => merged.extend(left_iter.by_ref()),
            (None, Some(_)) => merged.extend(right_iter.by_ref()),
            (None, None) => break,
        }
    }
    *values = merged;
    Ok(())
}

/// `%TypedArray%.prototype.sort`
pub fn ta_sort(obj: &Arc<JsObject>, comparator: Option<&Value>) -> EngineResult<()> {
    if let Some(c) = comparator {
        if !c.is_undefined() && !c.is_callable() {
            return Err(EngineError::type_error("Comparator must be a function"));
        }
    }
    let record = view(obj)?;
    let len = validate(record)?;
    let mut values: Vec<Value> = (0..len)
        .map(|i| record.read(i).unwrap_or_else(|| record.kind().zero()))
        .collect();

    match comparator.filter(|c| c.is_callable()) {
        Some(cmp_fn) => {
            let mut cmp = |a: &Value, b: &Value| -> EngineResult<Ordering> {
                let result = cmp_fn.call(&Value::undefined(), &[a.clone(), b.clone()])?;
                let n = convert::to_number(&result)?;
                Ok(if n.is_nan() {
                    Ordering::Equal
                } else if n < 0.0 {
                    Ordering::Less
                } else if n > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                })
            };
            fallible_sort(&mut values, &mut cmp)?;
        }
        None => values.sort_by(default_compare),
    }

    // A comparator may have shrunk or detached the view; write what fits.
    let current = record.element_count().unwrap_or(0);
    for (i, v) in values.iter().take(current).enumerate() {
        record.write(i, convert_element(record.kind(), v)?);
    }
    Ok(())
}

/// `%TypedArray%.prototype.forEach`. A callback that invalidates the view
/// makes the next element access throw.
pub fn ta_for_each(obj: &Arc<JsObject>, callback: &Value) -> EngineResult<()> {
    let record = view(obj)?;
    let len = validate(record)?;
    if !callback.is_callable() {
        return Err(EngineError::type_error("Callback must be a function"));
    }
    let this_arg = Value::object(obj.clone());
    for i in 0..len {
        let element = record
            .read(i)
            .ok_or_else(|| EngineError::type_error(DETACHED_MSG))?;
        callback.call(
            &Value::undefined(),
            &[element, Value::number(i as f64), this_arg.clone()],
        )?;
    }
    Ok(())
}

/// TypedArraySpeciesCreate: honor `constructor[Symbol.species]` when the
/// receiver carries one, otherwise allocate the same kind. The result must
/// be a valid typed array with at least `length` elements and a matching
/// content type.
pub fn typed_array_species_create(
    obj: &Arc<JsObject>,
    length: usize,
) -> EngineResult<Arc<JsObject>> {
    let source_kind = view(obj)?.kind();
    let ctor = obj.get_value(&PropertyKey::string("constructor"))?;
    let species = match &ctor {
        Value::Undefined => Value::undefined(),
        Value::Object(ctor_obj) => {
            let s = ctor_obj.get_value(&PropertyKey::Symbol(JsSymbol::species()))?;
            if s.is_nullish() { Value::undefined() } else { s }
        }
        _ => {
            return Err(EngineError::type_error(
                "Constructor property is not an object",
            ));
        }
    };
    let result = if species.is_undefined() {
        let record = TypedArrayRecord::allocate(source_kind, length, &Limits::default())?;
        JsObject::new_typed_array(record)
    } else {
        let created = species.call(&Value::undefined(), &[Value::number(length as f64)])?;
        match created {
            Value::Object(o) if o.typed_array_record().is_some() => o,
            _ => {
                return Err(EngineError::type_error(
                    "Species constructor did not return a typed array",
                ));
            }
        }
    };
    let result_record = view(&result)?;
    let result_len = validate(result_record)?;
    if result_len < length {
        return Err(EngineError::type_error(
            "Species constructor returned a typed array that is too small",
        ));
    }
    if result_record.kind().is_bigint() != source_kind.is_bigint() {
        return Err(EngineError::type_error("Cannot mix BigInt and other types"));
    }
    Ok(result)
}

/// `%TypedArray%.prototype.slice`. The species constructor may invalidate
/// the source; missing elements backfill as zero into the fixed-length
/// result rather than throwing.
pub fn ta_slice(obj: &Arc<JsObject>, start: &Value, end: &Value) -> EngineResult<Arc<JsObject>> {
    let record = view(obj)?;
    let len = validate(record)?;
    let from = relative_index(start, len, 0)?;
    let to = relative_index(end, len, len)?;
    let count = to.saturating_sub(from);
    let result = typed_array_species_create(obj, count)?;
    let result_record = view(&result)?;
    for i in 0..count {
        let element = record
            .read(from + i)
            .unwrap_or_else(|| record.kind().zero());
        result_record.write(i, convert_element(result_record.kind(), &element)?);
    }
    Ok(result)
}

/// `%TypedArray%.prototype.map`
pub fn ta_map(obj: &Arc<JsObject>, callback: &Value) -> EngineResult<Arc<JsObject>> {
    let record = view(obj)?;
    let len = validate(record)?;
    if !callback.is_callable() {
        return Err(EngineError::type_error("Callback must be a function"));
    }
    let result = typed_array_species_create(obj, len)?;
    let result_record = view(&result)?;
    let this_arg = Value::object(obj.clone());
    for i in 0..len {
        let element = record.read(i).unwrap_or_else(|| record.kind().zero());
        let mapped = callback.call(
            &Value::undefined(),
            &[element, Value::number(i as f64), this_arg.clone()],
        )?;
        result_record.write(i, convert_element(result_record.kind(), &mapped)?);
    }
    Ok(result)
}

/// `%TypedArray%.prototype.filter`. Kept elements are gathered first, then
/// the species result is created with the exact surviving count.
pub fn ta_filter(obj: &Arc<JsObject>, callback: &Value) -> EngineResult<Arc<JsObject>> {
    let record = view(obj)?;
    let len = validate(record)?;
    if !callback.is_callable() {
        return Err(EngineError::type_error("Callback must be a function"));
    }
    let this_arg = Value::object(obj.clone());
    let mut kept = Vec::new();
    for i in 0..len {
        let element = record.read(i).unwrap_or_else(|| record.kind().zero());
        let keep = callback.call(
            &Value::undefined(),
            &[element.clone(), Value::number(i as f64), this_arg.clone()],
        )?;
        if keep.to_boolean() {
            kept.push(element);
        }
    }
    let result = typed_array_species_create(obj, kept.len())?;
    let result_record = view(&result)?;
    for (i, element) in kept.iter().enumerate() {
        result_record.write(i, convert_element(result_record.kind(), element)?);
    }
    Ok(result)
}

/// `%TypedArray%.prototype.subarray`: a new view over the same buffer, no
/// bytes copied. Works on invalid views (they behave as empty).
pub fn ta_subarray(obj: &Arc<JsObject>, start: &Value, end: &Value) -> EngineResult<Arc<JsObject>> {
    let record = view(obj)?;
    let len = record.length();
    let from = relative_index(start, len, 0)?;
    let to = relative_index(end, len, len)?;
    let count = to.saturating_sub(from);
    let size = record.kind().element_size();
    let sub = TypedArrayRecord {
        buffer: record.buffer().clone(),
        byte_offset: record.byte_offset + from * size,
        length: Some(count),
        kind: record.kind(),
    };
    Ok(JsObject::new_typed_array(sub))
}
