//! Array exotic object semantics
//!
//! Arrays are ordinary objects except for [[DefineOwnProperty]], which keeps
//! the `length` property and the index keys coupled: writing `length` deletes
//! trailing elements, and defining an index at or past `length` grows it.

use std::sync::Arc;

use crate::convert;
use crate::error::{EngineError, EngineResult};
use crate::object::{DescriptorSpec, JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

const INVALID_LENGTH: &str = "Invalid array length";

fn length_key() -> PropertyKey {
    PropertyKey::string("length")
}

fn is_length_key(key: &PropertyKey) -> bool {
    matches!(key, PropertyKey::String(s) if s.to_std_string() == "length")
}

/// Current `length` of an Array exotic object, read straight from its table
fn current_length(obj: &JsObject) -> (u32, bool) {
    let table = obj.table().read();
    match table.get(&length_key()) {
        Some(PropertyDescriptor::Data { value, attributes }) => {
            let len = value.as_number().unwrap_or(0.0) as u32;
            (len, attributes.writable)
        }
        // Arrays are always constructed with a data length property.
        _ => (0, false),
    }
}

/// Array [[DefineOwnProperty]]
pub(crate) fn define_own_property(
    obj: &Arc<JsObject>,
    key: PropertyKey,
    spec: DescriptorSpec,
) -> EngineResult<bool> {
    if is_length_key(&key) {
        return set_length(obj, spec);
    }
    if let PropertyKey::Index(index) = key {
        let (old_len, len_writable) = current_length(obj);
        if index >= old_len && !len_writable {
            return Ok(false);
        }
        if !obj.ordinary_define_own_property(key, spec)? {
            return Ok(false);
        }
        if index >= old_len {
            // Grow length. The length property is writable here, so this
            // ordinary define cannot fail.
            obj.ordinary_define_own_property(
                length_key(),
                DescriptorSpec::value_only(Value::number(index as f64 + 1.0)),
            )?;
        }
        return Ok(true);
    }
    obj.ordinary_define_own_property(key, spec)
}

/// ArraySetLength
///
/// The candidate length is coerced once: `ToUint32` and `ToNumber` must agree
/// exactly or the whole operation throws RangeError before any state changes.
/// Shrinking deletes indices from high to low and stops early at the first
/// non-configurable element, leaving `length` just above it.
fn set_length(obj: &Arc<JsObject>, spec: DescriptorSpec) -> EngineResult<bool> {
    let Some(candidate) = spec.value.clone() else {
        // Attribute-only update (e.g. Object.freeze making length readonly)
        return obj.ordinary_define_own_property(length_key(), spec);
    };

    let number_len = convert::to_number(&candidate)?;
    let new_len = convert::to_uint32(number_len);
    if new_len as f64 != number_len {
        return Err(EngineError::range_error(INVALID_LENGTH));
    }

    let mut new_spec = spec;
    new_spec.value = Some(Value::number(new_len as f64));

    let (old_len, len_writable) = current_length(obj);
    if new_len >= old_len {
        return obj.ordinary_define_own_property(length_key(), new_spec);
    }
    if !len_writable {
        return Ok(false);
    }

    // Shrinking: keep length writable while elements are deleted, apply the
    // requested writable:false only after the deletions are done.
    let deferred_readonly = new_spec.writable == Some(false);
    if deferred_readonly {
        new_spec.writable = Some(true);
    }
    if !obj.ordinary_define_own_property(length_key(), new_spec.clone())? {
        return Ok(false);
    }

    let doomed: Vec<u32> = obj.table().read().indices_at_or_above(new_len);
    for &index in doomed.iter().rev() {
        let removed = {
            let mut table = obj.table().write();
            match table.get(&PropertyKey::Index(index)) {
                Some(desc) if !desc.is_configurable() => false,
                Some(_) => {
                    table.remove(&PropertyKey::Index(index));
                    true
                }
                None => true,
            }
        };
        if !removed {
            // Stopped at a non-configurable element: length lands just
            // above it and the define reports failure.
            let mut stop_spec =
                DescriptorSpec::value_only(Value::number(index as f64 + 1.0));
            if deferred_readonly {
                stop_spec.writable = Some(false);
            }
            obj.ordinary_define_own_property(length_key(), stop_spec)?;
            return Ok(false);
        }
    }

    if deferred_readonly {
        obj.ordinary_define_own_property(
            length_key(),
            DescriptorSpec::default().writable(false),
        )?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PropertyAttributes;

    fn array_with(values: &[f64]) -> Arc<JsObject> {
        let arr = JsObject::new_array(0);
        for (i, v) in values.iter().enumerate() {
            arr.set_or_throw(&PropertyKey::Index(i as u32), Value::number(*v))
                .unwrap();
        }
        arr
    }

    fn length_of(arr: &Arc<JsObject>) -> f64 {
        arr.get_value(&length_key()).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_index_write_grows_length() {
        let arr = JsObject::new_array(0);
        arr.set_or_throw(&PropertyKey::Index(4), Value::string("x"))
            .unwrap();
        assert_eq!(length_of(&arr), 5.0);
    }

    #[test]
    fn test_shrink_deletes_elements() {
        let arr = array_with(&[1.0, 2.0, 3.0, 4.0]);
        arr.set_or_throw(&length_key(), Value::number(2.0)).unwrap();
        assert_eq!(length_of(&arr), 2.0);
        assert!(arr.get_own_property(&PropertyKey::Index(2)).unwrap().is_none());
        assert!(arr.get_own_property(&PropertyKey::Index(1)).unwrap().is_some());
    }

    #[test]
    fn test_length_coercion_must_agree() {
        let arr = array_with(&[1.0]);
        let err = arr
            .set_or_throw(&length_key(), Value::number(-1.0))
            .unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(err.message(), "Invalid array length");

        let err = arr
            .set_or_throw(&length_key(), Value::number(4294967296.0))
            .unwrap_err();
        assert!(err.is_range_error());

        let err = arr
            .set_or_throw(&length_key(), Value::number(1.5))
            .unwrap_err();
        assert!(err.is_range_error());

        // Strings coerce through ToNumber first.
        arr.set_or_throw(&length_key(), Value::string("3")).unwrap();
        assert_eq!(length_of(&arr), 3.0);
    }

    #[test]
    fn test_shrink_stops_at_non_configurable() {
        let arr = array_with(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        arr.define_own_or_throw(
            PropertyKey::Index(2),
            DescriptorSpec::default().configurable(false),
        )
        .unwrap();

        let ok = arr
            .define_own_property(
                length_key(),
                DescriptorSpec::value_only(Value::number(0.0)),
            )
            .unwrap();
        assert!(!ok);
        // Deletion ran from the top and stopped just above index 2.
        assert_eq!(length_of(&arr), 3.0);
        assert!(arr.get_own_property(&PropertyKey::Index(4)).unwrap().is_none());
        assert!(arr.get_own_property(&PropertyKey::Index(2)).unwrap().is_some());
    }

    #[test]
    fn test_frozen_array_length_write() {
        // Object.freeze(arr) then arr.length = 0 in strict mode
        let arr = array_with(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for i in 0..5u32 {
            arr.define_own_or_throw(
                PropertyKey::Index(i),
                DescriptorSpec::default().writable(false).configurable(false),
            )
            .unwrap();
        }
        arr.define_own_or_throw(
            length_key(),
            DescriptorSpec::default().writable(false),
        )
        .unwrap();
        arr.prevent_extensions().unwrap();

        let err = arr
            .set_or_throw(&length_key(), Value::number(0.0))
            .unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(length_of(&arr), 5.0);
    }

    #[test]
    fn test_readonly_length_blocks_growth() {
        let arr = array_with(&[1.0]);
        arr.define_own_or_throw(
            length_key(),
            DescriptorSpec::default().writable(false),
        )
        .unwrap();
        // Existing indices stay writable.
        arr.set_or_throw(&PropertyKey::Index(0), Value::number(9.0))
            .unwrap();
        // New indices past length are rejected.
        let err = arr
            .set_or_throw(&PropertyKey::Index(5), Value::number(9.0))
            .unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(length_of(&arr), 1.0);
    }

    #[test]
    fn test_shrink_to_readonly_in_one_define() {
        let arr = array_with(&[1.0, 2.0, 3.0]);
        let ok = arr
            .define_own_property(
                length_key(),
                DescriptorSpec::data(
                    Value::number(1.0),
                    PropertyAttributes {
                        writable: false,
                        enumerable: false,
                        configurable: false,
                    },
                ),
            )
            .unwrap();
        assert!(ok);
        assert_eq!(length_of(&arr), 1.0);
        // Now readonly: further shrink attempts fail.
        let ok = arr
            .define_own_property(
                length_key(),
                DescriptorSpec::value_only(Value::number(0.0)),
            )
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_length_key_is_not_an_index() {
        let arr = array_with(&[1.0]);
        // An unrelated named property passes straight through.
        arr.set_or_throw(&PropertyKey::string("tag"), Value::string("t"))
            .unwrap();
        assert_eq!(length_of(&arr), 1.0);
    }
}
