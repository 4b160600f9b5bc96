//! Generic array algorithms
//!
//! These are the Array.prototype methods that are deliberately generic: they
//! only speak the fundamental operations, so they work identically on plain
//! arrays, array-likes, and proxies. Every element access is observable in
//! the exact order the algorithms perform them.

use std::sync::Arc;

use crate::convert;
use crate::error::{EngineError, EngineResult};
use crate::object::{JsObject, PropertyKey};
use crate::typed_array::fallible_sort;
use crate::value::{JsSymbol, Value};

fn length_key() -> PropertyKey {
    PropertyKey::string("length")
}

fn index_key(i: u64) -> PropertyKey {
    PropertyKey::from_u64(i)
}

/// IsArray: true for Array exotic objects, looking through proxies.
/// A revoked proxy throws.
pub fn is_array(value: &Value) -> EngineResult<bool> {
    let Some(obj) = value.as_object() else {
        return Ok(false);
    };
    let mut cur = obj.clone();
    loop {
        if cur.is_array_exotic() {
            return Ok(true);
        }
        let Some(slots) = cur.proxy_slots() else {
            return Ok(false);
        };
        let Some(target) = slots.target() else {
            return Err(EngineError::type_error(
                "Cannot perform 'IsArray' on a proxy that has been revoked",
            ));
        };
        cur = target;
    }
}

/// LengthOfArrayLike
pub fn length_of(obj: &Arc<JsObject>) -> EngineResult<u64> {
    convert::to_length(&obj.get_value(&length_key())?)
}

/// `Array.prototype.push`; returns the new length
pub fn array_push(obj: &Arc<JsObject>, values: &[Value]) -> EngineResult<f64> {
    let len = length_of(obj)?;
    for (i, value) in values.iter().enumerate() {
        obj.set_or_throw(&index_key(len + i as u64), value.clone())?;
    }
    let new_len = len + values.len() as u64;
    obj.set_or_throw(&length_key(), Value::number(new_len as f64))?;
    Ok(new_len as f64)
}

/// `Array.prototype.pop`
pub fn array_pop(obj: &Arc<JsObject>) -> EngineResult<Value> {
    let len = length_of(obj)?;
    if len == 0 {
        obj.set_or_throw(&length_key(), Value::number(0.0))?;
        return Ok(Value::undefined());
    }
    let key = index_key(len - 1);
    let element = obj.get_value(&key)?;
    obj.delete_or_throw(&key)?;
    obj.set_or_throw(&length_key(), Value::number((len - 1) as f64))?;
    Ok(element)
}

/// `Array.prototype.shift`
pub fn array_shift(obj: &Arc<JsObject>) -> EngineResult<Value> {
    let len = length_of(obj)?;
    if len == 0 {
        obj.set_or_throw(&length_key(), Value::number(0.0))?;
        return Ok(Value::undefined());
    }
    let first = obj.get_value(&index_key(0))?;
    for k in 1..len {
        let from = index_key(k);
        let to = index_key(k - 1);
        if obj.has_property(&from)? {
            let value = obj.get_value(&from)?;
            obj.set_or_throw(&to, value)?;
        } else {
            obj.delete_or_throw(&to)?;
        }
    }
    obj.delete_or_throw(&index_key(len - 1))?;
    obj.set_or_throw(&length_key(), Value::number((len - 1) as f64))?;
    Ok(first)
}

/// `Array.prototype.unshift`; returns the new length
pub fn array_unshift(obj: &Arc<JsObject>, values: &[Value]) -> EngineResult<f64> {
    let len = length_of(obj)?;
    let count = values.len() as u64;
    if count > 0 {
        for k in (0..len).rev() {
            let from = index_key(k);
            let to = index_key(k + count);
            if obj.has_property(&from)? {
                let value = obj.get_value(&from)?;
                obj.set_or_throw(&to, value)?;
            } else {
                obj.delete_or_throw(&to)?;
            }
        }
        for (i, value) in values.iter().enumerate() {
            obj.set_or_throw(&index_key(i as u64), value.clone())?;
        }
    }
    let new_len = len + count;
    obj.set_or_throw(&length_key(), Value::number(new_len as f64))?;
    Ok(new_len as f64)
}

/// `Array.prototype.reverse`. Holes are preserved by pairwise has/get/set/
/// delete, so a proxy observes the full canonical trap sequence.
pub fn array_reverse(obj: &Arc<JsObject>) -> EngineResult<()> {
    let len = length_of(obj)?;
    let middle = len / 2;
    for lower in 0..middle {
        let upper = len - lower - 1;
        let lower_key = index_key(lower);
        let upper_key = index_key(upper);
        let lower_exists = obj.has_property(&lower_key)?;
        let lower_value = if lower_exists {
            Some(obj.get_value(&lower_key)?)
        } else {
            None
        };
        let upper_exists = obj.has_property(&upper_key)?;
        let upper_value = if upper_exists {
            Some(obj.get_value(&upper_key)?)
        } else {
            None
        };
        match (lower_value, upper_value) {
            (Some(lv), Some(uv)) => {
                obj.set_or_throw(&lower_key, uv)?;
                obj.set_or_throw(&upper_key, lv)?;
            }
            (None, Some(uv)) => {
                obj.set_or_throw(&lower_key, uv)?;
                obj.delete_or_throw(&upper_key)?;
            }
            (Some(lv), None) => {
                obj.delete_or_throw(&lower_key)?;
                obj.set_or_throw(&upper_key, lv)?;
            }
            (None, None) => {}
        }
    }
    Ok(())
}

/// `Array.prototype.sort`. Undefined values sort after everything, holes
/// are compacted to the tail and deleted.
pub fn array_sort(obj: &Arc<JsObject>, comparator: Option<&Value>) -> EngineResult<()> {
    if let Some(c) = comparator {
        if !c.is_undefined() && !c.is_callable() {
            return Err(EngineError::type_error("Comparator must be a function"));
        }
    }
    let len = length_of(obj)?;
    let mut values = Vec::new();
    let mut undefined_count: u64 = 0;
    let mut hole_count: u64 = 0;
    for i in 0..len {
        let key = index_key(i);
        if !obj.has_property(&key)? {
            hole_count += 1;
            continue;
        }
        let value = obj.get_value(&key)?;
        if value.is_undefined() {
            undefined_count += 1;
        } else {
            values.push(value);
        }
    }

    let comparator = comparator.filter(|c| c.is_callable());
    let mut cmp = |a: &Value, b: &Value| -> EngineResult<std::cmp::Ordering> {
        if let Some(cmp_fn) = comparator {
            let result = cmp_fn.call(&Value::undefined(), &[a.clone(), b.clone()])?;
            let n = convert::to_number(&result)?;
            return Ok(if n.is_nan() {
                std::cmp::Ordering::Equal
            } else if n < 0.0 {
                std::cmp::Ordering::Less
            } else if n > 0.0 {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            });
        }
        // Default: compare string forms by code units.
        let sa = convert::to_string(a)?;
        let sb = convert::to_string(b)?;
        Ok(sa.cmp(&sb))
    };
    fallible_sort(&mut values, &mut cmp)?;

    let mut write = 0u64;
    for value in values {
        obj.set_or_throw(&index_key(write), value)?;
        write += 1;
    }
    for _ in 0..undefined_count {
        obj.set_or_throw(&index_key(write), Value::undefined())?;
        write += 1;
    }
    for _ in 0..hole_count {
        obj.delete_or_throw(&index_key(write))?;
        write += 1;
    }
    Ok(())
}

/// ArraySpeciesCreate: consult `constructor[Symbol.species]` of array
/// receivers, fall back to a plain array
pub fn array_species_create(obj: &Arc<JsObject>, length: u64) -> EngineResult<Arc<JsObject>> {
    let length_u32: u32 = length
        .try_into()
        .map_err(|_| EngineError::range_error("Invalid array length"))?;
    if !is_array(&Value::object(obj.clone()))? {
        return Ok(JsObject::new_array(length_u32));
    }
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
    if species.is_undefined() {
        return Ok(JsObject::new_array(length_u32));
    }
    if !species.is_callable() {
        return Err(EngineError::type_error("Species is not a constructor"));
    }
    match species.call(&Value::undefined(), &[Value::number(length as f64)])? {
        Value::Object(o) => Ok(o),
        _ => Err(EngineError::type_error(
            "Species constructor did not return an object",
        )),
    }
}

/// `Array.prototype.map`. Holes stay holes in the result.
pub fn array_map(obj: &Arc<JsObject>, callback: &Value) -> EngineResult<Arc<JsObject>> {
    if !callback.is_callable() {
        return Err(EngineError::type_error("Callback must be a function"));
    }
    let len = length_of(obj)?;
    let result = array_species_create(obj, len)?;
    let this_arg = Value::object(obj.clone());
    for i in 0..len {
        let key = index_key(i);
        if !obj.has_property(&key)? {
            continue;
        }
        let element = obj.get_value(&key)?;
        let mapped = callback.call(
            &Value::undefined(),
            &[element, Value::number(i as f64), this_arg.clone()],
        )?;
        result.create_data_property_or_throw(key, mapped)?;
    }
    Ok(result)
}

/// `Array.prototype.filter`
pub fn array_filter(obj: &Arc<JsObject>, callback: &Value) -> EngineResult<Arc<JsObject>> {
    if !callback.is_callable() {
        return Err(EngineError::type_error("Callback must be a function"));
    }
    let len = length_of(obj)?;
    let result = array_species_create(obj, 0)?;
    let this_arg = Value::object(obj.clone());
    let mut kept: u64 = 0;
    for i in 0..len {
        let key = index_key(i);
        if !obj.has_property(&key)? {
            continue;
        }
        let element = obj.get_value(&key)?;
        let keep = callback.call(
            &Value::undefined(),
            &[element.clone(), Value::number(i as f64), this_arg.clone()],
        )?;
        if keep.to_boolean() {
            result.create_data_property_or_throw(index_key(kept), element)?;
            kept += 1;
        }
    }
    Ok(result)
}
