//! Proxy trap dispatch and invariant enforcement
//!
//! Each fundamental operation on a proxy looks up its trap on the handler.
//! A missing (or nullish) trap forwards to the target; a present trap is
//! called with the handler as `this`, and its answer is then checked against
//! the target's observable state so a proxy can never lie about
//! non-configurable properties or a non-extensible target.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::convert;
use crate::error::{EngineError, EngineResult};
use crate::object::{
    is_compatible_descriptor, validate_and_apply, DescriptorSpec, JsObject, PropertyDescriptor,
    PropertyKey,
};
use crate::proxy::ProxySlots;
use crate::value::Value;

/// Look up a trap on the handler. Nullish means absent; anything else must
/// be callable.
fn trap(handler: &Arc<JsObject>, name: &str) -> EngineResult<Option<Value>> {
    let value = handler.get_value(&PropertyKey::string(name))?;
    if value.is_nullish() {
        return Ok(None);
    }
    if !value.is_callable() {
        return Err(EngineError::type_error(format!(
            "'{name}' trap must be a function"
        )));
    }
    Ok(Some(value))
}

fn call_trap(
    trap_fn: &Value,
    handler: &Arc<JsObject>,
    args: &[Value],
) -> EngineResult<Value> {
    trap_fn.call(&Value::object(handler.clone()), args)
}

/// Build the argument array a trap receives for a call/construct
fn arguments_array(args: &[Value]) -> Arc<JsObject> {
    let arr = JsObject::new_array(0);
    for (i, arg) in args.iter().enumerate() {
        let _ = arr.create_data_property(PropertyKey::Index(i as u32), arg.clone());
    }
    arr
}

/// Materialize only the present fields of a partial descriptor, the shape
/// the `defineProperty` trap observes
fn spec_to_object(spec: &DescriptorSpec) -> Arc<JsObject> {
    let obj = JsObject::new(None);
    if let Some(v) = &spec.value {
        let _ = obj.create_data_property(PropertyKey::string("value"), v.clone());
    }
    if let Some(w) = spec.writable {
        let _ = obj.create_data_property(PropertyKey::string("writable"), Value::boolean(w));
    }
    if let Some(g) = &spec.get {
        let _ = obj.create_data_property(PropertyKey::string("get"), g.clone());
    }
    if let Some(s) = &spec.set {
        let _ = obj.create_data_property(PropertyKey::string("set"), s.clone());
    }
    if let Some(e) = spec.enumerable {
        let _ = obj.create_data_property(PropertyKey::string("enumerable"), Value::boolean(e));
    }
    if let Some(c) = spec.configurable {
        let _ = obj.create_data_property(
            PropertyKey::string("configurable"),
            Value::boolean(c),
        );
    }
    obj
}

/// Proxy [[GetPrototypeOf]]
pub(crate) fn get_prototype_of(slots: &ProxySlots) -> EngineResult<Option<Arc<JsObject>>> {
    let (target, handler) = slots.parts("getPrototypeOf")?;
    let Some(trap_fn) = trap(&handler, "getPrototypeOf")? else {
        return target.get_prototype_of();
    };
    let result = call_trap(&trap_fn, &handler, &[Value::object(target.clone())])?;
    let reported = match &result {
        Value::Null => None,
        Value::Object(o) => Some(o.clone()),
        _ => {
            return Err(EngineError::type_error(
                "'getPrototypeOf' trap must return an object or null",
            ));
        }
    };
    if target.is_extensible()? {
        return Ok(reported);
    }
    let actual = target.get_prototype_of()?;
    let same = match (&reported, &actual) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };
    if !same {
        return Err(EngineError::type_error(
            "'getPrototypeOf' trap must return the target's prototype when the target is non-extensible",
        ));
    }
    Ok(reported)
}

/// Proxy [[SetPrototypeOf]]
pub(crate) fn set_prototype_of(
    slots: &ProxySlots,
    proto: Option<Arc<JsObject>>,
) -> EngineResult<bool> {
    let (target, handler) = slots.parts("setPrototypeOf")?;
    let Some(trap_fn) = trap(&handler, "setPrototypeOf")? else {
        return target.set_prototype_of(proto);
    };
    let proto_value = proto
        .as_ref()
        .map(|p| Value::object(p.clone()))
        .unwrap_or(Value::null());
    let result = call_trap(
        &trap_fn,
        &handler,
        &[Value::object(target.clone()), proto_value],
    )?;
    if !result.to_boolean() {
        return Ok(false);
    }
    if target.is_extensible()? {
        return Ok(true);
    }
    let actual = target.get_prototype_of()?;
    let same = match (&proto, &actual) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };
    if !same {
        return Err(EngineError::type_error(
            "'setPrototypeOf' trap cannot change the prototype of a non-extensible target",
        ));
    }
    Ok(true)
}

/// Proxy [[IsExtensible]]
pub(crate) fn is_extensible(slots: &ProxySlots) -> EngineResult<bool> {
    let (target, handler) = slots.parts("isExtensible")?;
    let Some(trap_fn) = trap(&handler, "isExtensible")? else {
        return target.is_extensible();
    };
    let result = call_trap(&trap_fn, &handler, &[Value::object(target.clone())])?.to_boolean();
    if result != target.is_extensible()? {
        return Err(EngineError::type_error(
            "'isExtensible' trap must match the target's extensibility",
        ));
    }
    Ok(result)
}

/// Proxy [[PreventExtensions]]
pub(crate) fn prevent_extensions(slots: &ProxySlots) -> EngineResult<bool> {
    let (target, handler) = slots.parts("preventExtensions")?;
    let Some(trap_fn) = trap(&handler, "preventExtensions")? else {
        return target.prevent_extensions();
    };
    let result = call_trap(&trap_fn, &handler, &[Value::object(target.clone())])?.to_boolean();
    if result && target.is_extensible()? {
        return Err(EngineError::type_error(
            "'preventExtensions' trap returned true but the target is still extensible",
        ));
    }
    Ok(result)
}

/// Proxy [[GetOwnProperty]]
pub(crate) fn get_own_property(
    slots: &ProxySlots,
    key: &PropertyKey,
) -> EngineResult<Option<PropertyDescriptor>> {
    let (target, handler) = slots.parts("getOwnPropertyDescriptor")?;
    let Some(trap_fn) = trap(&handler, "getOwnPropertyDescriptor")? else {
        return target.get_own_property(key);
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[Value::object(target.clone()), key.to_value()],
    )?;
    let target_desc = target.get_own_property(key)?;
    match result {
        Value::Undefined => {
            match &target_desc {
                None => Ok(None),
                Some(desc) if !desc.is_configurable() => Err(EngineError::type_error(format!(
                    "'getOwnPropertyDescriptor' trap reported non-configurable property '{key}' as non-existent"
                ))),
                Some(_) if !target.is_extensible()? => Err(EngineError::type_error(format!(
                    "'getOwnPropertyDescriptor' trap cannot hide property '{key}' of a non-extensible target"
                ))),
                Some(_) => Ok(None),
            }
        }
        Value::Object(desc_obj) => {
            let spec = DescriptorSpec::from_object(&desc_obj)?;
            let extensible = target.is_extensible()?;
            let Some(completed) = validate_and_apply(None, true, &spec) else {
                return Err(EngineError::type_error(
                    "'getOwnPropertyDescriptor' trap returned an invalid descriptor",
                ));
            };
            if !is_compatible_descriptor(extensible, &spec, target_desc.as_ref()) {
                return Err(EngineError::type_error(format!(
                    "'getOwnPropertyDescriptor' trap returned a descriptor incompatible with property '{key}'"
                )));
            }
            if !completed.is_configurable() {
                let legal = matches!(&target_desc, Some(d) if !d.is_configurable());
                if !legal {
                    return Err(EngineError::type_error(format!(
                        "'getOwnPropertyDescriptor' trap reported property '{key}' as non-configurable"
                    )));
                }
            }
            Ok(Some(completed))
        }
        _ => Err(EngineError::type_error(
            "'getOwnPropertyDescriptor' trap must return an object or undefined",
        )),
    }
}

/// Proxy [[DefineOwnProperty]]
pub(crate) fn define_own_property(
    slots: &ProxySlots,
    key: &PropertyKey,
    spec: &DescriptorSpec,
) -> EngineResult<bool> {
    let (target, handler) = slots.parts("defineProperty")?;
    let Some(trap_fn) = trap(&handler, "defineProperty")? else {
        return target.define_own_property(key.clone(), spec.clone());
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[
            Value::object(target.clone()),
            key.to_value(),
            Value::object(spec_to_object(spec)),
        ],
    )?;
    if !result.to_boolean() {
        return Ok(false);
    }
    let target_desc = target.get_own_property(key)?;
    let extensible = target.is_extensible()?;
    let wants_non_configurable = spec.configurable == Some(false);
    match &target_desc {
        None => {
            if !extensible {
                return Err(EngineError::type_error(format!(
                    "'defineProperty' trap added property '{key}' to a non-extensible target"
                )));
            }
            if wants_non_configurable {
                return Err(EngineError::type_error(format!(
                    "'defineProperty' trap reported adding non-configurable property '{key}' that is missing from the target"
                )));
            }
        }
        Some(desc) => {
            if !is_compatible_descriptor(extensible, spec, Some(desc)) {
                return Err(EngineError::type_error(format!(
                    "'defineProperty' trap returned true for incompatible property '{key}'"
                )));
            }
            if wants_non_configurable && desc.is_configurable() {
                return Err(EngineError::type_error(format!(
                    "'defineProperty' trap reported configurable property '{key}' as non-configurable"
                )));
            }
        }
    }
    Ok(true)
}

/// Proxy [[HasProperty]]
pub(crate) fn has_property(slots: &ProxySlots, key: &PropertyKey) -> EngineResult<bool> {
    let (target, handler) = slots.parts("has")?;
    let Some(trap_fn) = trap(&handler, "has")? else {
        return target.has_property(key);
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[Value::object(target.clone()), key.to_value()],
    )?
    .to_boolean();
    if !result {
        if let Some(desc) = target.get_own_property(key)? {
            if !desc.is_configurable() {
                return Err(EngineError::type_error(format!(
                    "'has' trap denied non-configurable property '{key}'"
                )));
            }
            if !target.is_extensible()? {
                return Err(EngineError::type_error(format!(
                    "'has' trap cannot hide property '{key}' of a non-extensible target"
                )));
            }
        }
    }
    Ok(result)
}

/// Proxy [[Get]]
pub(crate) fn get(slots: &ProxySlots, key: &PropertyKey, receiver: &Value) -> EngineResult<Value> {
    let (target, handler) = slots.parts("get")?;
    let Some(trap_fn) = trap(&handler, "get")? else {
        return target.get(key, receiver);
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[
            Value::object(target.clone()),
            key.to_value(),
            receiver.clone(),
        ],
    )?;
    if let Some(desc) = target.get_own_property(key)? {
        if !desc.is_configurable() {
            match &desc {
                PropertyDescriptor::Data { value, attributes } if !attributes.writable => {
                    if !result.same_value(value) {
                        return Err(EngineError::type_error(format!(
                            "'get' trap must report the same value for non-configurable, non-writable property '{key}'"
                        )));
                    }
                }
                PropertyDescriptor::Accessor { get: None, .. } => {
                    if !result.is_undefined() {
                        return Err(EngineError::type_error(format!(
                            "'get' trap must return undefined for non-configurable accessor property '{key}' without a getter"
                        )));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(result)
}

/// Proxy [[Set]]
pub(crate) fn set(
    slots: &ProxySlots,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> EngineResult<bool> {
    let (target, handler) = slots.parts("set")?;
    let Some(trap_fn) = trap(&handler, "set")? else {
        return target.set(key, value, receiver);
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[
            Value::object(target.clone()),
            key.to_value(),
            value.clone(),
            receiver.clone(),
        ],
    )?
    .to_boolean();
    if !result {
        return Ok(false);
    }
    if let Some(desc) = target.get_own_property(key)? {
        if !desc.is_configurable() {
            match &desc {
                PropertyDescriptor::Data {
                    value: existing,
                    attributes,
                } if !attributes.writable => {
                    if !value.same_value(existing) {
                        return Err(EngineError::type_error(format!(
                            "'set' trap cannot change non-configurable, non-writable property '{key}'"
                        )));
                    }
                }
                PropertyDescriptor::Accessor { set: None, .. } => {
                    return Err(EngineError::type_error(format!(
                        "'set' trap cannot write to non-configurable accessor property '{key}' without a setter"
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(true)
}

/// Proxy [[Delete]]
pub(crate) fn delete(slots: &ProxySlots, key: &PropertyKey) -> EngineResult<bool> {
    let (target, handler) = slots.parts("deleteProperty")?;
    let Some(trap_fn) = trap(&handler, "deleteProperty")? else {
        return target.delete(key);
    };
    let result = call_trap(
        &trap_fn,
        &handler,
        &[Value::object(target.clone()), key.to_value()],
    )?
    .to_boolean();
    if !result {
        return Ok(false);
    }
    match target.get_own_property(key)? {
        None => Ok(true),
        Some(desc) if !desc.is_configurable() => Err(EngineError::type_error(format!(
            "'deleteProperty' trap cannot delete non-configurable property '{key}'"
        ))),
        Some(_) if !target.is_extensible()? => Err(EngineError::type_error(format!(
            "'deleteProperty' trap cannot delete property '{key}' of a non-extensible target"
        ))),
        Some(_) => Ok(true),
    }
}

/// Proxy [[OwnPropertyKeys]]
pub(crate) fn own_property_keys(slots: &ProxySlots) -> EngineResult<Vec<PropertyKey>> {
    let (target, handler) = slots.parts("ownKeys")?;
    let Some(trap_fn) = trap(&handler, "ownKeys")? else {
        return target.own_property_keys();
    };
    let result = call_trap(&trap_fn, &handler, &[Value::object(target.clone())])?;
    let Some(list_obj) = result.as_object() else {
        return Err(EngineError::type_error(
            "'ownKeys' trap must return an array-like object",
        ));
    };

    // CreateListFromArrayLike, restricted to property-key values.
    let receiver = Value::object(list_obj.clone());
    let len_value = list_obj.get(&PropertyKey::string("length"), &receiver)?;
    let len = convert::to_length(&len_value)?;
    let mut keys = Vec::with_capacity(len as usize);
    let mut seen: FxHashSet<PropertyKey> = FxHashSet::default();
    for i in 0..len {
        let element = list_obj.get(&PropertyKey::from_u64(i), &receiver)?;
        let key = match element {
            Value::String(s) => PropertyKey::from_js_string(s),
            Value::Symbol(s) => PropertyKey::Symbol(s),
            _ => {
                return Err(EngineError::type_error(
                    "'ownKeys' trap result entries must be strings or symbols",
                ));
            }
        };
        if !seen.insert(key.clone()) {
            return Err(EngineError::type_error(
                "'ownKeys' trap returned duplicate entries",
            ));
        }
        keys.push(key);
    }

    let extensible = target.is_extensible()?;
    let target_keys = target.own_property_keys()?;
    let mut all_configurable = true;
    for target_key in &target_keys {
        let configurable = target
            .get_own_property(target_key)?
            .map(|d| d.is_configurable())
            .unwrap_or(true);
        if !configurable {
            all_configurable = false;
            if !seen.contains(target_key) {
                return Err(EngineError::type_error(format!(
                    "'ownKeys' trap result must include non-configurable property '{target_key}'"
                )));
            }
        }
    }
    if extensible && all_configurable {
        return Ok(keys);
    }
    if !extensible {
        // Non-extensible: the trap result must be exactly the target's keys.
        for target_key in &target_keys {
            if !seen.contains(target_key) {
                return Err(EngineError::type_error(format!(
                    "'ownKeys' trap result must include property '{target_key}' of a non-extensible target"
                )));
            }
        }
        if keys.len() != target_keys.len() {
            return Err(EngineError::type_error(
                "'ownKeys' trap cannot report extra keys for a non-extensible target",
            ));
        }
    }
    Ok(keys)
}

/// Proxy [[Call]]
pub(crate) fn apply(slots: &ProxySlots, this: &Value, args: &[Value]) -> EngineResult<Value> {
    let (target, handler) = slots.parts("apply")?;
    if !target.is_callable() {
        return Err(EngineError::type_error("Proxy target is not a function"));
    }
    let Some(trap_fn) = trap(&handler, "apply")? else {
        return target.call(this, args);
    };
    call_trap(
        &trap_fn,
        &handler,
        &[
            Value::object(target.clone()),
            this.clone(),
            Value::object(arguments_array(args)),
        ],
    )
}

/// Proxy [[Construct]]. The result must be an object.
pub(crate) fn construct(slots: &ProxySlots, args: &[Value]) -> EngineResult<Arc<JsObject>> {
    let (target, handler) = slots.parts("construct")?;
    if !target.is_callable() {
        return Err(EngineError::type_error("Proxy target is not a constructor"));
    }
    let result = match trap(&handler, "construct")? {
        Some(trap_fn) => call_trap(
            &trap_fn,
            &handler,
            &[
                Value::object(target.clone()),
                Value::object(arguments_array(args)),
            ],
        )?,
        None => target.call(&Value::undefined(), args)?,
    };
    match result {
        Value::Object(o) => Ok(o),
        _ => Err(EngineError::type_error(
            "'construct' trap must return an object",
        )),
    }
}

/// Construct through a proxy object, as `new proxy(...)` would
pub fn construct_proxy(proxy: &Arc<JsObject>, args: &[Value]) -> EngineResult<Arc<JsObject>> {
    match proxy.proxy_slots() {
        Some(slots) => construct(slots, args),
        None => Err(EngineError::type_error("Object is not a constructor")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PropertyAttributes;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::string(s)
    }

    #[test]
    fn test_missing_traps_forward_to_target() {
        let target = JsObject::new(None);
        target.set_or_throw(&key("x"), Value::number(1.0)).unwrap();
        let proxy = JsObject::new_proxy(target.clone(), JsObject::new(None));

        assert!(
            proxy
                .get_value(&key("x"))
                .unwrap()
                .strict_equals(&Value::number(1.0))
        );
        proxy.set_or_throw(&key("y"), Value::number(2.0)).unwrap();
        assert!(
            target
                .get_value(&key("y"))
                .unwrap()
                .strict_equals(&Value::number(2.0))
        );
        assert!(proxy.has_property(&key("x")).unwrap());
        assert!(proxy.delete(&key("x")).unwrap());
        assert!(!target.table().read().contains(&key("x")));
    }

    #[test]
    fn test_get_trap_intercepts() {
        let target = JsObject::new(None);
        let handler = JsObject::new(None);
        handler.set_native_property("get", |_, _| Ok(Value::string("trapped")));
        let proxy = JsObject::new_proxy(target, handler);
        assert!(
            proxy
                .get_value(&key("anything"))
                .unwrap()
                .strict_equals(&Value::string("trapped"))
        );
    }

    #[test]
    fn test_get_trap_cannot_lie_about_frozen_data() {
        let target = JsObject::new(None);
        target
            .define_own_or_throw(
                key("pinned"),
                DescriptorSpec::data(Value::number(7.0), PropertyAttributes::frozen()),
            )
            .unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("get", |_, _| Ok(Value::number(8.0)));
        let proxy = JsObject::new_proxy(target, handler);
        assert!(proxy.get_value(&key("pinned")).unwrap_err().is_type_error());
    }

    #[test]
    fn test_non_callable_trap_is_a_type_error() {
        let target = JsObject::new(None);
        let handler = JsObject::new(None);
        handler
            .set_or_throw(&key("get"), Value::number(5.0))
            .unwrap();
        let proxy = JsObject::new_proxy(target, handler);
        let err = proxy.get_value(&key("x")).unwrap_err();
        assert!(err.is_type_error());
        assert!(err.message().contains("'get' trap must be a function"));
    }

    #[test]
    fn test_revoked_proxy_throws() {
        let proxy = JsObject::new_proxy(JsObject::new(None), JsObject::new(None));
        assert!(proxy.revoke_proxy());
        let err = proxy.get_value(&key("x")).unwrap_err();
        assert!(err.is_type_error());
        assert!(err.message().contains("revoked"));
    }

    #[test]
    fn test_has_trap_cannot_hide_non_configurable() {
        let target = JsObject::new(None);
        target
            .define_own_or_throw(
                key("fixed"),
                DescriptorSpec::data(Value::number(1.0), PropertyAttributes::frozen()),
            )
            .unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("has", |_, _| Ok(Value::boolean(false)));
        let proxy = JsObject::new_proxy(target, handler);
        assert!(proxy.has_property(&key("fixed")).unwrap_err().is_type_error());
        assert!(!proxy.has_property(&key("absent")).unwrap());
    }

    #[test]
    fn test_own_keys_duplicates_rejected() {
        let target = JsObject::new(None);
        let handler = JsObject::new(None);
        handler.set_native_property("ownKeys", |_, _| {
            let arr = JsObject::new_array(0);
            arr.create_data_property(PropertyKey::Index(0), Value::string("a"))?;
            arr.create_data_property(PropertyKey::Index(1), Value::string("a"))?;
            Ok(Value::object(arr))
        });
        let proxy = JsObject::new_proxy(target, handler);
        let err = proxy.own_property_keys().unwrap_err();
        assert!(err.is_type_error());
        assert!(err.message().contains("duplicate"));
    }

    #[test]
    fn test_own_keys_must_include_non_configurable() {
        let target = JsObject::new(None);
        target
            .define_own_or_throw(
                key("keep"),
                DescriptorSpec::data(Value::number(1.0), PropertyAttributes::frozen()),
            )
            .unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("ownKeys", |_, _| {
            let arr = JsObject::new_array(0);
            arr.create_data_property(PropertyKey::Index(0), Value::string("other"))?;
            Ok(Value::object(arr))
        });
        let proxy = JsObject::new_proxy(target, handler);
        assert!(proxy.own_property_keys().unwrap_err().is_type_error());
    }

    #[test]
    fn test_own_keys_non_extensible_exact_match() {
        let target = JsObject::new(None);
        target.set_or_throw(&key("a"), Value::number(1.0)).unwrap();
        target.prevent_extensions().unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("ownKeys", |_, _| {
            let arr = JsObject::new_array(0);
            arr.create_data_property(PropertyKey::Index(0), Value::string("a"))?;
            arr.create_data_property(PropertyKey::Index(1), Value::string("b"))?;
            Ok(Value::object(arr))
        });
        let proxy = JsObject::new_proxy(target, handler);
        let err = proxy.own_property_keys().unwrap_err();
        assert!(err.is_type_error());
        assert!(err.message().contains("extra keys"));
    }

    #[test]
    fn test_get_prototype_of_lie_on_non_extensible() {
        let target = JsObject::new(None);
        target.prevent_extensions().unwrap();
        let fake_proto = JsObject::new(None);
        let handler = JsObject::new(None);
        let fake = fake_proto.clone();
        handler.set_native_property("getPrototypeOf", move |_, _| {
            Ok(Value::object(fake.clone()))
        });
        let proxy = JsObject::new_proxy(target, handler);
        assert!(proxy.get_prototype_of().unwrap_err().is_type_error());
    }

    #[test]
    fn test_delete_trap_cannot_remove_non_configurable() {
        let target = JsObject::new(None);
        target
            .define_own_or_throw(
                key("fixed"),
                DescriptorSpec::data(Value::number(1.0), PropertyAttributes::frozen()),
            )
            .unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("deleteProperty", |_, _| Ok(Value::boolean(true)));
        let proxy = JsObject::new_proxy(target, handler);
        assert!(proxy.delete(&key("fixed")).unwrap_err().is_type_error());
    }

    #[test]
    fn test_apply_trap() {
        let target = JsObject::function(|_, _| Ok(Value::number(1.0)));
        let handler = JsObject::new(None);
        handler.set_native_property("apply", |_, args| {
            // args are [target, thisArg, argArray]
            let arg_array = args[2].as_object().cloned().ok_or_else(|| {
                EngineError::internal("missing argument array")
            })?;
            arg_array.get_value(&PropertyKey::Index(0))
        });
        let proxy = JsObject::new_proxy(target, handler);
        let result = proxy
            .call(&Value::undefined(), &[Value::number(42.0)])
            .unwrap();
        assert!(result.strict_equals(&Value::number(42.0)));
    }

    #[test]
    fn test_apply_without_trap_forwards() {
        let target = JsObject::function(|_, args| {
            Ok(args.first().cloned().unwrap_or(Value::undefined()))
        });
        let proxy = JsObject::new_proxy(target, JsObject::new(None));
        assert!(proxy.is_callable());
        let result = proxy
            .call(&Value::undefined(), &[Value::string("through")])
            .unwrap();
        assert!(result.strict_equals(&Value::string("through")));
    }

    #[test]
    fn test_construct_requires_object_result() {
        let target = JsObject::function(|_, _| Ok(Value::number(3.0)));
        let proxy = JsObject::new_proxy(target, JsObject::new(None));
        let err = construct_proxy(&proxy, &[]).unwrap_err();
        assert!(err.is_type_error());

        let target = JsObject::function(|_, _| Ok(Value::object(JsObject::new(None))));
        let proxy = JsObject::new_proxy(target, JsObject::new(None));
        assert!(construct_proxy(&proxy, &[]).is_ok());
    }

    #[test]
    fn test_define_property_trap_validation() {
        let target = JsObject::new(None);
        target.prevent_extensions().unwrap();
        let handler = JsObject::new(None);
        handler.set_native_property("defineProperty", |_, _| Ok(Value::boolean(true)));
        let proxy = JsObject::new_proxy(target, handler);
        let err = proxy
            .define_own_property(key("fresh"), DescriptorSpec::value_only(Value::number(1.0)))
            .unwrap_err();
        assert!(err.is_type_error());
    }
}
