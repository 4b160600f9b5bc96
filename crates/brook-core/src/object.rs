//! JavaScript objects and the fundamental internal operations
//!
//! Every object owns a property table (index keys ordered ascending, named
//! keys in creation order), a shared prototype link, and an extensibility
//! flag. Exotic behavior (Array, Arguments, Proxy, ArrayBuffer, TypedArray)
//! is a tagged variant dispatching to per-kind overrides of the fundamental
//! operations; the dispatch is a total match, not inheritance.
//!
//! Objects are shared as `Arc<JsObject>` with `RwLock` interior mutability.
//! User callables (getters, setters, traps) are never invoked while a table
//! lock is held; descriptors are cloned out first.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::array;
use crate::array_buffer::ArrayBufferRecord;
use crate::error::{EngineError, EngineResult};
use crate::proxy::ProxySlots;
use crate::proxy_ops;
use crate::string::JsString;
use crate::typed_array::{self, TypedArrayRecord};
use crate::value::{JsSymbol, NativeFn, Value};

/// Property key: string, symbol, or canonical array index.
///
/// Strings that are canonical non-negative integers below 2^32-1 are
/// normalized to `Index` at construction, so ordering and array semantics
/// never have to re-parse key text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Array-index key (canonical integer string below 2^32-1)
    Index(u32),
    /// String property key
    String(Arc<JsString>),
    /// Symbol property key
    Symbol(Arc<JsSymbol>),
}

impl PropertyKey {
    /// Key from Rust text, canonicalizing array indices
    pub fn string(s: &str) -> Self {
        Self::from_js_string(JsString::intern(s))
    }

    /// Key from an engine string, canonicalizing array indices
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        match s.as_array_index() {
            Some(i) => Self::Index(i),
            None => Self::String(s),
        }
    }

    /// Array-index key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Symbol key
    pub fn symbol(s: Arc<JsSymbol>) -> Self {
        Self::Symbol(s)
    }

    /// Key for an unsigned integer that may exceed the array-index range
    pub fn from_u64(n: u64) -> Self {
        if n < u32::MAX as u64 {
            Self::Index(n as u32)
        } else {
            let mut buf = itoa::Buffer::new();
            Self::String(JsString::intern(buf.format(n)))
        }
    }

    /// The array index, if this is an index key
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// True for symbol keys
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// The key as a language value (index keys become strings)
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(i) => {
                let mut buf = itoa::Buffer::new();
                Value::string(buf.format(*i))
            }
            Self::String(s) => Value::String(s.clone()),
            Self::Symbol(s) => Value::Symbol(s.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Symbol(s) => match s.description() {
                Some(d) => write!(f, "Symbol({d})"),
                None => write!(f, "Symbol()"),
            },
        }
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Property is writable (data descriptors only)
    pub writable: bool,
    /// Property shows up in enumeration
    pub enumerable: bool,
    /// Property may be deleted or reshaped
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default attributes for assignment-created data properties
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// Writable but hidden from enumeration, not reshapeable
    pub const fn writable_hidden() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: false,
        }
    }
}

/// A complete property descriptor: data or accessor, never both
#[derive(Clone, Debug)]
pub enum PropertyDescriptor {
    /// Data property
    Data {
        /// The stored value
        value: Value,
        /// Attributes
        attributes: PropertyAttributes,
    },
    /// Accessor property
    Accessor {
        /// Getter (callable), if any
        get: Option<Value>,
        /// Setter (callable), if any
        set: Option<Value>,
        /// Attributes (`writable` is unused for accessors)
        attributes: PropertyAttributes,
    },
}

impl PropertyDescriptor {
    /// Data descriptor with default (true/true/true) attributes
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::data(),
        }
    }

    /// Data descriptor with explicit attributes
    pub fn data_with(value: Value, attributes: PropertyAttributes) -> Self {
        Self::Data { value, attributes }
    }

    /// Accessor descriptor
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: PropertyAttributes) -> Self {
        Self::Accessor {
            get,
            set,
            attributes,
        }
    }

    /// The attribute triple
    pub fn attributes(&self) -> PropertyAttributes {
        match self {
            Self::Data { attributes, .. } | Self::Accessor { attributes, .. } => *attributes,
        }
    }

    /// True if the property may be deleted/reshaped
    pub fn is_configurable(&self) -> bool {
        self.attributes().configurable
    }

    /// True if the property shows up in enumeration
    pub fn is_enumerable(&self) -> bool {
        self.attributes().enumerable
    }

    /// True for data descriptors
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// True for accessor descriptors
    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }

    /// Writable flag; accessors are never writable
    pub fn is_writable(&self) -> bool {
        match self {
            Self::Data { attributes, .. } => attributes.writable,
            Self::Accessor { .. } => false,
        }
    }

    /// The stored value, for data descriptors
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    /// The getter, for accessor descriptors
    pub fn getter(&self) -> Option<&Value> {
        match self {
            Self::Accessor { get, .. } => get.as_ref(),
            Self::Data { .. } => None,
        }
    }

    /// The setter, for accessor descriptors
    pub fn setter(&self) -> Option<&Value> {
        match self {
            Self::Accessor { set, .. } => set.as_ref(),
            Self::Data { .. } => None,
        }
    }

    /// FromPropertyDescriptor: materialize as an ordinary object
    pub fn to_object(&self) -> Arc<JsObject> {
        let obj = JsObject::new(None);
        match self {
            Self::Data { value, attributes } => {
                let _ = obj.create_data_property(PropertyKey::string("value"), value.clone());
                let _ = obj.create_data_property(
                    PropertyKey::string("writable"),
                    Value::boolean(attributes.writable),
                );
                let _ = obj.create_data_property(
                    PropertyKey::string("enumerable"),
                    Value::boolean(attributes.enumerable),
                );
                let _ = obj.create_data_property(
                    PropertyKey::string("configurable"),
                    Value::boolean(attributes.configurable),
                );
            }
            Self::Accessor {
                get,
                set,
                attributes,
            } => {
                let _ = obj.create_data_property(
                    PropertyKey::string("get"),
                    get.clone().unwrap_or(Value::undefined()),
                );
                let _ = obj.create_data_property(
                    PropertyKey::string("set"),
                    set.clone().unwrap_or(Value::undefined()),
                );
                let _ = obj.create_data_property(
                    PropertyKey::string("enumerable"),
                    Value::boolean(attributes.enumerable),
                );
                let _ = obj.create_data_property(
                    PropertyKey::string("configurable"),
                    Value::boolean(attributes.configurable),
                );
            }
        }
        obj
    }
}

/// A partial descriptor, the input shape of DefineOwnProperty.
///
/// Every field is optional; absent fields keep the current property's state
/// (or take defaults when a new property is created).
#[derive(Clone, Debug, Default)]
pub struct DescriptorSpec {
    /// `value` field, if present
    pub value: Option<Value>,
    /// `writable` field, if present
    pub writable: Option<bool>,
    /// `get` field, if present (`Value::Undefined` clears the getter)
    pub get: Option<Value>,
    /// `set` field, if present
    pub set: Option<Value>,
    /// `enumerable` field, if present
    pub enumerable: Option<bool>,
    /// `configurable` field, if present
    pub configurable: Option<bool>,
}

impl DescriptorSpec {
    /// Spec carrying only a value (assignment-style define)
    pub fn value_only(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Fully populated data spec
    pub fn data(value: Value, attributes: PropertyAttributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(attributes.writable),
            enumerable: Some(attributes.enumerable),
            configurable: Some(attributes.configurable),
            ..Self::default()
        }
    }

    /// Fully populated accessor spec
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: PropertyAttributes) -> Self {
        Self {
            get: Some(get.unwrap_or(Value::undefined())),
            set: Some(set.unwrap_or(Value::undefined())),
            enumerable: Some(attributes.enumerable),
            configurable: Some(attributes.configurable),
            ..Self::default()
        }
    }

    /// Complete spec mirroring an existing descriptor
    pub fn from_descriptor(desc: &PropertyDescriptor) -> Self {
        match desc {
            PropertyDescriptor::Data { value, attributes } => Self::data(value.clone(), *attributes),
            PropertyDescriptor::Accessor {
                get,
                set,
                attributes,
            } => Self::accessor(get.clone(), set.clone(), *attributes),
        }
    }

    /// Builder: set `writable`
    pub fn writable(mut self, w: bool) -> Self {
        self.writable = Some(w);
        self
    }

    /// Builder: set `enumerable`
    pub fn enumerable(mut self, e: bool) -> Self {
        self.enumerable = Some(e);
        self
    }

    /// Builder: set `configurable`
    pub fn configurable(mut self, c: bool) -> Self {
        self.configurable = Some(c);
        self
    }

    /// True when no fields are present
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.get.is_none()
            && self.set.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
    }

    /// IsDataDescriptor
    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsAccessorDescriptor
    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic(&self) -> bool {
        !self.is_data() && !self.is_accessor()
    }

    /// ToPropertyDescriptor: read a descriptor object's fields, with the
    /// usual callable checks on `get`/`set`. Reads are observable `Get`s.
    pub fn from_object(obj: &Arc<JsObject>) -> EngineResult<Self> {
        let receiver = Value::object(obj.clone());
        let mut spec = Self::default();

        let read = |name: &str| -> EngineResult<Option<Value>> {
            let key = PropertyKey::string(name);
            if obj.has_property(&key)? {
                Ok(Some(obj.get(&key, &receiver)?))
            } else {
                Ok(None)
            }
        };

        if let Some(v) = read("enumerable")? {
            spec.enumerable = Some(v.to_boolean());
        }
        if let Some(v) = read("configurable")? {
            spec.configurable = Some(v.to_boolean());
        }
        if let Some(v) = read("value")? {
            spec.value = Some(v);
        }
        if let Some(v) = read("writable")? {
            spec.writable = Some(v.to_boolean());
        }
        if let Some(v) = read("get")? {
            if !v.is_undefined() && !v.is_callable() {
                return Err(EngineError::type_error("Getter must be a function"));
            }
            spec.get = Some(v);
        }
        if let Some(v) = read("set")? {
            if !v.is_undefined() && !v.is_callable() {
                return Err(EngineError::type_error("Setter must be a function"));
            }
            spec.set = Some(v);
        }
        if spec.is_data() && spec.is_accessor() {
            return Err(EngineError::type_error(
                "Property description must not specify both accessor and data fields",
            ));
        }
        Ok(spec)
    }

    fn getter_value(&self) -> Option<Value> {
        self.get.clone().filter(|v| !v.is_undefined())
    }

    fn setter_value(&self) -> Option<Value> {
        self.set.clone().filter(|v| !v.is_undefined())
    }
}

/// ValidateAndApplyPropertyDescriptor.
///
/// Returns the resulting complete descriptor when the update is legal, or
/// `None` when it must be rejected. Shared by ordinary DefineOwnProperty,
/// Array length updates, and Proxy trap-result verification.
pub fn validate_and_apply(
    current: Option<&PropertyDescriptor>,
    extensible: bool,
    spec: &DescriptorSpec,
) -> Option<PropertyDescriptor> {
    let Some(current) = current else {
        if !extensible {
            return None;
        }
        // New property: missing fields take their defaults.
        let attributes = PropertyAttributes {
            writable: spec.writable.unwrap_or(false),
            enumerable: spec.enumerable.unwrap_or(false),
            configurable: spec.configurable.unwrap_or(false),
        };
        return Some(if spec.is_accessor() {
            PropertyDescriptor::Accessor {
                get: spec.getter_value(),
                set: spec.setter_value(),
                attributes,
            }
        } else {
            PropertyDescriptor::Data {
                value: spec.value.clone().unwrap_or(Value::undefined()),
                attributes,
            }
        });
    };

    if spec.is_empty() {
        return Some(current.clone());
    }

    let cur_attrs = current.attributes();
    if !cur_attrs.configurable {
        if spec.configurable == Some(true) {
            return None;
        }
        if let Some(e) = spec.enumerable {
            if e != cur_attrs.enumerable {
                return None;
            }
        }
        if !spec.is_generic() && spec.is_accessor() != current.is_accessor() {
            return None;
        }
        match current {
            PropertyDescriptor::Data { value, attributes } => {
                if !attributes.writable {
                    if spec.writable == Some(true) {
                        return None;
                    }
                    if let Some(new_value) = &spec.value {
                        if !new_value.same_value(value) {
                            return None;
                        }
                    }
                }
            }
            PropertyDescriptor::Accessor { get, set, .. } => {
                if let Some(new_get) = &spec.get {
                    let existing = get.clone().unwrap_or(Value::undefined());
                    if !new_get.same_value(&existing) {
                        return None;
                    }
                }
                if let Some(new_set) = &spec.set {
                    let existing = set.clone().unwrap_or(Value::undefined());
                    if !new_set.same_value(&existing) {
                        return None;
                    }
                }
            }
        }
    }

    // Apply: merge the present fields over the current state.
    let attributes = PropertyAttributes {
        writable: spec.writable.unwrap_or_else(|| current.is_writable()),
        enumerable: spec.enumerable.unwrap_or(cur_attrs.enumerable),
        configurable: spec.configurable.unwrap_or(cur_attrs.configurable),
    };

    Some(if spec.is_accessor() || (spec.is_generic() && current.is_accessor()) {
        let (cur_get, cur_set) = match current {
            PropertyDescriptor::Accessor { get, set, .. } => (get.clone(), set.clone()),
            // Data-to-accessor conversion: accessor slots start empty.
            PropertyDescriptor::Data { .. } => (None, None),
        };
        PropertyDescriptor::Accessor {
            get: if spec.get.is_some() {
                spec.getter_value()
            } else {
                cur_get
            },
            set: if spec.set.is_some() {
                spec.setter_value()
            } else {
                cur_set
            },
            attributes: PropertyAttributes {
                writable: false,
                ..attributes
            },
        }
    } else {
        let cur_value = current.value().cloned();
        PropertyDescriptor::Data {
            value: spec
                .value
                .clone()
                .or(cur_value)
                .unwrap_or(Value::undefined()),
            attributes,
        }
    })
}

/// IsCompatiblePropertyDescriptor, the proxy-validation face of
/// [`validate_and_apply`]
pub fn is_compatible_descriptor(
    extensible: bool,
    spec: &DescriptorSpec,
    current: Option<&PropertyDescriptor>,
) -> bool {
    validate_and_apply(current, extensible, spec).is_some()
}

/// Ordered own-property storage: array-index keys ascending, named keys in
/// creation order (strings before symbols on enumeration).
#[derive(Debug, Default)]
pub struct PropertyTable {
    indexed: BTreeMap<u32, PropertyDescriptor>,
    named: IndexMap<PropertyKey, PropertyDescriptor, FxBuildHasher>,
}

impl PropertyTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a descriptor
    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        match key {
            PropertyKey::Index(i) => self.indexed.get(i),
            _ => self.named.get(key),
        }
    }

    /// Insert or replace a descriptor
    pub fn insert(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        match key {
            PropertyKey::Index(i) => {
                self.indexed.insert(i, desc);
            }
            _ => {
                self.named.insert(key, desc);
            }
        }
    }

    /// Remove a descriptor, preserving the creation order of survivors
    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        match key {
            PropertyKey::Index(i) => self.indexed.remove(i),
            _ => self.named.shift_remove(key),
        }
    }

    /// Membership test
    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of own properties
    pub fn len(&self) -> usize {
        self.indexed.len() + self.named.len()
    }

    /// True when no properties exist
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in the canonical order: indices ascending, then strings in
    /// creation order, then symbols in creation order.
    pub fn ordered_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::with_capacity(self.len());
        keys.extend(self.indexed.keys().map(|&i| PropertyKey::Index(i)));
        keys.extend(
            self.named
                .keys()
                .filter(|k| !k.is_symbol())
                .cloned(),
        );
        keys.extend(self.named.keys().filter(|k| k.is_symbol()).cloned());
        keys
    }

    /// Index keys at or above `from`, ascending
    pub fn indices_at_or_above(&self, from: u32) -> Vec<u32> {
        self.indexed.range(from..).map(|(&i, _)| i).collect()
    }
}

/// Exotic behavior selector
pub enum Exotic {
    /// No overrides
    Ordinary,
    /// Array: magic `length`
    Array,
    /// Unmapped arguments object (ordinary semantics, special layout)
    Arguments,
    /// Proxy: trap-forwarding over a target/handler pair
    Proxy(ProxySlots),
    /// ArrayBuffer: owner of a detachable byte region
    ArrayBuffer(Arc<ArrayBufferRecord>),
    /// TypedArray: integer-indexed view over an ArrayBuffer
    TypedArray(TypedArrayRecord),
}

impl std::fmt::Debug for Exotic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ordinary => "Ordinary",
            Self::Array => "Array",
            Self::Arguments => "Arguments",
            Self::Proxy(_) => "Proxy",
            Self::ArrayBuffer(_) => "ArrayBuffer",
            Self::TypedArray(_) => "TypedArray",
        };
        write!(f, "{name}")
    }
}

/// A JavaScript object
pub struct JsObject {
    table: RwLock<PropertyTable>,
    prototype: RwLock<Option<Arc<JsObject>>>,
    extensible: RwLock<bool>,
    call: Option<NativeFn>,
    exotic: Exotic,
}

impl JsObject {
    fn with_parts(
        prototype: Option<Arc<JsObject>>,
        call: Option<NativeFn>,
        exotic: Exotic,
    ) -> Arc<Self> {
        Arc::new(Self {
            table: RwLock::new(PropertyTable::new()),
            prototype: RwLock::new(prototype),
            extensible: RwLock::new(true),
            call,
            exotic,
        })
    }

    /// Create an ordinary object
    pub fn new(prototype: Option<Arc<JsObject>>) -> Arc<Self> {
        Self::with_parts(prototype, None, Exotic::Ordinary)
    }

    /// Create a callable object from a host closure
    pub fn function(
        f: impl Fn(&Value, &[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_parts(None, Some(Arc::new(f)), Exotic::Ordinary)
    }

    /// Create an Array exotic object with the given initial length
    pub fn new_array(length: u32) -> Arc<Self> {
        let arr = Self::with_parts(None, None, Exotic::Array);
        arr.table.write().insert(
            PropertyKey::string("length"),
            PropertyDescriptor::data_with(
                Value::number(length as f64),
                PropertyAttributes::writable_hidden(),
            ),
        );
        arr
    }

    /// Create an unmapped arguments object over the given values
    pub fn new_arguments(args: &[Value]) -> Arc<Self> {
        let obj = Self::with_parts(None, None, Exotic::Arguments);
        {
            let mut table = obj.table.write();
            for (i, arg) in args.iter().enumerate() {
                table.insert(
                    PropertyKey::Index(i as u32),
                    PropertyDescriptor::data(arg.clone()),
                );
            }
            table.insert(
                PropertyKey::string("length"),
                PropertyDescriptor::data_with(
                    Value::number(args.len() as f64),
                    PropertyAttributes {
                        writable: true,
                        enumerable: false,
                        configurable: true,
                    },
                ),
            );
        }
        obj
    }

    /// Create a Proxy over `target` with `handler`
    pub fn new_proxy(target: Arc<JsObject>, handler: Arc<JsObject>) -> Arc<Self> {
        Self::with_parts(None, None, Exotic::Proxy(ProxySlots::new(target, handler)))
    }

    /// Create an ArrayBuffer object over an existing byte record
    pub fn new_array_buffer(record: Arc<ArrayBufferRecord>) -> Arc<Self> {
        Self::with_parts(None, None, Exotic::ArrayBuffer(record))
    }

    /// Create a TypedArray view object
    pub fn new_typed_array(record: TypedArrayRecord) -> Arc<Self> {
        Self::with_parts(None, None, Exotic::TypedArray(record))
    }

    /// The exotic behavior tag
    pub fn exotic(&self) -> &Exotic {
        &self.exotic
    }

    /// True for Array exotic objects (not proxy-unwrapping; see
    /// [`crate::array_ops::is_array`] for the `IsArray` operation)
    pub fn is_array_exotic(&self) -> bool {
        matches!(self.exotic, Exotic::Array)
    }

    /// True for Proxy exotic objects
    pub fn is_proxy(&self) -> bool {
        matches!(self.exotic, Exotic::Proxy(_))
    }

    /// The proxy slots, for Proxy exotic objects
    pub fn proxy_slots(&self) -> Option<&ProxySlots> {
        match &self.exotic {
            Exotic::Proxy(slots) => Some(slots),
            _ => None,
        }
    }

    /// Revoke a proxy. Returns false for non-proxies and double revokes.
    pub fn revoke_proxy(&self) -> bool {
        match &self.exotic {
            Exotic::Proxy(slots) => slots.revoke(),
            _ => false,
        }
    }

    /// The buffer record, for ArrayBuffer objects
    pub fn array_buffer_record(&self) -> Option<&Arc<ArrayBufferRecord>> {
        match &self.exotic {
            Exotic::ArrayBuffer(record) => Some(record),
            _ => None,
        }
    }

    /// The view record, for TypedArray objects
    pub fn typed_array_record(&self) -> Option<&TypedArrayRecord> {
        match &self.exotic {
            Exotic::TypedArray(record) => Some(record),
            _ => None,
        }
    }

    /// True if the object can be invoked
    pub fn is_callable(&self) -> bool {
        match &self.exotic {
            Exotic::Proxy(slots) => slots
                .target()
                .map(|t| t.is_callable())
                .unwrap_or(false),
            _ => self.call.is_some(),
        }
    }

    /// Invoke the object. Proxies route through the `apply` trap.
    pub fn call(self: &Arc<Self>, this: &Value, args: &[Value]) -> EngineResult<Value> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::apply(slots, this, args),
            _ => match &self.call {
                Some(f) => f(this, args),
                None => Err(EngineError::type_error("Object is not a function")),
            },
        }
    }

    /// Convenience: define an enumerable data property holding a host
    /// closure, ignoring failure (used when wiring up handlers in tests and
    /// fixtures).
    pub fn set_native_property(
        self: &Arc<Self>,
        name: &str,
        f: impl Fn(&Value, &[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    ) {
        let func = JsObject::function(f);
        let _ = self.create_data_property(PropertyKey::string(name), Value::object(func));
    }

    // ---------------------------------------------------------------------
    // Fundamental internal operations (dispatch layer)
    // ---------------------------------------------------------------------

    /// \[\[GetPrototypeOf\]\]
    pub fn get_prototype_of(self: &Arc<Self>) -> EngineResult<Option<Arc<JsObject>>> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::get_prototype_of(slots),
            _ => Ok(self.prototype.read().clone()),
        }
    }

    /// \[\[SetPrototypeOf\]\]
    pub fn set_prototype_of(
        self: &Arc<Self>,
        proto: Option<Arc<JsObject>>,
    ) -> EngineResult<bool> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::set_prototype_of(slots, proto),
            _ => self.ordinary_set_prototype_of(proto),
        }
    }

    /// \[\[SetPrototypeOf\]\] taking a language value; anything that is not
    /// an object or null fails without throwing.
    pub fn set_prototype_of_value(self: &Arc<Self>, proto: &Value) -> EngineResult<bool> {
        match proto {
            Value::Null => self.set_prototype_of(None),
            Value::Object(o) => self.set_prototype_of(Some(o.clone())),
            _ => Ok(false),
        }
    }

    /// \[\[IsExtensible\]\]
    pub fn is_extensible(self: &Arc<Self>) -> EngineResult<bool> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::is_extensible(slots),
            _ => Ok(*self.extensible.read()),
        }
    }

    /// \[\[PreventExtensions\]\]; permanent once done
    pub fn prevent_extensions(self: &Arc<Self>) -> EngineResult<bool> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::prevent_extensions(slots),
            _ => {
                *self.extensible.write() = false;
                Ok(true)
            }
        }
    }

    /// \[\[GetOwnProperty\]\]; never consults the prototype chain
    pub fn get_own_property(
        self: &Arc<Self>,
        key: &PropertyKey,
    ) -> EngineResult<Option<PropertyDescriptor>> {
        match (&self.exotic, key) {
            (Exotic::Proxy(slots), _) => proxy_ops::get_own_property(slots, key),
            (Exotic::TypedArray(record), PropertyKey::Index(i)) => {
                Ok(typed_array::index_descriptor(record, *i))
            }
            _ => Ok(self.table.read().get(key).cloned()),
        }
    }

    /// \[\[DefineOwnProperty\]\]
    pub fn define_own_property(
        self: &Arc<Self>,
        key: PropertyKey,
        spec: DescriptorSpec,
    ) -> EngineResult<bool> {
        match (&self.exotic, &key) {
            (Exotic::Proxy(slots), _) => proxy_ops::define_own_property(slots, &key, &spec),
            (Exotic::Array, _) => array::define_own_property(self, key, spec),
            (Exotic::TypedArray(_), PropertyKey::Index(i)) => {
                let i = *i;
                typed_array::define_index(self, i, &spec)
            }
            _ => self.ordinary_define_own_property(key, spec),
        }
    }

    /// DefineOwnProperty that throws TypeError on rejection
    pub fn define_own_or_throw(
        self: &Arc<Self>,
        key: PropertyKey,
        spec: DescriptorSpec,
    ) -> EngineResult<()> {
        let label = key.to_string();
        if self.define_own_property(key, spec)? {
            Ok(())
        } else {
            Err(EngineError::type_error(format!(
                "Cannot redefine property '{label}'"
            )))
        }
    }

    /// CreateDataProperty: full data descriptor with default attributes
    pub fn create_data_property(
        self: &Arc<Self>,
        key: PropertyKey,
        value: Value,
    ) -> EngineResult<bool> {
        self.define_own_property(
            key,
            DescriptorSpec::data(value, PropertyAttributes::data()),
        )
    }

    /// CreateDataProperty that throws on rejection
    pub fn create_data_property_or_throw(
        self: &Arc<Self>,
        key: PropertyKey,
        value: Value,
    ) -> EngineResult<()> {
        let label = key.to_string();
        if self.create_data_property(key, value)? {
            Ok(())
        } else {
            Err(EngineError::type_error(format!(
                "Cannot create property '{label}'"
            )))
        }
    }

    /// \[\[HasProperty\]\]; delegates up the prototype chain
    pub fn has_property(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<bool> {
        match (&self.exotic, key) {
            (Exotic::Proxy(slots), _) => proxy_ops::has_property(slots, key),
            (Exotic::TypedArray(record), PropertyKey::Index(i)) => {
                Ok(typed_array::index_descriptor(record, *i).is_some())
            }
            _ => self.ordinary_has_property(key),
        }
    }

    /// \[\[Get\]\]
    pub fn get(self: &Arc<Self>, key: &PropertyKey, receiver: &Value) -> EngineResult<Value> {
        match (&self.exotic, key) {
            (Exotic::Proxy(slots), _) => proxy_ops::get(slots, key, receiver),
            (Exotic::TypedArray(record), PropertyKey::Index(i)) => Ok(typed_array::index_descriptor(
                record, *i,
            )
            .and_then(|d| d.value().cloned())
            .unwrap_or(Value::undefined())),
            _ => self.ordinary_get(key, receiver),
        }
    }

    /// \[\[Get\]\] with the object itself as receiver
    pub fn get_value(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<Value> {
        self.get(key, &Value::object(self.clone()))
    }

    /// \[\[Set\]\]; returns false on sloppy-mode style rejection
    pub fn set(
        self: &Arc<Self>,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> EngineResult<bool> {
        match (&self.exotic, key) {
            (Exotic::Proxy(slots), _) => proxy_ops::set(slots, key, value, receiver),
            (Exotic::TypedArray(_), PropertyKey::Index(i)) => {
                let i = *i;
                typed_array::set_index(self, i, &value)
            }
            _ => self.ordinary_set(key, value, receiver),
        }
    }

    /// Strict-mode \[\[Set\]\]: rejection becomes a TypeError
    pub fn set_or_throw(self: &Arc<Self>, key: &PropertyKey, value: Value) -> EngineResult<()> {
        let receiver = Value::object(self.clone());
        if self.set(key, value, &receiver)? {
            Ok(())
        } else {
            Err(EngineError::type_error(format!(
                "Attempted to assign to readonly property '{key}'"
            )))
        }
    }

    /// \[\[Delete\]\]; only fails (false) on a non-configurable own property
    pub fn delete(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<bool> {
        match (&self.exotic, key) {
            (Exotic::Proxy(slots), _) => proxy_ops::delete(slots, key),
            (Exotic::TypedArray(record), PropertyKey::Index(i)) => {
                Ok(typed_array::index_descriptor(record, *i).is_none())
            }
            _ => self.ordinary_delete(key),
        }
    }

    /// Strict-mode delete
    pub fn delete_or_throw(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<()> {
        if self.delete(key)? {
            Ok(())
        } else {
            Err(EngineError::type_error(format!(
                "Unable to delete property '{key}'"
            )))
        }
    }

    /// \[\[OwnPropertyKeys\]\]: indices ascending, then strings, then
    /// symbols, each group in creation order
    pub fn own_property_keys(self: &Arc<Self>) -> EngineResult<Vec<PropertyKey>> {
        match &self.exotic {
            Exotic::Proxy(slots) => proxy_ops::own_property_keys(slots),
            Exotic::TypedArray(record) => {
                let mut keys: Vec<PropertyKey> = (0..typed_array::record_length(record) as u32)
                    .map(PropertyKey::Index)
                    .collect();
                keys.extend(self.table.read().ordered_keys());
                Ok(keys)
            }
            _ => Ok(self.table.read().ordered_keys()),
        }
    }

    // ---------------------------------------------------------------------
    // Ordinary implementations
    // ---------------------------------------------------------------------

    fn ordinary_set_prototype_of(
        self: &Arc<Self>,
        proto: Option<Arc<JsObject>>,
    ) -> EngineResult<bool> {
        let current = self.prototype.read().clone();
        let unchanged = match (&proto, &current) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        if unchanged {
            return Ok(true);
        }
        if !*self.extensible.read() {
            return Ok(false);
        }
        // Walk the proposed chain to refuse cycles. The walk stops at the
        // first object whose [[GetPrototypeOf]] is not ordinary (a proxy),
        // which is what keeps this loop finite.
        let mut p = proto.clone();
        while let Some(ancestor) = p {
            if Arc::ptr_eq(&ancestor, self) {
                return Ok(false);
            }
            if ancestor.is_proxy() {
                break;
            }
            p = ancestor.prototype.read().clone();
        }
        *self.prototype.write() = proto;
        Ok(true)
    }

    pub(crate) fn ordinary_define_own_property(
        self: &Arc<Self>,
        key: PropertyKey,
        spec: DescriptorSpec,
    ) -> EngineResult<bool> {
        let current = self.table.read().get(&key).cloned();
        let extensible = *self.extensible.read();
        match validate_and_apply(current.as_ref(), extensible, &spec) {
            Some(applied) => {
                self.table.write().insert(key, applied);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ordinary_has_property(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<bool> {
        let mut cur = self.clone();
        let mut visited: SmallVec<[*const JsObject; 8]> = SmallVec::new();
        loop {
            if visited.iter().any(|&p| std::ptr::eq(p, Arc::as_ptr(&cur))) {
                return Ok(false);
            }
            visited.push(Arc::as_ptr(&cur));
            if !Arc::ptr_eq(&cur, self) && cur.overrides_chain_ops(key) {
                return cur.has_property(key);
            }
            if cur.table.read().contains(key) {
                return Ok(true);
            }
            let proto = cur.prototype.read().clone();
            match proto {
                Some(p) => cur = p,
                None => return Ok(false),
            }
        }
    }

    fn ordinary_get(self: &Arc<Self>, key: &PropertyKey, receiver: &Value) -> EngineResult<Value> {
        let mut cur = self.clone();
        let mut visited: SmallVec<[*const JsObject; 8]> = SmallVec::new();
        loop {
            if visited.iter().any(|&p| std::ptr::eq(p, Arc::as_ptr(&cur))) {
                return Ok(Value::undefined());
            }
            visited.push(Arc::as_ptr(&cur));
            if !Arc::ptr_eq(&cur, self) && cur.overrides_chain_ops(key) {
                return cur.get(key, receiver);
            }
            let own = cur.table.read().get(key).cloned();
            if let Some(desc) = own {
                return match desc {
                    PropertyDescriptor::Data { value, .. } => Ok(value),
                    PropertyDescriptor::Accessor { get, .. } => match get {
                        Some(getter) => getter.call(receiver, &[]),
                        None => Ok(Value::undefined()),
                    },
                };
            }
            let proto = cur.prototype.read().clone();
            match proto {
                Some(p) => cur = p,
                None => return Ok(Value::undefined()),
            }
        }
    }

    fn ordinary_set(
        self: &Arc<Self>,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> EngineResult<bool> {
        // Resolve the governing descriptor along the chain.
        let mut own: Option<PropertyDescriptor> = None;
        let mut cur = self.clone();
        let mut visited: SmallVec<[*const JsObject; 8]> = SmallVec::new();
        loop {
            if visited.iter().any(|&p| std::ptr::eq(p, Arc::as_ptr(&cur))) {
                break;
            }
            visited.push(Arc::as_ptr(&cur));
            if !Arc::ptr_eq(&cur, self) && cur.overrides_chain_ops(key) {
                return cur.set(key, value, receiver);
            }
            if let Some(desc) = cur.table.read().get(key).cloned() {
                own = Some(desc);
                break;
            }
            let proto = cur.prototype.read().clone();
            match proto {
                Some(p) => cur = p,
                None => break,
            }
        }

        let own = own.unwrap_or_else(|| PropertyDescriptor::data(Value::undefined()));
        match own {
            PropertyDescriptor::Data { attributes, .. } => {
                if !attributes.writable {
                    return Ok(false);
                }
                let Some(receiver_obj) = receiver.as_object() else {
                    return Ok(false);
                };
                let existing = receiver_obj.get_own_property(key)?;
                match existing {
                    Some(existing) => {
                        if existing.is_accessor() || !existing.is_writable() {
                            return Ok(false);
                        }
                        receiver_obj
                            .define_own_property(key.clone(), DescriptorSpec::value_only(value))
                    }
                    None => receiver_obj.create_data_property(key.clone(), value),
                }
            }
            PropertyDescriptor::Accessor { set, .. } => match set {
                Some(setter) => {
                    setter.call(receiver, &[value])?;
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    fn ordinary_delete(self: &Arc<Self>, key: &PropertyKey) -> EngineResult<bool> {
        let mut table = self.table.write();
        match table.get(key) {
            Some(desc) if !desc.is_configurable() => Ok(false),
            Some(_) => {
                table.remove(key);
                Ok(true)
            }
            None => Ok(true),
        }
    }

    /// True when this object's [[Get]]/[[Set]]/[[HasProperty]] for `key`
    /// are not the ordinary chain-walking ones
    fn overrides_chain_ops(&self, key: &PropertyKey) -> bool {
        match &self.exotic {
            Exotic::Proxy(_) => true,
            Exotic::TypedArray(_) => matches!(key, PropertyKey::Index(_)),
            _ => false,
        }
    }

    /// Raw table access for same-crate exotic implementations
    pub(crate) fn table(&self) -> &RwLock<PropertyTable> {
        &self.table
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObject")
            .field("exotic", &self.exotic)
            .field("properties", &self.table.read().len())
            .field("extensible", &*self.extensible.read())
            .finish()
    }
}
