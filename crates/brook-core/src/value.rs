//! JavaScript values
//!
//! `Value` is a tagged union over the eight language types. Heap data lives
//! behind `Arc`, so cloning a value is cheap and the garbage collector of the
//! embedding host (an external collaborator) sees only reference drops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bigint::JsBigInt;
use crate::error::{EngineError, EngineResult};
use crate::object::JsObject;
use crate::string::JsString;

/// Host-supplied callable attached to an object.
///
/// Receives the `this` value and the argument list. Getters, setters, proxy
/// traps, callbacks, and species constructors are all of this shape; they may
/// synchronously re-enter the engine and mutate anything reachable.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> EngineResult<Value> + Send + Sync>;

static SYMBOL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A unique identity token with an optional description
#[derive(Debug)]
pub struct JsSymbol {
    id: u64,
    description: Option<Arc<JsString>>,
}

impl JsSymbol {
    /// Allocate a fresh symbol
    pub fn new(description: Option<Arc<JsString>>) -> Arc<Self> {
        Arc::new(Self {
            id: SYMBOL_COUNTER.fetch_add(1, Ordering::Relaxed),
            description,
        })
    }

    /// The well-known `Symbol.species` symbol
    pub fn species() -> Arc<Self> {
        static SPECIES: std::sync::LazyLock<Arc<JsSymbol>> = std::sync::LazyLock::new(|| {
            JsSymbol::new(Some(JsString::intern("Symbol.species")))
        });
        SPECIES.clone()
    }

    /// The well-known `Symbol.iterator` symbol
    pub fn iterator() -> Arc<Self> {
        static ITERATOR: std::sync::LazyLock<Arc<JsSymbol>> = std::sync::LazyLock::new(|| {
            JsSymbol::new(Some(JsString::intern("Symbol.iterator")))
        });
        ITERATOR.clone()
    }

    /// Identity of this symbol
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The optional description
    pub fn description(&self) -> Option<&Arc<JsString>> {
        self.description.as_ref()
    }
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl std::hash::Hash for JsSymbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.id);
    }
}

/// A JavaScript value
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// IEEE-754 double
    Number(f64),
    /// Arbitrary-precision integer
    BigInt(Arc<JsBigInt>),
    /// Immutable UTF-16 string
    String(Arc<JsString>),
    /// Unique identity token
    Symbol(Arc<JsSymbol>),
    /// Object reference
    Object(Arc<JsObject>),
}

impl Value {
    /// `undefined`
    pub fn undefined() -> Self {
        Self::Undefined
    }

    /// `null`
    pub fn null() -> Self {
        Self::Null
    }

    /// A boolean value
    pub fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// A Number value
    pub fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// A String value from Rust text
    pub fn string(s: &str) -> Self {
        Self::String(JsString::intern(s))
    }

    /// A String value from an existing `JsString`
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        Self::String(s)
    }

    /// A BigInt value
    pub fn bigint(b: JsBigInt) -> Self {
        Self::BigInt(Arc::new(b))
    }

    /// A Symbol value
    pub fn symbol(s: Arc<JsSymbol>) -> Self {
        Self::Symbol(s)
    }

    /// An Object value
    pub fn object(o: Arc<JsObject>) -> Self {
        Self::Object(o)
    }

    /// True for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// True for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// True for booleans
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(_))
    }

    /// True for Numbers
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// True for BigInts
    pub fn is_bigint(&self) -> bool {
        matches!(self, Self::BigInt(_))
    }

    /// True for Strings
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// True for Symbols
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// True for Objects
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// The boolean payload, if any
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The Number payload, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The BigInt payload, if any
    pub fn as_bigint(&self) -> Option<&Arc<JsBigInt>> {
        match self {
            Self::BigInt(b) => Some(b),
            _ => None,
        }
    }

    /// The String payload, if any
    pub fn as_string(&self) -> Option<&Arc<JsString>> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The Symbol payload, if any
    pub fn as_symbol(&self) -> Option<&Arc<JsSymbol>> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// The Object payload, if any
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => !(*n == 0.0 || n.is_nan()),
            Self::BigInt(b) => !b.is_zero(),
            Self::String(s) => !s.is_empty(),
            Self::Symbol(_) | Self::Object(_) => true,
        }
    }

    /// `typeof` result
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Object(o) => {
                if o.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// True if this value can be invoked
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Object(o) if o.is_callable())
    }

    /// Invoke the value as a function. TypeError if it is not callable.
    pub fn call(&self, this: &Value, args: &[Value]) -> EngineResult<Value> {
        match self {
            Self::Object(o) => o.call(this, args),
            _ => Err(EngineError::type_error(format!(
                "{} is not a function",
                self.type_of()
            ))),
        }
    }

    /// SameValue: like `===` but NaN equals NaN and +0 differs from -0.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                if *a == 0.0 && *b == 0.0 {
                    return a.is_sign_positive() == b.is_sign_positive();
                }
                a == b
            }
            _ => self.same_non_number(other),
        }
    }

    /// SameValueZero: like SameValue but +0 equals -0.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            _ => self.same_non_number(other),
        }
    }

    /// Strict equality (`===`). Never coerces: type identity is checked
    /// before value comparison, so a BigInt is never strictly equal to an
    /// Object, even a wrapper whose primitive would compare equal.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => self.same_non_number(other),
        }
    }

    fn same_non_number(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a.id() == b.id(),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::BigInt(b) => write!(f, "{b}n"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => match s.description() {
                Some(d) => write!(f, "Symbol({d})"),
                None => write!(f, "Symbol()"),
            },
            Self::Object(o) => write!(f, "{o:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_identity() {
        let desc = JsString::intern("tag");
        let a = JsSymbol::new(Some(desc.clone()));
        let b = JsSymbol::new(Some(desc));
        assert_ne!(a.id(), b.id());
        assert!(!Value::symbol(a.clone()).strict_equals(&Value::symbol(b)));
        assert!(Value::symbol(a.clone()).strict_equals(&Value::symbol(a)));
    }

    #[test]
    fn test_well_known_species_is_singleton() {
        assert_eq!(JsSymbol::species().id(), JsSymbol::species().id());
    }

    #[test]
    fn test_same_value_zero_and_nan() {
        let nan = Value::number(f64::NAN);
        assert!(nan.same_value(&nan));
        assert!(nan.same_value_zero(&nan));
        assert!(!nan.strict_equals(&nan));

        let pz = Value::number(0.0);
        let nz = Value::number(-0.0);
        assert!(!pz.same_value(&nz));
        assert!(pz.same_value_zero(&nz));
        assert!(pz.strict_equals(&nz));
    }

    #[test]
    fn test_strict_equality_never_coerces() {
        let big = Value::bigint(crate::bigint::JsBigInt::from_i64(1));
        let num = Value::number(1.0);
        assert!(!big.strict_equals(&num));
        assert!(!num.strict_equals(&Value::string("1")));
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Value::undefined().to_boolean());
        assert!(!Value::null().to_boolean());
        assert!(!Value::number(0.0).to_boolean());
        assert!(!Value::number(f64::NAN).to_boolean());
        assert!(!Value::string("").to_boolean());
        assert!(!Value::bigint(crate::bigint::JsBigInt::zero()).to_boolean());
        assert!(Value::number(-1.0).to_boolean());
        assert!(Value::string("0").to_boolean());
    }

    #[test]
    fn test_call_on_non_callable() {
        let err = Value::number(1.0)
            .call(&Value::undefined(), &[])
            .unwrap_err();
        assert!(err.is_type_error());
    }
}
