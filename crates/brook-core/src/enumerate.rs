//! For-in style property enumeration
//!
//! EnumerateObjectProperties: string keys of the object and its prototype
//! chain, own before inherited, with shadowed and already-seen keys
//! suppressed. The key list of each level is snapshotted when the level is
//! entered, but each key is re-checked against the live object before being
//! produced, so keys deleted mid-iteration are skipped and symbols never
//! appear.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::EngineResult;
use crate::object::{JsObject, PropertyKey};
use crate::string::JsString;

/// Iterator over enumerable string keys, following the prototype chain
pub struct ForInIterator {
    current: Option<Arc<JsObject>>,
    pending: std::vec::IntoIter<PropertyKey>,
    seen: FxHashSet<PropertyKey>,
    visited: Vec<Arc<JsObject>>,
}

impl ForInIterator {
    /// Begin enumeration at `obj`
    pub fn new(obj: Arc<JsObject>) -> EngineResult<Self> {
        let pending = level_keys(&obj)?;
        Ok(Self {
            current: Some(obj.clone()),
            pending,
            seen: FxHashSet::default(),
            visited: vec![obj],
        })
    }

    /// Produce the next key, or `None` when the chain is exhausted.
    ///
    /// Fallible because proxies in the chain run traps for every step.
    pub fn next(&mut self) -> EngineResult<Option<Arc<JsString>>> {
        loop {
            let Some(current) = self.current.clone() else {
                return Ok(None);
            };
            if let Some(key) = self.pending.next() {
                if self.seen.contains(&key) {
                    continue;
                }
                // Re-check against the live object: the key may be gone.
                let Some(desc) = current.get_own_property(&key)? else {
                    continue;
                };
                // A non-enumerable own key still shadows the chain below.
                self.seen.insert(key.clone());
                if !desc.is_enumerable() {
                    continue;
                }
                return Ok(Some(key_string(&key)));
            }

            let proto = current.get_prototype_of()?;
            match proto {
                Some(p) => {
                    if self.visited.iter().any(|v| Arc::ptr_eq(v, &p)) {
                        // Prototype cycle (possible through proxy traps):
                        // stop rather than loop.
                        self.current = None;
                        return Ok(None);
                    }
                    self.pending = level_keys(&p)?;
                    self.visited.push(p.clone());
                    self.current = Some(p);
                }
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    /// Drain the iterator into a key list
    pub fn collect_keys(mut self) -> EngineResult<Vec<Arc<JsString>>> {
        let mut keys = Vec::new();
        while let Some(key) = self.next()? {
            keys.push(key);
        }
        Ok(keys)
    }
}

fn level_keys(obj: &Arc<JsObject>) -> EngineResult<std::vec::IntoIter<PropertyKey>> {
    let keys: Vec<PropertyKey> = obj
        .own_property_keys()?
        .into_iter()
        .filter(|k| !k.is_symbol())
        .collect();
    Ok(keys.into_iter())
}

fn key_string(key: &PropertyKey) -> Arc<JsString> {
    match key {
        PropertyKey::String(s) => s.clone(),
        PropertyKey::Index(i) => {
            let mut buf = itoa::Buffer::new();
            JsString::intern(buf.format(*i))
        }
        // Symbols are filtered out before this point.
        PropertyKey::Symbol(_) => JsString::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{DescriptorSpec, PropertyAttributes};
    use crate::value::{JsSymbol, Value};

    fn key(s: &str) -> PropertyKey {
        PropertyKey::string(s)
    }

    fn keys_of(obj: &Arc<JsObject>) -> Vec<String> {
        ForInIterator::new(obj.clone())
            .unwrap()
            .collect_keys()
            .unwrap()
            .iter()
            .map(|s| s.to_std_string())
            .collect()
    }

    #[test]
    fn test_own_keys_in_order() {
        let obj = JsObject::new(None);
        obj.set_or_throw(&key("b"), Value::number(1.0)).unwrap();
        obj.set_or_throw(&key("1"), Value::number(2.0)).unwrap();
        obj.set_or_throw(&key("a"), Value::number(3.0)).unwrap();
        assert_eq!(keys_of(&obj), vec!["1", "b", "a"]);
    }

    #[test]
    fn test_symbols_and_non_enumerable_excluded() {
        let obj = JsObject::new(None);
        obj.set_or_throw(&key("visible"), Value::number(1.0)).unwrap();
        obj.define_own_or_throw(
            key("hidden"),
            DescriptorSpec::data(Value::number(2.0), PropertyAttributes::frozen()),
        )
        .unwrap();
        obj.create_data_property(PropertyKey::symbol(JsSymbol::new(None)), Value::number(3.0))
            .unwrap();
        assert_eq!(keys_of(&obj), vec!["visible"]);
    }

    #[test]
    fn test_prototype_chain_own_first() {
        let grandparent = JsObject::new(None);
        grandparent.set_or_throw(&key("g"), Value::number(1.0)).unwrap();
        let parent = JsObject::new(Some(grandparent));
        parent.set_or_throw(&key("p"), Value::number(2.0)).unwrap();
        let obj = JsObject::new(Some(parent));
        obj.set_or_throw(&key("o"), Value::number(3.0)).unwrap();
        assert_eq!(keys_of(&obj), vec!["o", "p", "g"]);
    }

    #[test]
    fn test_shadowing_suppresses_inherited() {
        let proto = JsObject::new(None);
        proto.set_or_throw(&key("x"), Value::number(1.0)).unwrap();
        proto.set_or_throw(&key("y"), Value::number(2.0)).unwrap();
        let obj = JsObject::new(Some(proto));
        obj.set_or_throw(&key("x"), Value::number(3.0)).unwrap();
        assert_eq!(keys_of(&obj), vec!["x", "y"]);
    }

    #[test]
    fn test_non_enumerable_own_shadows_enumerable_inherited() {
        let proto = JsObject::new(None);
        proto.set_or_throw(&key("x"), Value::number(1.0)).unwrap();
        let obj = JsObject::new(Some(proto));
        obj.define_own_or_throw(
            key("x"),
            DescriptorSpec::data(Value::number(2.0), PropertyAttributes::frozen()),
        )
        .unwrap();
        assert!(keys_of(&obj).is_empty());
    }

    #[test]
    fn test_deleted_mid_iteration_skipped() {
        let obj = JsObject::new(None);
        obj.set_or_throw(&key("a"), Value::number(1.0)).unwrap();
        obj.set_or_throw(&key("b"), Value::number(2.0)).unwrap();
        obj.set_or_throw(&key("c"), Value::number(3.0)).unwrap();

        let mut iter = ForInIterator::new(obj.clone()).unwrap();
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.to_std_string(), "a");
        obj.delete(&key("b")).unwrap();
        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.to_std_string(), "c");
        assert!(iter.next().unwrap().is_none());
    }

    #[test]
    fn test_proxy_in_chain() {
        let target = JsObject::new(None);
        target.set_or_throw(&key("t"), Value::number(1.0)).unwrap();
        let proxy = JsObject::new_proxy(target, JsObject::new(None));
        let obj = JsObject::new(Some(proxy));
        obj.set_or_throw(&key("o"), Value::number(2.0)).unwrap();
        assert_eq!(keys_of(&obj), vec!["o", "t"]);
    }
}
