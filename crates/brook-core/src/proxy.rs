//! Proxy target/handler slots and revocation
//!
//! Revoking clears both slots atomically with respect to each other; every
//! fundamental operation on a revoked proxy throws TypeError. The slots are
//! separate from the trap logic in [`crate::proxy_ops`] so the object core
//! can carry them without pulling in the dispatch machinery.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::object::JsObject;

/// The internal slots of a Proxy exotic object
pub struct ProxySlots {
    target: RwLock<Option<Arc<JsObject>>>,
    handler: RwLock<Option<Arc<JsObject>>>,
}

impl ProxySlots {
    pub(crate) fn new(target: Arc<JsObject>, handler: Arc<JsObject>) -> Self {
        Self {
            target: RwLock::new(Some(target)),
            handler: RwLock::new(Some(handler)),
        }
    }

    /// Clear both slots. Returns false if the proxy was already revoked.
    pub fn revoke(&self) -> bool {
        let mut target = self.target.write();
        let mut handler = self.handler.write();
        let was_live = target.is_some();
        *target = None;
        *handler = None;
        was_live
    }

    /// True once [`revoke`](Self::revoke) has run
    pub fn is_revoked(&self) -> bool {
        self.target.read().is_none()
    }

    /// The proxy target, unless revoked
    pub fn target(&self) -> Option<Arc<JsObject>> {
        self.target.read().clone()
    }

    /// The proxy handler, unless revoked
    pub fn handler(&self) -> Option<Arc<JsObject>> {
        self.handler.read().clone()
    }

    /// Both slots, or the revocation TypeError for operation `op`
    pub(crate) fn parts(&self, op: &str) -> EngineResult<(Arc<JsObject>, Arc<JsObject>)> {
        let target = self.target.read().clone();
        let handler = self.handler.read().clone();
        match (target, handler) {
            (Some(t), Some(h)) => Ok((t, h)),
            _ => Err(EngineError::type_error(format!(
                "Cannot perform '{op}' on a proxy that has been revoked"
            ))),
        }
    }
}

impl std::fmt::Debug for ProxySlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySlots")
            .field("revoked", &self.is_revoked())
            .finish()
    }
}
