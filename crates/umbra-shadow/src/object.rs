//! Real framework objects and the non-owning handles shadows keep to them.

use std::fmt;
use std::sync::{Arc, Weak};

use umbra_types::{MethodSignature, RealType};

use crate::error::{InvocationError, InvocationResult};
use crate::value::Value;

/// A real framework instance whose calls may be redirected to a shadow.
///
/// `invoke_real` is the original, un-intercepted behavior. The binder only
/// calls it for signatures the resolved shadow does not override.
pub trait RealObject: Send + Sync + 'static {
    /// Most-derived real type of this instance.
    fn real_type(&self) -> RealType;

    /// Runs the real method body.
    fn invoke_real(&self, method: &MethodSignature, args: &[Value]) -> InvocationResult;
}

/// Shared reference to a real instance.
pub type ObjectRef = Arc<dyn RealObject>;

/// Identity of a real instance: the address of its allocation.
///
/// Addresses can be reused once an instance is dropped, so the binder
/// always confirms a key against a live [`RealHandle`] before trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey(usize);

impl InstanceKey {
    pub fn of(object: &ObjectRef) -> Self {
        Self(Arc::as_ptr(object).cast::<()>() as usize)
    }
}

/// Non-owning back-reference from a shadow to its real instance.
#[derive(Clone)]
pub struct RealHandle {
    real_type: RealType,
    object: Weak<dyn RealObject>,
}

impl RealHandle {
    pub fn new(object: &ObjectRef) -> Self {
        Self {
            real_type: object.real_type(),
            object: Arc::downgrade(object),
        }
    }

    pub fn real_type(&self) -> &RealType {
        &self.real_type
    }

    /// Returns the real instance if it is still reachable.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.object.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }

    /// Returns true if this handle points at `object`.
    pub fn refers_to(&self, object: &ObjectRef) -> bool {
        self.upgrade()
            .is_some_and(|live| Arc::ptr_eq(&live, object))
    }

    /// Runs the real method body, failing if the instance is gone.
    pub fn invoke_real(&self, method: &MethodSignature, args: &[Value]) -> InvocationResult {
        let object = self
            .upgrade()
            .ok_or_else(|| InvocationError::RealInstanceDropped {
                real_type: self.real_type.clone(),
            })?;
        object.invoke_real(method, args)
    }
}

impl fmt::Debug for RealHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealHandle")
            .field("real_type", &self.real_type)
            .field("alive", &self.is_alive())
            .finish()
    }
}
