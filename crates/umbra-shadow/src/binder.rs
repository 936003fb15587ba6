//! Lazy pairing of real instances with shadow instances, and call
//! redirection through those pairings.
//!
//! # Dispatch policy
//!
//! For every signature the binding's descriptor overrides, the shadow
//! method runs and the real body never does. For every other signature the
//! real body runs and the shadow is not consulted. Errors from either side
//! are returned to the caller as raised.
//!
//! No lock is held while a shadow method runs. A real body reached from a
//! shadow method may dispatch back into the same binding, including into
//! overridden methods, on the same thread or any other.
//!
//! # Identity
//!
//! Bindings are keyed by the address of the real instance. Each binding
//! holds a weak handle to its instance, so the allocation (and therefore
//! the address) stays reserved for as long as the binding exists; a key is
//! still confirmed against the live instance before a binding is reused.
//!
//! # Reclamation
//!
//! A binding whose real instance was dropped is released when its address
//! is looked up again, by [`ShadowBinder::purge_unreachable`], by the
//! automatic purge that runs as the table grows, and at the latest by
//! [`ShadowBinder::clear`] at tear-down.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use umbra_types::{MethodSignature, RealType};

use crate::descriptor::{Invocation, ShadowDescriptor, ShadowState};
use crate::error::{InvocationError, InvocationResult, ShadowError};
use crate::object::{InstanceKey, ObjectRef, RealHandle};
use crate::registry::ShadowRegistry;
use crate::value::Value;

struct BindingInner {
    key: InstanceKey,
    real: RealHandle,
    descriptor: Arc<ShadowDescriptor>,
    shadow: ShadowState,
}

/// One real instance paired with one shadow instance.
///
/// Cloning shares the pairing; two clones compare equal.
#[derive(Clone)]
pub struct ShadowBinding {
    inner: Arc<BindingInner>,
}

impl ShadowBinding {
    /// Most-derived type of the bound real instance.
    pub fn real_type(&self) -> &RealType {
        self.inner.real.real_type()
    }

    /// Descriptor the shadow was built from. Its real type may be an
    /// ancestor of [`real_type`](Self::real_type).
    pub fn descriptor(&self) -> &Arc<ShadowDescriptor> {
        &self.inner.descriptor
    }

    pub fn real(&self) -> &RealHandle {
        &self.inner.real
    }

    pub fn key(&self) -> InstanceKey {
        self.inner.key
    }
}

impl PartialEq for ShadowBinding {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ShadowBinding {}

impl fmt::Debug for ShadowBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowBinding")
            .field("real_type", self.real_type())
            .field("shadow", &self.inner.descriptor.shadow_type_name())
            .field("alive", &self.inner.real.is_alive())
            .finish()
    }
}

/// Table size at which `bind` first sweeps out bindings of dropped
/// instances. The threshold doubles past whatever survives a sweep.
pub(crate) const PURGE_THRESHOLD: usize = 256;

struct BindingTable {
    entries: HashMap<InstanceKey, ShadowBinding>,
    purge_at: usize,
}

impl BindingTable {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            purge_at: PURGE_THRESHOLD,
        }
    }

    /// Removes bindings whose real instance is gone and hands them back, so
    /// their shadows can be dropped outside the table lock.
    fn take_unreachable(&mut self) -> Vec<ShadowBinding> {
        let dead: Vec<InstanceKey> = self
            .entries
            .iter()
            .filter(|(_, binding)| !binding.inner.real.is_alive())
            .map(|(key, _)| *key)
            .collect();
        dead.iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    fn insert(&mut self, key: InstanceKey, binding: ShadowBinding) -> Vec<ShadowBinding> {
        let mut released = Vec::new();
        if self.entries.len() >= self.purge_at {
            released = self.take_unreachable();
            self.purge_at = (self.entries.len() * 2).max(PURGE_THRESHOLD);
            tracing::debug!(
                released = released.len(),
                live = self.entries.len(),
                "purged dead bindings"
            );
        }
        if let Some(stale) = self.entries.insert(key, binding) {
            released.push(stale);
        }
        released
    }
}

/// Side table of live bindings for one environment.
pub struct ShadowBinder {
    registry: Arc<ShadowRegistry>,
    bindings: Mutex<BindingTable>,
}

impl ShadowBinder {
    pub fn new(registry: Arc<ShadowRegistry>) -> Self {
        Self {
            registry,
            bindings: Mutex::new(BindingTable::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ShadowRegistry> {
        &self.registry
    }

    fn bindings(&self) -> MutexGuard<'_, BindingTable> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the binding for `real`, creating it on first use.
    ///
    /// # Errors
    ///
    /// [`ShadowError::UnshadowedType`] if neither the instance's type nor
    /// any ancestor has a registered shadow. Nothing is stored in that case.
    pub fn bind(&self, real: &ObjectRef) -> Result<ShadowBinding, ShadowError> {
        if let Some(existing) = self.binding_for(real) {
            return Ok(existing);
        }

        let real_type = real.real_type();
        let descriptor = self
            .registry
            .resolve(&real_type)
            .ok_or_else(|| ShadowError::UnshadowedType {
                real_type: real_type.clone(),
            })?;

        // The constructor may itself bind other instances, so it runs
        // without the table lock.
        let handle = RealHandle::new(real);
        let shadow = descriptor.construct(&handle);
        let key = InstanceKey::of(real);

        let mut bindings = self.bindings();
        if let Some(existing) = bindings.entries.get(&key)
            && existing.inner.real.refers_to(real)
        {
            return Ok(existing.clone());
        }

        let binding = ShadowBinding {
            inner: Arc::new(BindingInner {
                key,
                real: handle,
                descriptor,
                shadow,
            }),
        };
        let released = bindings.insert(key, binding.clone());
        drop(bindings);
        drop(released);

        tracing::debug!(
            real_type = %real_type,
            shadow = binding.descriptor().shadow_type_name(),
            "bound shadow"
        );
        Ok(binding)
    }

    /// Existing binding for `real`, without creating one.
    pub fn binding_for(&self, real: &ObjectRef) -> Option<ShadowBinding> {
        let key = InstanceKey::of(real);
        let mut bindings = self.bindings();
        match bindings.entries.get(&key) {
            Some(binding) if binding.inner.real.refers_to(real) => Some(binding.clone()),
            Some(_) => {
                bindings.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn is_bound(&self, real: &ObjectRef) -> bool {
        self.binding_for(real).is_some()
    }

    /// Runs `method` through `binding`: the shadow override if one exists,
    /// otherwise the real body.
    ///
    /// # Errors
    ///
    /// Whatever the shadow or real body returns, unchanged.
    pub fn dispatch(
        &self,
        binding: &ShadowBinding,
        method: &MethodSignature,
        args: &[Value],
    ) -> InvocationResult {
        let Some(body) = binding.inner.descriptor.instance_override(method) else {
            return binding.inner.real.invoke_real(method, args);
        };

        let call = Invocation {
            method,
            args,
            real: &binding.inner.real,
        };
        body(&*binding.inner.shadow, &call)
    }

    /// Binds `real` if needed, then dispatches `method` on it.
    ///
    /// # Errors
    ///
    /// [`InvocationError::Binding`] if the instance is unshadowed, otherwise
    /// as [`dispatch`](Self::dispatch).
    pub fn invoke(&self, real: &ObjectRef, method: &MethodSignature, args: &[Value]) -> InvocationResult {
        let binding = self.bind(real)?;
        self.dispatch(&binding, method, args)
    }

    /// Dispatches a static method of exactly `real_type`.
    ///
    /// Static overrides are not inherited: only a descriptor registered for
    /// `real_type` itself is consulted. `real_body` runs when that
    /// descriptor does not override `method`.
    ///
    /// # Errors
    ///
    /// [`InvocationError::Binding`] wrapping [`ShadowError::UnshadowedType`]
    /// if `real_type` has no descriptor of its own.
    pub fn dispatch_static<F>(
        &self,
        real_type: &RealType,
        method: &MethodSignature,
        args: &[Value],
        real_body: F,
    ) -> InvocationResult
    where
        F: FnOnce(&[Value]) -> InvocationResult,
    {
        let descriptor = self
            .registry
            .get(real_type)
            .ok_or_else(|| ShadowError::UnshadowedType {
                real_type: real_type.clone(),
            })?;

        match descriptor.static_override(method) {
            Some(body) => body(args),
            None => real_body(args),
        }
    }

    /// Runs `f` against the typed shadow of `real`, binding it first if
    /// needed.
    ///
    /// # Errors
    ///
    /// [`InvocationError::Binding`] if `real` is unshadowed,
    /// [`InvocationError::ShadowTypeMismatch`] if its shadow is not an `S`.
    pub fn with_shadow<S, R>(&self, real: &ObjectRef, f: impl FnOnce(&S) -> R) -> Result<R, InvocationError>
    where
        S: Any + Send + Sync,
    {
        let binding = self.bind(real)?;
        let typed = binding
            .inner
            .shadow
            .downcast_ref::<S>()
            .ok_or_else(|| InvocationError::ShadowTypeMismatch {
                real_type: binding.real_type().clone(),
                requested: type_name::<S>(),
            })?;
        Ok(f(typed))
    }

    /// Number of bindings currently held.
    pub fn binding_count(&self) -> usize {
        self.bindings().entries.len()
    }

    /// Releases bindings whose real instance is gone. Returns how many
    /// were released.
    pub fn purge_unreachable(&self) -> usize {
        let released = self.bindings().take_unreachable();
        released.len()
    }

    /// Releases every binding.
    pub fn clear(&self) {
        // Shadow state is dropped after the table lock is released.
        let released = std::mem::replace(&mut *self.bindings(), BindingTable::new()).entries;
        if !released.is_empty() {
            let released = released.len();
            tracing::debug!(released, "released shadow bindings");
        }
    }
}

impl fmt::Debug for ShadowBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowBinder")
            .field("registered", &self.registry.len())
            .field("bindings", &self.binding_count())
            .finish()
    }
}
