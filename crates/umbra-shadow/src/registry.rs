//! Shadow registry: which shadow stands in for which real type.
//!
//! Resolution walks the ancestor chain of the requested type and returns
//! the nearest registered descriptor. Results (including misses) are
//! cached per requested type; any registration change clears the cache
//! while the state write lock is still held, so a resolve never observes a
//! cache entry older than the registrations it was computed from.
//!
//! Lock order is always `state` then `cache`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use umbra_types::RealType;

use crate::descriptor::ShadowDescriptor;
use crate::error::ShadowError;
use crate::hierarchy::ClassHierarchy;

#[derive(Debug, Default)]
struct RegistryState {
    hierarchy: ClassHierarchy,
    descriptors: BTreeMap<RealType, Arc<ShadowDescriptor>>,
}

type ResolutionCache = HashMap<RealType, Option<Arc<ShadowDescriptor>>>;

/// Thread-safe table of shadow descriptors.
#[derive(Debug, Default)]
pub struct ShadowRegistry {
    state: RwLock<RegistryState>,
    cache: RwLock<ResolutionCache>,
}

impl ShadowRegistry {
    /// Creates a registry over the given inheritance table.
    pub fn new(hierarchy: ClassHierarchy) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                hierarchy,
                descriptors: BTreeMap::new(),
            }),
            cache: RwLock::new(HashMap::new()),
        }
    }

    // Registry data has no invariants that a panicking reader could break,
    // so poisoned guards are recovered rather than surfaced.
    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, ResolutionCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `descriptor` for its real type.
    ///
    /// # Errors
    ///
    /// [`ShadowError::DuplicateRegistration`] if the exact real type already
    /// has a descriptor. The existing registration is left untouched.
    pub fn register(&self, descriptor: ShadowDescriptor) -> Result<Arc<ShadowDescriptor>, ShadowError> {
        let real_type = descriptor.real_type().clone();
        let mut state = self.write_state();

        if state.descriptors.contains_key(&real_type) {
            return Err(ShadowError::DuplicateRegistration { real_type });
        }

        let descriptor = Arc::new(descriptor);
        state.descriptors.insert(real_type.clone(), Arc::clone(&descriptor));
        self.write_cache().clear();
        drop(state);

        tracing::debug!(
            real_type = %real_type,
            shadow = descriptor.shadow_type_name(),
            "registered shadow"
        );
        Ok(descriptor)
    }

    /// Removes the descriptor registered for exactly `real_type`.
    pub fn deregister(&self, real_type: &RealType) -> Option<Arc<ShadowDescriptor>> {
        let mut state = self.write_state();
        let removed = state.descriptors.remove(real_type);
        if removed.is_some() {
            self.write_cache().clear();
            tracing::debug!(real_type = %real_type, "deregistered shadow");
        }
        removed
    }

    /// Records a parent link in the inheritance table.
    ///
    /// # Errors
    ///
    /// [`ShadowError::HierarchyCycle`] if the link would close a loop.
    pub fn declare_type(
        &self,
        real_type: impl Into<RealType>,
        parent: impl Into<RealType>,
    ) -> Result<(), ShadowError> {
        let mut state = self.write_state();
        state.hierarchy.declare(real_type, parent)?;
        self.write_cache().clear();
        Ok(())
    }

    /// Finds the shadow for `real_type`: its own descriptor if registered,
    /// otherwise the nearest ancestor's, otherwise `None`.
    pub fn resolve(&self, real_type: &RealType) -> Option<Arc<ShadowDescriptor>> {
        // Holding the state read lock keeps writers (and their cache
        // invalidation) out until this lookup is cached.
        let state = self.read_state();

        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(real_type)
        {
            return hit.clone();
        }

        let resolved = state
            .hierarchy
            .ancestors(real_type)
            .find_map(|ancestor| state.descriptors.get(ancestor))
            .cloned();

        self.write_cache()
            .insert(real_type.clone(), resolved.clone());
        resolved
    }

    /// Descriptor registered for exactly `real_type`, ignoring ancestors.
    pub fn get(&self, real_type: &RealType) -> Option<Arc<ShadowDescriptor>> {
        self.read_state().descriptors.get(real_type).cloned()
    }

    pub fn is_registered(&self, real_type: &RealType) -> bool {
        self.read_state().descriptors.contains_key(real_type)
    }

    /// Registered real types, sorted.
    pub fn registered_types(&self) -> Vec<RealType> {
        self.read_state().descriptors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().descriptors.is_empty()
    }

    /// Number of memoized resolutions.
    pub fn cached_resolutions(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Removes every descriptor. The inheritance table is kept.
    pub fn clear(&self) {
        let mut state = self.write_state();
        state.descriptors.clear();
        self.write_cache().clear();
    }
}
