//! Shadow descriptors: what a shadow simulates and which calls it replaces.
//!
//! A descriptor is built once, registered, and never mutated afterwards.
//! The shadow type is erased behind `dyn Any` so descriptors for different
//! shadow types can share one registry; the typed closures given to the
//! builder downcast back to the concrete shadow on every call.
//!
//! Shadow methods receive `&S`. Real bodies may call back into overridden
//! methods of the same instance while a shadow method is still running, so
//! shadows keep mutable state behind their own locks or atomics and must
//! not hold those locks across a call into the real instance.
//!
//! # Example
//!
//! ```
//! use umbra_shadow::{OverridePolicy, ShadowDescriptor, Value};
//! use umbra_types::MethodSignature;
//!
//! #[derive(Default)]
//! struct ShadowDrawable {
//!     intrinsic_width: i64,
//! }
//!
//! let descriptor = ShadowDescriptor::with_default::<ShadowDrawable>("android.graphics.drawable.Drawable")
//!     .implement("getIntrinsicWidth()", |shadow, _call| Ok(Value::Int(shadow.intrinsic_width)))
//!     .build();
//!
//! assert_eq!(
//!     descriptor.policy_for(&MethodSignature::new("getIntrinsicWidth()")),
//!     OverridePolicy::Replace
//! );
//! assert_eq!(
//!     descriptor.policy_for(&MethodSignature::new("draw(Canvas)")),
//!     OverridePolicy::NotApplicable
//! );
//! ```

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use umbra_types::{MethodSignature, RealType};

use crate::error::{InvocationError, InvocationResult};
use crate::object::{ObjectRef, RealHandle};
use crate::value::Value;

/// Type-erased shadow instance, shared by every in-flight call on it.
pub type ShadowState = Arc<dyn Any + Send + Sync>;

type Constructor = Box<dyn Fn(&RealHandle) -> ShadowState + Send + Sync>;
type InstanceMethod =
    Box<dyn Fn(&(dyn Any + Send + Sync), &Invocation<'_>) -> InvocationResult + Send + Sync>;
type StaticMethod = Box<dyn Fn(&[Value]) -> InvocationResult + Send + Sync>;

/// How a descriptor treats a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    /// The shadow method runs instead of the real body.
    Replace,
    /// The shadow does not touch this signature; the real body runs.
    NotApplicable,
}

/// Context handed to a shadow method.
pub struct Invocation<'a> {
    /// Signature being dispatched.
    pub method: &'a MethodSignature,
    /// Call arguments.
    pub args: &'a [Value],
    /// Back-reference to the real instance.
    pub real: &'a RealHandle,
}

impl Invocation<'_> {
    /// Returns argument `index`, or an `IllegalArgumentException` if the
    /// caller passed fewer arguments.
    pub fn arg(&self, index: usize) -> Result<&Value, InvocationError> {
        self.args.get(index).ok_or_else(|| {
            InvocationError::thrown(
                "IllegalArgumentException",
                format!(
                    "{} expects argument {index}, got {} argument(s)",
                    self.method,
                    self.args.len()
                ),
            )
        })
    }

    /// Returns the real instance this call was made on, if still alive.
    pub fn this(&self) -> Option<ObjectRef> {
        self.real.upgrade()
    }
}

/// Registration record for one shadow type.
pub struct ShadowDescriptor {
    real_type: RealType,
    shadow_type: &'static str,
    constructor: Constructor,
    methods: BTreeMap<MethodSignature, InstanceMethod>,
    static_methods: BTreeMap<MethodSignature, StaticMethod>,
}

impl ShadowDescriptor {
    /// Starts a descriptor for `real_type` whose shadow instances are built
    /// by `constructor`.
    pub fn builder<S, F>(real_type: impl Into<RealType>, constructor: F) -> ShadowDescriptorBuilder<S>
    where
        S: Any + Send + Sync,
        F: Fn(&RealHandle) -> S + Send + Sync + 'static,
    {
        ShadowDescriptorBuilder {
            real_type: real_type.into(),
            constructor: Box::new(move |real| Arc::new(constructor(real)) as ShadowState),
            methods: BTreeMap::new(),
            static_methods: BTreeMap::new(),
            _shadow: PhantomData,
        }
    }

    /// Starts a descriptor whose shadow instances are `S::default()`.
    pub fn with_default<S>(real_type: impl Into<RealType>) -> ShadowDescriptorBuilder<S>
    where
        S: Any + Send + Sync + Default,
    {
        Self::builder(real_type, |_real| S::default())
    }

    pub fn real_type(&self) -> &RealType {
        &self.real_type
    }

    /// Rust type name of the shadow.
    pub fn shadow_type_name(&self) -> &'static str {
        self.shadow_type
    }

    /// Policy for an instance method.
    pub fn policy_for(&self, method: &MethodSignature) -> OverridePolicy {
        if self.methods.contains_key(method) {
            OverridePolicy::Replace
        } else {
            OverridePolicy::NotApplicable
        }
    }

    /// Policy for a static method.
    pub fn static_policy_for(&self, method: &MethodSignature) -> OverridePolicy {
        if self.static_methods.contains_key(method) {
            OverridePolicy::Replace
        } else {
            OverridePolicy::NotApplicable
        }
    }

    /// Overridden instance signatures, in order.
    pub fn overridden_methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.keys()
    }

    pub(crate) fn construct(&self, real: &RealHandle) -> ShadowState {
        (self.constructor)(real)
    }

    pub(crate) fn instance_override(&self, method: &MethodSignature) -> Option<&InstanceMethod> {
        self.methods.get(method)
    }

    pub(crate) fn static_override(&self, method: &MethodSignature) -> Option<&StaticMethod> {
        self.static_methods.get(method)
    }
}

impl fmt::Debug for ShadowDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowDescriptor")
            .field("real_type", &self.real_type)
            .field("shadow_type", &self.shadow_type)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("static_methods", &self.static_methods.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Typed builder for [`ShadowDescriptor`].
pub struct ShadowDescriptorBuilder<S> {
    real_type: RealType,
    constructor: Constructor,
    methods: BTreeMap<MethodSignature, InstanceMethod>,
    static_methods: BTreeMap<MethodSignature, StaticMethod>,
    _shadow: PhantomData<fn() -> S>,
}

impl<S: Any + Send + Sync> ShadowDescriptorBuilder<S> {
    /// Replaces the real body of `method` with `body`.
    pub fn implement<F>(mut self, method: impl Into<MethodSignature>, body: F) -> Self
    where
        F: Fn(&S, &Invocation<'_>) -> InvocationResult + Send + Sync + 'static,
    {
        let erased: InstanceMethod = Box::new(move |state, call| {
            let shadow = state.downcast_ref::<S>().ok_or_else(|| {
                InvocationError::ShadowTypeMismatch {
                    real_type: call.real.real_type().clone(),
                    requested: type_name::<S>(),
                }
            })?;
            body(shadow, call)
        });
        self.methods.insert(method.into(), erased);
        self
    }

    /// Replaces the real body of static `method` with `body`.
    pub fn implement_static<F>(mut self, method: impl Into<MethodSignature>, body: F) -> Self
    where
        F: Fn(&[Value]) -> InvocationResult + Send + Sync + 'static,
    {
        self.static_methods.insert(method.into(), Box::new(body));
        self
    }

    pub fn build(self) -> ShadowDescriptor {
        ShadowDescriptor {
            real_type: self.real_type,
            shadow_type: type_name::<S>(),
            constructor: self.constructor,
            methods: self.methods,
            static_methods: self.static_methods,
        }
    }
}
