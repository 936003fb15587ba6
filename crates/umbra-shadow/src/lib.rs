//! # umbra-shadow: Shadow registry and call redirection for `Umbra`
//!
//! Real framework objects are paired with user-supplied "shadow" objects
//! that stand in for their behavior. This crate holds the registration
//! table, resolves which shadow applies to a real type, and routes calls
//! to either the shadow or the real body.
//!
//! ## Key Concepts
//!
//! - **[`ClassHierarchy`]**: Parent table of the simulated framework types
//! - **[`ShadowDescriptor`]**: What one shadow simulates and which methods it replaces
//! - **[`ShadowRegistry`]**: Registration plus nearest-ancestor resolution, cached per type
//! - **[`ShadowBinder`]**: One shadow per real instance, created lazily, and dispatch
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use umbra_shadow::{
//!     ClassHierarchy, InvocationResult, ObjectRef, RealObject, ShadowBinder, ShadowDescriptor,
//!     ShadowRegistry, Value,
//! };
//! use umbra_types::{MethodSignature, RealType};
//!
//! struct BitmapDrawable;
//!
//! impl RealObject for BitmapDrawable {
//!     fn real_type(&self) -> RealType {
//!         RealType::new("android.graphics.drawable.BitmapDrawable")
//!     }
//!
//!     fn invoke_real(&self, _method: &MethodSignature, _args: &[Value]) -> InvocationResult {
//!         Ok(Value::Int(-1))
//!     }
//! }
//!
//! #[derive(Default)]
//! struct ShadowDrawable;
//!
//! let hierarchy = ClassHierarchy::new()
//!     .with("android.graphics.drawable.BitmapDrawable", "android.graphics.drawable.Drawable")
//!     .unwrap();
//! let registry = Arc::new(ShadowRegistry::new(hierarchy));
//! registry
//!     .register(
//!         ShadowDescriptor::with_default::<ShadowDrawable>("android.graphics.drawable.Drawable")
//!             .implement("getIntrinsicWidth()", |_, _| Ok(Value::Int(48)))
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let binder = ShadowBinder::new(registry);
//! let drawable: ObjectRef = Arc::new(BitmapDrawable);
//!
//! let width = binder
//!     .invoke(&drawable, &MethodSignature::new("getIntrinsicWidth()"), &[])
//!     .unwrap();
//! assert_eq!(width, Value::Int(48));
//!
//! let height = binder
//!     .invoke(&drawable, &MethodSignature::new("getIntrinsicHeight()"), &[])
//!     .unwrap();
//! assert_eq!(height, Value::Int(-1));
//! ```

mod binder;
mod descriptor;
mod error;
mod hierarchy;
mod object;
mod registry;
mod value;

#[cfg(test)]
mod tests;

pub use binder::{ShadowBinder, ShadowBinding};
pub use descriptor::{
    Invocation, OverridePolicy, ShadowDescriptor, ShadowDescriptorBuilder, ShadowState,
};
pub use error::{InvocationError, InvocationResult, ShadowError};
pub use hierarchy::{Ancestors, ClassHierarchy};
pub use object::{InstanceKey, ObjectRef, RealHandle, RealObject};
pub use registry::ShadowRegistry;
pub use value::Value;
