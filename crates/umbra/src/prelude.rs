//! Glob-importable set of the types most tests touch.
//!
//! ```
//! use umbra::prelude::*;
//! ```

pub use crate::qualifiers::{Density, Locale, Orientation, UiModeType};
pub use crate::{
    ApiLevel, AppManifest, Application, ApplicationContext, ApplicationFactory, ClassHierarchy,
    EnvError, InvocationError, InvocationResult, MethodSignature, ObjectRef, ParallelUniverse,
    RealObject, RealType, ResourceContexts, Scheduler, ShadowDescriptor, ShadowRegistry,
    StaticManifest, TestConfig, TestIdentity, Umbra, UmbraConfig, Value, VirtualThreadId,
};
