//! Shadow layer error types

use thiserror::Error;
use umbra_types::{MethodSignature, RealType};

use crate::value::Value;

/// Registration and binding failures.
///
/// Every variant names the real type involved so an interception failure
/// points straight at the missing or conflicting shadow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadowError {
    #[error("a shadow for '{real_type}' is already registered; deregister it first")]
    DuplicateRegistration { real_type: RealType },

    #[error("no shadow registered for '{real_type}' or any of its ancestors")]
    UnshadowedType { real_type: RealType },

    #[error("declaring '{parent}' as the parent of '{real_type}' would create a cycle")]
    HierarchyCycle { real_type: RealType, parent: RealType },
}

/// Failures surfaced by a dispatched call.
///
/// `Thrown` carries a simulated exception raised by a shadow or by the
/// real body. The binder hands it back to the caller exactly as raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("{exception}: {message}")]
    Thrown { exception: String, message: String },

    #[error("the real '{real_type}' instance behind this binding was dropped")]
    RealInstanceDropped { real_type: RealType },

    #[error("'{real_type}' has no method {method}")]
    NoSuchMethod {
        real_type: RealType,
        method: MethodSignature,
    },

    #[error("shadow of '{real_type}' is not a {requested}")]
    ShadowTypeMismatch {
        real_type: RealType,
        requested: &'static str,
    },

    #[error(transparent)]
    Binding(#[from] ShadowError),
}

impl InvocationError {
    /// Builds a simulated exception.
    pub fn thrown(exception: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Thrown {
            exception: exception.into(),
            message: message.into(),
        }
    }
}

/// Result of a dispatched call.
pub type InvocationResult = Result<Value, InvocationError>;
