//! Environment orchestration error types

use std::path::PathBuf;

use thiserror::Error;
use umbra_scheduler::SchedulerError;
use umbra_shadow::{InvocationError, ShadowError};
use umbra_types::{RealType, TestIdentity};

use crate::collaborators::SdkDependency;
use crate::qualifiers::QualifierLayer;

/// Error returned by an external collaborator (factory, resolver,
/// manifest, resource context).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Malformed qualifier strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualifierError {
    #[error("empty qualifier at position {position}")]
    EmptyToken { position: usize },

    #[error("unknown qualifier '{token}'")]
    Unknown { token: String },

    #[error("qualifier '{token}' must come before '{previous}'")]
    OutOfOrder { token: String, previous: String },

    #[error("invalid qualifier '{token}': {reason}")]
    InvalidValue { token: String, reason: &'static str },
}

/// Failures of environment set-up and tear-down.
///
/// Set-up failures leave the universe torn down; every variant describes
/// which step, layer or real type was at fault.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("set_up called while {live} is still live; tear it down first")]
    ReentrantSetUp { live: TestIdentity },

    #[error("could not resolve framework artifact {dependency}: {source}")]
    ArtifactResolution {
        dependency: SdkDependency,
        source: CollaboratorError,
    },

    #[error("could not create temp directory for {test} under {root:?}: {source}")]
    TempDirectory {
        test: TestIdentity,
        root: Option<PathBuf>,
        source: std::io::Error,
    },

    #[error("resource not found while initializing manifest of '{package}': {message}")]
    ResourceNotFound { package: String, message: String },

    #[error("manifest of '{package}' failed to initialize: {source}")]
    Manifest {
        package: String,
        source: CollaboratorError,
    },

    #[error("{layer} qualifier layer produced an unparsable configuration '{qualifiers}': {source}")]
    ConfigurationParse {
        layer: QualifierLayer,
        qualifiers: String,
        source: QualifierError,
    },

    #[error("main looper could not be prepared: {0}")]
    SchedulerAlreadyBound(#[from] SchedulerError),

    #[error("application factory failed for {test}: {source}")]
    ApplicationConstruction {
        test: TestIdentity,
        source: CollaboratorError,
    },

    #[error("could not bind shadow: {0}")]
    Binding(#[from] ShadowError),

    #[error("{context} resource context rejected the configuration: {source}")]
    ResourceContext {
        context: &'static str,
        source: CollaboratorError,
    },

    #[error("application '{real_type}' failed in {hook}: {source}")]
    Lifecycle {
        hook: &'static str,
        real_type: RealType,
        source: InvocationError,
    },

    #[error("application '{real_type}' failed in on_terminate (state was reset anyway): {source}")]
    TeardownHook {
        real_type: RealType,
        source: InvocationError,
    },
}
