//! Error type for the top-level `Umbra` API.

use thiserror::Error;
use umbra_config::ConfigError;
use umbra_env::EnvError;
use umbra_shadow::{InvocationError, ShadowError};

/// Result type for `Umbra` operations.
pub type Result<T> = std::result::Result<T, UmbraError>;

/// Errors surfaced by the `Umbra` entry points.
#[derive(Debug, Error)]
pub enum UmbraError {
    /// Harness configuration could not be loaded.
    #[error(transparent)]
    Load(#[from] anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Shadow(#[from] ShadowError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
