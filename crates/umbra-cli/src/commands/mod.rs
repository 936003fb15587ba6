//! CLI command implementations.

pub mod config;
pub mod gates;
pub mod qualifiers;
pub mod version;
