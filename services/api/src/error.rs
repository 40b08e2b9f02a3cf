//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::config::ConfigError;

/// The primary error type for the `api` service. Handlers map `PortError`
/// straight to HTTP responses; this enum covers the binaries' startup path.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network
    /// socket or creating the store directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
