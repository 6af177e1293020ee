use thiserror::Error;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Deserialization error: {message}")]
    Deserialization { message: String },

    #[error("Backend connectivity error: {backend} - {message}")]
    BackendConnectivity { backend: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Computation error: {message}")]
    Computation { message: String },
}

impl CacheError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    pub fn connectivity(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendConnectivity {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }

    /// Returns true if the backend could not be reached or answered with a
    /// protocol failure
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::BackendConnectivity { .. })
    }
}
