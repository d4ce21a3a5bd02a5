//! Error types for nixkit-core

use thiserror::Error;

/// Result type alias for nixkit-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nixkit-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Failed to parse a YAML document (configuration or recipe module)
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Recipe module file could not be found
    #[error("recipe module not found: {path}")]
    ModuleNotFound {
        /// Path that was searched
        path: String,
    },

    /// Recipe module contains a value that cannot be turned into a recipe value
    #[error("invalid recipe in {module} at {location}: {message}")]
    InvalidRecipe {
        /// Module the value was declared in
        module: String,
        /// Position of the value inside the module
        location: String,
        /// Description of the problem
        message: String,
    },

    /// Selected attribute does not exist in the module
    #[error("attribute '{attribute}' not found in {module}")]
    AttributeNotFound {
        /// Attribute path that was requested
        attribute: String,
        /// Module that was searched
        module: String,
    },

    /// Attribute path is empty or contains an invalid component
    #[error("invalid attribute path '{attribute}': {message}")]
    InvalidAttribute {
        /// The rejected attribute path
        attribute: String,
        /// Description of the problem
        message: String,
    },

    /// Package-set accessor name is not a valid identifier path
    #[error("invalid package accessor '{name}'")]
    InvalidAccessor {
        /// The rejected accessor name
        name: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
