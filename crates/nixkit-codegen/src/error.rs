//! Error types for code generation and building

use std::path::PathBuf;
use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or building a recipe
#[derive(Error, Debug)]
pub enum Error {
    /// Input value cannot be expressed (non-finite number, cycle, bad URL...)
    #[error("unsupported value at {path}: {message}")]
    ValueKind {
        /// Position of the value, from the exported root
        path: String,
        /// Description of the problem
        message: String,
    },

    /// A file reference could not be resolved against its declaring module
    #[error("cannot resolve file '{file}' at {path}: {message}")]
    Resolution {
        /// File as written in the recipe
        file: String,
        /// Position of the value, from the exported root
        path: String,
        /// Description of the problem
        message: String,
    },

    /// The transient expression file could not be created or written
    #[error("failed to write expression file {path}: {source}")]
    Write {
        /// File (or directory) being written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The external builder failed
    #[error("{program} failed: {status}")]
    ExternalTool {
        /// Builder executable
        program: String,
        /// Exit status or failure description
        status: String,
        /// Captured standard error
        stderr: String,
        /// Expression file left on disk (keep-failed)
        kept: Option<PathBuf>,
    },

    /// Invalid or missing options, reported before compilation starts
    #[error("{0}")]
    Usage(String),

    /// Recipe module could not be loaded or evaluated
    #[error(transparent)]
    Recipe(#[from] nixkit_core::Error),
}

impl Error {
    /// Usage error with the given message
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }
}
