use thiserror::Error;

/// Validation errors raised before any I/O happens.
///
/// The store and search crates wrap these into their own error enums; a
/// `CoreError` always means the input was rejected, never that a write
/// partially happened.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid module path '{path}': {message}")]
    InvalidModulePath { path: String, message: String },

    #[error("invalid version '{version}': {message}")]
    InvalidVersion { version: String, message: String },
}

/// Convenience alias used throughout modfind-core.
pub type Result<T> = std::result::Result<T, CoreError>;
