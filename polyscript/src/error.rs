//! Host-level errors
//!
//! Problems in a running program never end up here; those are pushed as
//! error blocks onto the value stack. This type covers malformed input text,
//! bad plugin registrations and I/O around the VM.

use thiserror::Error;

/// Host result type
pub type Result<T> = std::result::Result<T, Error>;

/// Host errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("workspace text does not match the workspace grammar")]
    WorkspaceParse,

    #[error("input definition does not match the input grammar")]
    InputDefinitionParse,

    #[error("stack not found: {0}")]
    UnknownStack(String),

    #[error("invalid serialization pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("serialization pattern of {0} must not contain capture groups")]
    CapturingPattern(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state variable {0} cannot hold a data block or a function")]
    UnsupportedStateValue(String),

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
