//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// file is not a bfres container
    #[error("file is not a bfres container")]
    InvalidFile,

    /// expected signature {expected}, found {found}
    #[error("expected signature {expected:?}, found {found:?}")]
    InvalidSignature {
        /// The signature the format requires at this position
        expected: String,
        /// The bytes actually read, lossily decoded
        found: String,
    },

    /// invalid {name} value {value:#x}
    #[error("invalid {name} value {value:#x}")]
    InvalidEnumValue {
        /// Name of the on-disk enumeration
        name: &'static str,
        /// The raw value that did not map to a variant
        value: u32,
    },

    /// {0}
    #[error("{0}")]
    InvalidValue(String),

    /// key {0:?} already exists in the dictionary
    #[error("key {0:?} already exists in the dictionary")]
    DuplicateKey(String),

    /// unable to find requested entry
    #[error("unable to find requested entry")]
    NotFound(#[from] NotFoundError),

    /// dictionary lookup for {expected:?} ended on {found:?}
    #[error("dictionary lookup for {expected:?} ended on {found:?}")]
    LookupMismatch {
        /// The key that was searched for
        expected: String,
        /// The key of the node the trie walk terminated on
        found: Option<String>,
    },

    /// {0} reserved offsets were never resolved
    #[error("{0} reserved offsets were never resolved")]
    UnresolvedOffsets(usize),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Error type to provide further information when a dictionary entry has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested entry")]
pub enum NotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by key {0}
    #[error("by key {0}")]
    Key(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
