//! Error type shared by the whole crate.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by stores and backed matrices.
///
/// Storage-layer I/O failures are propagated as-is; the crate has no
/// recovery strategy for them.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A named array or group does not exist in the store.
    #[error("no array or group named '{0}' in store")]
    NotFound(String),

    /// Missing or unsupported encoding tag, or a dtype that does not match
    /// the stored one.
    #[error("format error: {0}")]
    Format(String),

    /// Array lengths or matrix dimensions do not line up.
    #[error("shape error: {0}")]
    Shape(String),

    /// An index selector referred to a position outside the axis.
    #[error("index {index} out of range for axis of length {len}")]
    Index {
        /// The offending position.
        index: usize,
        /// Length of the axis being indexed.
        len: usize,
    },

    /// The operation does not support this kind of input.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The descriptor's backing group is fixed at construction.
    #[error("usage error: {0}")]
    Frozen(&'static str),
}
