//! Error types for index construction, deserialization and request routing.

use thiserror::Error;

use crate::coord::CoordKind;

/// Errors raised by [`HilbertRTree`](crate::HilbertRTree) and the selection engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IndexError {
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("data does not look like a packed index (magic byte {0:#04x})")]
    InvalidMagic(u8),

    #[error("got v{found} data when expected v{expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("unrecognized coordinate kind index {0}")]
    UnknownCoordKind(u8),

    #[error("buffer holds {found:?} coordinates, expected {expected:?}")]
    CoordKindMismatch { expected: CoordKind, found: CoordKind },

    #[error("node size {0} is below the minimum of 2")]
    InvalidNodeSize(u16),

    #[error("index already holds all {expected} items")]
    TooManyItems { expected: usize },

    #[error("added {added} items when expected {expected}")]
    ItemCountMismatch { added: usize, expected: usize },

    #[error("index must be finished before it can be queried or exported")]
    NotFinished,

    #[error("index is already finished")]
    AlreadyFinished,

    #[error("{0} items exceed the capacity of the packed format")]
    CapacityExceeded(usize),
}

/// Errors raised while dispatching requests through the [`Router`](crate::Router).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RouterError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("selection requested before init")]
    NotReady,

    #[error("lasso needs x/y pairs, got {0} values")]
    OddCoordinateCount(usize),
}

/// Convenience Result type alias for [`IndexError`].
pub type Result<T> = std::result::Result<T, IndexError>;
