use crate::util::SegmentError;
use std::fmt::{Display, Error as FmtError, Formatter};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The host allocator could not provide room for a new entry
    OutOfMemory,

    /// A limit of the token encoding was reached (array depth, index space, ...)
    CapacityExceeded(&'static str),

    /// A class name or descriptor is not well formed
    MalformedSignature(String),
}

impl From<SegmentError> for Error {
    fn from(err: SegmentError) -> Error {
        match err {
            SegmentError::OutOfMemory => Error::OutOfMemory,
            SegmentError::IndexSpaceExhausted => Error::CapacityExceeded("type table is full"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Error::OutOfMemory => f.write_str("out of memory"),
            Error::CapacityExceeded(what) => write!(f, "capacity exceeded: {}", what),
            Error::MalformedSignature(msg) => write!(f, "malformed signature: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
